//! Cycle detection over any [`DependencyView`].
//!
//! Tarjan's algorithm splits the graph into strongly connected components.
//! Inside each cyclic component, Johnson's circuit search lists every
//! elementary cycle, so two loops sharing a node come out as two cycles.
//! Each cycle starts at its smallest member and follows real edges; the
//! closing edge runs from the last member back to the first. A single node
//! with a self edge is a cycle of length one.
//!
//! Both searches use explicit stacks, so long chains cannot overflow.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::graph::DependencyView;

/// Index-based snapshot of a view. Ids and neighbour lists are sorted, so
/// comparing indices compares ids.
struct Adjacency {
    ids: Vec<String>,
    edges: Vec<Vec<usize>>,
}

impl Adjacency {
    fn from_view<G: DependencyView + ?Sized>(graph: &G) -> Self {
        let ids: Vec<String> = graph.nodes().into_iter().collect();
        let position: HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
        let edges = ids
            .iter()
            .map(|id| {
                graph
                    .dependencies_of(id)
                    .iter()
                    .filter_map(|dep| position.get(dep.as_str()).copied())
                    .collect()
            })
            .collect();
        Self { ids, edges }
    }

    fn has_self_edge(&self, node: usize) -> bool {
        self.edges[node].binary_search(&node).is_ok()
    }

    fn names(&self, cycle: &[usize]) -> Vec<String> {
        cycle.iter().map(|&i| self.ids[i].clone()).collect()
    }
}

struct Frame {
    node: usize,
    next: usize,
}

/// Tarjan state for one pass over the subgraph induced by `allowed`.
struct Tarjan<'a, F> {
    edges: &'a [Vec<usize>],
    allowed: F,
    counter: usize,
    index: HashMap<usize, usize>,
    lowlink: HashMap<usize, usize>,
    on_stack: HashSet<usize>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

impl<'a, F: Fn(usize) -> bool> Tarjan<'a, F> {
    fn new(edges: &'a [Vec<usize>], allowed: F) -> Self {
        Self {
            edges,
            allowed,
            counter: 0,
            index: HashMap::new(),
            lowlink: HashMap::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, node: usize, work: &mut Vec<Frame>) {
        self.index.insert(node, self.counter);
        self.lowlink.insert(node, self.counter);
        self.counter += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
        work.push(Frame { node, next: 0 });
    }

    fn lower(&mut self, node: usize, candidate: usize) {
        if let Some(low) = self.lowlink.get_mut(&node) {
            *low = (*low).min(candidate);
        }
    }

    fn run(&mut self, root: usize) {
        if self.index.contains_key(&root) || !(self.allowed)(root) {
            return;
        }
        let mut work = Vec::new();
        self.visit(root, &mut work);

        while let Some(frame) = work.last_mut() {
            let node = frame.node;
            if let Some(&target) = self.edges[node].get(frame.next) {
                frame.next += 1;
                if !(self.allowed)(target) {
                    continue;
                }
                match self.index.get(&target).copied() {
                    None => self.visit(target, &mut work),
                    Some(target_index) if self.on_stack.contains(&target) => {
                        self.lower(node, target_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            let node_low = self.lowlink[&node];
            if node_low == self.index[&node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                self.components.push(component);
            }
            if let Some(parent) = work.last() {
                let parent = parent.node;
                self.lower(parent, node_low);
            }
        }
    }
}

/// Strongly connected components of the subgraph induced by `allowed`,
/// searched from `roots`.
fn strongly_connected<F: Fn(usize) -> bool>(
    edges: &[Vec<usize>],
    roots: impl IntoIterator<Item = usize>,
    allowed: F,
) -> Vec<Vec<usize>> {
    let mut tarjan = Tarjan::new(edges, allowed);
    for root in roots {
        tarjan.run(root);
    }
    tarjan.components
}

/// Every elementary cycle through `start` inside the subgraph induced by
/// `allowed`, in the order Johnson's search finds them.
fn circuits_from<F: Fn(usize) -> bool>(
    edges: &[Vec<usize>],
    start: usize,
    allowed: F,
    out: &mut Vec<Vec<usize>>,
) {
    struct Step {
        node: usize,
        next: usize,
        closed: bool,
    }

    let mut blocked: HashSet<usize> = HashSet::from([start]);
    let mut blockers: HashMap<usize, HashSet<usize>> = HashMap::new();
    let mut path = vec![Step {
        node: start,
        next: 0,
        closed: false,
    }];

    while let Some(step) = path.last_mut() {
        if let Some(&target) = edges[step.node].get(step.next) {
            step.next += 1;
            if !allowed(target) {
                continue;
            }
            if target == start {
                step.closed = true;
                out.push(path.iter().map(|s| s.node).collect());
            } else if blocked.insert(target) {
                path.push(Step {
                    node: target,
                    next: 0,
                    closed: false,
                });
            }
            continue;
        }

        let Some(done) = path.pop() else {
            break;
        };
        if done.closed {
            unblock(done.node, &mut blocked, &mut blockers);
        } else {
            for &target in edges[done.node].iter().filter(|&&t| allowed(t)) {
                blockers.entry(target).or_default().insert(done.node);
            }
        }
        if let Some(parent) = path.last_mut() {
            parent.closed |= done.closed;
        }
    }
}

fn unblock(
    node: usize,
    blocked: &mut HashSet<usize>,
    blockers: &mut HashMap<usize, HashSet<usize>>,
) {
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        if blocked.remove(&node) {
            if let Some(waiting) = blockers.remove(&node) {
                pending.extend(waiting);
            }
        }
    }
}

/// Elementary cycles of one strongly connected component.
///
/// Repeatedly takes the smallest member that still sits on a cycle,
/// collects the circuits through it, then drops it from the search.
fn component_cycles(adjacency: &Adjacency, component: &BTreeSet<usize>, out: &mut Vec<Vec<usize>>) {
    let edges = &adjacency.edges;
    let mut floor = 0;

    loop {
        let live = |n: usize| n >= floor && component.contains(&n);
        let next = strongly_connected(edges, component.range(floor..).copied(), live)
            .into_iter()
            .filter(|c| c.len() > 1 || adjacency.has_self_edge(c[0]))
            .min_by_key(|c| c.iter().min().copied());
        let Some(sub) = next else {
            break;
        };
        let Some(&start) = sub.iter().min() else {
            break;
        };

        let members: HashSet<usize> = sub.into_iter().collect();
        circuits_from(edges, start, |n| members.contains(&n), out);
        floor = start + 1;
    }
}

/// Find every elementary cycle in `graph`.
///
/// Output is deterministic: each cycle starts at its smallest member, and
/// the returned cycles are sorted.
pub fn detect_cycles<G: DependencyView + ?Sized>(graph: &G) -> Vec<Vec<String>> {
    let adjacency = Adjacency::from_view(graph);
    let edges = &adjacency.edges;

    let mut found = Vec::new();
    for component in strongly_connected(edges, 0..edges.len(), |_| true) {
        if component.len() == 1 && !adjacency.has_self_edge(component[0]) {
            continue;
        }
        let members: BTreeSet<usize> = component.into_iter().collect();
        component_cycles(&adjacency, &members, &mut found);
    }

    let mut cycles: Vec<Vec<String>> = found.iter().map(|c| adjacency.names(c)).collect();
    cycles.sort();
    cycles
}

/// Whether two cycles list the same members in the same cyclic order,
/// regardless of the starting point.
pub fn cycles_equivalent(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.is_empty() {
        return true;
    }
    (0..b.len()).any(|offset| a.iter().zip(b.iter().cycle().skip(offset)).all(|(x, y)| x == y))
}
