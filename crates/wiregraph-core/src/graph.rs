use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::trace;

use crate::filter::NamespaceFilter;
use crate::types::{Granularity, SourceFact};

/// Read-only view shared by the import graph and the wiring graph.
///
/// Every method returns owned collections; callers may mutate them freely.
pub trait DependencyView {
    /// All node ids.
    fn nodes(&self) -> BTreeSet<String>;

    /// Outgoing neighbours of `id`. Unknown ids yield an empty set.
    fn dependencies_of(&self, id: &str) -> BTreeSet<String>;

    /// Incoming neighbours of `id`. Unknown ids yield an empty set.
    fn dependents_of(&self, id: &str) -> BTreeSet<String> {
        self.nodes()
            .into_iter()
            .filter(|n| self.dependencies_of(n).contains(id))
            .collect()
    }
}

/// Directed graph of ids over a petgraph `DiGraph`, one node per id and at
/// most one edge per ordered pair.
#[derive(Debug, Clone)]
pub(crate) struct IdGraph<N> {
    pub(crate) graph: DiGraph<N, ()>,
    pub(crate) index: HashMap<String, NodeIndex>,
}

impl<N> IdGraph<N> {
    pub(crate) fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Get or create the node for `id`, building its weight on first sight.
    pub(crate) fn ensure_node(&mut self, id: &str, make: impl FnOnce() -> N) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(make());
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Add `from -> to` unless it already exists.
    pub(crate) fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        self.graph.update_edge(from, to, ());
    }

    pub(crate) fn node(&self, id: &str) -> Option<&N> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut N> {
        let idx = *self.index.get(id)?;
        self.graph.node_weight_mut(idx)
    }

    pub(crate) fn ids(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    pub(crate) fn neighbors(&self, id: &str, direction: Direction) -> BTreeSet<String>
    where
        N: AsRef<str>,
    {
        let Some(&idx) = self.index.get(id) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].as_ref().to_string())
            .collect()
    }

    pub(crate) fn edge_pairs(&self) -> Vec<(String, String)>
    where
        N: AsRef<str>,
    {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].as_ref().to_string(),
                    self.graph[e.target()].as_ref().to_string(),
                )
            })
            .collect();
        edges.sort();
        edges
    }
}

/// Node weight of the import graph: the package or type id.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportNode(String);

impl AsRef<str> for ImportNode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Directed graph of package (or type) references built from import facts.
///
/// Nodes are created lazily on first reference and never removed. References
/// rejected by the namespace filter and self references never become edges.
#[derive(Debug, Clone)]
pub struct ImportGraph {
    inner: IdGraph<ImportNode>,
    granularity: Granularity,
    filter: NamespaceFilter,
}

impl ImportGraph {
    pub fn new(granularity: Granularity, filter: NamespaceFilter) -> Self {
        Self {
            inner: IdGraph::new(),
            granularity,
            filter,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn filter(&self) -> &NamespaceFilter {
        &self.filter
    }

    /// Record that `owner` references each of `imports`.
    ///
    /// An absent or empty owner contributes nothing. The owner node is created
    /// even when every import is filtered out.
    pub fn add_source<S: AsRef<str>>(&mut self, owner: Option<&str>, imports: &[S]) {
        let Some(owner) = owner.map(str::trim).filter(|o| !o.is_empty()) else {
            trace!("skipping source without an owning namespace");
            return;
        };
        let from = self
            .inner
            .ensure_node(owner, || ImportNode(owner.to_string()));

        for imported in imports {
            let imported = imported.as_ref().trim();
            if imported.is_empty() || imported == owner {
                continue;
            }
            let package = match self.granularity {
                Granularity::Package => imported,
                Granularity::Type => imported.rsplit_once('.').map_or("", |(p, _)| p),
            };
            if !self.filter.admits(imported, package) {
                trace!(owner, imported, "filtered external reference");
                continue;
            }
            let to = self
                .inner
                .ensure_node(imported, || ImportNode(imported.to_string()));
            self.inner.add_edge(from, to);
        }
    }

    /// Add a source fact, deriving ids according to the graph's granularity.
    pub fn add_fact(&mut self, fact: &SourceFact) {
        let owner = fact.owner_id(self.granularity);
        let imports: Vec<String> = fact
            .imports
            .iter()
            .filter_map(|import| import_target(import, self.granularity))
            .collect();
        self.add_source(owner.as_deref(), imports.as_slice());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.inner.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.graph.edge_count()
    }

    /// All edges as `(from, to)` pairs, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.inner.edge_pairs()
    }
}

impl Default for ImportGraph {
    fn default() -> Self {
        Self::new(Granularity::default(), NamespaceFilter::default())
    }
}

impl DependencyView for ImportGraph {
    fn nodes(&self) -> BTreeSet<String> {
        self.inner.ids()
    }

    fn dependencies_of(&self, id: &str) -> BTreeSet<String> {
        self.inner.neighbors(id, Direction::Outgoing)
    }

    fn dependents_of(&self, id: &str) -> BTreeSet<String> {
        self.inner.neighbors(id, Direction::Incoming)
    }
}

/// Map an imported name to the node id it references at `granularity`.
///
/// The first capitalised segment names the top-level type; anything after it
/// is a nested type or a member. `a.b.Outer.Inner` therefore references the
/// package `a.b` and the type `a.b.Outer`. Names without a capitalised
/// segment fall back to their last segment being the type.
fn import_target(import: &str, granularity: Granularity) -> Option<String> {
    let import = import.trim();
    let (name, wildcard) = match import.strip_suffix(".*") {
        Some(name) => (name, true),
        None => (import, false),
    };
    let segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
    let type_at = segments
        .iter()
        .position(|s| s.starts_with(|c: char| c.is_uppercase()));

    let target = match (granularity, type_at) {
        (Granularity::Package, Some(at)) => segments[..at].join("."),
        (Granularity::Package, None) if wildcard => segments.join("."),
        (Granularity::Package, None) => segments[..segments.len().saturating_sub(1)].join("."),
        (Granularity::Type, Some(at)) => segments[..=at].join("."),
        // `a.b.*` names no single type.
        (Granularity::Type, None) if wildcard => return None,
        (Granularity::Type, None) => segments.join("."),
    };
    Some(target).filter(|t| !t.is_empty())
}
