use std::collections::HashSet;

use wiregraph_core::{detect_cycles, ComponentInfo, ComponentWiringGraph, DependencyView, ImportGraph};

/// DOT digraph of the import graph. Edges that close a cycle are red.
pub fn import_diagram(graph: &ImportGraph) -> String {
    let mut out = header("imports");
    out.push_str("  node [shape=box];\n\n");

    for id in graph.nodes() {
        out.push_str(&format!("  {};\n", quote(&id)));
    }
    out.push('\n');
    push_edges(&mut out, &graph.edges(), &detect_cycles(graph));

    out.push_str("}\n");
    out
}

/// DOT digraph of the wiring graph, nodes shaped by declaration origin.
pub fn wiring_diagram(graph: &ComponentWiringGraph) -> String {
    let mut out = header("wiring");

    for (id, info) in graph.get_all_component_info() {
        out.push_str(&format!("  {} [{}];\n", quote(&id), node_style(&info)));
    }
    out.push('\n');
    push_edges(&mut out, &graph.edges(), &detect_cycles(graph));

    out.push_str("}\n");
    out
}

fn header(name: &str) -> String {
    format!("digraph {name} {{\n  rankdir=LR;\n")
}

fn node_style(info: &ComponentInfo) -> String {
    let shape = match (info.is_declaratively_defined, info.is_marker_defined) {
        (true, true) => "doubleoctagon",
        (true, false) => "box",
        _ => "ellipse",
    };
    let mut attrs = format!("shape={shape}");
    if info.is_dangling() {
        attrs.push_str(", style=dashed");
    }
    if let Some(class) = &info.class_name {
        attrs.push_str(&format!(", tooltip={}", quote(class)));
    }
    attrs
}

fn push_edges(out: &mut String, edges: &[(String, String)], cycles: &[Vec<String>]) {
    let mut cycle_edges: HashSet<(&str, &str)> = HashSet::new();
    for cycle in cycles {
        for (i, from) in cycle.iter().enumerate() {
            let to = &cycle[(i + 1) % cycle.len()];
            cycle_edges.insert((from.as_str(), to.as_str()));
        }
    }

    for (from, to) in edges {
        if cycle_edges.contains(&(from.as_str(), to.as_str())) {
            out.push_str(&format!("  {} -> {} [color=red];\n", quote(from), quote(to)));
        } else {
            out.push_str(&format!("  {} -> {};\n", quote(from), quote(to)));
        }
    }
}

/// Quoted DOT id; ids keep their dots so `a.b` and `a_b` stay distinct.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
