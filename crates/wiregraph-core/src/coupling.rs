use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::DependencyView;

/// Afferent/efferent coupling and instability for one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouplingMetrics {
    /// Distinct incoming edges.
    pub afferent: usize,
    /// Distinct outgoing edges.
    pub efferent: usize,
    /// `efferent / (afferent + efferent)`, 0.0 when both are zero.
    pub instability: f64,
}

impl CouplingMetrics {
    pub fn new(afferent: usize, efferent: usize) -> Self {
        let total = afferent + efferent;
        let instability = if total == 0 {
            0.0
        } else {
            efferent as f64 / total as f64
        };
        Self {
            afferent,
            efferent,
            instability,
        }
    }
}

/// Compute coupling metrics for every node of a finished graph.
pub fn calculate_coupling_metrics<G: DependencyView + ?Sized>(
    graph: &G,
) -> BTreeMap<String, CouplingMetrics> {
    graph
        .nodes()
        .into_iter()
        .map(|node| {
            let afferent = graph.dependents_of(&node).len();
            let efferent = graph.dependencies_of(&node).len();
            (node, CouplingMetrics::new(afferent, efferent))
        })
        .collect()
}
