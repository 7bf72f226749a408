use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coupling::{calculate_coupling_metrics, CouplingMetrics};
use crate::cycles::detect_cycles;
use crate::graph::ImportGraph;
use crate::types::Granularity;
use crate::wiring::{ComponentInfo, ComponentWiringGraph};

/// Serializable result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub granularity: Granularity,
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub import_nodes: usize,
    pub import_edges: usize,
    pub wiring_nodes: usize,
    pub wiring_edges: usize,
    pub import_cycles: Vec<Vec<String>>,
    pub wiring_cycles: Vec<Vec<String>>,
    pub coupling: BTreeMap<String, CouplingMetrics>,
    pub wiring_coupling: BTreeMap<String, CouplingMetrics>,
    pub components: BTreeMap<String, ComponentInfo>,
}

/// File counters gathered while extracting facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub analyzed: usize,
    pub skipped: usize,
}

impl AnalysisSummary {
    /// Run the read-only passes over two finished graphs.
    pub fn build(
        imports: &ImportGraph,
        wiring: &ComponentWiringGraph,
        stats: FileStats,
    ) -> Self {
        Self {
            granularity: imports.granularity(),
            files_analyzed: stats.analyzed,
            files_skipped: stats.skipped,
            import_nodes: imports.node_count(),
            import_edges: imports.edge_count(),
            wiring_nodes: wiring.node_count(),
            wiring_edges: wiring.edge_count(),
            import_cycles: detect_cycles(imports),
            wiring_cycles: detect_cycles(wiring),
            coupling: calculate_coupling_metrics(imports),
            wiring_coupling: calculate_coupling_metrics(wiring),
            components: wiring.get_all_component_info(),
        }
    }

    pub fn has_cycles(&self) -> bool {
        !self.import_cycles.is_empty() || !self.wiring_cycles.is_empty()
    }

    /// Components that are referenced but never declared.
    pub fn dangling_components(&self) -> Vec<&ComponentInfo> {
        self.components.values().filter(|c| c.is_dangling()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::NamespaceFilter;
    use crate::types::ComponentRecord;

    #[test]
    fn test_build_summary() {
        let mut imports = ImportGraph::new(Granularity::Package, NamespaceFilter::allow_all());
        imports.add_source(Some("a"), &["b"]);
        imports.add_source(Some("b"), &["a"]);

        let mut wiring = ComponentWiringGraph::new();
        wiring.add_marker(&ComponentRecord::marker("com.acme.Api").with_reference("gateway"));

        let summary = AnalysisSummary::build(
            &imports,
            &wiring,
            FileStats {
                analyzed: 3,
                skipped: 1,
            },
        );

        assert_eq!(summary.files_analyzed, 3);
        assert_eq!(summary.import_edges, 2);
        assert_eq!(summary.import_cycles.len(), 1);
        assert!(summary.wiring_cycles.is_empty());
        assert!(summary.has_cycles());
        assert_eq!(summary.wiring_coupling["api"].efferent, 1);
        assert_eq!(summary.dangling_components().len(), 1);
        assert_eq!(summary.dangling_components()[0].id, "gateway");
    }
}
