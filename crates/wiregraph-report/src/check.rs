use std::fmt;

use serde::Serialize;

use wiregraph_core::config::ReportConfig;
use wiregraph_core::{AnalysisSummary, CouplingMetrics};

/// Presentation class of a node's coupling numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stability {
    /// No edges at all.
    Isolated,
    /// Depended upon, depends on nothing.
    Stable,
    Balanced,
    /// Instability above the configured threshold.
    Unstable,
    /// Depends on others, depended on by none.
    FullyDependent,
}

impl Stability {
    pub fn classify(metrics: &CouplingMetrics, threshold: f64) -> Self {
        if metrics.afferent == 0 && metrics.efferent == 0 {
            Self::Isolated
        } else if metrics.efferent == 0 {
            Self::Stable
        } else if metrics.afferent == 0 {
            Self::FullyDependent
        } else if metrics.instability > threshold {
            Self::Unstable
        } else {
            Self::Balanced
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Isolated => "isolated",
            Self::Stable => "stable",
            Self::Balanced => "balanced",
            Self::Unstable => "unstable",
            Self::FullyDependent => "fully-dependent",
        };
        f.pad(s)
    }
}

/// A node whose instability is above `max_instability`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstabilityBreach {
    pub id: String,
    pub instability: f64,
}

/// Result of the `check` gates over one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub passed: bool,
    pub failing_import_cycles: usize,
    pub failing_wiring_cycles: usize,
    pub instability_breaches: Vec<InstabilityBreach>,
}

/// Apply the `[report]` gates to a finished summary.
///
/// Only import-graph nodes that have dependents count toward
/// `max_instability`; a node nothing depends on is trivially 1.0.
pub fn evaluate(summary: &AnalysisSummary, config: &ReportConfig) -> CheckOutcome {
    let failing_import_cycles = if config.fail_on_import_cycles {
        summary.import_cycles.len()
    } else {
        0
    };
    let failing_wiring_cycles = if config.fail_on_wiring_cycles {
        summary.wiring_cycles.len()
    } else {
        0
    };

    let instability_breaches: Vec<InstabilityBreach> = match config.max_instability {
        Some(max) => summary
            .coupling
            .iter()
            .filter(|(_, m)| m.afferent > 0 && m.instability > max)
            .map(|(id, m)| InstabilityBreach {
                id: id.clone(),
                instability: m.instability,
            })
            .collect(),
        None => Vec::new(),
    };

    CheckOutcome {
        passed: failing_import_cycles == 0
            && failing_wiring_cycles == 0
            && instability_breaches.is_empty(),
        failing_import_cycles,
        failing_wiring_cycles,
        instability_breaches,
    }
}
