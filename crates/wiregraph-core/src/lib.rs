pub mod analyzer;
pub mod cache;
pub mod config;
pub mod coupling;
pub mod cycles;
pub mod error;
pub mod filter;
pub mod graph;
pub mod pipeline;
pub mod summary;
pub mod types;
pub mod wiring;

pub use analyzer::{LanguageAnalyzer, MarkupAnalyzer, MarkupDocument, ParsedFile};
pub use config::Config;
pub use coupling::{calculate_coupling_metrics, CouplingMetrics};
pub use cycles::{cycles_equivalent, detect_cycles};
pub use error::ExtractError;
pub use filter::NamespaceFilter;
pub use graph::{DependencyView, ImportGraph};
pub use summary::AnalysisSummary;
pub use types::*;
pub use wiring::{ComponentInfo, ComponentWiringGraph};
