use std::path::PathBuf;

use thiserror::Error;

/// Failures an extractor can report for a single file.
///
/// The pipeline logs these and skips the file; they never abort an analysis.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to parse source file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("malformed markup in '{}': {message}", path.display())]
    Markup { path: PathBuf, message: String },

    #[error("no extractor handles '{}'", path.display())]
    Unsupported { path: PathBuf },
}
