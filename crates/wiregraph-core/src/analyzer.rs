use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tree_sitter::Tree;

use crate::types::{AliasDecl, ComponentRecord, SourceFact};

/// A parsed source file with its tree-sitter AST and original content.
pub struct ParsedFile {
    pub path: PathBuf,
    pub tree: Tree,
    pub content: String,
}

/// Trait that each source-language extractor must implement.
pub trait LanguageAnalyzer: Send + Sync {
    /// Language name (e.g., "java")
    fn language(&self) -> &'static str;

    /// File extensions this analyzer handles (e.g., &["java"])
    fn file_extensions(&self) -> &[&str];

    /// Parse a source file into a ParsedFile.
    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile>;

    /// Package and import facts for the import graph.
    fn extract_source_fact(&self, parsed: &ParsedFile) -> SourceFact;

    /// Components declared by in-source role markers.
    fn extract_component_records(&self, parsed: &ParsedFile) -> Vec<ComponentRecord>;
}

/// Everything a markup document contributes to the wiring graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupDocument {
    pub records: Vec<ComponentRecord>,
    pub aliases: Vec<AliasDecl>,
}

/// Trait for extractors of declarative component configuration.
pub trait MarkupAnalyzer: Send + Sync {
    /// Format name (e.g., "xml")
    fn name(&self) -> &'static str;

    /// Whether this analyzer understands the document.
    fn accepts(&self, path: &Path, content: &str) -> bool;

    /// Extract component declarations and aliases.
    fn extract(&self, path: &Path, content: &str) -> Result<MarkupDocument>;
}
