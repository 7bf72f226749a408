use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::analyzer::{LanguageAnalyzer, MarkupAnalyzer};
use crate::cache::{FactCache, FileFacts};
use crate::config::Config;
use crate::graph::ImportGraph;
use crate::summary::{AnalysisSummary, FileStats};
use crate::types::DeclarationOrigin;
use crate::wiring::ComponentWiringGraph;

/// Full analysis output including both graphs for diagram generation.
pub struct FullAnalysis {
    pub import_graph: ImportGraph,
    pub wiring_graph: ComponentWiringGraph,
    pub summary: AnalysisSummary,
}

/// Which extractor a discovered file goes to.
#[derive(Debug, Clone, Copy)]
enum Candidate {
    Source(usize),
    Markup,
}

enum Outcome {
    Facts(FileFacts),
    /// Not something any extractor understands (e.g. an XML file without `<beans>`).
    Ignored,
    Failed,
}

struct Extraction {
    rel_path: String,
    content: Option<String>,
    outcome: Outcome,
}

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &[".git", ".wiregraph", "target", "build", "node_modules", ".idea"];

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!(pattern = %pattern, "ignoring invalid glob: {e}"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!("failed to compile glob set: {e}");
        GlobSet::empty()
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Fold extracted facts into fresh graphs.
///
/// Aliases go first so references resolve, then declarative records, then
/// marker records, then import facts. Markup metadata therefore wins over
/// marker metadata when both name the same component.
pub fn assemble(config: &Config, facts: &[FileFacts]) -> (ImportGraph, ComponentWiringGraph) {
    let mut filter = config.namespaces.filter();
    if config.namespaces.internal.is_empty() && config.namespaces.infer_internal {
        let packages: BTreeSet<&str> = facts
            .iter()
            .filter_map(|f| match f {
                FileFacts::Source { fact, .. } => fact.package.as_deref(),
                FileFacts::Markup(_) => None,
            })
            .filter(|p| !p.is_empty())
            .collect();
        if !packages.is_empty() {
            debug!(count = packages.len(), "inferred internal packages");
            filter = filter.with_packages(packages);
        }
    }

    let mut imports = ImportGraph::new(config.graph.granularity, filter);
    let mut wiring = ComponentWiringGraph::new();

    for facts in facts {
        if let FileFacts::Markup(doc) = facts {
            for alias in &doc.aliases {
                wiring.add_alias(alias);
            }
        }
    }

    let records = facts.iter().flat_map(|f| match f {
        FileFacts::Source { records, .. } => records.iter(),
        FileFacts::Markup(doc) => doc.records.iter(),
    });
    let (declarative, marker): (Vec<_>, Vec<_>) =
        records.partition(|r| r.origin == DeclarationOrigin::Declarative);
    for record in declarative {
        wiring.add_declarative(record);
    }
    for record in marker {
        wiring.add_marker(record);
    }

    for facts in facts {
        if let FileFacts::Source { fact, .. } = facts {
            imports.add_fact(fact);
        }
    }

    (imports, wiring)
}

/// Reusable analysis pipeline: discover files, extract facts, build graphs.
pub struct AnalysisPipeline {
    analyzers: Vec<Box<dyn LanguageAnalyzer>>,
    markup_analyzers: Vec<Box<dyn MarkupAnalyzer>>,
    config: Config,
    excludes: GlobSet,
    markup_patterns: GlobSet,
}

impl AnalysisPipeline {
    pub fn new(
        analyzers: Vec<Box<dyn LanguageAnalyzer>>,
        markup_analyzers: Vec<Box<dyn MarkupAnalyzer>>,
        config: Config,
    ) -> Self {
        let excludes = build_globset(&config.project.exclude_patterns);
        let markup_patterns = build_globset(&config.project.markup_patterns);
        Self {
            analyzers,
            markup_analyzers,
            config,
            excludes,
            markup_patterns,
        }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a full analysis on the given project path.
    pub fn analyze(&self, project_path: &Path) -> Result<FullAnalysis> {
        self.analyze_inner(project_path, false)
    }

    /// Run an incremental analysis, reusing cached facts for unchanged files.
    pub fn analyze_incremental(&self, project_path: &Path) -> Result<FullAnalysis> {
        self.analyze_inner(project_path, true)
    }

    fn discover(&self, project_path: &Path) -> Vec<(PathBuf, String, Candidate)> {
        let mut files = Vec::new();
        for entry in WalkDir::new(project_path)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.into_path();
            let rel_path = path
                .strip_prefix(project_path)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            if self.excludes.is_match(&rel_path) {
                continue;
            }
            if let Some(candidate) = self.classify(&path, &rel_path) {
                files.push((path, rel_path, candidate));
            }
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));
        files
    }

    fn classify(&self, path: &Path, rel_path: &str) -> Option<Candidate> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let wanted = self
            .config
            .project
            .source_extensions
            .iter()
            .any(|e| e == ext);
        if wanted {
            if let Some(idx) = self
                .analyzers
                .iter()
                .position(|a| a.file_extensions().contains(&ext))
            {
                return Some(Candidate::Source(idx));
            }
        }
        if !self.markup_analyzers.is_empty() && self.markup_patterns.is_match(rel_path) {
            return Some(Candidate::Markup);
        }
        None
    }

    fn extract(&self, path: &Path, candidate: Candidate, content: &str) -> Outcome {
        match candidate {
            Candidate::Source(idx) => {
                let analyzer = &self.analyzers[idx];
                match analyzer.parse_file(path, content) {
                    Ok(parsed) => Outcome::Facts(FileFacts::Source {
                        fact: analyzer.extract_source_fact(&parsed),
                        records: analyzer.extract_component_records(&parsed),
                    }),
                    Err(e) => {
                        warn!(path = %path.display(), "failed to parse: {e:#}");
                        Outcome::Failed
                    }
                }
            }
            Candidate::Markup => {
                let Some(analyzer) = self
                    .markup_analyzers
                    .iter()
                    .find(|a| a.accepts(path, content))
                else {
                    return Outcome::Ignored;
                };
                match analyzer.extract(path, content) {
                    Ok(doc) => Outcome::Facts(FileFacts::Markup(doc)),
                    Err(e) => {
                        warn!(path = %path.display(), "failed to read {} markup: {e:#}", analyzer.name());
                        Outcome::Failed
                    }
                }
            }
        }
    }

    #[instrument(skip(self, project_path), fields(path = %project_path.display()))]
    fn analyze_inner(&self, project_path: &Path, incremental: bool) -> Result<FullAnalysis> {
        if !project_path.is_dir() {
            anyhow::bail!("'{}' is not a directory", project_path.display());
        }

        let mut cache = if incremental {
            FactCache::load(project_path).unwrap_or_else(|e| {
                warn!("ignoring unreadable fact cache: {e:#}");
                FactCache::new()
            })
        } else {
            FactCache::new()
        };

        let files = self.discover(project_path);
        debug!(count = files.len(), "discovered candidate files");

        let extractions: Vec<Extraction> = files
            .par_iter()
            .map(|(path, rel_path, candidate)| {
                let content = match std::fs::read_to_string(path) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(path = %path.display(), "failed to read: {e}");
                        return Extraction {
                            rel_path: rel_path.clone(),
                            content: None,
                            outcome: Outcome::Failed,
                        };
                    }
                };
                if incremental {
                    if let Some(cached) = cache.get(rel_path, &content) {
                        return Extraction {
                            rel_path: rel_path.clone(),
                            outcome: Outcome::Facts(cached.clone()),
                            content: Some(content),
                        };
                    }
                }
                let outcome = self.extract(path, *candidate, &content);
                Extraction {
                    rel_path: rel_path.clone(),
                    content: Some(content),
                    outcome,
                }
            })
            .collect();

        let mut stats = FileStats::default();
        let mut facts = Vec::new();
        let mut current_files = Vec::new();
        for extraction in extractions {
            match extraction.outcome {
                Outcome::Facts(file_facts) => {
                    stats.analyzed += 1;
                    if incremental {
                        if let Some(content) = &extraction.content {
                            cache.insert(extraction.rel_path.clone(), content, file_facts.clone());
                        }
                        current_files.push(extraction.rel_path);
                    }
                    facts.push(file_facts);
                }
                Outcome::Ignored => {}
                Outcome::Failed => stats.skipped += 1,
            }
        }

        if incremental {
            cache.prune(&current_files);
            if let Err(e) = cache.save(project_path) {
                warn!("failed to save fact cache: {e:#}");
            }
        }

        let (import_graph, wiring_graph) = assemble(&self.config, &facts);
        let summary = AnalysisSummary::build(&import_graph, &wiring_graph, stats);
        info!(
            files = stats.analyzed,
            skipped = stats.skipped,
            import_nodes = summary.import_nodes,
            components = summary.wiring_nodes,
            import_cycles = summary.import_cycles.len(),
            wiring_cycles = summary.wiring_cycles.len(),
            "analysis complete"
        );

        Ok(FullAnalysis {
            import_graph,
            wiring_graph,
            summary,
        })
    }
}
