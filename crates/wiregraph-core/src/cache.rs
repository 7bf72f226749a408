use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analyzer::MarkupDocument;
use crate::types::{ComponentRecord, SourceFact};

/// What one file contributed, as produced by its extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFacts {
    Source {
        fact: SourceFact,
        records: Vec<ComponentRecord>,
    },
    Markup(MarkupDocument),
}

/// Cache entry for a single file's extraction results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFileFacts {
    pub hash: String,
    pub facts: FileFacts,
}

/// Extraction cache stored in `.wiregraph/cache.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactCache {
    pub files: HashMap<String, CachedFileFacts>,
}

const CACHE_DIR: &str = ".wiregraph";
const CACHE_FILE: &str = "cache.json";

impl FactCache {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// Load cache from `.wiregraph/cache.json` relative to project root.
    pub fn load(project_root: &Path) -> Result<Self> {
        let cache_path = project_root.join(CACHE_DIR).join(CACHE_FILE);
        if !cache_path.exists() {
            return Ok(Self::new());
        }
        let content =
            std::fs::read_to_string(&cache_path).context("failed to read fact cache")?;
        let cache: Self = serde_json::from_str(&content).context("failed to parse fact cache")?;
        Ok(cache)
    }

    /// Save cache to `.wiregraph/cache.json` relative to project root.
    pub fn save(&self, project_root: &Path) -> Result<()> {
        let cache_dir = project_root.join(CACHE_DIR);
        std::fs::create_dir_all(&cache_dir).context("failed to create .wiregraph directory")?;
        let cache_path = cache_dir.join(CACHE_FILE);
        let content =
            serde_json::to_string_pretty(self).context("failed to serialize fact cache")?;
        std::fs::write(&cache_path, content).context("failed to write fact cache")?;
        Ok(())
    }

    /// Cached facts for a file if present and its content is unchanged.
    pub fn get(&self, rel_path: &str, content: &str) -> Option<&FileFacts> {
        let cached = self.files.get(rel_path)?;
        if cached.hash == compute_hash(content) {
            Some(&cached.facts)
        } else {
            None
        }
    }

    /// Insert or update a file's cache entry.
    pub fn insert(&mut self, rel_path: String, content: &str, facts: FileFacts) {
        let entry = CachedFileFacts {
            hash: compute_hash(content),
            facts,
        };
        self.files.insert(rel_path, entry);
    }

    /// Remove entries for files that no longer exist.
    pub fn prune(&mut self, existing_files: &[String]) {
        let existing: HashSet<&str> = existing_files.iter().map(String::as_str).collect();
        self.files.retain(|path, _| existing.contains(path.as_str()));
    }
}

/// Compute SHA-256 hash of file content.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source_facts() -> FileFacts {
        FileFacts::Source {
            fact: SourceFact {
                file: PathBuf::from("src/com/acme/App.java"),
                package: Some("com.acme".to_string()),
                types: vec!["App".to_string()],
                imports: vec!["com.acme.util.Clock".to_string()],
            },
            records: vec![ComponentRecord::marker("com.acme.App")],
        }
    }

    #[test]
    fn test_compute_hash_deterministic() {
        assert_eq!(compute_hash("hello world"), compute_hash("hello world"));
        assert_ne!(compute_hash("hello"), compute_hash("world"));
    }

    #[test]
    fn test_cache_get_checks_content() {
        let mut cache = FactCache::new();
        cache.insert("App.java".to_string(), "content", source_facts());

        assert_eq!(cache.get("App.java", "content"), Some(&source_facts()));
        assert!(cache.get("App.java", "changed").is_none());
        assert!(cache.get("Other.java", "content").is_none());
    }

    #[test]
    fn test_cache_prune() {
        let mut cache = FactCache::new();
        cache.insert("a.xml".to_string(), "a", FileFacts::Markup(MarkupDocument::default()));
        cache.insert("b.xml".to_string(), "b", FileFacts::Markup(MarkupDocument::default()));

        cache.prune(&["a.xml".to_string()]);
        assert!(cache.files.contains_key("a.xml"));
        assert!(!cache.files.contains_key("b.xml"));
    }

    #[test]
    fn test_cache_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = FactCache::new();
        cache.insert("App.java".to_string(), "content", source_facts());

        cache.save(dir.path()).unwrap();
        let loaded = FactCache::load(dir.path()).unwrap();
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.get("App.java", "content"), Some(&source_facts()));
    }

    #[test]
    fn test_load_missing_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FactCache::load(dir.path()).unwrap().files.is_empty());
    }
}
