use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::filter::{NamespaceFilter, DEFAULT_EXTERNAL_PREFIXES};
use crate::types::Granularity;

pub const CONFIG_FILE: &str = ".wiregraph.toml";

/// Top-level configuration from `.wiregraph.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub namespaces: NamespacesConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    #[serde(default = "default_markup_patterns")]
    pub markup_patterns: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/target/**".to_string(),
        "**/build/**".to_string(),
        "**/src/test/**".to_string(),
    ]
}

fn default_source_extensions() -> Vec<String> {
    vec!["java".to_string()]
}

fn default_markup_patterns() -> Vec<String> {
    vec!["**/*.xml".to_string()]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
            source_extensions: default_source_extensions(),
            markup_patterns: default_markup_patterns(),
        }
    }
}

/// Which namespaces count as part of the analyzed project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespacesConfig {
    /// Allow-list of internal prefixes. Empty means "not configured".
    #[serde(default)]
    pub internal: Vec<String>,
    /// Deny-list of external prefixes.
    #[serde(default = "default_external")]
    pub external: Vec<String>,
    /// Admit exactly the analyzed packages when `internal` is empty.
    #[serde(default = "default_true")]
    pub infer_internal: bool,
}

fn default_external() -> Vec<String> {
    DEFAULT_EXTERNAL_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

impl Default for NamespacesConfig {
    fn default() -> Self {
        Self {
            internal: Vec::new(),
            external: default_external(),
            infer_internal: default_true(),
        }
    }
}

impl NamespacesConfig {
    /// Build the filter from the configured lists only.
    pub fn filter(&self) -> NamespaceFilter {
        NamespaceFilter::new(&self.internal, &self.external)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub granularity: Granularity,
}

/// Presentation thresholds and `check` gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Nodes with instability strictly above this are shown as unstable.
    #[serde(default = "default_instability_threshold")]
    pub instability_threshold: f64,
    #[serde(default = "default_true")]
    pub fail_on_import_cycles: bool,
    #[serde(default = "default_true")]
    pub fail_on_wiring_cycles: bool,
    /// Fail `check` when any node with dependents exceeds this instability.
    #[serde(default)]
    pub max_instability: Option<f64>,
}

fn default_instability_threshold() -> f64 {
    0.5
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            instability_threshold: default_instability_threshold(),
            fail_on_import_cycles: default_true(),
            fail_on_wiring_cycles: default_true(),
            max_instability: None,
        }
    }
}

impl Config {
    /// Load configuration from a `.wiregraph.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `wiregraph init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.wiregraph.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(
                            path = %config_path.display(),
                            "failed to load config: {e:#}. Using defaults."
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `wiregraph init`.
    pub fn default_toml() -> String {
        r#"# wiregraph - import and DI wiring analysis configuration

[project]
exclude_patterns = ["**/target/**", "**/build/**", "**/src/test/**"]
source_extensions = ["java"]
# Bean-definition documents; files without a <beans> root are ignored
markup_patterns = ["**/*.xml"]

[namespaces]
# Prefixes that belong to this project, subpackages included. Leave empty to
# admit exactly the packages found during analysis.
internal = []
# Prefixes that never become graph nodes
external = [
  "java", "javax", "jakarta", "sun", "com.sun", "jdk",
  "org.springframework", "org.slf4j", "org.apache", "org.junit", "org.mockito",
  "com.google", "com.fasterxml", "lombok", "org.hibernate",
  "kotlin", "scala", "reactor", "io.micrometer",
]
infer_internal = true

[graph]
# "package" or "type"
granularity = "package"

[report]
# Nodes above this instability are flagged as unstable
instability_threshold = 0.5
fail_on_import_cycles = true
fail_on_wiring_cycles = true
# max_instability = 0.8
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.source_extensions, vec!["java"]);
        assert!(config.namespaces.internal.is_empty());
        assert!(config.namespaces.infer_internal);
        assert_eq!(config.graph.granularity, Granularity::Package);
        assert!((config.report.instability_threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_config() {
        let toml_str = r#"
[namespaces]
internal = ["com.acme"]
external = ["com.acme.generated"]

[graph]
granularity = "type"

[report]
instability_threshold = 0.7
fail_on_wiring_cycles = false
max_instability = 0.9
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.namespaces.internal, vec!["com.acme"]);
        assert_eq!(config.graph.granularity, Granularity::Type);
        assert!(!config.report.fail_on_wiring_cycles);
        assert!(config.report.fail_on_import_cycles);
        assert_eq!(config.report.max_instability, Some(0.9));

        let filter = config.namespaces.filter();
        assert!(filter.is_internal("com.acme.billing"));
        assert!(!filter.is_internal("com.acme.generated.Stub"));
    }

    #[test]
    fn test_default_toml_is_valid() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.namespaces.external.len(), DEFAULT_EXTERNAL_PREFIXES.len());
        assert_eq!(config.graph.granularity, Granularity::Package);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[graph]\n").unwrap();
        assert_eq!(config.project.markup_patterns, vec!["**/*.xml"]);
        assert!(config.namespaces.external.iter().any(|p| p == "java"));
    }

    #[test]
    fn test_load_or_default_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[graph]\ngranularity = \"type\"\n",
        )
        .unwrap();
        let nested = dir.path().join("module/src");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load_or_default(&nested);
        assert_eq!(config.graph.granularity, Granularity::Type);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[graph\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("wiregraph init"));
    }
}
