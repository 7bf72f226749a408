use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Well-known namespaces that never belong to the analyzed project.
pub const DEFAULT_EXTERNAL_PREFIXES: &[&str] = &[
    "java",
    "javax",
    "jakarta",
    "sun",
    "com.sun",
    "jdk",
    "org.springframework",
    "org.slf4j",
    "org.apache",
    "org.junit",
    "org.mockito",
    "com.google",
    "com.fasterxml",
    "lombok",
    "org.hibernate",
    "kotlin",
    "scala",
    "reactor",
    "io.micrometer",
];

/// Decides which namespaces are internal to the analyzed project.
///
/// Prefix matching is segment-aware: `com.acme` matches `com.acme` and
/// `com.acme.billing` but not `com.acmecorp`. Known packages match exactly,
/// so knowing `com.acme` says nothing about `com.acme.vendor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFilter {
    internal: Vec<String>,
    external: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    packages: BTreeSet<String>,
}

impl NamespaceFilter {
    pub fn new<I, E>(internal: I, external: E) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            internal: normalize_prefixes(internal),
            external: normalize_prefixes(external),
            packages: BTreeSet::new(),
        }
    }

    /// A filter that accepts everything.
    pub fn allow_all() -> Self {
        Self {
            internal: Vec::new(),
            external: Vec::new(),
            packages: BTreeSet::new(),
        }
    }

    /// Add packages that belong to the project, matched exactly.
    pub fn with_packages<I>(mut self, packages: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.packages.extend(
            packages
                .into_iter()
                .map(|p| p.as_ref().trim().to_string())
                .filter(|p| !p.is_empty()),
        );
        self
    }

    pub fn known_packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    pub fn internal_prefixes(&self) -> &[String] {
        &self.internal
    }

    pub fn external_prefixes(&self) -> &[String] {
        &self.external
    }

    /// Whether a package id belongs to the project.
    pub fn is_internal(&self, id: &str) -> bool {
        self.admits(id, id)
    }

    /// Whether `id`, declared in `package`, belongs to the project.
    ///
    /// The deny-list is checked against `id` first. With neither prefixes nor
    /// known packages configured, everything else is internal.
    pub fn admits(&self, id: &str, package: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        if self.external.iter().any(|p| matches_prefix(id, p)) {
            return false;
        }
        if self.internal.is_empty() && self.packages.is_empty() {
            return true;
        }
        self.packages.contains(package.trim()) || self.internal.iter().any(|p| matches_prefix(id, p))
    }
}

impl Default for NamespaceFilter {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), DEFAULT_EXTERNAL_PREFIXES.iter().copied())
    }
}

fn normalize_prefixes<I>(prefixes: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = prefixes
        .into_iter()
        .map(|p| {
            p.as_ref()
                .trim()
                .trim_end_matches(".*")
                .trim_end_matches('.')
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

fn matches_prefix(id: &str, prefix: &str) -> bool {
    match id.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}
