use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How identifiers in the import graph are derived from a source fact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// One node per package (`com.acme.billing`).
    #[default]
    Package,
    /// One node per fully-qualified type (`com.acme.billing.Invoice`).
    Type,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Package => write!(f, "package"),
            Granularity::Type => write!(f, "type"),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "package" | "pkg" => Ok(Granularity::Package),
            "type" | "class" => Ok(Granularity::Type),
            _ => Err(anyhow::anyhow!("unknown granularity: {s}")),
        }
    }
}

/// Where a component declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationOrigin {
    /// External markup configuration (bean-definition XML).
    Declarative,
    /// An in-source role marker on a type (`@Service`, `@Component`, ...).
    Marker,
}

impl fmt::Display for DeclarationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationOrigin::Declarative => write!(f, "declarative"),
            DeclarationOrigin::Marker => write!(f, "marker"),
        }
    }
}

/// Facts extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFact {
    pub file: PathBuf,
    /// Declared package, `None` for the default package or an unparsable header.
    pub package: Option<String>,
    /// Top-level types declared in the file, in source order.
    pub types: Vec<String>,
    /// Imported names in source order. Wildcards keep their `.*` suffix.
    pub imports: Vec<String>,
}

impl SourceFact {
    /// The type that owns the file: the one named after the file, else the first declared.
    pub fn primary_type(&self) -> Option<&str> {
        let stem = self.file.file_stem().and_then(|s| s.to_str());
        if let Some(stem) = stem {
            if let Some(t) = self.types.iter().find(|t| t.as_str() == stem) {
                return Some(t);
            }
        }
        self.types.first().map(String::as_str)
    }

    /// Owning node id for this file at the given granularity.
    pub fn owner_id(&self, granularity: Granularity) -> Option<String> {
        let package = self.package.as_deref().filter(|p| !p.is_empty())?;
        match granularity {
            Granularity::Package => Some(package.to_string()),
            Granularity::Type => self
                .primary_type()
                .map(|t| format!("{package}.{t}")),
        }
    }
}

/// One declaration of a DI-managed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Explicit id; derived from `class_name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Implementation type name, simple or fully qualified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy_method: Option<String>,
    /// Ids of the components this one requires.
    #[serde(default)]
    pub references: Vec<String>,
    pub origin: DeclarationOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl ComponentRecord {
    pub fn new(origin: DeclarationOrigin, class_name: Option<&str>) -> Self {
        Self {
            id: None,
            class_name: class_name.map(str::to_string),
            scope: None,
            init_method: None,
            destroy_method: None,
            references: Vec::new(),
            origin,
            source: None,
        }
    }

    /// A record declared in markup.
    pub fn declarative(class_name: &str) -> Self {
        Self::new(DeclarationOrigin::Declarative, Some(class_name))
    }

    /// A record discovered from an in-source role marker.
    pub fn marker(class_name: &str) -> Self {
        Self::new(DeclarationOrigin::Marker, Some(class_name))
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.references.push(reference.to_string());
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    /// The explicit id, or the id derived from the implementation type.
    pub fn component_id(&self) -> Option<String> {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => self
                .class_name
                .as_deref()
                .and_then(derive_component_id),
        }
    }
}

/// An alternative name for a component declared in markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasDecl {
    pub alias: String,
    pub canonical: String,
}

/// Derive the implicit component id for an implementation type.
///
/// Takes the simple name (after the last `.` and `$`) and lower-cases only
/// its first character. Leading acronyms are not special-cased, so
/// `URLResolver` becomes `uRLResolver`.
pub fn derive_component_id(class_name: &str) -> Option<String> {
    let simple = class_name
        .trim()
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .rsplit('$')
        .next()
        .unwrap_or_default();
    let mut chars = simple.chars();
    let first = chars.next()?;
    let mut id: String = first.to_lowercase().collect();
    id.push_str(chars.as_str());
    Some(id)
}
