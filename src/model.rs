//! Shared data model: annotations, tag kinds, and the plan-builder's
//! `Construct` view of an annotation.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// The tag kinds the pipeline actually consumes and gates behaviour on.
/// This is the full "consumed" subset — everything else round-trips as
/// [`AnnotationKind::Other`].
pub const CONSUMED_KINDS: &[&str] = &["core", "module", "generated", "shadow", "wrap", "dependency"];

/// Kinds that are recognized by name (so they don't round-trip as unknown)
/// but never gate pipeline output. New kinds beyond this set still parse
/// fine as `Other`.
pub const INERT_KINDS: &[&str] = &[
    "observable",
    "metrics",
    "security",
    "audit",
    "deprecated",
    "experimental",
    "microservice",
    "cli",
    "template",
];

/// An extensible annotation kind. Known kinds are matched by name via
/// [`KnownKinds`]; anything else round-trips as `Other` so downstream
/// tooling can introduce new tag families without a scanner release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AnnotationKind {
    Core,
    Module,
    Generated,
    Shadow,
    Wrap,
    Dependency,
    /// Recognized-but-inert kind (`observable`, `security`, …) or any other
    /// caller-extended kind name.
    Other(String),
}

impl AnnotationKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "core" => Self::Core,
            "module" => Self::Module,
            "generated" => Self::Generated,
            "shadow" => Self::Shadow,
            "wrap" => Self::Wrap,
            "dependency" => Self::Dependency,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Core => "core",
            Self::Module => "module",
            Self::Generated => "generated",
            Self::Shadow => "shadow",
            Self::Wrap => "wrap",
            Self::Dependency => "dependency",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Whether the annotation grammar requires a non-empty `module` for this kind.
    pub fn requires_module(&self) -> bool {
        matches!(self, Self::Module | Self::Shadow | Self::Wrap | Self::Dependency)
    }

    /// Whether this kind participates in plan-building (`shadow`/`wrap` by
    /// default; other consumers may select differently).
    pub fn is_overlay_kind(&self) -> bool {
        matches!(self, Self::Shadow | Self::Wrap)
    }
}

impl From<AnnotationKind> for String {
    fn from(k: AnnotationKind) -> String {
        k.as_str().to_string()
    }
}

impl From<String> for AnnotationKind {
    fn from(s: String) -> AnnotationKind {
        AnnotationKind::parse(&s)
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registry of tag kinds recognized by name.
/// Registering a new kind here is purely documentation/introspection — the
/// scanner and analyzer never refuse an unregistered kind, they just surface
/// it as `AnnotationKind::Other`.
#[derive(Debug, Clone)]
pub struct KnownKinds {
    consumed: Vec<String>,
    inert: Vec<String>,
}

impl Default for KnownKinds {
    fn default() -> Self {
        Self {
            consumed: CONSUMED_KINDS.iter().map(|s| s.to_string()).collect(),
            inert: INERT_KINDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl KnownKinds {
    pub fn register_inert(&mut self, kind: impl Into<String>) {
        let kind = kind.into();
        if !self.consumed.contains(&kind) && !self.inert.contains(&kind) {
            self.inert.push(kind);
        }
    }

    pub fn is_consumed(&self, kind: &AnnotationKind) -> bool {
        self.consumed.iter().any(|k| k == kind.as_str())
    }

    pub fn is_known(&self, kind: &AnnotationKind) -> bool {
        self.consumed.iter().any(|k| k == kind.as_str()) || self.inert.iter().any(|k| k == kind.as_str())
    }
}

/// One occurrence of `@kthulu:<kind>[:<value>] (key:val )*` on a comment line.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// Present for `kind in {module, shadow, wrap, dependency}`; empty otherwise.
    pub module: String,
    pub symbol: String,
    pub priority: i64,
    pub attrs: BTreeMap<String, String>,
    pub file: PathBuf,
    pub line: u32,
}

impl Annotation {
    /// `(kind, module, symbol, file, line)` uniqueness key.
    pub fn identity_key(&self) -> (String, String, String, PathBuf, u32) {
        (
            self.kind.to_string(),
            self.module.clone(),
            self.symbol.clone(),
            self.file.clone(),
            self.line,
        )
    }
}

/// The plan-builder's view of one annotation targeted at a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Construct {
    pub id: String,
    pub path: String,
    pub priority: i64,
}

impl Construct {
    pub fn from_annotation(a: &Annotation) -> Self {
        let id = format!("{}:{}:{}", a.kind, a.module, a.symbol);
        let path = join_path(&a.module, &a.symbol);
        Self {
            id,
            path,
            priority: a.priority,
        }
    }
}

/// Joins a module and symbol into a logical path (`<module>/<symbol>`).
pub fn join_path(module: &str, symbol: &str) -> String {
    if module.is_empty() {
        symbol.to_string()
    } else {
        format!("{module}/{symbol}")
    }
}

/// `dirname()` over a logical `/`-separated path. A path with no separator
/// has no parent.
pub fn dirname(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}
