//! Pipeline configuration.
//!
//! A real scanner is never hardcoded in production — it reads an optional
//! on-disk config before falling back to built-in defaults, the same way a
//! long-lived plugin reads a watchlist file before falling back to its
//! built-in default. Here that file is `<root>/kthulu.toml`.

use crate::error::KthuluError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The default layering order, outermost-last.
pub const DEFAULT_LAYERS: &[&str] = &[
    "domain",
    "usecase",
    "repository",
    "adapters",
    "infrastructure",
    "cmd",
];

/// Directories the scanner and layer analyzer never descend into.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[".git", "node_modules", "vendor", ".kthulu", "target"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// File extensions (without the leading dot) the scanner treats as source.
    pub source_extensions: Vec<String>,
    /// Directory names skipped entirely during the walk, beyond the built-in set.
    pub extra_ignore_dirs: Vec<String>,
    /// Declared layer order, earliest (most depended-upon) first.
    pub layers: Vec<String>,
    /// Skip hidden files (dotfiles) during scanning.
    pub skip_hidden: bool,
    /// Skip files that look like test files (`*_test.rs`, files under `tests/`).
    pub skip_tests: bool,
    /// Debounce window for the watcher, in milliseconds.
    pub watch_debounce_ms: u64,
    /// Subtrees the watcher observes, relative to the project root.
    pub watch_roots: Vec<String>,
    /// Directory (relative to root) conventionally hosting usecase files,
    /// scanned by the validation graph builder.
    pub usecase_dir: String,
    /// Directory (relative to root) conventionally hosting adapter files.
    pub adapter_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_extensions: vec!["rs".to_string()],
            extra_ignore_dirs: Vec::new(),
            layers: DEFAULT_LAYERS.iter().map(|s| s.to_string()).collect(),
            skip_hidden: false,
            skip_tests: false,
            watch_debounce_ms: 150,
            watch_roots: vec!["overrides".to_string(), "extends".to_string()],
            usecase_dir: "usecase".to_string(),
            adapter_dir: "adapters".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads `<root>/kthulu.toml` if present, otherwise returns the default config.
    pub fn load(root: &Path) -> Result<Self, KthuluError> {
        let path = root.join("kthulu.toml");
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        DEFAULT_IGNORE_DIRS.contains(&name) || self.extra_ignore_dirs.iter().any(|d| d == name)
    }

    pub fn layer_rank(&self, layer: &str) -> Option<usize> {
        self.layers.iter().position(|l| l == layer)
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.source_extensions.iter().any(|s| s == ext))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_rust_extension() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.source_extensions, vec!["rs".to_string()]);
    }

    #[test]
    fn test_default_layer_order() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.layer_rank("domain"), Some(0));
        assert_eq!(cfg.layer_rank("cmd"), Some(5));
        assert_eq!(cfg.layer_rank("nonexistent"), None);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.source_extensions, PipelineConfig::default().source_extensions);
    }

    #[test]
    fn test_load_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kthulu.toml"),
            "source_extensions = [\"rs\", \"gotpl\"]\nwatch_debounce_ms = 500\n",
        )
        .unwrap();
        let cfg = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.source_extensions, vec!["rs".to_string(), "gotpl".to_string()]);
        assert_eq!(cfg.watch_debounce_ms, 500);
    }

    #[test]
    fn test_is_ignored_dir_builtin() {
        let cfg = PipelineConfig::default();
        assert!(cfg.is_ignored_dir(".git"));
        assert!(cfg.is_ignored_dir("vendor"));
        assert!(!cfg.is_ignored_dir("src"));
    }

    #[test]
    fn test_is_source_file() {
        let cfg = PipelineConfig::default();
        assert!(cfg.is_source_file(Path::new("src/main.rs")));
        assert!(!cfg.is_source_file(Path::new("README.md")));
    }
}
