//! Error types for the kthulu pipeline.
//!
//! This module defines the canonical error type returned by every pipeline
//! stage. Recoverable conditions (malformed tags, unresolved module names)
//! are never represented here — they are collected as [`Warning`] values on
//! the relevant output types instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Canonical error type for all kthulu pipeline operations.
#[derive(Error, Debug)]
pub enum KthuluError {
    /// The scanner could not walk the root directory.
    #[error("scan failed under {root}: {source}")]
    ScanFailed { root: PathBuf, source: io::Error },

    /// The tag parser / project analyzer failed to build a project model.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// An import edge crosses layers in the wrong direction.
    #[error("layer violation: {} edge(s) cross layers out of order", edges.len())]
    LayerViolation { edges: Vec<LayerEdge> },

    /// A strongly connected component of size > 1 was found in the import graph.
    #[error("import cycle detected across {} file(s)", components.iter().map(|c| c.len()).sum::<usize>())]
    ImportCycle { components: Vec<Vec<PathBuf>> },

    /// The plan file could not be written.
    #[error("failed to write plan file {path}: {source}")]
    PlanWriteFailed { path: PathBuf, source: io::Error },

    /// The overlay generator produced source the target formatter rejected.
    #[error("generated overlay source failed formatting: {0}")]
    FormatFailed(String),

    /// A generic filesystem write failure from the plan writer or generator.
    #[error("write failed for {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The watcher's underlying OS notification channel died.
    #[error("watcher failed: {0}")]
    WatcherFailed(String),

    /// Requested behaviour is outside this crate's contract (e.g. the `mcp` transport,
    /// which is owned by an external collaborator).
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// I/O error that doesn't fit a more specific variant above.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization failure (plan file, overlay plan, validation graph).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization failure (validation graph export).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parse failure loading `kthulu.toml`.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl PartialEq for LayerEdge {
    fn eq(&self, other: &Self) -> bool {
        self.from_file == other.from_file
            && self.to_file == other.to_file
            && self.from_layer == other.from_layer
            && self.to_layer == other.to_layer
    }
}

/// One `(from-layer, to-layer)` edge that violates the declared layering.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LayerEdge {
    pub from_file: PathBuf,
    pub to_file: PathBuf,
    pub from_layer: String,
    pub to_layer: String,
}

/// A recoverable diagnostic: a malformed tag, an unresolved module name, etc.
///
/// Warnings never abort a pipeline stage; they ride along on the stage's
/// output value for the caller to surface.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Warning {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub message: String,
}

impl Warning {
    pub fn new(file: impl Into<PathBuf>, line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}
