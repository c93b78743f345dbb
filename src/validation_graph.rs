//! Validation graph builder.
//!
//! Builds a module↔usecase↔adapter graph purely from tags and a textual
//! import pass — no persistence, no side effects. Feeds visualisation
//! dashboards and contract checks via three export formats (DOT, JSON,
//! YAML), with a small hand-written DOT serializer.

use crate::config::PipelineConfig;
use crate::error::KthuluError;
use crate::imports::extract_use_paths;
use crate::model::AnnotationKind;
use crate::scan::scan;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationGraph {
    pub nodes: BTreeSet<String>,
    pub edges: BTreeSet<EdgePair>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct EdgePair {
    pub from: String,
    pub to: String,
}

/// Builds a [`ValidationGraph`] for the tree rooted at `root`. Pure: the
/// same tree always yields the same graph.
pub fn build(root: &Path, config: &PipelineConfig) -> Result<ValidationGraph, KthuluError> {
    let scan_result = scan(root, config)?;

    let mut graph = ValidationGraph::default();
    let mut usecase_names: BTreeSet<String> = BTreeSet::new();

    for annotation in &scan_result.annotations {
        if annotation.kind != AnnotationKind::Module {
            continue;
        }
        let Ok(rel) = annotation.file.strip_prefix(root) else { continue };
        let in_usecase_dir = rel.components().next().map(|c| c.as_os_str() == config.usecase_dir.as_str()).unwrap_or(false);
        if !in_usecase_dir {
            continue;
        }
        let stem = annotation.file.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown");
        let module_node = format!("module:{}", annotation.module);
        let usecase_node = format!("usecase:{stem}");
        graph.nodes.insert(module_node.clone());
        graph.nodes.insert(usecase_node.clone());
        graph.edges.insert(EdgePair { from: module_node, to: usecase_node });
        usecase_names.insert(stem.to_ascii_lowercase());
    }

    for annotation in &scan_result.annotations {
        if annotation.kind != AnnotationKind::Module {
            continue;
        }
        let Ok(rel) = annotation.file.strip_prefix(root) else { continue };
        let in_adapter_dir = rel.components().next().map(|c| c.as_os_str() == config.adapter_dir.as_str()).unwrap_or(false);
        if !in_adapter_dir {
            continue;
        }
        let stem = annotation.file.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown");
        let adapter_node = format!("adapter:{stem}");
        let module_node = format!("module:{}", annotation.module);
        graph.nodes.insert(adapter_node.clone());
        graph.nodes.insert(module_node.clone());
        graph.edges.insert(EdgePair { from: adapter_node.clone(), to: module_node });

        let content = std::fs::read_to_string(&annotation.file)?;
        for use_path in extract_use_paths(&content) {
            let lower = use_path.to_ascii_lowercase();
            for usecase in &usecase_names {
                if lower.contains(usecase.as_str()) {
                    let usecase_node = format!("usecase:{usecase}");
                    graph.edges.insert(EdgePair {
                        from: adapter_node.clone(),
                        to: usecase_node,
                    });
                }
            }
        }
    }

    Ok(graph)
}

impl ValidationGraph {
    /// `digraph { "a" -> "b"; }` form. Isolated nodes are emitted as bare
    /// statements so they still appear in the rendered graph.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        let mut connected: BTreeSet<&str> = BTreeSet::new();
        for edge in &self.edges {
            connected.insert(edge.from.as_str());
            connected.insert(edge.to.as_str());
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", edge.from, edge.to));
        }
        for node in &self.nodes {
            if !connected.contains(node.as_str()) {
                out.push_str(&format!("  \"{node}\";\n"));
            }
        }
        out.push_str("}\n");
        out
    }

    pub fn to_json(&self) -> Result<String, KthuluError> {
        #[derive(serde::Serialize)]
        struct Shape<'a> {
            nodes: Vec<&'a String>,
            edges: Vec<&'a EdgePair>,
        }
        let shape = Shape {
            nodes: self.nodes.iter().collect(),
            edges: self.edges.iter().collect(),
        };
        let mut json = serde_json::to_string_pretty(&shape)?;
        json.push('\n');
        Ok(json)
    }

    pub fn to_yaml(&self) -> Result<String, KthuluError> {
        #[derive(serde::Serialize)]
        struct Shape<'a> {
            nodes: Vec<&'a String>,
            edges: Vec<&'a EdgePair>,
        }
        let shape = Shape {
            nodes: self.nodes.iter().collect(),
            edges: self.edges.iter().collect(),
        };
        Ok(serde_yaml::to_string(&shape)?)
    }
}
