//! Layer / cycle analyzer.
//!
//! Classifies every source file into a declared architectural layer by path
//! prefix, checks every internal import edge against the declared layering,
//! and runs Tarjan's SCC algorithm over the file-level import graph to catch
//! any cycle. Side-effect free: produces a structured report, never writes
//! to disk.

use crate::config::PipelineConfig;
use crate::error::{KthuluError, LayerEdge};
use crate::fs_capability::{EntryKind, FsCapability, StdFs};
use crate::imports::{build_module_index, extract_use_paths, resolve_import_target};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Classifies `file` into one of `config.layers` by its first path component
/// relative to `root`. Returns `None` for files outside any declared layer
/// directory — those files are not subject to layering checks.
pub fn classify_layer<'a>(root: &Path, file: &Path, config: &'a PipelineConfig) -> Option<&'a str> {
    let rel = file.strip_prefix(root).ok()?;
    let first = rel.components().next()?.as_os_str().to_str()?;
    config.layers.iter().find(|l| l.as_str() == first).map(|s| s.as_str())
}

/// Runs the layer and cycle checks over the tree rooted at `root`. Returns
/// `Ok(())` when the tree is clean; otherwise the first violated invariant,
/// layering taking priority over cycle detection since a layer violation
/// alone already blocks plan emission regardless of whether a cycle also
/// exists.
pub fn analyze(root: &Path, config: &PipelineConfig) -> Result<(), KthuluError> {
    let fsc = StdFs;
    let files = collect_all_source_files(root, root, config, &fsc)?;
    let index = build_module_index(root, &files);

    let edges = resolve_edges(&files, &index, &fsc)?;

    let violations = layer_violations(root, &edges, config);
    if !violations.is_empty() {
        return Err(KthuluError::LayerViolation { edges: violations });
    }

    if let Some(components) = detect_cycle(&files, &edges) {
        return Err(KthuluError::ImportCycle { components });
    }

    Ok(())
}

fn collect_all_source_files<F: FsCapability>(
    root: &Path,
    dir: &Path,
    config: &PipelineConfig,
    fsc: &F,
) -> Result<Vec<PathBuf>, KthuluError> {
    let mut out = Vec::new();
    let mut entries = fsc
        .readdir(dir)
        .map_err(|source| KthuluError::ScanFailed { root: root.to_path_buf(), source })?;
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    for entry in entries {
        let path = entry.path;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let is_dir = match entry.kind {
            EntryKind::Dir => true,
            EntryKind::Symlink => fsc.stat_is_dir(&path).unwrap_or(false),
            EntryKind::File | EntryKind::Other => false,
        };
        if is_dir {
            if config.is_ignored_dir(name) {
                continue;
            }
            out.extend(collect_all_source_files(root, &path, config, fsc)?);
            continue;
        }
        if config.is_source_file(&path) {
            out.push(path);
        }
    }
    Ok(out)
}

fn resolve_edges<F: FsCapability>(
    files: &[PathBuf],
    index: &BTreeMap<String, PathBuf>,
    fsc: &F,
) -> Result<Vec<(PathBuf, PathBuf)>, KthuluError> {
    let mut edges = Vec::new();
    for file in files {
        let content = fsc.read_to_string(file)?;
        for use_path in extract_use_paths(&content) {
            if let Some(target) = resolve_import_target(&use_path, index) {
                if &target != file {
                    edges.push((file.clone(), target));
                }
            }
        }
    }
    edges.sort();
    edges.dedup();
    Ok(edges)
}

/// Layers may only depend on themselves or an earlier (more depended-upon)
/// layer: `adapters → usecase → domain` is fine, `domain → adapters` is not.
/// A violation is an edge whose target layer ranks *later* than its source.
fn layer_violations(root: &Path, edges: &[(PathBuf, PathBuf)], config: &PipelineConfig) -> Vec<LayerEdge> {
    let mut violations = Vec::new();
    for (from, to) in edges {
        let Some(from_layer) = classify_layer(root, from, config) else { continue };
        let Some(to_layer) = classify_layer(root, to, config) else { continue };
        let from_rank = config.layer_rank(from_layer).unwrap_or(usize::MAX);
        let to_rank = config.layer_rank(to_layer).unwrap_or(usize::MAX);
        if to_rank > from_rank {
            violations.push(LayerEdge {
                from_file: from.clone(),
                to_file: to.clone(),
                from_layer: from_layer.to_string(),
                to_layer: to_layer.to_string(),
            });
        }
    }
    violations.sort_by(|a, b| (&a.from_file, &a.to_file).cmp(&(&b.from_file, &b.to_file)));
    violations
}

fn detect_cycle(files: &[PathBuf], edges: &[(PathBuf, PathBuf)]) -> Option<Vec<Vec<PathBuf>>> {
    let mut graph: DiGraph<PathBuf, ()> = DiGraph::new();
    let mut node_of: BTreeMap<PathBuf, NodeIndex> = BTreeMap::new();
    for file in files {
        let idx = graph.add_node(file.clone());
        node_of.insert(file.clone(), idx);
    }
    for (from, to) in edges {
        if let (Some(&a), Some(&b)) = (node_of.get(from), node_of.get(to)) {
            graph.add_edge(a, b, ());
        }
    }

    let sccs = tarjan_scc(&graph);
    let mut components: Vec<Vec<PathBuf>> = sccs
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut paths: Vec<PathBuf> = scc.into_iter().map(|idx| graph[idx].clone()).collect();
            paths.sort();
            paths
        })
        .collect();

    if components.is_empty() {
        return None;
    }
    components.sort();
    Some(components)
}
