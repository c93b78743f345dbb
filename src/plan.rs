//! Plan builder.
//!
//! Groups annotations (by default, `shadow`/`wrap` — the kinds selected for
//! overlay construction) by target path, deterministically
//! orders them into a `Replace`/`Decorate` DAG, and persists it as
//! `.kthulu/plan.json` via write-to-temp-then-rename so the file is never
//! partially written.

use crate::error::KthuluError;
use crate::fs_capability::atomic_write;
use crate::model::{dirname, Annotation, Construct};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Action {
    /// Sorts before `Replace` lexicographically ("action 'Decorate' <
    /// 'Replace'").
    Decorate,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub construct: Construct,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Plan {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Builds the scan-level [`Plan`] from a stream of annotations, selecting
/// only the kinds the caller wants plan-relevant (by default `shadow` and
/// `wrap`, per [`crate::model::AnnotationKind::is_overlay_kind`]).
pub fn build<'a>(annotations: impl IntoIterator<Item = &'a Annotation>) -> Plan {
    let mut groups: BTreeMap<String, Vec<Construct>> = BTreeMap::new();
    for a in annotations {
        if !a.kind.is_overlay_kind() {
            continue;
        }
        let construct = Construct::from_annotation(a);
        groups.entry(construct.path.clone()).or_default().push(construct);
    }

    let mut nodes = Vec::new();
    for constructs in groups.values_mut() {
        constructs.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        let mut iter = constructs.iter();
        if let Some(winner) = iter.next() {
            nodes.push(Node {
                construct: winner.clone(),
                action: Action::Replace,
            });
        }
        for loser in iter {
            nodes.push(Node {
                construct: loser.clone(),
                action: Action::Decorate,
            });
        }
    }

    let node_paths: std::collections::BTreeSet<String> = nodes.iter().map(|n| n.construct.path.clone()).collect();
    let mut edges = Vec::new();
    for node in &nodes {
        if let Some(parent) = dirname(&node.construct.path) {
            if parent != node.construct.path && node_paths.contains(parent) {
                edges.push(Edge {
                    from: parent.to_string(),
                    to: node.construct.path.clone(),
                });
            }
        }
    }

    nodes.sort_by(|a, b| {
        (a.construct.path.clone(), format!("{:?}", a.action), a.construct.id.clone()).cmp(&(
            b.construct.path.clone(),
            format!("{:?}", b.action),
            b.construct.id.clone(),
        ))
    });
    edges.sort();
    edges.dedup();

    Plan { nodes, edges }
}

/// Serializes `plan` as pretty JSON (two-space indent, trailing newline)
/// and writes it atomically to `<root>/.kthulu/plan.json`.
pub fn write(root: &Path, plan: &Plan) -> Result<std::path::PathBuf, KthuluError> {
    let path = root.join(".kthulu").join("plan.json");
    let mut json = serde_json::to_string_pretty(plan)?;
    json.push('\n');
    atomic_write(&path, json.as_bytes()).map_err(|e| match e {
        KthuluError::WriteFailed { path, source } => KthuluError::PlanWriteFailed { path, source },
        other => other,
    })?;
    Ok(path)
}
