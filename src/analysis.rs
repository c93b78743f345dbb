//! Tag parser / project analyzer.
//!
//! Consumes the scanner's flat annotation stream plus the raw file list and
//! builds a [`ProjectAnalysis`]: modules (files + tags), explicit and
//! implicit inter-module dependencies, and purely informational pattern
//! heuristics that feed the resolver's recommendations but never gate
//! scanning or plan output.

use crate::config::PipelineConfig;
use crate::error::{KthuluError, Warning};
use crate::imports::{build_module_index, extract_use_paths, resolve_import_target};
use crate::model::{Annotation, AnnotationKind};
use crate::scan::scan;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub type Tag = Annotation;

/// How a [`Dependency`] edge was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Declared via `@kthulu:dependency:<csv>`.
    Explicit,
    /// Derived from a `use` edge crossing module boundaries.
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Dependency {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub dep_type: DependencyType,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Module {
    pub name: String,
    pub files: Vec<PathBuf>,
    pub tags: Vec<Tag>,
}

/// An informational observation about the project's shape — never gates
/// scanning or plan output, only feeds the resolver's recommendations.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PatternHint {
    pub module: String,
    pub pattern: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProjectAnalysis {
    pub modules: BTreeMap<String, Module>,
    pub dependencies: Vec<Dependency>,
    pub tags: Vec<Tag>,
    pub pattern_hints: Vec<PatternHint>,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
}

/// Builds a [`ProjectAnalysis`] for the tree rooted at `root`. Deterministic
/// and idempotent: identical inputs produce equal values across repeated
/// calls, and scanning an unchanged tree twice returns equal analyses.
pub fn analyze(root: &Path, config: &PipelineConfig) -> Result<ProjectAnalysis, KthuluError> {
    let scan_result = scan(root, config)?;

    let mut modules: BTreeMap<String, Module> = BTreeMap::new();
    for annotation in &scan_result.annotations {
        if annotation.module.is_empty() {
            continue;
        }
        let module = modules.entry(annotation.module.clone()).or_insert_with(|| Module {
            name: annotation.module.clone(),
            files: Vec::new(),
            tags: Vec::new(),
        });
        if !module.files.contains(&annotation.file) {
            module.files.push(annotation.file.clone());
        }
        module.tags.push(annotation.clone());
    }
    for module in modules.values_mut() {
        module.files.sort();
        module.tags.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    }

    let mut dependencies = BTreeSet::new();
    dependencies.extend(explicit_dependencies(&scan_result.annotations));
    dependencies.extend(implicit_dependencies(root, &modules)?);

    let pattern_hints = detect_pattern_hints(&modules);

    Ok(ProjectAnalysis {
        modules,
        dependencies: dependencies.into_iter().collect(),
        tags: scan_result.annotations,
        pattern_hints,
        warnings: scan_result.warnings,
    })
}

fn explicit_dependencies(annotations: &[Annotation]) -> Vec<Dependency> {
    let mut out = Vec::new();
    for a in annotations {
        if a.kind != AnnotationKind::Dependency {
            continue;
        }
        let Some(csv) = a.attrs.get("value") else { continue };
        for target in csv.split(',') {
            let target = target.trim();
            if target.is_empty() || target == a.module {
                continue;
            }
            out.push(Dependency {
                from: a.module.clone(),
                to: target.to_string(),
                dep_type: DependencyType::Explicit,
            });
        }
    }
    out
}

fn implicit_dependencies(root: &Path, modules: &BTreeMap<String, Module>) -> Result<Vec<Dependency>, KthuluError> {
    let mut file_to_module: BTreeMap<PathBuf, String> = BTreeMap::new();
    let mut all_files = Vec::new();
    for module in modules.values() {
        for file in &module.files {
            file_to_module.insert(file.clone(), module.name.clone());
            all_files.push(file.clone());
        }
    }
    all_files.sort();
    all_files.dedup();

    let index = build_module_index(root, &all_files);
    let mut out = Vec::new();

    for (file, from_module) in &file_to_module {
        let content = std::fs::read_to_string(file)?;
        for use_path in extract_use_paths(&content) {
            let Some(target_file) = resolve_import_target(&use_path, &index) else { continue };
            let Some(to_module) = file_to_module.get(&target_file) else { continue };
            if to_module == from_module {
                continue;
            }
            out.push(Dependency {
                from: from_module.clone(),
                to: to_module.clone(),
                dep_type: DependencyType::Import,
            });
        }
    }
    Ok(out)
}

/// Scores a handful of DDD-layer / repository-service-handler heuristics
/// over each module's file stems. Purely informational — consumed only by
/// the resolver's recommendation step.
fn detect_pattern_hints(modules: &BTreeMap<String, Module>) -> Vec<PatternHint> {
    let mut hints = Vec::new();
    for module in modules.values() {
        let stems: Vec<String> = module
            .files
            .iter()
            .filter_map(|f| f.file_stem().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()))
            .collect();

        let has = |needle: &str| stems.iter().any(|s| s.contains(needle));

        if has("repository") && has("service") {
            hints.push(PatternHint {
                module: module.name.clone(),
                pattern: "repository-service".to_string(),
                detail: "module has both a repository and a service file".to_string(),
            });
        }
        if has("repository") && has("service") && has("handler") {
            hints.push(PatternHint {
                module: module.name.clone(),
                pattern: "repository-service-handler-triad".to_string(),
                detail: "module carries a full repository/service/handler triad".to_string(),
            });
        }
        if has("domain") || has("entity") || has("entities") {
            hints.push(PatternHint {
                module: module.name.clone(),
                pattern: "ddd-domain-layer".to_string(),
                detail: "module has files suggesting a domain/entity layer".to_string(),
            });
        }
    }
    hints.sort_by(|a, b| (&a.module, &a.pattern).cmp(&(&b.module, &b.pattern)));
    hints
}
