//! Dependency resolver.
//!
//! Given a [`ProjectAnalysis`] and a set of requested modules, computes the
//! required + optional closure, an install order, conflicts, and
//! recommendations. Never fails on an unresolvable module name alone — those
//! become warnings on the returned [`ResolutionPlan`].

use crate::analysis::ProjectAnalysis;
use crate::error::Warning;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const MAX_OPTIONAL_MODULES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Cycle,
    Version,
    Capability,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub description: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Add,
    Configure,
    Upgrade,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub module: String,
    pub reason: String,
    pub impact: String,
    pub auto_apply: bool,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResolutionPlan {
    pub required_modules: Vec<String>,
    pub optional_modules: Vec<String>,
    pub install_order: Vec<String>,
    pub conflicts: Vec<Conflict>,
    pub recommendations: Vec<Recommendation>,
    pub warnings: Vec<Warning>,
}

/// Resolves `requested` against `analysis`'s dependency graph.
pub fn resolve(analysis: &ProjectAnalysis, requested: &[String]) -> ResolutionPlan {
    let adjacency = build_adjacency(analysis);

    let mut warnings = Vec::new();
    for name in requested {
        if !analysis.modules.contains_key(name) {
            warnings.push(Warning::new(
                "<requested>",
                None,
                format!("requested module '{name}' is not present in the project"),
            ));
        }
    }

    let required = transitive_closure(requested, &adjacency, analysis, &mut warnings);

    let (install_order, had_cycle, cycle_members) = topological_order(&required, &adjacency);

    let optional = optional_closure(&required, &adjacency);

    let mut conflicts = Vec::new();
    if had_cycle {
        let mut members: Vec<String> = cycle_members.into_iter().collect();
        members.sort();
        conflicts.push(Conflict {
            conflict_type: ConflictType::Cycle,
            description: format!("dependency cycle detected among: {}", members.join(", ")),
            suggestions: vec![format!(
                "break the cycle by removing the dependency edge originating at '{}'",
                members.first().cloned().unwrap_or_default()
            )],
        });
    }
    conflicts.extend(version_conflicts(&required, analysis));
    conflicts.extend(capability_conflicts(&required, analysis));

    let recommendations = build_recommendations(&required, &optional, analysis, &adjacency);

    ResolutionPlan {
        required_modules: required.into_iter().collect(),
        optional_modules: optional,
        install_order,
        conflicts,
        recommendations,
        warnings,
    }
}

fn build_adjacency(analysis: &ProjectAnalysis) -> BTreeMap<String, BTreeSet<String>> {
    let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for dep in &analysis.dependencies {
        adjacency.entry(dep.from.clone()).or_default().insert(dep.to.clone());
    }
    adjacency
}

fn transitive_closure(
    requested: &[String],
    adjacency: &BTreeMap<String, BTreeSet<String>>,
    analysis: &ProjectAnalysis,
    warnings: &mut Vec<Warning>,
) -> BTreeSet<String> {
    let mut required: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = requested.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        if !required.insert(name.clone()) {
            continue;
        }
        if let Some(targets) = adjacency.get(&name) {
            for target in targets {
                if !analysis.modules.contains_key(target) && !required.contains(target) {
                    warnings.push(Warning::new(
                        "<dependency>",
                        None,
                        format!("module '{name}' depends on unknown module '{target}'"),
                    ));
                }
                if !required.contains(target) {
                    queue.push_back(target.clone());
                }
            }
        }
    }
    required
}

/// Kahn's algorithm with lexicographic tie-breaking; when no remaining node
/// has zero in-degree (a cycle), the lexicographically smallest remaining
/// node is forced next, breaking at the lexicographically smallest module
/// on the cycle.
fn topological_order(
    required: &BTreeSet<String>,
    adjacency: &BTreeMap<String, BTreeSet<String>>,
) -> (Vec<String>, bool, BTreeSet<String>) {
    let mut in_degree: BTreeMap<String, usize> = required.iter().map(|m| (m.clone(), 0)).collect();
    for (from, targets) in adjacency {
        if !required.contains(from) {
            continue;
        }
        for to in targets {
            if required.contains(to) {
                *in_degree.get_mut(to).unwrap() += 1;
            }
        }
    }

    let mut remaining: BTreeSet<String> = required.clone();
    let mut order = Vec::new();
    let mut had_cycle = false;
    let mut cycle_members = BTreeSet::new();

    while !remaining.is_empty() {
        let ready: Option<String> = remaining
            .iter()
            .filter(|m| in_degree.get(*m).copied().unwrap_or(0) == 0)
            .min()
            .cloned();

        let next = match ready {
            Some(m) => m,
            None => {
                had_cycle = true;
                cycle_members = remaining.clone();
                remaining.iter().min().cloned().unwrap()
            }
        };

        remaining.remove(&next);
        order.push(next.clone());
        if let Some(targets) = adjacency.get(&next) {
            for to in targets {
                if let Some(d) = in_degree.get_mut(to) {
                    *d = d.saturating_sub(1);
                }
            }
        }
    }

    (order, had_cycle, cycle_members)
}

fn optional_closure(required: &BTreeSet<String>, adjacency: &BTreeMap<String, BTreeSet<String>>) -> Vec<String> {
    let mut scores: BTreeMap<String, usize> = BTreeMap::new();
    for (from, targets) in adjacency {
        for to in targets {
            if required.contains(from) && !required.contains(to) {
                *scores.entry(to.clone()).or_insert(0) += 1;
            }
            if required.contains(to) && !required.contains(from) {
                *scores.entry(from.clone()).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<(String, usize)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(MAX_OPTIONAL_MODULES).map(|(m, _)| m).collect()
}

fn version_conflicts(required: &BTreeSet<String>, analysis: &ProjectAnalysis) -> Vec<Conflict> {
    // Two required modules pin different versions of the same shared target
    // via `@kthulu:dependency:<target> pin:<version>`.
    let mut pins: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for module_name in required {
        let Some(module) = analysis.modules.get(module_name) else { continue };
        for tag in &module.tags {
            let Some(target) = tag.attrs.get("value").and_then(|v| v.split(',').next()) else { continue };
            let Some(pin) = tag.attrs.get("pin") else { continue };
            pins.entry((target.trim().to_string(), pin.clone()))
                .or_default()
                .insert(module_name.clone());
        }
    }

    let mut by_target: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (target, _) in pins.keys() {
        by_target.entry(target.clone()).or_default();
    }
    for ((target, pin), modules) in &pins {
        for m in modules {
            by_target.get_mut(target).unwrap().insert(format!("{m}@{pin}"));
        }
    }

    let mut conflicts = Vec::new();
    let mut seen_targets: BTreeSet<String> = BTreeSet::new();
    for (target, _) in pins.keys() {
        if !seen_targets.insert(target.clone()) {
            continue;
        }
        let distinct_pins: BTreeSet<&String> = pins
            .keys()
            .filter(|(t, _)| t == target)
            .map(|(_, p)| p)
            .collect();
        if distinct_pins.len() > 1 {
            conflicts.push(Conflict {
                conflict_type: ConflictType::Version,
                description: format!("required modules pin conflicting versions of '{target}'"),
                suggestions: vec![format!("align all pins of '{target}' on a single version")],
            });
        }
    }
    conflicts
}

fn capability_conflicts(required: &BTreeSet<String>, analysis: &ProjectAnalysis) -> Vec<Conflict> {
    // Two required modules declare the same `capability:<name>` with
    // `exclusive:true` — mutually exclusive by declaration.
    let mut owners: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for module_name in required {
        let Some(module) = analysis.modules.get(module_name) else { continue };
        for tag in &module.tags {
            let Some(capability) = tag.attrs.get("capability") else { continue };
            if tag.attrs.get("exclusive").map(|v| v == "true").unwrap_or(false) {
                owners.entry(capability.clone()).or_default().insert(module_name.clone());
            }
        }
    }
    owners
        .into_iter()
        .filter(|(_, modules)| modules.len() > 1)
        .map(|(capability, modules)| Conflict {
            conflict_type: ConflictType::Capability,
            description: format!(
                "modules {} declare mutually exclusive capability '{capability}'",
                modules.iter().cloned().collect::<Vec<_>>().join(", ")
            ),
            suggestions: vec![format!("keep only one module owning capability '{capability}'")],
        })
        .collect()
}

fn build_recommendations(
    required: &BTreeSet<String>,
    optional: &[String],
    analysis: &ProjectAnalysis,
    adjacency: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for module_name in required {
        let Some(targets) = adjacency.get(module_name) else { continue };
        for target in targets {
            if !analysis.modules.contains_key(target) {
                out.push(Recommendation {
                    recommendation_type: RecommendationType::Add,
                    module: target.clone(),
                    reason: format!("required by '{module_name}' but not present in the project"),
                    impact: "required module closure is incomplete without it".to_string(),
                    auto_apply: false,
                });
            }
        }
    }

    for module_name in optional {
        let score = adjacency
            .iter()
            .filter(|(from, targets)| (required.contains(*from) && targets.contains(module_name)))
            .count();
        if score >= 2 {
            out.push(Recommendation {
                recommendation_type: RecommendationType::Configure,
                module: module_name.clone(),
                reason: format!("co-occurs with {score} required module(s)"),
                impact: "enabling it avoids re-deriving shared wiring later".to_string(),
                auto_apply: true,
            });
        }
    }

    for hint in &analysis.pattern_hints {
        if hint.pattern == "repository-service" && required.contains(&hint.module) {
            let has_handler = analysis.modules[&hint.module]
                .files
                .iter()
                .any(|f| f.file_stem().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase().contains("handler")).unwrap_or(false));
            if !has_handler {
                out.push(Recommendation {
                    recommendation_type: RecommendationType::Add,
                    module: hint.module.clone(),
                    reason: "has a repository and service but no handler".to_string(),
                    impact: "module may be missing its inbound adapter".to_string(),
                    auto_apply: false,
                });
            }
        }
    }

    out.sort_by(|a, b| (a.module.clone(), format!("{:?}", a.recommendation_type)).cmp(&(b.module.clone(), format!("{:?}", b.recommendation_type))));
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Dependency, DependencyType, Module};

    fn analysis_with(deps: Vec<(&str, &str)>, modules: &[&str]) -> ProjectAnalysis {
        let mut analysis = ProjectAnalysis::default();
        for m in modules {
            analysis.modules.insert(
                m.to_string(),
                Module {
                    name: m.to_string(),
                    files: Vec::new(),
                    tags: Vec::new(),
                },
            );
        }
        for (from, to) in deps {
            analysis.dependencies.push(Dependency {
                from: from.to_string(),
                to: to.to_string(),
                dep_type: DependencyType::Explicit,
            });
        }
        analysis
    }

    #[test]
    fn test_required_closure_is_transitive() {
        let analysis = analysis_with(vec![("a", "b"), ("b", "c")], &["a", "b", "c"]);
        let plan = resolve(&analysis, &["a".to_string()]);
        assert_eq!(plan.required_modules, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_install_order_is_topological() {
        let analysis = analysis_with(vec![("a", "b"), ("b", "c")], &["a", "b", "c"]);
        let plan = resolve(&analysis, &["a".to_string()]);
        let pos = |name: &str| plan.install_order.iter().position(|m| m == name).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }

    #[test]
    fn test_unknown_requested_module_is_warning_not_error() {
        let analysis = analysis_with(vec![], &["a"]);
        let plan = resolve(&analysis, &["missing".to_string()]);
        assert!(plan.required_modules.contains(&"missing".to_string()));
        assert!(!plan.warnings.is_empty());
    }

    #[test]
    fn test_cycle_produces_conflict_and_order() {
        let analysis = analysis_with(vec![("a", "b"), ("b", "a")], &["a", "b"]);
        let plan = resolve(&analysis, &["a".to_string()]);
        assert!(plan.conflicts.iter().any(|c| c.conflict_type == ConflictType::Cycle));
        assert_eq!(plan.install_order.len(), 2);
    }

    #[test]
    fn test_optional_closure_capped_and_scored() {
        let mut deps = Vec::new();
        let mut modules = vec!["a"];
        for i in 0..10 {
            let name: &'static str = Box::leak(format!("opt{i}").into_boxed_str());
            deps.push(("a", name));
            modules.push(name);
        }
        let analysis = analysis_with(deps, &modules);
        let plan = resolve(&analysis, &["a".to_string()]);
        assert!(plan.optional_modules.is_empty() || plan.optional_modules.len() <= MAX_OPTIONAL_MODULES);
    }
}
