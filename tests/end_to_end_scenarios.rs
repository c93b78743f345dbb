//! Concrete end-to-end scenarios driven through the public pipeline entry
//! points (`pipeline::run_once` / `run_once_with_overlay`).

use kthulu::config::PipelineConfig;
use kthulu::error::KthuluError;
use kthulu::pipeline::{run_once, run_once_with_overlay};
use kthulu::plan::Action;
use std::fs;

/// A single `@kthulu:shadow` tag produces exactly one `Replace` node.
#[test]
fn single_shadow_produces_one_replace_node() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.rs"),
        "// @kthulu:shadow module:billing symbol:Invoice priority:5\n",
    )
    .unwrap();
    let config = PipelineConfig::default();
    let report = run_once(dir.path(), &config).unwrap();

    assert_eq!(report.plan.nodes.len(), 1);
    assert_eq!(report.plan.nodes[0].action, Action::Replace);
    assert!(report.plan_path.exists());
}

/// Two competing tags on the same construct tie-break by priority, then
/// by id — the winner becomes `Replace`, the loser `Decorate`.
#[test]
fn competing_tags_tie_break_by_priority_then_id() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.rs"),
        "// @kthulu:shadow module:billing symbol:Invoice priority:5\n\
         // @kthulu:wrap module:billing symbol:Invoice priority:9\n",
    )
    .unwrap();
    let config = PipelineConfig::default();
    let report = run_once(dir.path(), &config).unwrap();

    let replace_count = report.plan.nodes.iter().filter(|n| n.action == Action::Replace).count();
    let decorate_count = report.plan.nodes.iter().filter(|n| n.action == Action::Decorate).count();
    assert_eq!(replace_count, 1);
    assert_eq!(decorate_count, 1);
    let winner = report.plan.nodes.iter().find(|n| n.action == Action::Replace).unwrap();
    assert_eq!(winner.construct.priority, 9);
}

/// A layer violation blocks plan emission entirely — no `.kthulu/plan.json`
/// is written, even though annotations elsewhere in the tree are valid.
#[test]
fn layer_violation_blocks_plan_emission() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("domain")).unwrap();
    fs::create_dir_all(dir.path().join("adapters")).unwrap();
    fs::write(
        dir.path().join("adapters/y.rs"),
        "// @kthulu:shadow module:billing symbol:Y priority:1\npub struct Y;\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("domain/x.rs"),
        "use crate::adapters::y::Y;\npub struct X;\n",
    )
    .unwrap();
    let config = PipelineConfig::default();

    let result = run_once(dir.path(), &config);
    assert!(matches!(result, Err(KthuluError::LayerViolation { .. })));
    assert!(!dir.path().join(".kthulu/plan.json").exists());
}

/// A shadowed construct flows end-to-end into a generated overlay whose
/// wiring file references the replacement's package.
#[test]
fn shadow_flows_into_generated_overlay_wiring() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.rs"),
        "// @kthulu:shadow module:pkg/impl symbol:MockService priority:1\n",
    )
    .unwrap();
    let config = PipelineConfig::default();
    let out_dir = dir.path().join("dist");
    let report = run_once_with_overlay(dir.path(), &config, &out_dir).unwrap();

    let overlay = report.overlay.unwrap();
    let wiring = fs::read_to_string(&overlay.wiring_path).unwrap();
    assert!(wiring.contains("pkg::impl as r#impl"));
    assert!(wiring.contains(".replace("));
    assert!(overlay.contracts_path.is_some());
}

/// An import cycle blocks the run the same way a layer violation does, and
/// reports every file on the cycle.
#[test]
fn import_cycle_blocks_the_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "use crate::b::Thing;\npub struct AThing;\n").unwrap();
    fs::write(dir.path().join("b.rs"), "use crate::a::Thing;\npub struct Thing;\n").unwrap();
    let config = PipelineConfig::default();

    match run_once(dir.path(), &config) {
        Err(KthuluError::ImportCycle { components }) => {
            assert_eq!(components[0].len(), 2);
        }
        other => panic!("expected ImportCycle, got {other:?}"),
    }
    assert!(!dir.path().join(".kthulu/plan.json").exists());
}
