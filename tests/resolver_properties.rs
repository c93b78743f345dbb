//! Integration tests covering resolver closure (the exact transitive
//! closure; install order is a valid topological order) over a real
//! scanned + analyzed tree.

use kthulu::analysis::analyze;
use kthulu::config::PipelineConfig;
use kthulu::resolver::{resolve, ConflictType};
use std::fs;

fn write_chain(dir: &std::path::Path) {
    fs::create_dir_all(dir.join("billing")).unwrap();
    fs::create_dir_all(dir.join("auth")).unwrap();
    fs::create_dir_all(dir.join("ledger")).unwrap();
    fs::create_dir_all(dir.join("reporting")).unwrap();
    fs::write(
        dir.join("billing/invoice.rs"),
        "// @kthulu:module:billing symbol:Invoice\n// @kthulu:dependency:auth module:billing\n",
    )
    .unwrap();
    fs::write(
        dir.join("auth/session.rs"),
        "// @kthulu:module:auth symbol:Session\n// @kthulu:dependency:ledger module:auth\n",
    )
    .unwrap();
    fs::write(dir.join("ledger/entry.rs"), "// @kthulu:module:ledger symbol:Entry\n").unwrap();
    fs::write(
        dir.join("reporting/report.rs"),
        "// @kthulu:module:reporting symbol:Report\n",
    )
    .unwrap();
}

#[test]
fn required_closure_matches_transitive_reachability_from_a_real_scan() {
    let dir = tempfile::tempdir().unwrap();
    write_chain(dir.path());
    let config = PipelineConfig::default();
    let analysis = analyze(dir.path(), &config).unwrap();

    let plan = resolve(&analysis, &["billing".to_string()]);

    assert!(plan.required_modules.contains(&"billing".to_string()));
    assert!(plan.required_modules.contains(&"auth".to_string()));
    assert!(plan.required_modules.contains(&"ledger".to_string()));
    assert!(!plan.required_modules.contains(&"reporting".to_string()));
}

#[test]
fn install_order_respects_every_dependency_edge() {
    let dir = tempfile::tempdir().unwrap();
    write_chain(dir.path());
    let config = PipelineConfig::default();
    let analysis = analyze(dir.path(), &config).unwrap();

    let plan = resolve(&analysis, &["billing".to_string()]);
    let pos = |name: &str| plan.install_order.iter().position(|m| m == name).unwrap();

    assert!(pos("ledger") < pos("auth"));
    assert!(pos("auth") < pos("billing"));
    assert_eq!(plan.install_order.len(), plan.required_modules.len());
}

#[test]
fn resolver_over_a_real_import_cycle_reports_a_cycle_conflict() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(
        dir.path().join("a/x.rs"),
        "// @kthulu:module:a symbol:X\n// @kthulu:dependency:b module:a\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("b/y.rs"),
        "// @kthulu:module:b symbol:Y\n// @kthulu:dependency:a module:b\n",
    )
    .unwrap();
    let config = PipelineConfig::default();
    let analysis = analyze(dir.path(), &config).unwrap();

    let plan = resolve(&analysis, &["a".to_string()]);
    assert!(plan.conflicts.iter().any(|c| c.conflict_type == ConflictType::Cycle));
    assert_eq!(plan.install_order.len(), 2);
}

#[test]
fn resolving_the_same_analysis_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_chain(dir.path());
    let config = PipelineConfig::default();
    let analysis = analyze(dir.path(), &config).unwrap();

    let first = resolve(&analysis, &["billing".to_string()]);
    let second = resolve(&analysis, &["billing".to_string()]);
    assert_eq!(first.required_modules, second.required_modules);
    assert_eq!(first.install_order, second.install_order);
}
