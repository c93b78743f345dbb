//! Integration tests covering layer safety and import-cycle detection.

use kthulu::config::PipelineConfig;
use kthulu::error::KthuluError;
use kthulu::layers::analyze;
use std::fs;

#[test]
fn layer_violation_blocks_with_edge_detail() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("domain")).unwrap();
    fs::create_dir_all(dir.path().join("adapters")).unwrap();
    fs::write(dir.path().join("adapters/y.rs"), "pub struct Y;\n").unwrap();
    fs::write(
        dir.path().join("domain/x.rs"),
        "use crate::adapters::y::Y;\npub struct X;\n",
    )
    .unwrap();

    let config = PipelineConfig::default();
    match analyze(dir.path(), &config) {
        Err(KthuluError::LayerViolation { edges }) => {
            assert_eq!(edges.len(), 1);
            assert_eq!(edges[0].from_layer, "domain");
            assert_eq!(edges[0].to_layer, "adapters");
        }
        other => panic!("expected LayerViolation, got {other:?}"),
    }
}

#[test]
fn adapters_depending_on_usecase_and_domain_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    for layer in ["domain", "usecase", "adapters"] {
        fs::create_dir_all(dir.path().join(layer)).unwrap();
    }
    fs::write(dir.path().join("domain/user.rs"), "pub struct User;\n").unwrap();
    fs::write(
        dir.path().join("usecase/create_user.rs"),
        "use crate::domain::user::User;\npub struct CreateUser;\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("adapters/http.rs"),
        "use crate::usecase::create_user::CreateUser;\nuse crate::domain::user::User;\npub struct Http;\n",
    )
    .unwrap();

    let config = PipelineConfig::default();
    assert!(analyze(dir.path(), &config).is_ok());
}

#[test]
fn import_cycle_reports_both_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "use crate::b::Thing;\npub struct AThing;\n").unwrap();
    fs::write(dir.path().join("b.rs"), "use crate::a::Thing;\npub struct Thing;\n").unwrap();

    let config = PipelineConfig::default();
    match analyze(dir.path(), &config) {
        Err(KthuluError::ImportCycle { components }) => {
            assert_eq!(components.len(), 1);
            assert_eq!(components[0].len(), 2);
        }
        other => panic!("expected ImportCycle, got {other:?}"),
    }
}

#[test]
fn three_way_cycle_is_detected_as_one_component() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "use crate::b::B;\n").unwrap();
    fs::write(dir.path().join("b.rs"), "use crate::c::C;\n").unwrap();
    fs::write(dir.path().join("c.rs"), "use crate::a::A;\n").unwrap();

    let config = PipelineConfig::default();
    match analyze(dir.path(), &config) {
        Err(KthuluError::ImportCycle { components }) => {
            assert_eq!(components.iter().map(|c| c.len()).sum::<usize>(), 3);
        }
        other => panic!("expected ImportCycle, got {other:?}"),
    }
}
