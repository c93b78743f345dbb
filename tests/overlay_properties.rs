//! Integration tests covering generator alias safety and generator
//! formatting, exercised through the public `overlay::generate` API only.

use kthulu::error::KthuluError;
use kthulu::overlay::{generate, Formatter, NullFormatter, OverlayPlan, Replacement};
use std::collections::BTreeMap;
use std::fs;

fn wide_plan() -> OverlayPlan {
    let mut groups = BTreeMap::new();
    groups.insert(
        "hooks".to_string(),
        vec![
            "services/auth/impl.NewHook".to_string(),
            "services/billing/impl.NewHook".to_string(),
            "services/ledger/impl.NewHook".to_string(),
        ],
    );
    OverlayPlan {
        replacements: vec![
            Replacement {
                interface: "pkg/svc.Service".to_string(),
                implementation: "pkg/impl.MockService".to_string(),
                constructor: "pkg/impl.NewMockService".to_string(),
            },
            Replacement {
                interface: "pkg/other.Other".to_string(),
                implementation: "vendor/impl.MockOther".to_string(),
                constructor: "vendor/impl.NewMockOther".to_string(),
            },
        ],
        decorations: vec!["pkg/dec.DecorateService".to_string()],
        groups,
    }
}

#[test]
fn every_distinct_package_path_gets_a_distinct_alias() {
    let dir = tempfile::tempdir().unwrap();
    let plan = wide_plan();
    let generated = generate(&plan, dir.path(), &NullFormatter).unwrap();

    let import_lines: Vec<&str> = generated
        .wiring_source
        .lines()
        .filter(|l| l.starts_with("use "))
        .collect();
    let mut aliases: Vec<&str> = import_lines
        .iter()
        .filter_map(|l| l.rsplit(' ').next())
        .map(|s| s.trim_end_matches(';'))
        .collect();
    let before = aliases.len();
    aliases.sort();
    aliases.dedup();
    assert_eq!(aliases.len(), before);
}

#[test]
fn same_basename_packages_collide_into_suffixed_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let mut groups = BTreeMap::new();
    groups.insert(
        "hooks".to_string(),
        vec![
            "services/auth/impl.NewHook".to_string(),
            "services/billing/impl.NewHook".to_string(),
            "services/ledger/impl.NewHook".to_string(),
        ],
    );
    let plan = OverlayPlan {
        replacements: Vec::new(),
        decorations: Vec::new(),
        groups,
    };
    let generated = generate(&plan, dir.path(), &NullFormatter).unwrap();

    assert!(generated.wiring_source.contains("services::auth::impl as r#impl"));
    assert!(generated.wiring_source.contains("services::billing::impl as impl2"));
    assert!(generated.wiring_source.contains("services::ledger::impl as impl3"));
}

#[test]
fn generated_wiring_and_contracts_pass_the_null_formatter_and_are_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let plan = wide_plan();
    let generated = generate(&plan, dir.path(), &NullFormatter).unwrap();

    assert!(fs::read_to_string(&generated.wiring_path).unwrap().contains("fx::Module::new()"));
    let contracts_path = generated.contracts_path.unwrap();
    assert!(fs::read_to_string(&contracts_path).unwrap().contains("_ASSERT_CONTRACT_0"));
}

#[test]
fn generation_is_byte_stable_across_repeated_calls() {
    let dir = tempfile::tempdir().unwrap();
    let plan = wide_plan();
    let first = generate(&plan, dir.path(), &NullFormatter).unwrap();
    let second = generate(&plan, dir.path(), &NullFormatter).unwrap();
    assert_eq!(first.wiring_source, second.wiring_source);
    assert_eq!(first.contracts_source, second.contracts_source);
}

struct RejectingFormatter;

impl Formatter for RejectingFormatter {
    fn format(&self, _src: &str) -> Result<String, KthuluError> {
        Err(KthuluError::FormatFailed("refused by test formatter".to_string()))
    }
}

#[test]
fn formatter_rejection_surfaces_as_a_hard_error_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let plan = wide_plan();
    let result = generate(&plan, dir.path(), &RejectingFormatter);
    assert!(matches!(result, Err(KthuluError::FormatFailed(_))));
    assert!(!dir.path().join("compiled.rs").exists());
}

#[test]
fn plan_with_no_replacements_emits_no_contract_file() {
    let dir = tempfile::tempdir().unwrap();
    let plan = OverlayPlan {
        replacements: Vec::new(),
        decorations: vec!["pkg/dec.DecorateService".to_string()],
        groups: BTreeMap::new(),
    };
    let generated = generate(&plan, dir.path(), &NullFormatter).unwrap();
    assert!(generated.contracts_path.is_none());
    assert!(generated.wiring_source.contains(".decorate(dec::DecorateService)"));
}
