//! Integration tests covering scanner determinism and tag uniqueness over
//! a realistic multi-directory tree.

use kthulu::config::PipelineConfig;
use kthulu::scan::scan;
use std::fs;

fn write_tree(dir: &std::path::Path) {
    fs::create_dir_all(dir.join("overrides")).unwrap();
    fs::create_dir_all(dir.join("extends")).unwrap();
    fs::create_dir_all(dir.join("vendor")).unwrap();
    fs::write(
        dir.join("overrides/a.rs"),
        "// @kthulu:shadow module:billing symbol:Invoice priority:5\nfn a() {}\n",
    )
    .unwrap();
    fs::write(
        dir.join("extends/b.rs"),
        "/* @kthulu:wrap module:billing symbol:Invoice priority:3 */\nfn b() {}\n",
    )
    .unwrap();
    fs::write(
        dir.join("vendor/c.rs"),
        "// @kthulu:shadow module:billing symbol:Ignored\n",
    )
    .unwrap();
    fs::write(
        dir.join("overrides/d.rs"),
        "let s = \"@kthulu:shadow module:fake symbol:Z\";\n// not a real tag line without prefix\n",
    )
    .unwrap();
}

#[test]
fn scan_is_deterministic_across_repeated_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path());
    let config = PipelineConfig::default();

    let first = scan(dir.path(), &config).unwrap();
    let second = scan(dir.path(), &config).unwrap();
    assert_eq!(first.annotations, second.annotations);
    assert_eq!(first.warnings.len(), second.warnings.len());
}

#[test]
fn scan_skips_vendor_and_string_literals() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path());
    let config = PipelineConfig::default();
    let result = scan(dir.path(), &config).unwrap();

    assert!(result.annotations.iter().all(|a| !a.file.to_string_lossy().contains("vendor")));
    assert!(result.annotations.iter().all(|a| a.module != "fake"));
}

#[test]
fn scan_output_identity_keys_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path());
    let config = PipelineConfig::default();
    let result = scan(dir.path(), &config).unwrap();

    let mut keys: Vec<_> = result.annotations.iter().map(|a| a.identity_key()).collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before);
}

#[test]
fn scan_orders_by_file_then_line() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("z.rs"),
        "// @kthulu:module:m symbol:A\n// @kthulu:module:m symbol:B\n",
    )
    .unwrap();
    fs::write(dir.path().join("a.rs"), "// @kthulu:module:m symbol:C\n").unwrap();
    let config = PipelineConfig::default();
    let result = scan(dir.path(), &config).unwrap();

    let files: Vec<_> = result.annotations.iter().map(|a| a.file.clone()).collect();
    let mut sorted_files = files.clone();
    sorted_files.sort();
    assert_eq!(files, sorted_files);
}
