//! Scoped, tokenization-aware import extraction, shared by the project
//! analyzer and the layer/cycle analyzer.
//!
//! Falls back to scoped textual matching constrained to import aliases,
//! never unscoped regex over file text: this module never matches `use`
//! keywords against raw file text, only against lines that are not
//! comments, with brace-group expansion for `use a::b::{c, d}` syntax.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extracts every path referenced by a `use` declaration in `src`, with
/// brace groups and `as` renames expanded/stripped to their target path.
pub fn extract_use_paths(src: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in src.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
            continue;
        }
        let code = match trimmed.find("//") {
            Some(idx) => &trimmed[..idx],
            None => trimmed,
        };
        let code = code.trim();

        let rest = if let Some(r) = code.strip_prefix("use ") {
            r
        } else if let Some(r) = code.strip_prefix("pub use ") {
            r
        } else if let Some(r) = code.strip_prefix("pub(crate) use ") {
            r
        } else {
            continue;
        };

        let rest = rest.trim_end_matches(';').trim();
        if rest.is_empty() {
            continue;
        }
        out.extend(expand_use_path(rest));
    }
    out
}

fn expand_use_path(path: &str) -> Vec<String> {
    if let Some(brace_idx) = path.find('{') {
        let prefix = path[..brace_idx].trim_end_matches("::").to_string();
        let close = path.rfind('}').unwrap_or(path.len());
        let inner = &path[brace_idx + 1..close];
        let mut out = Vec::new();
        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let leaf = part.split(" as ").next().unwrap_or(part).trim();
            if leaf == "self" || leaf.is_empty() {
                out.push(prefix.clone());
            } else {
                out.push(format!("{prefix}::{leaf}"));
            }
        }
        out
    } else {
        let leaf = path.split(" as ").next().unwrap_or(path).trim();
        let leaf = leaf.trim_end_matches("::*");
        vec![leaf.to_string()]
    }
}

/// Maps every known internal module path (`a::b::c`, derived from a file's
/// location relative to `root`) to the file that defines it, so `use`
/// targets can be resolved to internal files without a real module resolver.
pub fn build_module_index(root: &Path, files: &[PathBuf]) -> BTreeMap<String, PathBuf> {
    let mut index = BTreeMap::new();
    for file in files {
        let Ok(rel) = file.strip_prefix(root) else { continue };
        let stem = rel.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let mut components: Vec<String> = rel
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();
        if stem != "mod" && stem != "lib" && stem != "main" {
            components.push(stem.to_string());
        }
        if components.is_empty() {
            continue;
        }
        index.insert(components.join("::"), file.clone());
    }
    index
}

/// Resolves a `use`-declared path to the internal file it refers to, if any.
/// Strips `crate::`/`self::`/`super::` prefixes and matches the longest
/// registered module-path prefix in `index`.
pub fn resolve_import_target(use_path: &str, index: &BTreeMap<String, PathBuf>) -> Option<PathBuf> {
    let normalized = use_path
        .trim_start_matches("crate::")
        .trim_start_matches("self::")
        .trim_start_matches("super::");

    let mut best: Option<(&str, &PathBuf)> = None;
    for (key, file) in index {
        let matches = normalized == key.as_str() || normalized.starts_with(&format!("{key}::"));
        if matches && best.map(|(k, _)| k.len() < key.len()).unwrap_or(true) {
            best = Some((key.as_str(), file));
        }
    }
    best.map(|(_, f)| f.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_use() {
        let src = "use domain::user::User;\n";
        assert_eq!(extract_use_paths(src), vec!["domain::user::User".to_string()]);
    }

    #[test]
    fn test_extract_use_ignores_comment_lines() {
        let src = "// use domain::user::User;\nuse adapters::db::Pool;\n";
        assert_eq!(extract_use_paths(src), vec!["adapters::db::Pool".to_string()]);
    }

    #[test]
    fn test_extract_use_brace_group() {
        let src = "use crate::domain::{User, Invoice as Inv};\n";
        let paths = extract_use_paths(src);
        assert_eq!(
            paths,
            vec![
                "crate::domain::User".to_string(),
                "crate::domain::Invoice".to_string(),
            ]
        );
    }

    #[test]
    fn test_build_module_index_and_resolve() {
        let root = Path::new("/proj");
        let files = vec![
            PathBuf::from("/proj/domain/user.rs"),
            PathBuf::from("/proj/adapters/db.rs"),
        ];
        let index = build_module_index(root, &files);
        let target = resolve_import_target("crate::domain::user::User", &index);
        assert_eq!(target, Some(PathBuf::from("/proj/domain/user.rs")));
    }
}
