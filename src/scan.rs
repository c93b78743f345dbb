//! Annotation scanner.
//!
//! Walks a root directory, reads each matching source file line-by-line,
//! isolates comment text via a small hand-rolled lexer (never raw regex over
//! the whole file — tags inside string literals must not be recognised), and
//! extracts `@kthulu:<kind>[:<value>] (key:val )*` tags from the comment
//! text, via a hand-rolled recursive directory walker generalised with an
//! ignore list and file-extension filter from [`PipelineConfig`].

use crate::config::PipelineConfig;
use crate::error::{KthuluError, Warning};
use crate::fs_capability::{EntryKind, FsCapability, StdFs};
use crate::model::{Annotation, AnnotationKind, KnownKinds};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Output of a full scan: the flat annotation stream plus any malformed-tag
/// warnings collected along the way. Never aborts on a malformed tag.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub annotations: Vec<Annotation>,
    pub warnings: Vec<Warning>,
}

/// Walks `root` and extracts every `@kthulu:*` tag.
///
/// Output is ordered by `(file path, line)`. I/O failures walking the root
/// surface as [`KthuluError::ScanFailed`]; malformed tags never abort the
/// scan, they are collected as warnings instead.
pub fn scan(root: &Path, config: &PipelineConfig) -> Result<ScanResult, KthuluError> {
    scan_with_fs(root, config, &StdFs)
}

/// Same as [`scan`], but reads the tree through a caller-supplied
/// [`FsCapability`] instead of the real filesystem — lets a host embed this
/// scanner over an in-memory or sandboxed tree.
pub fn scan_with_fs<F: FsCapability + Sync>(
    root: &Path,
    config: &PipelineConfig,
    fs: &F,
) -> Result<ScanResult, KthuluError> {
    let known_kinds = KnownKinds::default();

    let files = collect_source_files(root, root, config, fs).map_err(|source| KthuluError::ScanFailed {
        root: root.to_path_buf(),
        source,
    })?;

    // Per-file work is independent; ordering is re-imposed by an explicit
    // sort afterwards so the result is byte-identical to a serial walk
    // regardless of directory-read order or thread scheduling.
    let per_file: Vec<(Vec<Annotation>, Vec<Warning>)> = files
        .par_iter()
        .map(|path| scan_file(path, fs, &known_kinds))
        .collect::<Result<Vec<_>, KthuluError>>()?;

    let mut annotations = Vec::new();
    let mut warnings = Vec::new();
    for (anns, warns) in per_file {
        annotations.extend(anns);
        warnings.extend(warns);
    }

    annotations.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    warnings.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    Ok(ScanResult { annotations, warnings })
}

fn scan_file<F: FsCapability>(
    path: &Path,
    fs: &F,
    known_kinds: &KnownKinds,
) -> Result<(Vec<Annotation>, Vec<Warning>), KthuluError> {
    let content = fs.read_to_string(path).map_err(|source| KthuluError::ScanFailed {
        root: path.to_path_buf(),
        source,
    })?;

    let mut annotations = Vec::new();
    let mut warnings = Vec::new();
    for (line_no, comment_text) in extract_comments(&content) {
        parse_tags_in_comment(path, line_no, &comment_text, known_kinds, &mut annotations, &mut warnings);
    }
    Ok((annotations, warnings))
}

fn collect_source_files<F: FsCapability>(
    root: &Path,
    dir: &Path,
    config: &PipelineConfig,
    fs: &F,
) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut entries = fs.readdir(dir)?;
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    for entry in entries {
        let path = entry.path;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        let is_dir = match entry.kind {
            EntryKind::Dir => true,
            EntryKind::Symlink => fs.stat_is_dir(&path).unwrap_or(false),
            EntryKind::File | EntryKind::Other => false,
        };
        if is_dir {
            if config.is_ignored_dir(name) {
                continue;
            }
            out.extend(collect_source_files(root, &path, config, fs)?);
            continue;
        }
        if entry.kind == EntryKind::Other {
            continue;
        }

        if !config.is_source_file(&path) {
            continue;
        }
        if config.skip_hidden && name.starts_with('.') {
            continue;
        }
        if config.skip_tests && looks_like_test_file(root, &path) {
            continue;
        }
        out.push(path);
    }
    Ok(out)
}

fn looks_like_test_file(root: &Path, path: &Path) -> bool {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    if stem.ends_with("_test") || stem.starts_with("test_") {
        return true;
    }
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.components().any(|c| c.as_os_str() == "tests"))
        .unwrap_or(false)
}

/// Comment-text spans, one per physical line that carries comment content,
/// as `(1-indexed line number, comment text for that line)`. String and char
/// literals are tracked and excluded so a tag-like substring inside a literal
/// is never mistaken for a real annotation.
fn extract_comments(src: &str) -> Vec<(u32, String)> {
    let chars: Vec<char> = src.chars().collect();
    let len = chars.len();
    let mut out = Vec::new();
    let mut i = 0usize;
    let mut line: u32 = 1;

    while i < len {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                let start = i;
                let mut j = i + 2;
                while j < len && chars[j] != '\n' {
                    j += 1;
                }
                out.push((line, chars[start..j].iter().collect()));
                i = j;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let mut j = i + 2;
                let mut seg_start = i;
                let mut seg_line = line;
                while j + 1 < len && !(chars[j] == '*' && chars[j + 1] == '/') {
                    if chars[j] == '\n' {
                        out.push((seg_line, chars[seg_start..j].iter().collect()));
                        seg_line += 1;
                        line += 1;
                        seg_start = j + 1;
                    }
                    j += 1;
                }
                let end = (j + 2).min(len);
                out.push((seg_line, chars[seg_start..end].iter().collect()));
                i = end;
            }
            '"' => {
                let mut j = i + 1;
                while j < len {
                    if chars[j] == '\\' {
                        j += 2;
                        continue;
                    }
                    if chars[j] == '\n' {
                        line += 1;
                    }
                    if chars[j] == '"' {
                        j += 1;
                        break;
                    }
                    j += 1;
                }
                i = j;
            }
            '\'' => {
                // Disambiguate a char literal (`'x'`, `'\n'`) from a lifetime
                // (`'a`) by a bounded lookahead for a closing quote.
                let mut k = i + 1;
                let mut closed = false;
                while k < len && k < i + 5 {
                    if chars[k] == '\\' {
                        k += 2;
                        continue;
                    }
                    if chars[k] == '\'' {
                        closed = true;
                        break;
                    }
                    if chars[k] == '\n' {
                        break;
                    }
                    k += 1;
                }
                i = if closed { k + 1 } else { i + 1 };
            }
            _ => i += 1,
        }
    }
    out
}

const TAG_PREFIX: &str = "@kthulu:";

/// Parses every `@kthulu:*` tag occurrence in one comment-line's text.
fn parse_tags_in_comment(
    file: &Path,
    line: u32,
    text: &str,
    known_kinds: &KnownKinds,
    annotations: &mut Vec<Annotation>,
    warnings: &mut Vec<Warning>,
) {
    let mut search_from = 0usize;
    while let Some(rel_idx) = text[search_from..].find(TAG_PREFIX) {
        let idx = search_from + rel_idx;
        let rest = &text[idx + TAG_PREFIX.len()..];
        let tag_end = rest.find(|c: char| c == '\r').unwrap_or(rest.len());
        let tag_text = &rest[..tag_end];

        match parse_one_tag(file, line, tag_text) {
            Ok(Some(annotation)) => {
                if !known_kinds.is_known(&annotation.kind) {
                    warnings.push(Warning::new(
                        file,
                        Some(line),
                        format!("unrecognized annotation kind '{}'", annotation.kind),
                    ));
                }
                annotations.push(annotation);
            }
            Ok(None) => {}
            Err(message) => warnings.push(Warning::new(file, Some(line), message)),
        }

        search_from = idx + TAG_PREFIX.len();
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_one_tag(file: &Path, line: u32, rest: &str) -> Result<Option<Annotation>, String> {
    let mut tokens = rest.split_whitespace();
    let first = match tokens.next() {
        Some(t) => t,
        None => return Err("malformed tag: missing kind".to_string()),
    };

    let (kind_str, value) = match first.split_once(':') {
        Some((k, v)) if !v.is_empty() => (k, Some(v.to_string())),
        Some((k, _)) => (k, None),
        None => (first, None),
    };

    if !is_identifier(kind_str) {
        return Err(format!("malformed tag: invalid kind {kind_str:?}"));
    }

    let kind = AnnotationKind::parse(kind_str);

    let mut attrs: BTreeMap<String, String> = BTreeMap::new();
    for tok in tokens {
        match tok.split_once(':') {
            Some((k, v)) => {
                attrs.insert(k.to_ascii_lowercase(), v.to_string());
            }
            None => {
                attrs.insert(tok.to_ascii_lowercase(), String::new());
            }
        }
    }
    if let Some(v) = &value {
        attrs.entry("value".to_string()).or_insert_with(|| v.clone());
    }

    let module = if matches!(kind, AnnotationKind::Core) {
        "core".to_string()
    } else if let Some(m) = attrs.get("module") {
        m.clone()
    } else if matches!(kind, AnnotationKind::Module) {
        value.clone().unwrap_or_default()
    } else {
        String::new()
    };

    if kind.requires_module() && module.is_empty() {
        return Err(format!("malformed tag: @kthulu:{kind} requires a module"));
    }

    let symbol = if let Some(s) = attrs.get("symbol") {
        s.clone()
    } else if matches!(kind, AnnotationKind::Module) {
        String::new()
    } else {
        value.clone().unwrap_or_default()
    };

    let priority = match attrs.get("priority") {
        Some(p) => p.parse::<i64>().unwrap_or(0),
        None => 0,
    };

    Ok(Some(Annotation {
        kind,
        module,
        symbol,
        priority,
        attrs,
        file: file.to_path_buf(),
        line,
    }))
}
