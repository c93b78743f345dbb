//! Overlay generator.
//!
//! Consumes an [`OverlayPlan`] (`{replacements, decorations, groups}`) and
//! renders the two overlay source artefacts: a wiring module aggregating
//! replace/decorate/provide blocks, and a sibling contract-check file
//! asserting every replacement satisfies its declared interface.
//!
//! Imports are sorted lexicographically by package path, with aliases
//! derived from `basename(path)`: the smallest integer suffix that makes a
//! collision unique, escaped if it would otherwise collide with a Rust
//! keyword, and the injection-library alias seeded first.

use crate::error::KthuluError;
use crate::fs_capability::atomic_write;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default alias for the injection/DI crate pulled into every wiring module.
const INJECTION_LIB_PATH: &str = "kthulu_runtime::di";
const INJECTION_LIB_ALIAS: &str = "fx";

/// Something the target formatter can accept or reject. The real canonical
/// formatter for the host framework's language lives outside this crate;
/// [`NullFormatter`] is the built-in stand-in that enforces the same
/// contract (reject malformed source as a hard error) without vendoring an
/// external toolchain.
pub trait Formatter {
    fn format(&self, src: &str) -> Result<String, KthuluError>;
}

/// Validates brace/paren/bracket balance and normalizes trailing whitespace.
/// A caller wiring this crate into a real build can substitute a `Formatter`
/// that shells out to the host language's canonical formatter instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFormatter;

impl Formatter for NullFormatter {
    fn format(&self, src: &str) -> Result<String, KthuluError> {
        let mut stack = Vec::new();
        for (offset, ch) in src.char_indices() {
            match ch {
                '(' | '[' | '{' => stack.push(ch),
                ')' => {
                    if stack.pop() != Some('(') {
                        return Err(KthuluError::FormatFailed(format!(
                            "unbalanced ')' at byte offset {offset}"
                        )));
                    }
                }
                ']' => {
                    if stack.pop() != Some('[') {
                        return Err(KthuluError::FormatFailed(format!(
                            "unbalanced ']' at byte offset {offset}"
                        )));
                    }
                }
                '}' => {
                    if stack.pop() != Some('{') {
                        return Err(KthuluError::FormatFailed(format!(
                            "unbalanced '}}' at byte offset {offset}"
                        )));
                    }
                }
                _ => {}
            }
        }
        if !stack.is_empty() {
            return Err(KthuluError::FormatFailed(format!(
                "{} unclosed delimiter(s)",
                stack.len()
            )));
        }
        let mut out = src
            .lines()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// One replacement: a constructor that produces `implementation`, which
/// stands in for `interface` everywhere it is injected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Replacement {
    pub interface: String,
    pub implementation: String,
    pub constructor: String,
}

/// The overlay-level plan form consumed by the generator. Distinct from
/// [`crate::plan::Plan`] — see [`OverlayPlan::from_plan_nodes`] for the
/// best-effort bridge between the two when a `path` already looks like
/// `pkg/path.Symbol`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct OverlayPlan {
    pub replacements: Vec<Replacement>,
    pub decorations: Vec<String>,
    pub groups: BTreeMap<String, Vec<String>>,
}

impl OverlayPlan {
    /// Best-effort projection from a scan-level [`crate::plan::Plan`]: every
    /// `Replace` node with a qualified-looking path (`pkg/path.Symbol`)
    /// becomes a replacement whose `constructor` is guessed as `New<Symbol>`
    /// in the same package; every `Decorate` node becomes a decoration. This
    /// is a convenience, not the contract — `interface` cannot be recovered
    /// from a scan-level `Plan` alone, so it is left equal to `implementation`
    /// and callers are expected to patch it in once they know the real
    /// interface type.
    pub fn from_plan_nodes(plan: &crate::plan::Plan) -> Self {
        let mut replacements = Vec::new();
        let mut decorations = Vec::new();
        for node in &plan.nodes {
            let Some((pkg, symbol)) = qualify(&node.construct.path) else { continue };
            let qualified = format!("{pkg}.{symbol}");
            match node.action {
                crate::plan::Action::Replace => replacements.push(Replacement {
                    interface: qualified.clone(),
                    implementation: qualified.clone(),
                    constructor: format!("{pkg}.New{symbol}"),
                }),
                crate::plan::Action::Decorate => decorations.push(qualified),
            }
        }
        replacements.sort();
        decorations.sort();
        decorations.dedup();
        Self {
            replacements,
            decorations,
            groups: BTreeMap::new(),
        }
    }
}

/// Splits `pkg/path/Symbol` into `("pkg/path", "Symbol")`, used only by the
/// best-effort [`OverlayPlan::from_plan_nodes`] bridge.
fn qualify(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    Some((&path[..idx], &path[idx + 1..]))
}

/// Splits a qualified name `pkg/path.Symbol` into `("pkg/path", "Symbol")`.
fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    }
}

/// Identifiers that cannot appear as a plain `use ... as <alias>` target.
/// Most reserved words are still legal as raw identifiers (`r#impl`); the
/// handful that aren't (`crate`, `self`, `super`, `Self`, `true`, `false`)
/// get an underscore suffix instead.
const RAW_ESCAPABLE_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "type", "unsafe", "use", "where", "while", "abstract",
    "become", "box", "do", "final", "macro", "override", "priv", "try", "typeof", "unsized",
    "virtual", "yield",
];
const NON_RAW_KEYWORDS: &[&str] = &["crate", "self", "super", "Self", "true", "false"];

/// Escapes `base` if it collides with a Rust keyword, so it is always safe
/// to emit as a bare `use ... as <alias>` identifier.
fn escape_keyword_alias(base: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&base) {
        format!("{base}_")
    } else if RAW_ESCAPABLE_KEYWORDS.contains(&base) {
        format!("r#{base}")
    } else {
        base.to_string()
    }
}

/// An import table: package path -> alias, built with collision avoidance.
/// Seeded with the injection library first.
struct ImportTable {
    alias_of: BTreeMap<String, String>,
    taken_aliases: std::collections::BTreeSet<String>,
}

impl ImportTable {
    fn new() -> Self {
        let mut table = Self {
            alias_of: BTreeMap::new(),
            taken_aliases: std::collections::BTreeSet::new(),
        };
        table.insert(INJECTION_LIB_PATH);
        table
    }

    /// Registers `pkg_path`, assigning `basename(pkg_path)` as its alias
    /// (escaped if it collides with a Rust keyword) unless already taken by
    /// a *different* path, in which case the smallest integer suffix making
    /// the alias unique is appended.
    fn insert(&mut self, pkg_path: &str) -> String {
        if let Some(existing) = self.alias_of.get(pkg_path) {
            return existing.clone();
        }
        let raw_base = if pkg_path == INJECTION_LIB_PATH {
            INJECTION_LIB_ALIAS.to_string()
        } else {
            pkg_path
                .rsplit('/')
                .next()
                .unwrap_or(pkg_path)
                .replace(['-', '.'], "_")
        };
        let mut candidate = raw_base.clone();
        let mut suffix = 2u32;
        let mut alias = escape_keyword_alias(&candidate);
        while self.taken_aliases.contains(&alias) {
            candidate = format!("{raw_base}{suffix}");
            alias = escape_keyword_alias(&candidate);
            suffix += 1;
        }
        self.taken_aliases.insert(alias.clone());
        self.alias_of.insert(pkg_path.to_string(), alias.clone());
        alias
    }

    fn alias(&self, pkg_path: &str) -> &str {
        self.alias_of.get(pkg_path).map(|s| s.as_str()).unwrap_or(pkg_path)
    }

    /// Import paths in lexicographic order, injection library excluded
    /// (rendered separately since it is always present).
    fn sorted_paths(&self) -> Vec<&String> {
        self.alias_of
            .keys()
            .filter(|p| p.as_str() != INJECTION_LIB_PATH)
            .collect()
    }
}

/// The two artefacts [`generate`] writes, alongside their final paths.
pub struct GeneratedOverlay {
    pub wiring_path: PathBuf,
    pub wiring_source: String,
    pub contracts_path: Option<PathBuf>,
    pub contracts_source: Option<String>,
}

/// Renders and writes the wiring artefact (always) and the contract
/// artefact (only when `plan.replacements` is non-empty) into `out_dir`,
/// formatting each through `formatter` and treating a formatter rejection
/// as [`KthuluError::FormatFailed`] — a hard error.
pub fn generate(
    plan: &OverlayPlan,
    out_dir: &Path,
    formatter: &dyn Formatter,
) -> Result<GeneratedOverlay, KthuluError> {
    let wiring_source = formatter.format(&render_wiring(plan))?;
    let wiring_path = out_dir.join("compiled.rs");
    atomic_write(&wiring_path, wiring_source.as_bytes())?;

    let (contracts_path, contracts_source) = if plan.replacements.is_empty() {
        (None, None)
    } else {
        let source = formatter.format(&render_contracts(plan))?;
        let path = out_dir.join("contracts_test.rs");
        atomic_write(&path, source.as_bytes())?;
        (Some(path), Some(source))
    };

    Ok(GeneratedOverlay {
        wiring_path,
        wiring_source,
        contracts_path,
        contracts_source,
    })
}

/// Builds the shared import table for a plan: every replacement's
/// implementation + constructor package, every decoration's package, every
/// grouped function's package.
fn build_import_table(plan: &OverlayPlan) -> ImportTable {
    let mut table = ImportTable::new();
    for r in &plan.replacements {
        table.insert(split_qualified(&r.implementation).0);
        table.insert(split_qualified(&r.constructor).0);
    }
    for d in &plan.decorations {
        table.insert(split_qualified(d).0);
    }
    for funcs in plan.groups.values() {
        for f in funcs {
            table.insert(split_qualified(f).0);
        }
    }
    table
}

fn qualified_ref(table: &ImportTable, qualified: &str) -> String {
    let (pkg, symbol) = split_qualified(qualified);
    if pkg.is_empty() {
        return symbol.to_string();
    }
    format!("{}::{}", table.alias(pkg), symbol)
}

const BUILD_TAG_HEADER: &str = "#![cfg(not(feature = \"nocli\"))]\n";

/// Renders the wiring artefact: a `Module` value aggregating Replace,
/// Decorate, and Provide blocks.
fn render_wiring(plan: &OverlayPlan) -> String {
    let table = build_import_table(plan);
    let mut out = String::new();
    out.push_str(BUILD_TAG_HEADER);
    out.push_str("// Code generated by kthulu. DO NOT EDIT.\n\n");

    out.push_str(&format!(
        "use {}::{} as {};\n",
        INJECTION_LIB_PATH, "Module", INJECTION_LIB_ALIAS
    ));
    for path in table.sorted_paths() {
        out.push_str(&format!("use {} as {};\n", path.replace('/', "::"), table.alias(path)));
    }
    out.push('\n');

    out.push_str("pub static MODULE: std::sync::LazyLock<fx::Module> = std::sync::LazyLock::new(|| {\n");
    out.push_str("    fx::Module::new()\n");

    let mut replacements = plan.replacements.clone();
    replacements.sort_by(|a, b| (&a.interface, &a.implementation).cmp(&(&b.interface, &b.implementation)));
    for r in &replacements {
        out.push_str(&format!(
            "        .replace({})\n",
            qualified_ref(&table, &r.constructor)
        ));
    }

    let mut decorations = plan.decorations.clone();
    decorations.sort();
    for d in &decorations {
        out.push_str(&format!("        .decorate({})\n", qualified_ref(&table, d)));
    }

    let mut group_names: Vec<&String> = plan.groups.keys().collect();
    group_names.sort();
    for name in group_names {
        let mut funcs = plan.groups[name].clone();
        funcs.sort();
        for f in &funcs {
            out.push_str(&format!(
                "        .provide({}, \"{}\")\n",
                qualified_ref(&table, f),
                name
            ));
        }
    }

    out.push_str("        .build()\n");
    out.push_str("});\n");
    out
}

/// Renders the contract artefact: a compile-time assertion per replacement
/// that `implementation` satisfies `interface`.
fn render_contracts(plan: &OverlayPlan) -> String {
    let table = build_import_table(plan);
    let mut out = String::new();
    out.push_str(BUILD_TAG_HEADER);
    out.push_str("// Code generated by kthulu. DO NOT EDIT.\n\n");

    for path in table.sorted_paths() {
        out.push_str(&format!("use {} as {};\n", path.replace('/', "::"), table.alias(path)));
    }
    out.push('\n');

    let mut replacements = plan.replacements.clone();
    replacements.sort_by(|a, b| (&a.interface, &a.implementation).cmp(&(&b.interface, &b.implementation)));
    for (i, r) in replacements.iter().enumerate() {
        out.push_str(&format!(
            "const _ASSERT_CONTRACT_{i}: fn() = || {{ fn assert_impl<T: {}>() {{}} assert_impl::<{}>(); }};\n",
            qualified_ref(&table, &r.interface),
            qualified_ref(&table, &r.implementation),
        ));
    }
    out
}
