//! Top-level pipeline entry points gluing A→G (and H) together.
//!
//! This is the seam the CLI and watcher both call through: `run_once`
//! executes the scanner → analyzer → resolver/layers → plan builder →
//! overlay generator chain a single time and returns a [`PipelineReport`];
//! `run_watch` re-invokes it on every coalesced filesystem change.

use crate::config::PipelineConfig;
use crate::error::{KthuluError, Warning};
use crate::overlay::{Formatter, NullFormatter, OverlayPlan};
use crate::plan::Plan;
use crate::validation_graph::ValidationGraph;
use crate::watcher;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Aggregated result of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub plan: Plan,
    pub plan_path: PathBuf,
    pub warnings: Vec<Warning>,
    pub validation_graph: ValidationGraph,
    pub overlay: Option<GeneratedOverlayPaths>,
}

#[derive(Debug, Clone)]
pub struct GeneratedOverlayPaths {
    pub wiring_path: PathBuf,
    pub contracts_path: Option<PathBuf>,
}

/// Runs the scanner, project analyzer, layer/cycle analyzer, validation
/// graph builder, and plan builder once over `root`, writing
/// `.kthulu/plan.json`. The layer/cycle check runs *before* plan emission:
/// a layer violation (or import cycle) aborts the run and no plan file is
/// written.
pub fn run_once(root: &Path, config: &PipelineConfig) -> Result<PipelineReport, KthuluError> {
    crate::layers::analyze(root, config)?;

    let scan_result = crate::scan::scan(root, config)?;
    let analysis = crate::analysis::analyze(root, config)?;
    let validation_graph = crate::validation_graph::build(root, config)?;

    let plan = crate::plan::build(&scan_result.annotations);
    let plan_path = crate::plan::write(root, &plan)?;

    let mut warnings = scan_result.warnings;
    warnings.extend(analysis.warnings);

    Ok(PipelineReport {
        plan,
        plan_path,
        warnings,
        validation_graph,
        overlay: None,
    })
}

/// Runs [`run_once`], then additionally projects the scan-level plan into an
/// [`OverlayPlan`] (via the best-effort bridge documented on
/// [`OverlayPlan::from_plan_nodes`]) and generates the overlay artefacts
/// into `out_dir`.
pub fn run_once_with_overlay(
    root: &Path,
    config: &PipelineConfig,
    out_dir: &Path,
) -> Result<PipelineReport, KthuluError> {
    let mut report = run_once(root, config)?;
    let overlay_plan = OverlayPlan::from_plan_nodes(&report.plan);
    let formatter: &dyn Formatter = &NullFormatter;
    let generated = crate::overlay::generate(&overlay_plan, out_dir, formatter)?;
    report.overlay = Some(GeneratedOverlayPaths {
        wiring_path: generated.wiring_path,
        contracts_path: generated.contracts_path,
    });
    Ok(report)
}

/// Runs the pipeline once, then watches `overrides/`/`extends/` (per
/// `config.watch_roots`) and re-runs on every coalesced change. Errors from
/// a re-run are passed to `on_error` rather than terminating the loop; only
/// a fatal watcher failure (kernel queue closed, etc.) returns `Err`.
/// Honors `NO_WATCHER` by falling back to a single run.
pub fn run_watch(
    root: &Path,
    config: &PipelineConfig,
    out_dir: &Path,
    mut on_run: impl FnMut(&PipelineReport),
    mut on_error: impl FnMut(&KthuluError),
) -> Result<(), KthuluError> {
    let initial = run_once_with_overlay(root, config, out_dir);
    match &initial {
        Ok(report) => on_run(report),
        Err(e) => on_error(e),
    }

    if watcher::watcher_disabled() {
        initial.map(|_| ())
    } else {
        let roots = watcher::resolve_roots(root, &config.watch_roots);
        let debounce = Duration::from_millis(config.watch_debounce_ms);
        watcher::watch(
            &roots,
            debounce,
            |_change| match run_once_with_overlay(root, config, out_dir) {
                Ok(report) => on_run(&report),
                Err(e) => on_error(&e),
            },
            || false,
        )
    }
}
