//! Filesystem watcher.
//!
//! Observes the configured `overrides/` and `extends/` subtrees for
//! filesystem changes, debounces bursts of events into a single coalesced
//! trigger, and hands control back to the caller to re-run the pipeline.
//! Kept purely synchronous — no `tokio` is introduced here, only `notify`'s
//! blocking API plus `crossbeam-channel` for the debounce queue.

use crate::error::KthuluError;
use crossbeam_channel::{RecvTimeoutError, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `NO_WATCHER=1` forces a single pipeline run instead of entering the
/// watch loop.
pub fn watcher_disabled() -> bool {
    std::env::var("NO_WATCHER").map(|v| v != "0" && !v.is_empty()).unwrap_or(false)
}

/// A single coalesced trigger: "something changed under one of the watched
/// roots, re-run the pipeline." Carries the distinct set of changed paths
/// only for diagnostics — the pipeline always re-scans from scratch.
#[derive(Debug, Clone, Default)]
pub struct CoalescedChange {
    pub paths: Vec<PathBuf>,
}

/// Watches `roots` (paths relative to nothing — callers pass absolute
/// paths) recursively, coalescing `Create | Write | Remove | Rename` events
/// within `debounce` into one [`CoalescedChange`] per `on_change` call.
/// Newly created subdirectories under an existing watch root are picked up
/// automatically by `notify`'s recursive mode.
///
/// Runs until `should_stop` returns `true` or a fatal watcher error occurs,
/// in which case it returns [`KthuluError::WatcherFailed`]: watcher errors
/// from the kernel queue terminate the watch loop, while errors from an
/// individual `on_change` invocation (the re-run pipeline) are expected to
/// be handled by the caller and never propagate here.
pub fn watch(
    roots: &[PathBuf],
    debounce: Duration,
    mut on_change: impl FnMut(CoalescedChange),
    mut should_stop: impl FnMut() -> bool,
) -> Result<(), KthuluError> {
    let (tx, rx) = crossbeam_channel::unbounded::<PathBuf>();

    let mut watcher = make_watcher(tx)?;
    for root in roots {
        if !root.is_dir() {
            continue;
        }
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| KthuluError::WatcherFailed(format!("failed to watch {}: {e}", root.display())))?;
    }

    loop {
        if should_stop() {
            return Ok(());
        }

        let first = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(path) => path,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(KthuluError::WatcherFailed(
                    "watcher event channel closed unexpectedly".to_string(),
                ))
            }
        };

        let mut paths = vec![first];
        loop {
            match rx.recv_timeout(debounce) {
                Ok(path) => paths.push(path),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        paths.sort();
        paths.dedup();
        on_change(CoalescedChange { paths });
    }
}

fn make_watcher(tx: Sender<PathBuf>) -> Result<RecommendedWatcher, KthuluError> {
    notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        }
        Err(_) => {
            // Surfaced to the caller only via channel disconnection; a
            // per-event notify error is not itself fatal.
        }
    })
    .map_err(|e| KthuluError::WatcherFailed(e.to_string()))
}

/// Resolves the watcher's configured roots (`overrides/`, `extends/` by
/// default) to absolute paths under `project_root`, skipping any that don't
/// exist yet — `notify` picks up roots created later only if they already
/// existed when `watch` started, so the caller is expected to re-enter
/// `watch` after a full pipeline re-run if a previously-missing root
/// appears.
pub fn resolve_roots(project_root: &Path, configured: &[String]) -> Vec<PathBuf> {
    configured.iter().map(|r| project_root.join(r)).collect()
}
