//! kthulu: a scaffolding and extension compiler for annotation-driven
//! backend frameworks.
//!
//! Given a source tree sprinkled with `@kthulu:<kind>[:<value>]` comment
//! annotations, this crate:
//!
//! 1. **Scans** (`scan`) the tree for annotations.
//! 2. **Analyzes** (`analysis`) them into a project model of modules and
//!    inter-module dependencies, and **resolves** (`resolver`) a requested
//!    module set into an install-ordered closure.
//! 3. **Checks layering** (`layers`) — every import edge must respect the
//!    declared architectural strata, and the import graph must be acyclic.
//! 4. **Builds a plan** (`plan`) — a deterministic DAG of `Replace`/
//!    `Decorate` actions, persisted as `.kthulu/plan.json`.
//! 5. **Generates an overlay** (`overlay`) — a wiring module and a sibling
//!    contract-check file that statically verifies every replacement
//!    implements its declared interface.
//!
//! A **validation graph** (`validation_graph`) feeds dashboards and
//! contract checks, and a **watcher** (`watcher`) re-runs the pipeline when
//! `overrides/`/`extends/` change on disk. [`pipeline`] is the seam gluing
//! all of the above together; [`cli`] is a thin `clap` shell over it.
//!
//! # Example
//!
//! ```no_run
//! use kthulu::config::PipelineConfig;
//! use kthulu::pipeline;
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let report = pipeline::run_once(Path::new("."), &config)?;
//! println!("wrote {}", report.plan_path.display());
//! # Ok::<(), kthulu::error::KthuluError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs_capability;
pub mod imports;
pub mod layers;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod plan;
pub mod resolver;
pub mod scan;
pub mod validation_graph;
pub mod watcher;
