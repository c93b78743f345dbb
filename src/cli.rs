//! CLI struct definitions and thin dispatch for the `kthulu` command-line
//! interface. Arg parsing and exit-code mapping live here; all pipeline
//! logic lives in [`crate::pipeline`] — this module never builds a `Plan`
//! or writes a file directly.

use crate::config::PipelineConfig;
use crate::error::KthuluError;
use crate::pipeline;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "kthulu",
    version = env!("CARGO_PKG_VERSION"),
    about = "Scans @kthulu annotations, resolves module layering, and emits a deterministic overlay + contract checks."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan, analyze, and write `.kthulu/plan.json`, optionally exporting
    /// the validation graph.
    Plan(PlanCli),
    /// Run the full pipeline and emit the overlay wiring + contract files.
    Compile(CompileCli),
    /// Expose the pipeline over an MCP transport (owned by an external
    /// collaborator; this crate only parses the flag surface).
    Mcp(McpCli),
}

#[derive(clap::Args, Debug)]
pub struct PlanCli {
    /// Project root to scan (defaults to the current directory).
    #[clap(default_value = ".")]
    pub dir: PathBuf,
    /// Also print the validation graph in `--format`.
    #[clap(long)]
    pub graph: bool,
    /// Validation graph serialization format.
    #[clap(long, value_enum, default_value_t = GraphFormat::Json)]
    pub format: GraphFormat,
    /// Run the layer/cycle analyzer before writing the plan and fail loudly
    /// on any violation (this is always enforced; the flag only controls
    /// whether the report is also printed).
    #[clap(long)]
    pub validate: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum GraphFormat {
    Dot,
    Json,
    Yaml,
}

#[derive(clap::Args, Debug)]
pub struct CompileCli {
    /// Project root to compile (defaults to the current directory).
    #[clap(default_value = ".")]
    pub dir: PathBuf,
    /// Output directory for the generated overlay sources.
    #[clap(long, default_value = "dist")]
    pub out: PathBuf,
    /// Keep running, re-compiling whenever `overrides/`/`extends/` change.
    #[clap(long)]
    pub watch: bool,
}

#[derive(clap::Args, Debug)]
pub struct McpCli {
    #[clap(long, default_value = ".")]
    pub working_dir: PathBuf,
    #[clap(long, value_enum, default_value_t = McpTransport::Stdio)]
    pub transport: McpTransport,
    #[clap(long)]
    pub listen: Option<String>,
    #[clap(long, default_value = "/mcp")]
    pub http_path: String,
    #[clap(long, value_delimiter = ',')]
    pub allow: Vec<String>,
    #[clap(long, value_delimiter = ',')]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum McpTransport {
    Stdio,
    Http,
}

/// Runs `cli.command`, returning the process exit code: `0` success, `1`
/// analysis/validation failure, `2` usage error. Clap itself already
/// handles `2` for malformed arguments before `run` is reached.
pub fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Compile(args) => run_compile(args),
        Command::Mcp(args) => run_mcp(args),
    }
}

fn run_plan(args: PlanCli) -> i32 {
    let config = match PipelineConfig::load(&args.dir) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    match pipeline::run_once(&args.dir, &config) {
        Ok(report) => {
            println!("wrote {}", report.plan_path.display());
            print_warnings(&report.warnings);
            if args.graph {
                let rendered = match args.format {
                    GraphFormat::Dot => report.validation_graph.to_dot(),
                    GraphFormat::Json => match report.validation_graph.to_json() {
                        Ok(s) => s,
                        Err(e) => return fail(&e),
                    },
                    GraphFormat::Yaml => match report.validation_graph.to_yaml() {
                        Ok(s) => s,
                        Err(e) => return fail(&e),
                    },
                };
                println!("{rendered}");
            }
            0
        }
        Err(e) => fail(&e),
    }
}

fn run_compile(args: CompileCli) -> i32 {
    let config = match PipelineConfig::load(&args.dir) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    if args.watch {
        let result = pipeline::run_watch(
            &args.dir,
            &config,
            &args.out,
            |report| {
                println!("recompiled, wrote {}", report.plan_path.display());
                print_warnings(&report.warnings);
            },
            |e| eprintln!("{e}"),
        );
        match result {
            Ok(()) => 0,
            Err(e) => fail(&e),
        }
    } else {
        match pipeline::run_once_with_overlay(&args.dir, &config, &args.out) {
            Ok(report) => {
                println!("wrote {}", report.plan_path.display());
                if let Some(overlay) = &report.overlay {
                    println!("wrote {}", overlay.wiring_path.display());
                    if let Some(contracts) = &overlay.contracts_path {
                        println!("wrote {}", contracts.display());
                    }
                }
                print_warnings(&report.warnings);
                0
            }
            Err(e) => fail(&e),
        }
    }
}

fn run_mcp(_args: McpCli) -> i32 {
    fail(&KthuluError::NotImplemented(
        "mcp transport is owned by an external collaborator; this binary only parses its flags".to_string(),
    ))
}

fn fail(err: &KthuluError) -> i32 {
    use colored::Colorize;
    eprintln!("{} {err}", "error:".red().bold());
    1
}

fn print_warnings(warnings: &[crate::error::Warning]) {
    use colored::Colorize;
    for w in warnings {
        let location = match w.line {
            Some(line) => format!("{}:{line}", w.file.display()),
            None => w.file.display().to_string(),
        };
        eprintln!("{} {location}: {}", "warning:".yellow().bold(), w.message);
    }
}
