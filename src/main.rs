use clap::Parser;
use kthulu::cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    ExitCode::from(kthulu::cli::run(cli) as u8)
}
