//! `rf-check`: Validates a Radiance model folder.
//!
//! Runs the check suite across:
//! - aperture group and dynamic scene state catalogs
//! - modifier and black modifier matching
//! - grid inventory counts
//! - redistribution records, when `--redistributed` is given
//!
//! **Usage:**
//! ```
//! rf-check [--project <path>] [--model <name>] [--redistributed <path>] [--quiet]
//! ```
//!
//! Exits with status 1 if any check fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use radiance_folder_check::{run_all, CheckReport, CheckResult, FolderPaths, Severity};
use tracing_subscriber::EnvFilter;

/// Check a model folder.
#[derive(Parser)]
#[command(name = "rf-check", version, about = "Validate a Radiance model folder")]
struct Args {
    /// Project folder holding the model folder.
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Model folder name inside the project folder.
    #[arg(long, default_value = "model")]
    model: String,

    /// Redistributed grid folder to check as well.
    #[arg(long)]
    redistributed: Option<PathBuf>,

    /// Only print warnings and failures.
    #[arg(short, long)]
    quiet: bool,
}

fn print_result(result: &CheckResult) {
    println!("[{}] {}: {}", result.severity, result.validator, result.message);
    for detail in &result.details {
        println!("    - {detail}");
    }
}

fn print_report(report: &CheckReport, quiet: bool) {
    for result in &report.results {
        if !(quiet && result.severity == Severity::Pass) {
            print_result(result);
        }
    }
    println!(
        "{} passed, {} warnings, {} failed",
        report.pass_count(),
        report.warning_count(),
        report.failure_count()
    );
}

fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let report = run_all(&FolderPaths {
        project: args.project,
        model: args.model,
        redistributed: args.redistributed,
    })?;
    print_report(&report, args.quiet);

    if report.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
