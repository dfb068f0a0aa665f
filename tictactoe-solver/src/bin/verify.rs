//! Re-check the persisted tables against direct search.
//!
//! Exits non-zero when any check fails.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tictactoe_solver::cli::{init_tracing, CommonArgs};
use tictactoe_solver::stats::format_elapsed;
use tictactoe_solver::verify::{self, Report};
use tictactoe_solver::Context;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "verify", about = "Check the symmetry table and tablebases against search")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn print_report(report: &Report) {
    let status = if report.passed() { "ok" } else { "FAILED" };
    println!(
        "{:<24} {:>6} checked  {:>4} failed  {status}",
        report.name, report.checked, report.failures
    );
    for detail in &report.details {
        println!("    {detail}");
    }
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let start = Instant::now();
    let context = Context::initialize(cli.common.config())?;
    let positions = verify::reachable_positions();

    let mut reports = vec![
        verify::check_symmetry_table(context.symmetry_table()),
        verify::check_search_agreement(&positions),
    ];
    if context.evaluator().is_native() {
        reports.push(verify::check_evaluator(context.evaluator(), &positions)?);
    }

    let names: Vec<String> = context.tablebase_names().map(str::to_string).collect();
    if names.is_empty() {
        warn!("no tablebase loaded; run the solver first");
    }
    for name in &names {
        info!(name = %name, "checking tablebase");
        reports.push(verify::check_tablebase(
            context.symmetry_table(),
            context.tablebase(name)?,
            context.evaluator(),
            &positions,
        ));
    }

    for report in &reports {
        print_report(report);
    }
    info!(elapsed = %format_elapsed(start.elapsed()), "verification finished");

    if reports.iter().all(Report::passed) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
