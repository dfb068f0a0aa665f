//! Export a tablebase to SQLite.
//!
//! Usage: export_sqlite [--input data/TableBase_MiniMax-1.json] [--output data/tablebase.db]
//!
//! Accepts the JSON or the binary framing (by extension) and verifies a sample
//! of rows after writing.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tictactoe_solver::cli::init_tracing;
use tictactoe_solver::sqlite::{self, SqliteTablebase};
use tictactoe_solver::stats::format_elapsed;
use tictactoe_solver::Tablebase;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "export_sqlite", about = "Copy a tablebase into a SQLite database")]
struct Cli {
    /// Tablebase file (.json or .bin)
    #[arg(long, default_value = "data/TableBase_MiniMax-1.json")]
    input: PathBuf,

    /// Database to create; an existing file is replaced
    #[arg(long, default_value = "data/tablebase.db")]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let start = Instant::now();
    let tablebase =
        Tablebase::load(&cli.input).with_context(|| format!("loading {}", cli.input.display()))?;
    info!(entries = tablebase.len(), elapsed = %format_elapsed(start.elapsed()), "loaded tablebase");

    let inserted = sqlite::export(&tablebase, &cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    let db = SqliteTablebase::open(&cli.output)?;
    if db.len()? != inserted {
        bail!("database has {} rows, expected {inserted}", db.len()?);
    }
    let step = (tablebase.len() / 5).max(1);
    for (n, expected) in tablebase.iter().step_by(step) {
        let stored = db.lookup(n)?;
        if stored != expected {
            bail!("row {n} reads back as {stored:?}, expected {expected:?}");
        }
    }

    let input_size = std::fs::metadata(&cli.input).map(|m| m.len()).unwrap_or(0);
    let output_size = std::fs::metadata(&cli.output).map(|m| m.len()).unwrap_or(0);
    println!("Rows:   {inserted}");
    println!("Input:  {} ({:.1} KB)", cli.input.display(), input_size as f64 / 1024.0);
    println!("Output: {} ({:.1} KB)", cli.output.display(), output_size as f64 / 1024.0);
    Ok(())
}
