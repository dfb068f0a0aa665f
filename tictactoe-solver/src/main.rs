//! Tic-tac-toe tablebase builder.
//!
//! Builds (or loads) the symmetry table, walks the game tree once, and writes
//! the tablebase registered under `--name`.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::Parser;
use tictactoe_core::Position;
use tictactoe_solver::cli::{init_tracing, CommonArgs};
use tictactoe_solver::stats::format_elapsed;
use tictactoe_solver::{Context, Tablebase, DEFAULT_TABLEBASE};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "solver", about = "Build the tic-tac-toe tablebase", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Registered tablebase to write
    #[arg(long, default_value = DEFAULT_TABLEBASE)]
    name: String,

    /// Also write the binary framing next to the JSON file
    #[arg(long)]
    binary: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.common.config();
    let output = config
        .tablebase_path(&cli.name)
        .with_context(|| format!("no tablebase registered as '{}'", cli.name))?;
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    let context = Context::initialize(config).context("initializing tables")?;

    let mut root = Position::new();
    let start = Instant::now();
    let evaluation = context.evaluator().evaluate(&mut root)?;
    info!(
        outcome = %evaluation.outcome,
        nodes = evaluation.nodes,
        algorithm = ?context.evaluator().algorithm(),
        elapsed = %format_elapsed(start.elapsed()),
        "empty board solved"
    );
    let evals = context.evaluator().evals_for_next_moves(&mut root)?;
    println!("{}", evals.render(&root));

    let (tablebase, stats) = Tablebase::build(context.symmetry_table())?;
    stats.log_summary();

    tablebase
        .save(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    if let Some(path) = &cli.binary {
        tablebase
            .save_binary(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    info!(name = %cli.name, path = %output.display(), entries = tablebase.len(), "tablebase written");
    context.teardown();
    Ok(())
}
