//! Count the full game tree.
//!
//! Every path is counted separately (no transposition merging). Games end on
//! a completed line or a full board.

use std::time::Instant;

use clap::Parser;
use tictactoe_solver::cli::init_tracing;
use tictactoe_solver::count_tree;

#[derive(Parser, Debug)]
#[command(name = "count_tree", about = "Count every game path from the empty board")]
struct Cli {
    /// Print the number of finished games by length
    #[arg(long)]
    by_length: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let start = Instant::now();
    let count = count_tree();
    count.log_summary(start.elapsed());

    println!("Total nodes:        {}", count.nodes);
    println!("Finished games:     {}", count.terminal());
    println!("  - X wins:         {}", count.x_wins);
    println!("  - O wins:         {}", count.o_wins);
    println!("  - Draws:          {}", count.draws);
    println!("Distinct positions: {}", count.distinct_positions);

    if cli.by_length {
        println!();
        for (moves, games) in count.games_by_length.iter().enumerate().filter(|&(_, &g)| g > 0) {
            println!("  {moves} moves: {games}");
        }
    }
}
