//! Build statistics and full game-tree counts.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tictactoe_core::{Outcome, Player, Position};
use tracing::info;

/// Format a duration as `HH:MM:SS`, or seconds with two decimals when short.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Statistics collected while building a tablebase.
#[derive(Debug, Default)]
pub struct BuildStats {
    /// Unfinished nodes reached by the tree walk, counted once per move order
    pub nodes_visited: u64,

    /// Nodes whose pattern is not its orbit representative
    pub non_canonical: u64,

    /// Canonical nodes reached again along another move order
    pub duplicates_skipped: u64,

    /// Recorded entries by value for the side to move
    pub wins: u64,
    pub draws: u64,
    pub losses: u64,

    start_time: Option<Instant>,
    elapsed: Option<Duration>,
}

impl BuildStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_entry(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Loss => self.losses += 1,
        }
    }

    pub fn entries_recorded(&self) -> u64 {
        self.wins + self.draws + self.losses
    }

    /// Stop the clock.
    pub fn finish(&mut self) {
        self.elapsed = self.start_time.map(|start| start.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
            .or_else(|| self.start_time.map(|start| start.elapsed()))
            .unwrap_or_default()
    }

    pub fn log_summary(&self) {
        info!(
            nodes = self.nodes_visited,
            entries = self.entries_recorded(),
            non_canonical = self.non_canonical,
            duplicates = self.duplicates_skipped,
            elapsed = %format_elapsed(self.elapsed()),
            "tablebase build finished"
        );
        info!(
            wins = self.wins,
            draws = self.draws,
            losses = self.losses,
            "entry outcomes for the side to move"
        );
    }
}

/// Every path through the game tree, transpositions counted separately.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TreeCount {
    /// Nodes including the root and every finished game
    pub nodes: u64,
    pub x_wins: u64,
    pub o_wins: u64,
    pub draws: u64,
    /// Distinct patterns reached
    pub distinct_positions: usize,
    /// Finished games by number of moves played
    pub games_by_length: [u64; 10],
}

impl TreeCount {
    pub fn terminal(&self) -> u64 {
        self.x_wins + self.o_wins + self.draws
    }

    pub fn log_summary(&self, elapsed: Duration) {
        info!(
            nodes = self.nodes,
            games = self.terminal(),
            distinct = self.distinct_positions,
            elapsed = %format_elapsed(elapsed),
            "game tree counted"
        );
        info!(x_wins = self.x_wins, o_wins = self.o_wins, draws = self.draws, "finished games");
    }
}

/// Enumerate the whole game tree from the empty board.
pub fn count_tree() -> TreeCount {
    count_subtree(&mut Position::new())
}

/// Enumerate every continuation of `position`. The position is left as found.
fn count_subtree(position: &mut Position) -> TreeCount {
    fn walk(position: &mut Position, count: &mut TreeCount, seen: &mut HashSet<u16>) {
        count.nodes += 1;
        seen.insert(position.encode());

        let finished = match position.check_winner() {
            Some(Player::X) => {
                count.x_wins += 1;
                true
            }
            Some(Player::O) => {
                count.o_wins += 1;
                true
            }
            None if position.legal_moves().is_empty() => {
                count.draws += 1;
                true
            }
            None => false,
        };
        if finished {
            count.games_by_length[position.history().len()] += 1;
            return;
        }

        for cell in position.legal_moves() {
            if let Ok(mut child) = position.scoped_move(cell) {
                walk(&mut child, count, seen);
            }
        }
    }

    let mut count = TreeCount::default();
    let mut seen = HashSet::new();
    walk(position, &mut count, &mut seen);
    count.distinct_positions = seen.len();
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_tree() {
        let count = count_tree();
        assert_eq!(count.nodes, 549_946);
        assert_eq!(count.terminal(), 255_168);
        assert_eq!(count.x_wins, 131_184);
        assert_eq!(count.o_wins, 77_904);
        assert_eq!(count.draws, 46_080);
        assert_eq!(count.distinct_positions, 5478);
        // Fastest win: X's third mark on move 5. Every draw fills the board.
        assert_eq!(count.games_by_length[4], 0);
        assert_eq!(count.games_by_length[5], 1440);
        assert_eq!(count.games_by_length.iter().sum::<u64>(), count.terminal());
    }

    #[test]
    fn test_subtree_count_restores_position() {
        // X: 0, 1   O: 3, 4   X to move; only cell 2 ends the game at once.
        let mut position = Position::from_moves(&[0, 3, 1, 4]).unwrap();
        let before = position;
        let count = count_subtree(&mut position);
        assert_eq!(position, before);
        assert_eq!(count.games_by_length[5], 1);
        assert_eq!(count.games_by_length.iter().sum::<u64>(), count.terminal());
        assert!(count.o_wins > 0);
    }

    #[test]
    fn test_build_stats_records() {
        let mut stats = BuildStats::new();
        stats.record_entry(Outcome::Win);
        stats.record_entry(Outcome::Draw);
        stats.record_entry(Outcome::Draw);
        stats.finish();
        assert_eq!(stats.entries_recorded(), 3);
        assert_eq!(stats.draws, 2);
        assert!(stats.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "01:02:05");
    }
}
