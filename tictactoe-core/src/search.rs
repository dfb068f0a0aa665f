//! Exhaustive and pruned minimax over [`Position`].
//!
//! Every outcome is from the perspective of the side to move. Searches mutate
//! the position in place and take every move back through [`MoveGuard`]s, so
//! the caller's position is unchanged when a search returns.
//!
//! [`MoveGuard`]: crate::MoveGuard

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::native::{NativeLibrary, NativeMode};
use crate::{MoveSet, Position, Result, CELLS};

/// Game-theoretic value of a position for the side to move.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
#[repr(i8)]
pub enum Outcome {
    Loss = -1,
    Draw = 0,
    Win = 1,
}

impl Outcome {
    /// The same result seen from the other side.
    #[inline]
    pub fn flip(self) -> Outcome {
        match self {
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
            Outcome::Win => Outcome::Loss,
        }
    }

    #[inline]
    pub fn from_i8(value: i8) -> Option<Outcome> {
        match value {
            -1 => Some(Outcome::Loss),
            0 => Some(Outcome::Draw),
            1 => Some(Outcome::Win),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    /// One-letter tag: W, D or L.
    pub fn symbol(self) -> char {
        match self {
            Outcome::Loss => 'L',
            Outcome::Draw => 'D',
            Outcome::Win => 'W',
        }
    }
}

impl From<Outcome> for i8 {
    fn from(outcome: Outcome) -> i8 {
        outcome.as_i8()
    }
}

impl TryFrom<i8> for Outcome {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, String> {
        Outcome::from_i8(value).ok_or_else(|| format!("outcome must be -1, 0 or 1, got {value}"))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Loss => f.write_str("loss"),
            Outcome::Draw => f.write_str("draw"),
            Outcome::Win => f.write_str("win"),
        }
    }
}

/// Which minimax variant to run. Both return identical outcomes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Algorithm {
    /// Evaluate every continuation.
    Exhaustive,
    /// Stop at a forced win, or at a draw the opponent already holds elsewhere.
    #[default]
    Pruned,
}

/// Search result with the number of nodes visited.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Evaluation {
    pub outcome: Outcome,
    pub nodes: u64,
}

/// Value of the position for the side to move, searching every continuation.
pub fn minimax(position: &mut Position) -> Outcome {
    evaluate(position, Algorithm::Exhaustive).outcome
}

/// Same value as [`minimax`], with cutoffs.
pub fn minimax_pruned(position: &mut Position) -> Outcome {
    evaluate(position, Algorithm::Pruned).outcome
}

/// Run a search and count the nodes it touched.
pub fn evaluate(position: &mut Position, algorithm: Algorithm) -> Evaluation {
    let mut nodes = 0;
    let outcome = match algorithm {
        Algorithm::Exhaustive => exhaustive(position, &mut nodes),
        Algorithm::Pruned => pruned(position, false, false, &mut nodes),
    };
    Evaluation { outcome, nodes }
}

/// A completed line always belongs to the player who just moved in legal
/// play; the side to move has lost.
#[inline]
fn finished(position: &Position) -> Option<Outcome> {
    position.check_winner().map(|winner| {
        if winner == position.next_player() {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    })
}

fn exhaustive(position: &mut Position, nodes: &mut u64) -> Outcome {
    *nodes += 1;
    if let Some(outcome) = finished(position) {
        return outcome;
    }

    let mut best: Option<Outcome> = None;
    for cell in position.legal_moves() {
        let mut child = position.play_scoped(cell);
        let outcome = exhaustive(&mut child, nodes).flip();
        best = Some(best.map_or(outcome, |b| b.max(outcome)));
    }
    // Full board without a line.
    best.unwrap_or(Outcome::Draw)
}

/// `mine_drawn`: an ancestor where this side moves already has a draw in hand.
/// `theirs_drawn`: same for the opponent.
fn pruned(position: &mut Position, mine_drawn: bool, theirs_drawn: bool, nodes: &mut u64) -> Outcome {
    *nodes += 1;
    if let Some(outcome) = finished(position) {
        return outcome;
    }

    let moves = position.legal_moves();
    if moves.is_empty() {
        return Outcome::Draw;
    }

    let mut mine_drawn = mine_drawn;
    for cell in moves {
        let outcome = {
            let mut child = position.play_scoped(cell);
            pruned(&mut child, theirs_drawn, mine_drawn, nodes).flip()
        };
        match outcome {
            Outcome::Win => return Outcome::Win,
            Outcome::Draw => {
                // The opponent will never let play reach anything better than this.
                if theirs_drawn {
                    return Outcome::Draw;
                }
                mine_drawn = true;
            }
            Outcome::Loss => {}
        }
    }

    if mine_drawn {
        Outcome::Draw
    } else {
        Outcome::Loss
    }
}

/// Outcome of each cell for the side to move; `None` marks an occupied cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MoveEvals(pub [Option<Outcome>; CELLS]);

impl MoveEvals {
    #[inline]
    pub fn get(&self, cell: usize) -> Option<Outcome> {
        self.0[cell]
    }

    /// Best outcome over all playable cells.
    pub fn best(&self) -> Option<Outcome> {
        self.0.iter().flatten().copied().max()
    }

    /// Cells whose outcome is exactly `outcome`.
    pub fn moves_with(&self, outcome: Outcome) -> MoveSet {
        (0..CELLS).filter(|&cell| self.0[cell] == Some(outcome)).collect()
    }

    /// Best outcome and every cell achieving it.
    pub fn best_moves(&self) -> Option<(Outcome, MoveSet)> {
        self.best().map(|best| (best, self.moves_with(best)))
    }

    /// Board grid with marks on occupied cells and W/D/L on the rest.
    pub fn render(&self, position: &Position) -> String {
        let mut out = format!("{} to move:\n", position.next_player());
        for row in 0..3 {
            for col in 0..3 {
                let cell = row * 3 + col;
                out.push(' ');
                match (position.cell(cell), self.0[cell]) {
                    (Some(player), _) => out.push_str(&player.to_string()),
                    (None, Some(outcome)) => out.push(outcome.symbol()),
                    (None, None) => out.push('.'),
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Outcome of every legal move, each searched with `algorithm`.
///
/// A finished game has no moves to evaluate.
pub fn evals_for_next_moves(position: &mut Position, algorithm: Algorithm) -> MoveEvals {
    let mut evals = MoveEvals::default();
    if position.check_winner().is_some() {
        return evals;
    }
    for cell in position.legal_moves() {
        let mut child = position.play_scoped(cell);
        evals.0[cell] = Some(evaluate(&mut child, algorithm).outcome.flip());
    }
    evals
}

/// Evaluate every continuation of `position`, calling `visit` on each
/// unfinished node once its move evaluations are known. Children are visited
/// before their parent and `position` itself is visited last.
///
/// Nodes reachable along several move orders are visited once per order.
pub fn walk_continuations<F>(position: &mut Position, visit: &mut F) -> MoveEvals
where
    F: FnMut(&Position, &MoveEvals),
{
    let mut evals = MoveEvals::default();
    if position.check_winner().is_some() {
        return evals;
    }

    let moves = position.legal_moves();
    for cell in moves {
        let mut child = position.play_scoped(cell);
        let outcome = if child.check_winner().is_some() {
            Outcome::Win
        } else if child.legal_moves().is_empty() {
            Outcome::Draw
        } else {
            let replies = walk_continuations(&mut child, visit);
            replies.best().map_or(Outcome::Draw, Outcome::flip)
        };
        evals.0[cell] = Some(outcome);
    }

    if !moves.is_empty() {
        visit(&*position, &evals);
    }
    evals
}

/// Search front end that prefers a loaded native routine and otherwise runs
/// the search in this module.
#[derive(Debug, Default)]
pub struct Evaluator {
    algorithm: Algorithm,
    native: Option<NativeLibrary>,
    strict: bool,
}

impl Evaluator {
    /// Evaluator that never leaves Rust.
    pub fn pure(algorithm: Algorithm) -> Evaluator {
        Evaluator {
            algorithm,
            native: None,
            strict: false,
        }
    }

    /// Resolve the backend for `mode`.
    ///
    /// A missing or incompatible library falls back to the pure search unless
    /// `mode` is [`NativeMode::Required`], in which case the load error is returned.
    pub fn with_native(algorithm: Algorithm, library: Option<&Path>, mode: NativeMode) -> Result<Evaluator> {
        let library = match (mode, library) {
            (NativeMode::Disabled, _) => return Ok(Evaluator::pure(algorithm)),
            (_, Some(path)) => NativeLibrary::load(path),
            (_, None) => Err(crate::Error::NativeUnavailable(
                "no native library path configured".to_string(),
            )),
        };

        match library {
            Ok(native) => {
                debug!(path = %native.path().display(), "using native minimax");
                Ok(Evaluator {
                    algorithm,
                    native: Some(native),
                    strict: mode == NativeMode::Required,
                })
            }
            Err(err) if mode == NativeMode::Required => Err(err),
            Err(err) => {
                warn!(error = %err, "native minimax unavailable, using pure search");
                Ok(Evaluator::pure(algorithm))
            }
        }
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        self.native.is_some()
    }

    /// Evaluate `position` for the side to move.
    pub fn evaluate(&self, position: &mut Position) -> Result<Evaluation> {
        if let Some(native) = &self.native {
            match native.evaluate(position, self.algorithm) {
                Ok(evaluation) => return Ok(evaluation),
                Err(err) if self.strict => return Err(err),
                Err(err) => warn!(error = %err, "native minimax failed, using pure search"),
            }
        }
        Ok(evaluate(position, self.algorithm))
    }

    /// Outcome of every legal move for the side to move.
    pub fn evals_for_next_moves(&self, position: &mut Position) -> Result<MoveEvals> {
        let mut evals = MoveEvals::default();
        if position.check_winner().is_some() {
            return Ok(evals);
        }
        for cell in position.legal_moves() {
            let mut child = position.play_scoped(cell);
            evals.0[cell] = Some(self.evaluate(&mut child)?.outcome.flip());
        }
        Ok(evals)
    }
}
