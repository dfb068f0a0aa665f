//! Move selection on top of search or tablebase lookups.

use rand::seq::IndexedRandom;
use rand::RngCore;
use tictactoe_core::{Error, Evaluator, MoveSet, Outcome, Position};

use crate::error::Result;
use crate::symtable::SymmetryTable;
use crate::tablebase::Tablebase;

/// How to choose among equally good moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Lowest cell index.
    Leftmost,
    /// Highest cell index.
    Rightmost,
    /// Uniformly at random.
    #[default]
    Random,
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "leftmost" => Ok(TieBreak::Leftmost),
            "rightmost" => Ok(TieBreak::Rightmost),
            "random" => Ok(TieBreak::Random),
            other => Err(format!("unknown tie-break '{other}'")),
        }
    }
}

pub trait Engine {
    /// Best value for the side to move and every move achieving it.
    ///
    /// Fails with [`Error::NoLegalMoves`] when the game is over.
    fn best_moves(&self, position: &Position) -> Result<(Outcome, MoveSet)>;

    /// One best move, ties resolved by `tie`.
    fn best_move(&self, position: &Position, tie: TieBreak, rng: &mut dyn RngCore) -> Result<usize> {
        let (_, moves) = self.best_moves(position)?;
        let chosen = match tie {
            TieBreak::Leftmost => moves.first(),
            TieBreak::Rightmost => moves.last(),
            TieBreak::Random => moves.to_vec().choose(rng).copied(),
        };
        Ok(chosen.ok_or(Error::NoLegalMoves)?)
    }
}

/// Uniformly random legal move.
pub fn random_move(position: &Position, rng: &mut dyn RngCore) -> Result<usize> {
    if position.is_terminal() {
        return Err(Error::NoLegalMoves.into());
    }
    let moves = position.legal_moves().to_vec();
    Ok(*moves.choose(rng).ok_or(Error::NoLegalMoves)?)
}

/// Searches every candidate move on demand.
#[derive(Debug)]
pub struct MinimaxEngine<'a> {
    evaluator: &'a Evaluator,
}

impl<'a> MinimaxEngine<'a> {
    pub fn new(evaluator: &'a Evaluator) -> Self {
        MinimaxEngine { evaluator }
    }
}

impl Engine for MinimaxEngine<'_> {
    fn best_moves(&self, position: &Position) -> Result<(Outcome, MoveSet)> {
        let mut scratch = *position;
        let evals = self.evaluator.evals_for_next_moves(&mut scratch)?;
        Ok(evals.best_moves().ok_or(Error::NoLegalMoves)?)
    }
}

/// Answers from a precomputed tablebase.
#[derive(Debug)]
pub struct TablebaseEngine<'a> {
    symmetry: &'a SymmetryTable,
    tablebase: &'a Tablebase,
}

impl<'a> TablebaseEngine<'a> {
    pub fn new(symmetry: &'a SymmetryTable, tablebase: &'a Tablebase) -> Self {
        TablebaseEngine {
            symmetry,
            tablebase,
        }
    }
}

impl Engine for TablebaseEngine<'_> {
    fn best_moves(&self, position: &Position) -> Result<(Outcome, MoveSet)> {
        if position.is_terminal() {
            return Err(Error::NoLegalMoves.into());
        }
        let sym = self.symmetry.lookup(position.encode())?;
        let entry = self.tablebase.lookup(sym.representative)?;
        // Entry moves are cells of the representative; carry them onto this board.
        Ok((entry.outcome, entry.moves.map(|cell| sym.op.new_index(cell))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tictactoe_core::Algorithm;

    fn is_no_legal_moves(result: Result<impl std::fmt::Debug>) -> bool {
        matches!(result, Err(SolverError::Core(Error::NoLegalMoves)))
    }

    #[test]
    fn test_tie_breaks() {
        let evaluator = Evaluator::pure(Algorithm::Pruned);
        let engine = MinimaxEngine::new(&evaluator);
        let mut rng = StdRng::seed_from_u64(7);
        let position = Position::from_moves(&[4]).unwrap();

        assert_eq!(engine.best_move(&position, TieBreak::Leftmost, &mut rng).unwrap(), 0);
        assert_eq!(engine.best_move(&position, TieBreak::Rightmost, &mut rng).unwrap(), 8);
        for _ in 0..20 {
            let cell = engine.best_move(&position, TieBreak::Random, &mut rng).unwrap();
            assert!([0, 2, 6, 8].contains(&cell));
        }
    }

    #[test]
    fn test_random_tie_break_is_seeded() {
        let evaluator = Evaluator::pure(Algorithm::Pruned);
        let engine = MinimaxEngine::new(&evaluator);
        let position = Position::new();
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| engine.best_move(&position, TieBreak::Random, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(3), pick(3));
    }

    #[test]
    fn test_finished_game_has_no_moves() {
        let evaluator = Evaluator::pure(Algorithm::Exhaustive);
        let engine = MinimaxEngine::new(&evaluator);
        let mut rng = StdRng::seed_from_u64(0);

        let won = Position::from_moves(&[0, 1, 4, 3, 8]).unwrap();
        assert!(is_no_legal_moves(engine.best_moves(&won)));
        assert!(is_no_legal_moves(random_move(&won, &mut rng)));

        let full = Position::from_moves(&[0, 1, 2, 4, 3, 5, 7, 6, 8]).unwrap();
        assert!(is_no_legal_moves(engine.best_move(&full, TieBreak::Leftmost, &mut rng)));

        let symmetry = SymmetryTable::build();
        let tablebase = Tablebase::default();
        let lookup = TablebaseEngine::new(&symmetry, &tablebase);
        assert!(is_no_legal_moves(lookup.best_moves(&won)));
    }

    #[test]
    fn test_tablebase_miss_is_reported() {
        let symmetry = SymmetryTable::build();
        let tablebase = Tablebase::default();
        let engine = TablebaseEngine::new(&symmetry, &tablebase);
        assert!(matches!(
            engine.best_moves(&Position::new()),
            Err(SolverError::LookupNotFound { .. })
        ));
    }

    #[test]
    fn test_random_move_is_legal() {
        let mut rng = StdRng::seed_from_u64(11);
        let position = Position::from_moves(&[0, 4, 8]).unwrap();
        for _ in 0..50 {
            let cell = random_move(&position, &mut rng).unwrap();
            assert!(position.legal_moves().contains(cell));
        }
    }
}
