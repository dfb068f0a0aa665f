use std::fmt;

use thiserror::Error;

use crate::Player;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a move was refused.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveRejection {
    /// Cell index outside 0..=8.
    OutOfRange,
    /// Cell already carries a mark.
    Occupied(Player),
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveRejection::OutOfRange => f.write_str("cell must be in 0..=8"),
            MoveRejection::Occupied(player) => write!(f, "cell is already marked {player}"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("invalid move at cell {cell}: {reason}")]
    InvalidMove { cell: usize, reason: MoveRejection },

    #[error("no moves to undo")]
    EmptyHistory,

    #[error("encoding {0} is outside the keyspace 0..19683")]
    EncodingOutOfRange(u32),

    #[error("symmetry operation {0} is outside 0..8")]
    InvalidSymmetry(u8),

    #[error("pattern with {x} X and {o} O marks cannot arise from alternating play")]
    IllegalPattern { x: usize, o: usize },

    #[error("no legal moves remain")]
    NoLegalMoves,

    #[error("native evaluator unavailable: {0}")]
    NativeUnavailable(String),
}
