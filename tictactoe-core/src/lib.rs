//! Tic-tac-toe game logic with base-3 position encoding and symmetry reduction.
//!
//! # Cell Layout
//!
//! ```text
//! Cell indices (row-major order):
//!   (0,0)=0  (0,1)=1  (0,2)=2
//!   (1,0)=3  (1,1)=4  (1,2)=5
//!   (2,0)=6  (2,1)=7  (2,2)=8
//! ```
//!
//! # Pattern Encoding (base 3)
//!
//! ```text
//! digit(cell) = 0 (empty), 1 (X), 2 (O)
//! encoding    = sum over cells of digit(cell) * 3^cell
//!
//! Cell 0 is the least significant digit; the keyspace is 0..19683.
//! ```
//!
//! # Move Sets (9 bits)
//!
//! ```text
//! Bit i set = cell i is part of the set. Iteration is in ascending cell order.
//! ```

pub mod encode;
mod error;
pub mod native;
pub mod search;
pub mod symmetry;

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

pub use encode::{decode, decode_position, encode, KEYSPACE};
pub use error::{Error, MoveRejection, Result};
pub use native::{NativeLibrary, NativeMode};
pub use search::{
    evals_for_next_moves, minimax, minimax_pruned, walk_continuations, Algorithm, Evaluation,
    Evaluator, MoveEvals, Outcome,
};
pub use symmetry::Symmetry;

/// Number of cells on the board.
pub const CELLS: usize = 9;

/// The 8 winning lines, in scan order: 3 rows, 3 columns, 2 diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2], // Row 0
    [3, 4, 5], // Row 1
    [6, 7, 8], // Row 2
    [0, 3, 6], // Col 0
    [1, 4, 7], // Col 1
    [2, 5, 8], // Col 2
    [0, 4, 8], // Main diagonal
    [2, 4, 6], // Anti-diagonal
];

/// Player mark. X always moves first.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    X = 1,
    O = 2,
}

impl Player {
    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Convert from a base-3 digit (1 or 2) to Player.
    #[inline]
    pub fn from_digit(digit: u8) -> Option<Player> {
        match digit {
            1 => Some(Player::X),
            2 => Some(Player::O),
            _ => None,
        }
    }

    /// Base-3 digit of this mark.
    #[inline]
    pub fn digit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::X => f.write_str("X"),
            Player::O => f.write_str("O"),
        }
    }
}

/// Set of cells packed into 9 bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MoveSet(u16);

impl MoveSet {
    const MASK: u16 = 0b1_1111_1111;

    /// Empty set.
    pub const EMPTY: MoveSet = MoveSet(0);

    /// Build a set from raw bits. Bits above cell 8 are dropped.
    #[inline]
    pub const fn from_bits(bits: u16) -> MoveSet {
        MoveSet(bits & Self::MASK)
    }

    /// Raw 9-bit mask.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Add a cell to the set.
    #[inline]
    pub fn insert(&mut self, cell: usize) {
        debug_assert!(cell < CELLS);
        self.0 |= 1 << cell;
    }

    #[inline]
    pub const fn contains(self, cell: usize) -> bool {
        cell < CELLS && self.0 & (1 << cell) != 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowest cell in the set.
    #[inline]
    pub fn first(self) -> Option<usize> {
        self.iter().next()
    }

    /// Highest cell in the set.
    #[inline]
    pub fn last(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(15 - self.0.leading_zeros() as usize)
        }
    }

    /// Iterate over cells in ascending order.
    #[inline]
    pub fn iter(self) -> MoveSetIter {
        MoveSetIter(self.0)
    }

    /// Map every cell through `f`, collecting into a new set.
    pub fn map(self, mut f: impl FnMut(usize) -> usize) -> MoveSet {
        self.iter().fold(MoveSet::EMPTY, |mut acc, cell| {
            acc.insert(f(cell));
            acc
        })
    }

    pub fn to_vec(self) -> Vec<usize> {
        self.iter().collect()
    }
}

impl FromIterator<usize> for MoveSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = MoveSet::EMPTY;
        for cell in iter {
            set.insert(cell);
        }
        set
    }
}

impl IntoIterator for MoveSet {
    type Item = usize;
    type IntoIter = MoveSetIter;

    fn into_iter(self) -> MoveSetIter {
        self.iter()
    }
}

impl fmt::Debug for MoveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending iterator over a [`MoveSet`].
#[derive(Clone, Copy, Debug)]
pub struct MoveSetIter(u16);

impl Iterator for MoveSetIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let cell = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for MoveSetIter {}

/// Raw assignment of marks to cells, with no turn or history attached.
///
/// Any of the 3^9 assignments is representable, including ones no game can reach.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Pattern(pub [Option<Player>; CELLS]);

impl Pattern {
    /// The empty board.
    pub const EMPTY: Pattern = Pattern([None; CELLS]);

    /// Mark at a cell.
    #[inline]
    pub fn get(&self, cell: usize) -> Option<Player> {
        self.0[cell]
    }

    /// Number of cells marked by `player`.
    pub fn count(&self, player: Player) -> usize {
        self.0.iter().filter(|&&mark| mark == Some(player)).count()
    }

    /// Number of marked cells.
    pub fn marks(&self) -> usize {
        self.0.iter().filter(|mark| mark.is_some()).count()
    }

    /// Empty cells.
    pub fn empty_cells(&self) -> MoveSet {
        (0..CELLS).filter(|&cell| self.0[cell].is_none()).collect()
    }

    /// Cells marked by `player`.
    pub fn cells_of(&self, player: Player) -> MoveSet {
        (0..CELLS).filter(|&cell| self.0[cell] == Some(player)).collect()
    }

    /// Base-3 digits of the 9 cells.
    pub fn digits(&self) -> [u8; CELLS] {
        self.0.map(|mark| mark.map_or(0, Player::digit))
    }

    /// First completed line in [`WIN_LINES`] scan order and its owner.
    ///
    /// With fewer than 5 marks nobody can have three in a row, so no scan happens.
    /// If an illegal pattern completes lines for both players, the line found first wins.
    pub fn winning_line(&self) -> Option<(Player, [usize; 3])> {
        if self.marks() < 5 {
            return None;
        }
        for line in &WIN_LINES {
            if let Some(player) = self.0[line[0]] {
                if self.0[line[1]] == Some(player) && self.0[line[2]] == Some(player) {
                    return Some((player, *line));
                }
            }
        }
        None
    }

    /// Owner of the first completed line, if any.
    #[inline]
    pub fn winner(&self) -> Option<Player> {
        self.winning_line().map(|(player, _)| player)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            for col in 0..3 {
                if col > 0 {
                    f.write_str(" ")?;
                }
                match self.0[row * 3 + col] {
                    Some(player) => write!(f, "{player}")?,
                    None => f.write_str(".")?,
                }
            }
            if row < 2 {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

/// Fixed-capacity move history (no heap allocation).
///
/// Slots past `len` are always zero so that equal histories compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct History {
    cells: [u8; CELLS],
    len: u8,
}

impl History {
    #[inline]
    fn push(&mut self, cell: usize) {
        debug_assert!((self.len as usize) < CELLS);
        self.cells[self.len as usize] = cell as u8;
        self.len += 1;
    }

    #[inline]
    fn pop(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let cell = self.cells[self.len as usize];
        self.cells[self.len as usize] = 0;
        Some(cell as usize)
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recent move.
    #[inline]
    pub fn last(&self) -> Option<usize> {
        self.as_slice().last().map(|&cell| cell as usize)
    }

    /// Moves in the order they were played.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.cells[..self.len as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.as_slice().iter().map(|&cell| cell as usize)
    }

    pub(crate) fn map(&self, mut f: impl FnMut(usize) -> usize) -> History {
        let mut mapped = *self;
        for slot in &mut mapped.cells[..self.len as usize] {
            *slot = f(*slot as usize) as u8;
        }
        mapped
    }
}

/// Game state: cell marks, side to move, and the moves that produced it.
///
/// Mutated in place by [`apply_move`](Position::apply_move) and
/// [`undo_last_move`](Position::undo_last_move), which are exact inverses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    pattern: Pattern,
    next: Player,
    history: History,
}

impl Position {
    /// Create an empty board with X to move.
    #[inline]
    pub fn new() -> Position {
        Position {
            pattern: Pattern::EMPTY,
            next: Player::X,
            history: History::default(),
        }
    }

    /// Play a sequence of moves from the empty board.
    pub fn from_moves(moves: &[usize]) -> Result<Position> {
        let mut position = Position::new();
        for &cell in moves {
            position.apply_move(cell)?;
        }
        Ok(position)
    }

    /// Build a position from a pattern whose mark counts some game could produce.
    ///
    /// The history is synthesized by alternating X and O cells in ascending order.
    /// It reproduces the pattern but is not necessarily the order actually played.
    pub fn from_pattern(pattern: Pattern) -> Result<Position> {
        let xs = pattern.cells_of(Player::X);
        let os = pattern.cells_of(Player::O);
        if xs.len() != os.len() && xs.len() != os.len() + 1 {
            return Err(Error::IllegalPattern {
                x: xs.len(),
                o: os.len(),
            });
        }

        let mut position = Position::new();
        let mut xs = xs.iter();
        let mut os = os.iter();
        while let Some(x) = xs.next() {
            position.play(x);
            if let Some(o) = os.next() {
                position.play(o);
            }
        }
        Ok(position)
    }

    /// Build a position from any pattern, with an empty history.
    ///
    /// X is to move unless X has more marks than O. Nothing about the result is
    /// guaranteed reachable, and [`undo_last_move`](Position::undo_last_move)
    /// fails until a move is applied.
    pub fn from_illegal_pattern(pattern: Pattern) -> Position {
        let next = if pattern.count(Player::X) > pattern.count(Player::O) {
            Player::O
        } else {
            Player::X
        };
        Position {
            pattern,
            next,
            history: History::default(),
        }
    }

    #[inline]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Mark at a cell.
    #[inline]
    pub fn cell(&self, cell: usize) -> Option<Player> {
        self.pattern.0[cell]
    }

    /// Side to move.
    #[inline]
    pub fn next_player(&self) -> Player {
        self.next
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Base-3 encoding of the cell pattern.
    #[inline]
    pub fn encode(&self) -> u16 {
        encode::encode(&self.pattern)
    }

    /// Mark `cell` for the side to move and pass the turn.
    pub fn apply_move(&mut self, cell: usize) -> Result<()> {
        if cell >= CELLS {
            return Err(Error::InvalidMove {
                cell,
                reason: MoveRejection::OutOfRange,
            });
        }
        if let Some(mark) = self.pattern.0[cell] {
            return Err(Error::InvalidMove {
                cell,
                reason: MoveRejection::Occupied(mark),
            });
        }
        self.play(cell);
        Ok(())
    }

    /// Take back the most recent move, returning its cell.
    pub fn undo_last_move(&mut self) -> Result<usize> {
        self.retract().ok_or(Error::EmptyHistory)
    }

    /// Apply a move that is undone when the returned guard drops.
    ///
    /// The guard dereferences to the position, so further moves and searches
    /// run through it. Every exit path restores the position, including early
    /// returns and `?`.
    pub fn scoped_move(&mut self, cell: usize) -> Result<MoveGuard<'_>> {
        self.apply_move(cell)?;
        let depth = self.history.len();
        Ok(MoveGuard {
            position: self,
            depth,
        })
    }

    /// Empty cells, ascending.
    #[inline]
    pub fn legal_moves(&self) -> MoveSet {
        self.pattern.empty_cells()
    }

    /// Winner of the position. See [`Pattern::winner`] for the scan rules.
    #[inline]
    pub fn check_winner(&self) -> Option<Player> {
        self.pattern.winner()
    }

    /// True when someone has won or the board is full.
    pub fn is_terminal(&self) -> bool {
        self.check_winner().is_some() || self.legal_moves().is_empty()
    }

    /// Caller guarantees `cell` is empty.
    #[inline]
    pub(crate) fn play(&mut self, cell: usize) {
        debug_assert!(self.pattern.0[cell].is_none());
        self.pattern.0[cell] = Some(self.next);
        self.next = self.next.opponent();
        self.history.push(cell);
    }

    #[inline]
    fn retract(&mut self) -> Option<usize> {
        let cell = self.history.pop()?;
        self.pattern.0[cell] = None;
        self.next = self.next.opponent();
        Some(cell)
    }

    /// Caller guarantees `cell` is empty.
    #[inline]
    pub(crate) fn play_scoped(&mut self, cell: usize) -> MoveGuard<'_> {
        self.play(cell);
        let depth = self.history.len();
        MoveGuard {
            position: self,
            depth,
        }
    }

    pub(crate) fn from_parts(pattern: Pattern, next: Player, history: History) -> Position {
        Position {
            pattern,
            next,
            history,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{} to move", self.pattern, self.next)
    }
}

/// A move applied to a borrowed [`Position`], taken back on drop.
///
/// Drop rewinds the position to where it stood before the guarded move, so
/// moves left unpaired through the guard are taken back too. If the guarded
/// move was already undone through the guard, drop leaves the position alone.
pub struct MoveGuard<'a> {
    position: &'a mut Position,
    depth: usize,
}

impl Deref for MoveGuard<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.position
    }
}

impl DerefMut for MoveGuard<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.position
    }
}

impl Drop for MoveGuard<'_> {
    fn drop(&mut self) {
        while self.position.history.len() >= self.depth {
            if self.position.retract().is_none() {
                break;
            }
        }
    }
}
