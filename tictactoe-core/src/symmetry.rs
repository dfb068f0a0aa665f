//! The 8 board automorphisms (dihedral group of the square).
//!
//! Operations, by index:
//!
//! ```text
//!   0  identity
//!   1  rotate 90° clockwise
//!   2  rotate 180°
//!   3  rotate 90° counter-clockwise
//!   4  flip left-right
//!   5  flip left-right, then rotate clockwise         (anti-diagonal reflection)
//!   6  flip left-right, then rotate 180°              (flip top-bottom)
//!   7  flip left-right, then rotate counter-clockwise (main-diagonal reflection)
//! ```
//!
//! Board layout:
//!
//! ```text
//!   0 1 2
//!   3 4 5
//!   6 7 8
//! ```

use crate::{Error, Pattern, Position, CELLS};

/// `NEW_INDEX[op][cell]` is where the mark on `cell` lands after `op`.
const NEW_INDEX: [[u8; CELLS]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8], // Identity
    [2, 5, 8, 1, 4, 7, 0, 3, 6], // Rotate 90° clockwise
    [8, 7, 6, 5, 4, 3, 2, 1, 0], // Rotate 180°
    [6, 3, 0, 7, 4, 1, 8, 5, 2], // Rotate 90° counter-clockwise
    [2, 1, 0, 5, 4, 3, 8, 7, 6], // Flip left-right
    [8, 5, 2, 7, 4, 1, 6, 3, 0], // Anti-diagonal
    [6, 7, 8, 3, 4, 5, 0, 1, 2], // Flip top-bottom
    [0, 3, 6, 1, 4, 7, 2, 5, 8], // Main diagonal
];

/// Group inverse of each operation. Only the quarter turns differ from themselves.
const INVERSE: [u8; 8] = [0, 3, 2, 1, 4, 5, 6, 7];

/// `COMPOSE[a][b]` is the single operation equal to `a` followed by `b`.
const COMPOSE: [[u8; 8]; 8] = compose_table();

const fn compose_table() -> [[u8; 8]; 8] {
    let mut table = [[0u8; 8]; 8];
    let mut a = 0;
    while a < 8 {
        let mut b = 0;
        while b < 8 {
            let mut k = 0;
            let mut found = false;
            while k < 8 && !found {
                let mut same = true;
                let mut cell = 0;
                while cell < CELLS {
                    let composed = NEW_INDEX[b][NEW_INDEX[a][cell] as usize];
                    if NEW_INDEX[k][cell] != composed {
                        same = false;
                    }
                    cell += 1;
                }
                if same {
                    table[a][b] = k as u8;
                    found = true;
                }
                k += 1;
            }
            if !found {
                panic!("symmetry operations are not closed under composition");
            }
            b += 1;
        }
        a += 1;
    }
    table
}

/// One of the 8 board symmetries, identified by index 0..8.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Symmetry(u8);

impl Symmetry {
    pub const IDENTITY: Symmetry = Symmetry(0);

    /// Number of operations in the group.
    pub const COUNT: usize = 8;

    /// Convert from index (0..8) to Symmetry.
    #[inline]
    pub fn from_index(idx: u8) -> Option<Symmetry> {
        if (idx as usize) < Self::COUNT {
            Some(Symmetry(idx))
        } else {
            None
        }
    }

    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// All operations in index order.
    pub fn all() -> impl Iterator<Item = Symmetry> {
        (0..Self::COUNT as u8).map(Symmetry)
    }

    /// The operation that undoes this one.
    #[inline]
    pub fn inverse(self) -> Symmetry {
        Symmetry(INVERSE[self.0 as usize])
    }

    /// Applying `self` and then `next` equals applying the returned operation.
    #[inline]
    pub fn then(self, next: Symmetry) -> Symmetry {
        Symmetry(COMPOSE[self.0 as usize][next.0 as usize])
    }

    /// Cell that `cell` moves to under this operation.
    #[inline]
    pub fn new_index(self, cell: usize) -> usize {
        NEW_INDEX[self.0 as usize][cell] as usize
    }

    /// Cell that ends up at `cell` under this operation.
    #[inline]
    pub fn old_index(self, cell: usize) -> usize {
        NEW_INDEX[INVERSE[self.0 as usize] as usize][cell] as usize
    }

    /// Transform a raw pattern.
    pub fn apply_pattern(self, pattern: &Pattern) -> Pattern {
        let mapping = &NEW_INDEX[self.0 as usize];
        let mut cells = [None; CELLS];
        for (old, &mark) in pattern.0.iter().enumerate() {
            cells[mapping[old] as usize] = mark;
        }
        Pattern(cells)
    }

    /// Transform a position: cells and the recorded history move together,
    /// the side to move is unchanged.
    pub fn apply(self, position: &Position) -> Position {
        Position::from_parts(
            self.apply_pattern(position.pattern()),
            position.next_player(),
            position.history().map(|cell| self.new_index(cell)),
        )
    }
}

impl TryFrom<u8> for Symmetry {
    type Error = Error;

    fn try_from(idx: u8) -> Result<Self, Error> {
        Symmetry::from_index(idx).ok_or(Error::InvalidSymmetry(idx))
    }
}

impl Pattern {
    /// Images under every operation, in operation index order.
    pub fn variants(&self) -> [Pattern; Symmetry::COUNT] {
        let mut result = [Pattern::EMPTY; Symmetry::COUNT];
        for op in Symmetry::all() {
            result[op.0 as usize] = op.apply_pattern(self);
        }
        result
    }

    /// Distinct images of this pattern (its orbit), in first-seen order.
    pub fn unique_variants(&self) -> Vec<Pattern> {
        let mut unique: Vec<Pattern> = Vec::with_capacity(Symmetry::COUNT);
        for variant in self.variants() {
            if !unique.contains(&variant) {
                unique.push(variant);
            }
        }
        unique
    }

    /// Canonical representative of this pattern's orbit and the operation
    /// mapping it back here.
    ///
    /// The representative is the smallest encoding among the 8 images. When
    /// several operations map it to this pattern, the lowest index is returned.
    pub fn canonical(&self) -> (u16, Symmetry) {
        let mut representative = *self;
        let mut reduce = Symmetry::IDENTITY;
        let mut min = self.encode();
        for op in Symmetry::all().skip(1) {
            let image = op.apply_pattern(self);
            let encoded = image.encode();
            if encoded < min {
                min = encoded;
                representative = image;
                reduce = op;
            }
        }

        let op = Symmetry::all()
            .find(|op| op.apply_pattern(&representative) == *self)
            .unwrap_or(reduce.inverse());
        (min, op)
    }
}
