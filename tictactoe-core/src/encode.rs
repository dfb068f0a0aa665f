//! Bijection between cell patterns and integers in `0..3^9`.

use crate::{Error, Pattern, Player, Position, Result, CELLS};

/// Number of distinct cell patterns (3^9).
pub const KEYSPACE: u16 = 19_683;

/// 3^cell for each cell.
const POW3: [u16; CELLS] = [1, 3, 9, 27, 81, 243, 729, 2187, 6561];

/// Base-3 encoding of a pattern, cell 0 least significant.
#[inline]
pub fn encode(pattern: &Pattern) -> u16 {
    let mut n = 0u16;
    for (cell, mark) in pattern.0.iter().enumerate() {
        if let Some(player) = mark {
            n += player.digit() as u16 * POW3[cell];
        }
    }
    n
}

/// Inverse of [`encode`]. Legality of the pattern is not checked.
pub fn decode(n: u16) -> Result<Pattern> {
    if n >= KEYSPACE {
        return Err(Error::EncodingOutOfRange(n as u32));
    }
    Ok(decode_unchecked(n))
}

/// Decode into a playable position.
///
/// Fails with [`Error::IllegalPattern`] when the mark counts rule out any game;
/// use [`Position::from_illegal_pattern`] on the decoded pattern instead.
pub fn decode_position(n: u16) -> Result<Position> {
    Position::from_pattern(decode(n)?)
}

#[inline]
fn decode_unchecked(mut n: u16) -> Pattern {
    let mut cells = [None; CELLS];
    for cell in &mut cells {
        *cell = Player::from_digit((n % 3) as u8);
        n /= 3;
    }
    Pattern(cells)
}

impl Pattern {
    /// Base-3 encoding of this pattern.
    #[inline]
    pub fn encode(&self) -> u16 {
        encode(self)
    }

    /// Every pattern in the keyspace with its encoding, ascending.
    pub fn all() -> impl Iterator<Item = (u16, Pattern)> {
        (0..KEYSPACE).map(|n| (n, decode_unchecked(n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_encodes_to_zero() {
        assert_eq!(encode(&Pattern::EMPTY), 0);
        assert_eq!(decode(0).unwrap(), Pattern::EMPTY);
    }

    #[test]
    fn test_cell_zero_is_least_significant() {
        let x_corner = Position::from_moves(&[0]).unwrap();
        assert_eq!(x_corner.encode(), 1);

        let x_center = Position::from_moves(&[4]).unwrap();
        assert_eq!(x_center.encode(), 81);

        // X at 4, O at 8: 1*81 + 2*6561
        let two = Position::from_moves(&[4, 8]).unwrap();
        assert_eq!(two.encode(), 81 + 2 * 6561);
    }

    #[test]
    fn test_all_twos_is_last_key() {
        let mut cells = [Some(Player::O); CELLS];
        assert_eq!(encode(&Pattern(cells)), KEYSPACE - 1);
        cells[0] = Some(Player::X);
        assert_eq!(encode(&Pattern(cells)), KEYSPACE - 2);
    }

    #[test]
    fn test_roundtrip_whole_keyspace() {
        for (n, pattern) in Pattern::all() {
            assert_eq!(encode(&pattern), n);
            assert_eq!(decode(n).unwrap(), pattern);
        }
        assert_eq!(Pattern::all().count(), KEYSPACE as usize);
    }

    #[test]
    fn test_decode_out_of_range() {
        assert_eq!(decode(KEYSPACE), Err(Error::EncodingOutOfRange(19_683)));
        assert_eq!(decode(u16::MAX), Err(Error::EncodingOutOfRange(65_535)));
    }

    #[test]
    fn test_decode_position_requires_legal_counts() {
        // Three X marks, no O: digits 1,1,1 in cells 0..3.
        let n = 1 + 3 + 9;
        assert!(decode(n).is_ok());
        assert_eq!(
            decode_position(n),
            Err(Error::IllegalPattern { x: 3, o: 0 })
        );

        let position = decode_position(81 + 2 * 6561).unwrap();
        assert_eq!(position.history().len(), 2);
        assert_eq!(position.next_player(), Player::X);
    }
}
