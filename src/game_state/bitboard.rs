//! 64-bit square set used for every board layer.
//!
//! Bit `i` is set exactly when square `i` belongs to the set the board
//! represents (a piece kind, a side's occupancy, an attack map, ...).

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use crate::game_state::chess_types::Square;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitBoard(pub u64);

impl BitBoard {
    pub const EMPTY: Self = Self(0);
    pub const FULL: Self = Self(u64::MAX);

    #[inline]
    pub const fn from_square(square: Square) -> Self {
        Self(1u64 << square)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn get(self, square: Square) -> bool {
        self.0 & (1u64 << square) != 0
    }

    #[inline]
    pub fn set(&mut self, square: Square) {
        self.0 |= 1u64 << square;
    }

    #[inline]
    pub fn clear(&mut self, square: Square) {
        self.0 &= !(1u64 << square);
    }

    #[inline]
    pub const fn with(self, square: Square) -> Self {
        Self(self.0 | (1u64 << square))
    }

    #[inline]
    pub const fn without(self, square: Square) -> Self {
        Self(self.0 & !(1u64 << square))
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn any(self) -> bool {
        self.0 != 0
    }

    /// Lowest set square, if any.
    #[inline]
    pub const fn lsb(self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as Square)
        }
    }

    /// Removes and returns the lowest set square.
    #[inline]
    pub fn pop_lsb(&mut self) -> Option<Square> {
        let square = self.lsb()?;
        self.0 &= self.0 - 1;
        Some(square)
    }

    #[inline]
    pub const fn squares(self) -> Squares {
        Squares(self.0)
    }
}

/// Iterator over the set squares of a board, lowest first.
#[derive(Debug, Clone)]
pub struct Squares(u64);

impl Iterator for Squares {
    type Item = Square;

    #[inline]
    fn next(&mut self) -> Option<Square> {
        if self.0 == 0 {
            return None;
        }
        let square = self.0.trailing_zeros() as Square;
        self.0 &= self.0 - 1;
        Some(square)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Squares {}

impl IntoIterator for BitBoard {
    type Item = Square;
    type IntoIter = Squares;

    fn into_iter(self) -> Squares {
        self.squares()
    }
}

impl From<u64> for BitBoard {
    #[inline]
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl BitAnd for BitBoard {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for BitBoard {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitXor for BitBoard {
    type Output = Self;
    #[inline]
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for BitBoard {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl BitAndAssign for BitBoard {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOrAssign for BitBoard {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitXorAssign for BitBoard {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl fmt::Debug for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitBoard({:#018x})", self.0)
    }
}

/// Renders the board as an 8x8 grid with rank 8 on top.
impl fmt::Display for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let mark = if self.get(rank * 8 + file) { '1' } else { '.' };
                write!(f, "{mark}")?;
                if file < 7 {
                    f.write_str(" ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BitBoard;

    #[test]
    fn set_get_clear_and_count() {
        let mut board = BitBoard::EMPTY;
        board.set(0);
        board.set(63);
        board.set(28);
        assert!(board.get(28));
        assert_eq!(board.count(), 3);
        board.clear(28);
        assert!(!board.get(28));
        assert_eq!(board.count(), 2);
    }

    #[test]
    fn pop_lsb_drains_in_ascending_order() {
        let mut board = BitBoard(0b1010_0001);
        assert_eq!(board.pop_lsb(), Some(0));
        assert_eq!(board.pop_lsb(), Some(5));
        assert_eq!(board.pop_lsb(), Some(7));
        assert_eq!(board.pop_lsb(), None);
        assert!(board.is_empty());
    }

    #[test]
    fn squares_iterator_matches_count() {
        let board = BitBoard(0xFF00_0000_0000_00FF);
        let squares: Vec<u8> = board.squares().collect();
        assert_eq!(squares.len(), board.count() as usize);
        assert_eq!(squares.first(), Some(&0));
        assert_eq!(squares.last(), Some(&63));
    }
}
