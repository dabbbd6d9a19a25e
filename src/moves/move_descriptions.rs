//! Packed move encoding.
//!
//! A move fits in a `u32`:
//!
//! | bits  | field                                   |
//! |-------|-----------------------------------------|
//! | 0-5   | source square                           |
//! | 6-11  | target square                           |
//! | 12-15 | moving piece (`Piece` index)            |
//! | 16-19 | promoted piece (`Piece` index, or 0xF)  |
//! | 20-24 | capture / double push / en passant / short castle / long castle |
//!
//! Equality and hashing operate on the packed value.

use std::fmt;

use crate::game_state::chess_types::{Piece, Square};
use crate::utils::algebraic::square_name;

const SOURCE_SHIFT: u32 = 0;
const TARGET_SHIFT: u32 = 6;
const PIECE_SHIFT: u32 = 12;
const PROMOTION_SHIFT: u32 = 16;

const SQUARE_MASK: u32 = 0x3F;
const PIECE_MASK: u32 = 0xF;
pub const NO_PIECE_CODE: u32 = 0xF;

pub const FLAG_CAPTURE: u32 = 1 << 20;
pub const FLAG_DOUBLE_PAWN_PUSH: u32 = 1 << 21;
pub const FLAG_EN_PASSANT: u32 = 1 << 22;
pub const FLAG_SHORT_CASTLE: u32 = 1 << 23;
pub const FLAG_LONG_CASTLE: u32 = 1 << 24;

const FLAGS_MASK: u32 = FLAG_CAPTURE
    | FLAG_DOUBLE_PAWN_PUSH
    | FLAG_EN_PASSANT
    | FLAG_SHORT_CASTLE
    | FLAG_LONG_CASTLE;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u32);

impl Move {
    #[inline]
    pub const fn new(
        source: Square,
        target: Square,
        piece: Piece,
        promoted: Option<Piece>,
        flags: u32,
    ) -> Self {
        let promoted_code = match promoted {
            Some(p) => p.index() as u32,
            None => NO_PIECE_CODE,
        };
        Self(
            ((source as u32 & SQUARE_MASK) << SOURCE_SHIFT)
                | ((target as u32 & SQUARE_MASK) << TARGET_SHIFT)
                | ((piece.index() as u32) << PIECE_SHIFT)
                | (promoted_code << PROMOTION_SHIFT)
                | (flags & FLAGS_MASK),
        )
    }

    #[inline]
    pub const fn quiet(source: Square, target: Square, piece: Piece) -> Self {
        Self::new(source, target, piece, None, 0)
    }

    #[inline]
    pub const fn capture(source: Square, target: Square, piece: Piece) -> Self {
        Self::new(source, target, piece, None, FLAG_CAPTURE)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn source(self) -> Square {
        ((self.0 >> SOURCE_SHIFT) & SQUARE_MASK) as Square
    }

    #[inline]
    pub const fn target(self) -> Square {
        ((self.0 >> TARGET_SHIFT) & SQUARE_MASK) as Square
    }

    #[inline]
    pub const fn piece(self) -> Piece {
        // Only `Move::new` builds values, so the code is always a valid index.
        Piece::ALL[((self.0 >> PIECE_SHIFT) & PIECE_MASK) as usize % 12]
    }

    #[inline]
    pub const fn promoted_piece(self) -> Option<Piece> {
        let code = (self.0 >> PROMOTION_SHIFT) & PIECE_MASK;
        Piece::from_index(code as usize)
    }

    #[inline]
    pub const fn flags(self) -> u32 {
        self.0 & FLAGS_MASK
    }

    #[inline]
    pub const fn is_capture(self) -> bool {
        self.0 & FLAG_CAPTURE != 0
    }

    #[inline]
    pub const fn is_double_pawn_push(self) -> bool {
        self.0 & FLAG_DOUBLE_PAWN_PUSH != 0
    }

    #[inline]
    pub const fn is_en_passant(self) -> bool {
        self.0 & FLAG_EN_PASSANT != 0
    }

    #[inline]
    pub const fn is_short_castle(self) -> bool {
        self.0 & FLAG_SHORT_CASTLE != 0
    }

    #[inline]
    pub const fn is_long_castle(self) -> bool {
        self.0 & FLAG_LONG_CASTLE != 0
    }

    #[inline]
    pub const fn is_castle(self) -> bool {
        self.0 & (FLAG_SHORT_CASTLE | FLAG_LONG_CASTLE) != 0
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.promoted_piece().is_some()
    }

    /// Neither a capture nor a promotion.
    #[inline]
    pub const fn is_quiet(self) -> bool {
        !self.is_capture() && !self.is_promotion()
    }
}

/// Long algebraic (UCI) form, e.g. `e2e4`, `e7e8q`.
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", square_name(self.source()), square_name(self.target()))?;
        if let Some(promoted) = self.promoted_piece() {
            write!(f, "{}", promoted.kind().to_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({self} {:?}", self.piece())?;
        let names = [
            (FLAG_CAPTURE, " capture"),
            (FLAG_DOUBLE_PAWN_PUSH, " double-push"),
            (FLAG_EN_PASSANT, " en-passant"),
            (FLAG_SHORT_CASTLE, " O-O"),
            (FLAG_LONG_CASTLE, " O-O-O"),
        ];
        for (flag, name) in names {
            if self.0 & flag != 0 {
                f.write_str(name)?;
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_survive_packing() {
        let mv = Move::new(
            52,
            60,
            Piece::WhitePawn,
            Some(Piece::WhiteQueen),
            FLAG_CAPTURE,
        );
        assert_eq!(mv.source(), 52);
        assert_eq!(mv.target(), 60);
        assert_eq!(mv.piece(), Piece::WhitePawn);
        assert_eq!(mv.promoted_piece(), Some(Piece::WhiteQueen));
        assert!(mv.is_capture());
        assert!(!mv.is_en_passant());
        assert!(!mv.is_quiet());
        assert_eq!(mv.to_string(), "e7e8q");
    }

    #[test]
    fn black_king_promotion_code_does_not_alias_none() {
        let mv = Move::quiet(60, 62, Piece::BlackKing);
        assert_eq!(mv.piece(), Piece::BlackKing);
        assert_eq!(mv.promoted_piece(), None);
        assert!(mv.is_quiet());
    }

    #[test]
    fn equality_uses_packed_form() {
        let a = Move::new(4, 6, Piece::WhiteKing, None, FLAG_SHORT_CASTLE);
        let b = Move::new(4, 6, Piece::WhiteKing, None, FLAG_SHORT_CASTLE);
        let c = Move::quiet(4, 6, Piece::WhiteKing);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_castle());
    }
}
