//! Canonical chess-rule constants.
//!
//! Starting FEN, named squares used by castling, and the fixed lookup tables
//! that `Position::apply_move` consults instead of branching on special cases.

use crate::game_state::chess_types::{CastlingRights, Side, Square};

/// Standard chess starting position in Forsyth-Edwards Notation (FEN).
pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

pub const A1: Square = 0;
pub const B1: Square = 1;
pub const C1: Square = 2;
pub const D1: Square = 3;
pub const E1: Square = 4;
pub const F1: Square = 5;
pub const G1: Square = 6;
pub const H1: Square = 7;
pub const A8: Square = 56;
pub const B8: Square = 57;
pub const C8: Square = 58;
pub const D8: Square = 59;
pub const E8: Square = 60;
pub const F8: Square = 61;
pub const G8: Square = 62;
pub const H8: Square = 63;

/// Rank (0-based) a side's pawns start on and may double-push from.
pub const PAWN_START_RANK: [u8; 2] = [1, 6];

/// Rank (0-based) on which a side's pawns promote.
pub const PROMOTION_RANK: [u8; 2] = [7, 0];

/// Offset from an en-passant target square to the pawn it captures, indexed by the capturing side.
pub const EN_PASSANT_CAPTURE_OFFSET: [i8; 2] = [-8, 8];

#[inline]
pub const fn en_passant_capture_square(capturing_side: Side, target: Square) -> Square {
    let offset = EN_PASSANT_CAPTURE_OFFSET[capturing_side.index() & 1];
    (target as i8 + offset) as Square
}

/// King (from, to) and rook (from, to) squares for a castle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastleSquares {
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
}

/// King-side castle squares, indexed by side.
pub const SHORT_CASTLE: [CastleSquares; 2] = [
    CastleSquares {
        king_from: E1,
        king_to: G1,
        rook_from: H1,
        rook_to: F1,
    },
    CastleSquares {
        king_from: E8,
        king_to: G8,
        rook_from: H8,
        rook_to: F8,
    },
];

/// Queen-side castle squares, indexed by side.
pub const LONG_CASTLE: [CastleSquares; 2] = [
    CastleSquares {
        king_from: E1,
        king_to: C1,
        rook_from: A1,
        rook_to: D1,
    },
    CastleSquares {
        king_from: E8,
        king_to: C8,
        rook_from: A8,
        rook_to: D8,
    },
];

/// Rights that survive a move touching a square (as source or target).
///
/// Every square keeps all rights except the king and rook home squares, so a
/// single `&` per endpoint covers king moves, rook moves, and rook captures.
pub const CASTLING_RIGHTS_UPDATE: [CastlingRights; 64] = build_castling_rights_update();

const fn build_castling_rights_update() -> [CastlingRights; 64] {
    let mut table = [CastlingRights::ALL; 64];
    table[A1 as usize] = CastlingRights::ALL.without(CastlingRights::WHITE_QUEEN_SIDE);
    table[E1 as usize] = CastlingRights::ALL
        .without(CastlingRights::WHITE_KING_SIDE)
        .without(CastlingRights::WHITE_QUEEN_SIDE);
    table[H1 as usize] = CastlingRights::ALL.without(CastlingRights::WHITE_KING_SIDE);
    table[A8 as usize] = CastlingRights::ALL.without(CastlingRights::BLACK_QUEEN_SIDE);
    table[E8 as usize] = CastlingRights::ALL
        .without(CastlingRights::BLACK_KING_SIDE)
        .without(CastlingRights::BLACK_QUEEN_SIDE);
    table[H8 as usize] = CastlingRights::ALL.without(CastlingRights::BLACK_KING_SIDE);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rights_update_only_touches_home_squares() {
        let touched = CASTLING_RIGHTS_UPDATE
            .iter()
            .filter(|rights| **rights != CastlingRights::ALL)
            .count();
        assert_eq!(touched, 6);
        assert_eq!(CASTLING_RIGHTS_UPDATE[E8 as usize].bits(), 0b0011);
        assert_eq!(CASTLING_RIGHTS_UPDATE[H1 as usize].bits(), 0b1110);
    }

    #[test]
    fn en_passant_offsets_point_behind_target() {
        // e6 target captured by White removes the pawn on e5.
        assert_eq!(en_passant_capture_square(Side::White, 44), 36);
        // d3 target captured by Black removes the pawn on d4.
        assert_eq!(en_passant_capture_square(Side::Black, 19), 27);
    }
}
