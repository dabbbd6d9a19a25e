//! Read-only attack lookups shared by move generation, legality and search.
//!
//! `AttackTables` is built once (the slider part takes a noticeable moment)
//! and then passed by reference or `Arc` wherever attacks are needed. Nothing
//! mutates it after construction, so concurrent readers need no locking.

use log::{info, warn};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::errors::AttackTableError;
use crate::game_state::bitboard::BitBoard;
use crate::game_state::chess_types::{Piece, PieceKind, Side, Square};
use crate::moves::leaper_attacks::{KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};
use crate::moves::magic::{Slider, SliderTable};

/// Seed for the magic multiplier search. Changing it changes the constants
/// but never the lookups.
const MAGIC_SEED: u64 = 0x6C79_6E78_6D61_6769;

#[derive(Debug, Clone)]
pub struct AttackTables {
    bishop: SliderTable,
    rook: SliderTable,
}

impl AttackTables {
    /// Builds and exhaustively verifies the slider tables.
    pub fn build() -> Result<Self, AttackTableError> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(MAGIC_SEED);
        let bishop = SliderTable::build(Slider::Bishop, &mut rng)?;
        let rook = SliderTable::build(Slider::Rook, &mut rng)?;
        bishop.verify()?;
        rook.verify()?;
        info!(
            "attack tables ready: {} bishop slots, {} rook slots",
            bishop.len(),
            rook.len()
        );
        Ok(Self { bishop, rook })
    }

    /// Builds the tables, panicking if verification fails.
    ///
    /// A failed build means the magic construction itself is broken; there is
    /// no meaningful way to continue playing with corrupt attack sets.
    pub fn new() -> Self {
        match Self::build() {
            Ok(tables) => tables,
            Err(err) => panic!("attack table construction defect: {err}"),
        }
    }

    #[inline]
    pub fn pawn_attacks(&self, side: Side, square: Square) -> BitBoard {
        BitBoard(PAWN_ATTACKS[side.index() & 1][square as usize])
    }

    #[inline]
    pub fn knight_attacks(&self, square: Square) -> BitBoard {
        BitBoard(KNIGHT_ATTACKS[square as usize])
    }

    #[inline]
    pub fn king_attacks(&self, square: Square) -> BitBoard {
        BitBoard(KING_ATTACKS[square as usize])
    }

    #[inline]
    pub fn bishop_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        BitBoard(self.bishop.attacks(square, occupancy.bits()))
    }

    #[inline]
    pub fn rook_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        BitBoard(self.rook.attacks(square, occupancy.bits()))
    }

    #[inline]
    pub fn queen_attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.bishop_attacks(square, occupancy) | self.rook_attacks(square, occupancy)
    }

    /// Attack set of a piece kind from `square`; pawns use `side`'s capture pattern.
    #[inline]
    pub fn piece_attacks(
        &self,
        kind: PieceKind,
        side: Side,
        square: Square,
        occupancy: BitBoard,
    ) -> BitBoard {
        match kind {
            PieceKind::Pawn => self.pawn_attacks(side, square),
            PieceKind::Knight => self.knight_attacks(square),
            PieceKind::Bishop => self.bishop_attacks(square, occupancy),
            PieceKind::Rook => self.rook_attacks(square, occupancy),
            PieceKind::Queen => self.queen_attacks(square, occupancy),
            PieceKind::King => self.king_attacks(square),
        }
    }

    /// Whether any piece of `by_side` attacks `square`.
    ///
    /// `Side::Both` is not a valid attacker set; it logs a warning and answers `false`.
    pub fn is_square_attacked(
        &self,
        square: Square,
        by_side: Side,
        pieces: &[BitBoard; 12],
        occupancy: &[BitBoard; 3],
    ) -> bool {
        if by_side == Side::Both {
            warn!("is_square_attacked called with Side::Both for square {square}");
            return false;
        }

        let both = occupancy[Side::Both.index()];
        let board = |kind: PieceKind| pieces[Piece::new(by_side, kind).index()];

        (self.pawn_attacks(by_side.opposite(), square) & board(PieceKind::Pawn)).any()
            || (self.knight_attacks(square) & board(PieceKind::Knight)).any()
            || (self.bishop_attacks(square, both) & board(PieceKind::Bishop)).any()
            || (self.rook_attacks(square, both) & board(PieceKind::Rook)).any()
            || (self.queen_attacks(square, both) & board(PieceKind::Queen)).any()
            || (self.king_attacks(square) & board(PieceKind::King)).any()
    }

    /// Every piece of either side attacking `square` given `occupied`.
    ///
    /// Used by static exchange evaluation, which removes pieces from
    /// `occupied` as the exchange unfolds to reveal x-ray attackers.
    pub fn attackers_to(
        &self,
        square: Square,
        occupied: BitBoard,
        pieces: &[BitBoard; 12],
    ) -> BitBoard {
        let of = |piece: Piece| pieces[piece.index()];
        let diagonal = of(Piece::WhiteBishop)
            | of(Piece::BlackBishop)
            | of(Piece::WhiteQueen)
            | of(Piece::BlackQueen);
        let straight = of(Piece::WhiteRook)
            | of(Piece::BlackRook)
            | of(Piece::WhiteQueen)
            | of(Piece::BlackQueen);

        ((self.pawn_attacks(Side::Black, square) & of(Piece::WhitePawn))
            | (self.pawn_attacks(Side::White, square) & of(Piece::BlackPawn))
            | (self.knight_attacks(square) & (of(Piece::WhiteKnight) | of(Piece::BlackKnight)))
            | (self.king_attacks(square) & (of(Piece::WhiteKing) | of(Piece::BlackKing)))
            | (self.bishop_attacks(square, occupied) & diagonal)
            | (self.rook_attacks(square, occupied) & straight))
            & occupied
    }
}

impl Default for AttackTables {
    fn default() -> Self {
        Self::new()
    }
}
