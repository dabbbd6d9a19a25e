//! Immutable board position.
//!
//! `Position` stores twelve piece boards, three occupancy boards (White,
//! Black, Both), the side to move, castling rights and the en-passant target.
//! Transitions never mutate: [`Position::apply_move`] returns a fresh value,
//! so parent and child positions never share state.
//!
//! Legality is two-phase. The generator emits pseudo-legal moves; a move is
//! accepted only if the position it produces passes
//! [`Position::was_produced_by_valid_move`].

use std::fmt;

use crate::errors::FenError;
use crate::game_state::bitboard::BitBoard;
use crate::game_state::chess_rules::{
    en_passant_capture_square, CASTLING_RIGHTS_UPDATE, LONG_CASTLE, SHORT_CASTLE,
};
use crate::game_state::chess_types::{CastlingRights, Piece, PieceKind, Side, Square};
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::Move;
use crate::search::board_scoring::{evaluate_absolute, CHECKMATE_SCORE, DEPTH_FACTOR};
use crate::utils::fen_generator::generate_fen;
use crate::utils::fen_parser::parse_fen;

#[rustfmt::skip]
const START_PIECES: [BitBoard; 12] = [
    BitBoard(0x0000_0000_0000_FF00), BitBoard(0x0000_0000_0000_0042),
    BitBoard(0x0000_0000_0000_0024), BitBoard(0x0000_0000_0000_0081),
    BitBoard(0x0000_0000_0000_0008), BitBoard(0x0000_0000_0000_0010),
    BitBoard(0x00FF_0000_0000_0000), BitBoard(0x4200_0000_0000_0000),
    BitBoard(0x2400_0000_0000_0000), BitBoard(0x8100_0000_0000_0000),
    BitBoard(0x0800_0000_0000_0000), BitBoard(0x1000_0000_0000_0000),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pieces: [BitBoard; 12],
    occupancy: [BitBoard; 3],
    side: Side,
    castling: CastlingRights,
    en_passant: Option<Square>,
}

impl Position {
    /// Builds a position from piece boards, deriving all occupancy boards.
    pub fn from_parts(
        pieces: [BitBoard; 12],
        side: Side,
        castling: CastlingRights,
        en_passant: Option<Square>,
    ) -> Self {
        let mut position = Self {
            pieces,
            occupancy: [BitBoard::EMPTY; 3],
            side,
            castling,
            en_passant,
        };
        position.recalc_occupancy();
        position
    }

    /// Standard initial position.
    pub fn start() -> Self {
        Self::from_parts(START_PIECES, Side::White, CastlingRights::ALL, None)
    }

    /// Parses a FEN string, dropping the move counters.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        parse_fen(fen).map(|parsed| parsed.position)
    }

    /// FEN with the move counters defaulted to `0 1`.
    pub fn fen(&self) -> String {
        generate_fen(self, 0, 1)
    }

    #[inline]
    pub fn pieces(&self) -> &[BitBoard; 12] {
        &self.pieces
    }

    #[inline]
    pub fn piece_board(&self, piece: Piece) -> BitBoard {
        self.pieces[piece.index()]
    }

    #[inline]
    pub fn occupancy(&self) -> &[BitBoard; 3] {
        &self.occupancy
    }

    #[inline]
    pub fn occupancy_of(&self, side: Side) -> BitBoard {
        self.occupancy[side.index()]
    }

    #[inline]
    pub fn side_to_move(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    pub fn en_passant_square(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        if !self.occupancy[Side::Both.index()].get(square) {
            return None;
        }
        Piece::ALL
            .into_iter()
            .find(|piece| self.pieces[piece.index()].get(square))
    }

    #[inline]
    pub fn king_square(&self, side: Side) -> Option<Square> {
        self.pieces[Piece::new(side, PieceKind::King).index()].lsb()
    }

    /// Whether `side` owns anything besides pawns and its king.
    pub fn has_non_pawn_material(&self, side: Side) -> bool {
        [
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
        ]
        .into_iter()
        .any(|kind| self.pieces[Piece::new(side, kind).index()].any())
    }

    /// Successor position after `mv`, which must come from this position's
    /// pseudo-legal move list.
    pub fn apply_move(&self, mv: Move) -> Position {
        let mut next = self.clone();
        let side = self.side;
        let opponent = side.opposite();
        let source = mv.source();
        let target = mv.target();
        let moved = mv.piece();
        let placed = mv.promoted_piece().unwrap_or(moved);

        next.pieces[moved.index()].clear(source);
        next.pieces[placed.index()].set(target);
        next.occupancy[side.index()].clear(source);
        next.occupancy[side.index()].set(target);

        if mv.is_capture() {
            let captured_square = if mv.is_en_passant() {
                en_passant_capture_square(side, target)
            } else {
                target
            };
            next.remove_piece_of(opponent, captured_square);
        }

        next.en_passant = if mv.is_double_pawn_push() {
            Some((source + target) / 2)
        } else {
            None
        };

        if mv.is_castle() {
            let castle = if mv.is_short_castle() {
                SHORT_CASTLE[side.index()]
            } else {
                LONG_CASTLE[side.index()]
            };
            let rook = Piece::new(side, PieceKind::Rook).index();
            next.pieces[rook].clear(castle.rook_from);
            next.pieces[rook].set(castle.rook_to);
            next.occupancy[side.index()].clear(castle.rook_from);
            next.occupancy[side.index()].set(castle.rook_to);
        }

        next.side = opponent;
        next.occupancy[Side::Both.index()] =
            next.occupancy[Side::White.index()] | next.occupancy[Side::Black.index()];
        next.castling = next
            .castling
            .intersection(CASTLING_RIGHTS_UPDATE[source as usize])
            .intersection(CASTLING_RIGHTS_UPDATE[target as usize]);

        next
    }

    /// Same board with the turn passed to the opponent.
    pub fn with_null_move(&self) -> Position {
        let mut next = self.clone();
        next.side = self.side.opposite();
        next.en_passant = None;
        next
    }

    /// Full validity check: both kings present (exactly one each) and the side
    /// that just moved is not in check. Safe on externally supplied positions.
    pub fn is_valid(&self, tables: &AttackTables) -> bool {
        let own_kings = self.pieces[Piece::new(self.side, PieceKind::King).index()];
        let other_kings = self.pieces[Piece::new(self.side.opposite(), PieceKind::King).index()];
        if own_kings.count() != 1 || other_kings.count() != 1 {
            return false;
        }
        self.was_produced_by_valid_move(tables)
    }

    /// Cheap check that the side that just moved did not leave its king
    /// attacked. Only meaningful on the direct result of `apply_move` from a
    /// valid parent.
    pub fn was_produced_by_valid_move(&self, tables: &AttackTables) -> bool {
        match self.king_square(self.side.opposite()) {
            Some(king) => !tables.is_square_attacked(king, self.side, &self.pieces, &self.occupancy),
            None => false,
        }
    }

    /// Whether the side to move is in check.
    pub fn is_in_check(&self, tables: &AttackTables) -> bool {
        match self.king_square(self.side) {
            Some(king) => tables.is_square_attacked(
                king,
                self.side.opposite(),
                &self.pieces,
                &self.occupancy,
            ),
            None => false,
        }
    }

    /// Static evaluation, positive when White is better.
    #[inline]
    pub fn static_evaluation(&self, tables: &AttackTables) -> i32 {
        evaluate_absolute(self, tables)
    }

    /// Static evaluation, positive when the side to move is better.
    #[inline]
    pub fn static_evaluation_relative(&self, tables: &AttackTables) -> i32 {
        evaluate_absolute(self, tables) * self.side.sign()
    }

    /// Score of a position with no legal moves, from the side to move's view.
    ///
    /// Mate scores grow with `depth_left`, so a mate found closer to the root
    /// is more extreme than one found deeper. Stalemate is exactly zero.
    pub fn evaluate_final_position(&self, tables: &AttackTables, depth_left: u8) -> i32 {
        if self.is_in_check(tables) {
            -(CHECKMATE_SCORE + DEPTH_FACTOR * i32::from(depth_left))
        } else {
            0
        }
    }

    /// [`Position::evaluate_final_position`] with White-positive sign.
    pub fn evaluate_final_position_absolute(&self, tables: &AttackTables, depth_left: u8) -> i32 {
        self.evaluate_final_position(tables, depth_left) * self.side.sign()
    }

    fn remove_piece_of(&mut self, side: Side, square: Square) {
        for kind in PieceKind::ALL {
            let board = &mut self.pieces[Piece::new(side, kind).index()];
            if board.get(square) {
                board.clear(square);
                break;
            }
        }
        self.occupancy[side.index()].clear(square);
    }

    fn recalc_occupancy(&mut self) {
        let mut white = BitBoard::EMPTY;
        let mut black = BitBoard::EMPTY;
        for piece in Piece::ALL {
            match piece.side() {
                Side::White => white |= self.pieces[piece.index()],
                _ => black |= self.pieces[piece.index()],
            }
        }
        self.occupancy = [white, black, white | black];
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

/// Board diagram (rank 8 on top) followed by the FEN.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let c = self
                    .piece_at(rank * 8 + file)
                    .map_or('.', Piece::to_fen_char);
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")?;
        write!(f, "{}", self.fen())
    }
}

#[cfg(test)]
mod tests {
    use super::Position;
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::game_state::chess_types::{CastlingRights, Piece, Side};
    use crate::move_generation::move_generator::generate_moves;
    use crate::moves::attack_tables::AttackTables;
    use crate::moves::move_descriptions::Move;
    use crate::test_support::{find_move, tables};

    fn assert_board_invariants(position: &Position) {
        let occ = position.occupancy();
        assert_eq!(occ[2], occ[0] | occ[1]);
        assert!((occ[0] & occ[1]).is_empty());
        let mut seen = 0u64;
        for piece in Piece::ALL {
            let board = position.piece_board(piece).bits();
            assert_eq!(seen & board, 0, "square shared by two piece boards");
            seen |= board;
        }
        assert_eq!(seen, occ[2].bits());
    }

    fn walk(position: &Position, tables: &AttackTables, depth: u8) {
        assert_board_invariants(position);
        if depth == 0 {
            return;
        }
        for mv in generate_moves(position, tables, false) {
            let next = position.apply_move(mv);
            if next.was_produced_by_valid_move(tables) {
                walk(&next, tables, depth - 1);
            }
        }
    }

    #[test]
    fn start_matches_starting_fen() {
        let parsed = Position::from_fen(STARTING_POSITION_FEN).expect("start fen should parse");
        assert_eq!(Position::start(), parsed);
        assert_eq!(Position::start().fen(), STARTING_POSITION_FEN);
    }

    #[test]
    fn occupancy_invariants_hold_through_move_tree() {
        let tables = tables();
        walk(&Position::start(), tables, 3);
        let kiwipete = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .expect("kiwipete should parse");
        walk(&kiwipete, tables, 2);
    }

    #[test]
    fn double_push_sets_and_next_move_clears_en_passant() {
        let tables = tables();
        let start = Position::start();
        let e4 = find_move(&start, tables, "e2e4");
        let after = start.apply_move(e4);
        assert_eq!(after.en_passant_square(), Some(20));
        assert_eq!(after.side_to_move(), Side::Black);
        let nf6 = find_move(&after, tables, "g8f6");
        assert_eq!(after.apply_move(nf6).en_passant_square(), None);
    }

    #[test]
    fn en_passant_removes_pawn_behind_target() {
        let tables = tables();
        let position = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1")
            .expect("fen should parse");
        let mv = find_move(&position, tables, "e5d6");
        assert!(mv.is_en_passant());
        let after = position.apply_move(mv);
        assert_eq!(after.piece_at(35), None, "d5 pawn captured");
        assert_eq!(after.piece_at(43), Some(Piece::WhitePawn));
        assert_eq!(after.fen(), "4k3/8/3P4/8/8/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn castling_relocates_rook_and_drops_rights() {
        let tables = tables();
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .expect("fen should parse");
        let castle = find_move(&position, tables, "e1g1");
        assert!(castle.is_short_castle());
        let after = position.apply_move(castle);
        assert_eq!(after.piece_at(5), Some(Piece::WhiteRook));
        assert_eq!(after.piece_at(7), None);
        assert_eq!(
            after.castling_rights(),
            CastlingRights::BLACK_KING_SIDE.union(CastlingRights::BLACK_QUEEN_SIDE)
        );

        let long = find_move(&after, tables, "e8c8");
        assert!(long.is_long_castle());
        let after_long = after.apply_move(long);
        assert_eq!(after_long.piece_at(59), Some(Piece::BlackRook));
        assert_eq!(after_long.castling_rights(), CastlingRights::NONE);
    }

    #[test]
    fn capturing_corner_rook_clears_that_right() {
        let tables = tables();
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .expect("fen should parse");
        let rxa8 = find_move(&position, tables, "a1a8");
        let after = position.apply_move(rxa8);
        assert!(!after.castling_rights().contains(CastlingRights::BLACK_QUEEN_SIDE));
        assert!(!after.castling_rights().contains(CastlingRights::WHITE_QUEEN_SIDE));
        assert!(after.castling_rights().contains(CastlingRights::WHITE_KING_SIDE));
        assert!(after.castling_rights().contains(CastlingRights::BLACK_KING_SIDE));
    }

    #[test]
    fn promotion_places_promoted_piece() {
        let tables = tables();
        let position = Position::from_fen("7k/4P3/8/8/8/8/8/K7 w - - 0 1").expect("fen should parse");
        let mv = find_move(&position, tables, "e7e8n");
        let after = position.apply_move(mv);
        assert_eq!(after.piece_at(60), Some(Piece::WhiteKnight));
        assert!(after.piece_board(Piece::WhitePawn).is_empty());
    }

    #[test]
    fn is_valid_requires_both_kings() {
        let tables = tables();
        let no_black_king = Position::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").expect("fen should parse");
        assert!(!no_black_king.is_valid(tables));
        assert!(Position::start().is_valid(tables));
        // Black to move while the White king is attacked: White just moved illegally.
        let exposed = Position::from_fen("4k3/8/8/8/8/8/8/r3K3 b - - 0 1").expect("fen should parse");
        assert!(!exposed.is_valid(tables));
    }

    #[test]
    fn checkmate_and_stalemate_scores() {
        let tables = tables();
        let mated = Position::from_fen("6k1/6Q1/6K1/8/8/8/8/8 b - - 0 1").expect("fen should parse");
        // g7 queen is defended by the g6 king and covers every flight square.
        assert!(mated.is_in_check(tables));
        let mate_score = mated.evaluate_final_position(tables, 0);
        assert!(mate_score <= -super::CHECKMATE_SCORE);
        assert!(mated.evaluate_final_position_absolute(tables, 0) > 0);

        let stalemate = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").expect("fen should parse");
        assert!(!stalemate.is_in_check(tables));
        assert_eq!(stalemate.evaluate_final_position(tables, 3), 0);
    }

    #[test]
    fn faster_mates_score_more_extreme() {
        let tables = tables();
        let mated = Position::from_fen("6k1/6Q1/6K1/8/8/8/8/8 b - - 0 1").expect("fen should parse");
        // Mate after one ply of a depth-3 search leaves 2 plies; after three plies none are left.
        let mate_in_one = mated.evaluate_final_position(tables, 2);
        let mate_in_three = mated.evaluate_final_position(tables, 0);
        assert!(mate_in_one < mate_in_three);
    }

    #[test]
    fn null_move_flips_side_only() {
        let position = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").expect("fen should parse");
        let null = position.with_null_move();
        assert_eq!(null.side_to_move(), Side::Black);
        assert_eq!(null.en_passant_square(), None);
        assert_eq!(null.pieces(), position.pieces());
    }

    #[test]
    fn move_equality_survives_application() {
        let tables = tables();
        let position = Position::start();
        let a: Move = find_move(&position, tables, "g1f3");
        let b: Move = find_move(&position, tables, "g1f3");
        assert_eq!(position.apply_move(a), position.apply_move(b));
    }
}
