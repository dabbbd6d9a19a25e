//! Pseudo-legal move generation.
//!
//! Moves are produced without checking whether they leave the mover's king
//! in check; callers apply each move and keep it only if the resulting
//! position passes `Position::was_produced_by_valid_move`. Castling is the
//! exception: its path-safety rules are checked here because they are not
//! expressible as "king not attacked afterwards".

use crate::game_state::bitboard::BitBoard;
use crate::game_state::chess_rules::{
    CastleSquares, LONG_CASTLE, PAWN_START_RANK, PROMOTION_RANK, SHORT_CASTLE,
};
use crate::game_state::chess_types::{
    square_rank, CastlingRights, Piece, PieceKind, Side, Square,
};
use crate::game_state::position::Position;
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::{
    Move, FLAG_CAPTURE, FLAG_DOUBLE_PAWN_PUSH, FLAG_EN_PASSANT, FLAG_LONG_CASTLE,
    FLAG_SHORT_CASTLE,
};

/// Pseudo-legal moves for the side to move.
///
/// With `captures_only`, only moves landing on an opponent piece (or the
/// en-passant square) are produced.
pub fn generate_moves(position: &Position, tables: &AttackTables, captures_only: bool) -> Vec<Move> {
    let mut moves = Vec::with_capacity(64);
    generate_moves_into(position, tables, captures_only, &mut moves);
    moves
}

pub fn generate_moves_into(
    position: &Position,
    tables: &AttackTables,
    captures_only: bool,
    out: &mut Vec<Move>,
) {
    let side = position.side_to_move();
    let own = position.occupancy_of(side);
    let enemy = position.occupancy_of(side.opposite());
    let both = position.occupancy()[Side::Both.index()];
    // Squares a non-pawn piece may land on.
    let targets = if captures_only { enemy } else { !own };

    generate_pawn_moves(position, tables, captures_only, out);

    for kind in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ] {
        let piece = Piece::new(side, kind);
        for source in position.piece_board(piece) {
            let attacks = tables.piece_attacks(kind, side, source, both) & targets;
            push_piece_moves(source, attacks, piece, enemy, out);
        }
    }

    if !captures_only {
        generate_castling_moves(position, tables, out);
    }
}

/// Pseudo-legal moves filtered down to the legal ones.
pub fn legal_moves(position: &Position, tables: &AttackTables) -> Vec<Move> {
    generate_moves(position, tables, false)
        .into_iter()
        .filter(|&mv| position.apply_move(mv).was_produced_by_valid_move(tables))
        .collect()
}

/// Whether the side to move has at least one legal move.
pub fn has_legal_move(position: &Position, tables: &AttackTables) -> bool {
    generate_moves(position, tables, false)
        .into_iter()
        .any(|mv| position.apply_move(mv).was_produced_by_valid_move(tables))
}

fn push_piece_moves(source: Square, attacks: BitBoard, piece: Piece, enemy: BitBoard, out: &mut Vec<Move>) {
    for target in attacks {
        let flags = if enemy.get(target) { FLAG_CAPTURE } else { 0 };
        out.push(Move::new(source, target, piece, None, flags));
    }
}

fn generate_pawn_moves(
    position: &Position,
    tables: &AttackTables,
    captures_only: bool,
    out: &mut Vec<Move>,
) {
    let side = position.side_to_move();
    let pawn = Piece::new(side, PieceKind::Pawn);
    let enemy = position.occupancy_of(side.opposite());
    let empty = !position.occupancy()[Side::Both.index()];
    let start_rank = PAWN_START_RANK[side.index()];
    let promotion_rank = PROMOTION_RANK[side.index()];

    for source in position.piece_board(pawn) {
        let captures = tables.pawn_attacks(side, source) & enemy;
        for target in captures {
            push_pawn_move(source, target, pawn, promotion_rank, FLAG_CAPTURE, out);
        }

        if let Some(ep) = position.en_passant_square() {
            if tables.pawn_attacks(side, source).get(ep) {
                out.push(Move::new(source, ep, pawn, None, FLAG_CAPTURE | FLAG_EN_PASSANT));
            }
        }

        if captures_only {
            continue;
        }

        let Some(single) = forward(side, source) else {
            continue;
        };
        if !empty.get(single) {
            continue;
        }
        push_pawn_move(source, single, pawn, promotion_rank, 0, out);

        if square_rank(source) == start_rank {
            if let Some(double) = forward(side, single) {
                if empty.get(double) {
                    out.push(Move::new(source, double, pawn, None, FLAG_DOUBLE_PAWN_PUSH));
                }
            }
        }
    }
}

fn push_pawn_move(
    source: Square,
    target: Square,
    pawn: Piece,
    promotion_rank: u8,
    flags: u32,
    out: &mut Vec<Move>,
) {
    if square_rank(target) == promotion_rank {
        for kind in PieceKind::PROMOTIONS {
            let promoted = Piece::new(pawn.side(), kind);
            out.push(Move::new(source, target, pawn, Some(promoted), flags));
        }
    } else {
        out.push(Move::new(source, target, pawn, None, flags));
    }
}

#[inline]
fn forward(side: Side, square: Square) -> Option<Square> {
    match side {
        Side::Black => square.checked_sub(8),
        _ => square.checked_add(8).filter(|&sq| sq < 64),
    }
}

fn generate_castling_moves(position: &Position, tables: &AttackTables, out: &mut Vec<Move>) {
    let side = position.side_to_move();
    let rights = position.castling_rights();
    let short = CastlingRights::king_side(side);
    let long = CastlingRights::queen_side(side);

    if rights.contains(short) {
        try_castle(position, tables, SHORT_CASTLE[side.index()], FLAG_SHORT_CASTLE, out);
    }
    if rights.contains(long) {
        try_castle(position, tables, LONG_CASTLE[side.index()], FLAG_LONG_CASTLE, out);
    }
}

/// Requires king and rook on their home squares, an empty path between them,
/// and no attacked square from the king's start to its landing square.
fn try_castle(
    position: &Position,
    tables: &AttackTables,
    castle: CastleSquares,
    flag: u32,
    out: &mut Vec<Move>,
) {
    let side = position.side_to_move();
    let king = Piece::new(side, PieceKind::King);
    let rook = Piece::new(side, PieceKind::Rook);
    if !position.piece_board(king).get(castle.king_from)
        || !position.piece_board(rook).get(castle.rook_from)
    {
        return;
    }

    let between = squares_between(castle.king_from, castle.rook_from);
    if (between & position.occupancy()[Side::Both.index()]).any() {
        return;
    }

    let opponent = side.opposite();
    let king_path = squares_between(castle.king_from, castle.king_to)
        .with(castle.king_from)
        .with(castle.king_to);
    let path_attacked = king_path.squares().any(|sq| {
        tables.is_square_attacked(sq, opponent, position.pieces(), position.occupancy())
    });
    if path_attacked {
        return;
    }

    out.push(Move::new(castle.king_from, castle.king_to, king, None, flag));
}

/// Squares strictly between two squares on the same rank.
fn squares_between(a: Square, b: Square) -> BitBoard {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    let mut between = BitBoard::EMPTY;
    for sq in (low + 1)..high {
        between.set(sq);
    }
    between
}

#[cfg(test)]
mod tests {
    use super::{generate_moves, has_legal_move, legal_moves};
    use crate::game_state::chess_types::Side;
    use crate::game_state::position::Position;
    use crate::test_support::{find_move, tables};

    fn uci_list(moves: &[crate::moves::move_descriptions::Move]) -> Vec<String> {
        let mut out: Vec<String> = moves.iter().map(|m| m.to_string()).collect();
        out.sort();
        out
    }

    #[test]
    fn start_position_has_twenty_legal_moves() {
        let tables = tables();
        let position = Position::start();
        assert_eq!(generate_moves(&position, tables, false).len(), 20);
        assert_eq!(legal_moves(&position, tables).len(), 20);
        assert!(generate_moves(&position, tables, true).is_empty());
    }

    #[test]
    fn captures_only_keeps_captures_and_en_passant() {
        let tables = tables();
        let position = Position::from_fen("4k3/8/8/3pP3/8/2n5/1P6/4K3 w - d6 0 1")
            .expect("fen should parse");
        let captures = generate_moves(&position, tables, true);
        assert_eq!(uci_list(&captures), vec!["b2c3", "e5d6"]);
        assert!(captures.iter().all(|m| m.is_capture()));
        assert!(captures.iter().any(|m| m.is_en_passant()));
    }

    #[test]
    fn promotions_generate_four_moves_per_target() {
        let tables = tables();
        let position = Position::from_fen("3r3k/4P3/8/8/8/8/8/K7 w - - 0 1").expect("fen should parse");
        let moves = generate_moves(&position, tables, false);
        let promotions: Vec<_> = moves.iter().filter(|m| m.is_promotion()).collect();
        // e7e8 push and e7xd8 capture, four pieces each.
        assert_eq!(promotions.len(), 8);
        assert_eq!(promotions.iter().filter(|m| m.is_capture()).count(), 4);
        let captures = generate_moves(&position, tables, true);
        assert_eq!(captures.iter().filter(|m| m.is_promotion()).count(), 4);
    }

    #[test]
    fn double_push_needs_both_squares_empty() {
        let tables = tables();
        let blocked = Position::from_fen("4k3/8/8/8/4n3/8/4P3/4K3 w - - 0 1").expect("fen should parse");
        let moves = uci_list(&generate_moves(&blocked, tables, false));
        assert!(moves.contains(&"e2e3".to_owned()));
        assert!(!moves.contains(&"e2e4".to_owned()));
    }

    #[test]
    fn castling_requires_safe_path() {
        let tables = tables();
        // Black rook on f8 covers f1: no short castle; long castle is fine.
        let position = Position::from_fen("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1").expect("fen should parse");
        let moves = uci_list(&generate_moves(&position, tables, false));
        assert!(!moves.contains(&"e1g1".to_owned()));
        assert!(moves.contains(&"e1c1".to_owned()));

        // b1 may be attacked during a long castle; only the king's squares matter.
        let b_file = Position::from_fen("1r2k3/8/8/8/8/8/8/R3K3 w Q - 0 1").expect("fen should parse");
        assert!(uci_list(&generate_moves(&b_file, tables, false)).contains(&"e1c1".to_owned()));

        // No castling out of check.
        let in_check = Position::from_fen("4r1k1/8/8/8/8/8/8/R3K2R w KQ - 0 1").expect("fen should parse");
        let moves = uci_list(&generate_moves(&in_check, tables, false));
        assert!(!moves.contains(&"e1g1".to_owned()));
        assert!(!moves.contains(&"e1c1".to_owned()));
    }

    #[test]
    fn castling_blocked_by_piece_between() {
        let tables = tables();
        let position = Position::from_fen("4k3/8/8/8/8/8/8/RN2K2R w KQ - 0 1").expect("fen should parse");
        let moves = uci_list(&generate_moves(&position, tables, false));
        assert!(!moves.contains(&"e1c1".to_owned()));
        assert!(moves.contains(&"e1g1".to_owned()));
    }

    #[test]
    fn en_passant_discovered_check_is_rejected() {
        let tables = tables();
        let position = Position::from_fen("8/8/8/k1pP3R/8/8/8/n4K2 w - c6 0 1").expect("fen should parse");
        let ep = find_move(&position, tables, "d5c6");
        assert!(ep.is_en_passant());

        let after = position.apply_move(ep);
        assert!(after.was_produced_by_valid_move(tables));
        assert_eq!(after.side_to_move(), Side::Black);

        for reply in legal_moves(&after, tables) {
            let next = after.apply_move(reply);
            for white_reply in legal_moves(&next, tables) {
                let after_white = next.apply_move(white_reply);
                assert!(after_white.was_produced_by_valid_move(tables));
                let white_king = after_white.king_square(Side::White).expect("white king present");
                assert!(!tables.is_square_attacked(
                    white_king,
                    Side::Black,
                    after_white.pieces(),
                    after_white.occupancy()
                ));
            }
        }
    }

    #[test]
    fn pinned_en_passant_is_filtered() {
        let tables = tables();
        // Removing both fifth-rank pawns would open the h5 rook onto the a5 king.
        let position = Position::from_fen("8/8/8/KPp4r/8/8/8/7k w - c6 0 1").expect("fen should parse");
        let legal = uci_list(&legal_moves(&position, tables));
        assert!(!legal.contains(&"b5c6".to_owned()));
        let pseudo = uci_list(&generate_moves(&position, tables, false));
        assert!(pseudo.contains(&"b5c6".to_owned()));
    }

    #[test]
    fn checkmated_side_has_no_legal_move() {
        let tables = tables();
        let mated = Position::from_fen("6k1/6Q1/6K1/8/8/8/8/8 b - - 0 1").expect("fen should parse");
        assert!(!has_legal_move(&mated, tables));
        assert!(has_legal_move(&Position::start(), tables));
    }
}
