//! Long algebraic (UCI) move text.
//!
//! Parsing resolves text such as `e7e8q` against the legal moves of a
//! position, so the returned `Move` carries the same flags the generator
//! would have produced.

use crate::errors::MoveParseError;
use crate::game_state::chess_types::PieceKind;
use crate::game_state::position::Position;
use crate::move_generation::move_generator::legal_moves;
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::Move;
use crate::utils::algebraic::parse_square;

#[inline]
pub fn move_to_uci(mv: Move) -> String {
    mv.to_string()
}

pub fn parse_uci_move(
    text: &str,
    position: &Position,
    tables: &AttackTables,
) -> Result<Move, MoveParseError> {
    let text = text.trim();
    if !text.is_ascii() || !(text.len() == 4 || text.len() == 5) {
        return Err(MoveParseError::Malformed(text.to_owned()));
    }

    let source = parse_square(&text[0..2])?;
    let target = parse_square(&text[2..4])?;
    let promotion = match text[4..].chars().next() {
        None => None,
        Some(c) => match PieceKind::from_char(c) {
            Some(kind @ (PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen))
                if c.is_ascii_lowercase() =>
            {
                Some(kind)
            }
            _ => return Err(MoveParseError::Promotion(c)),
        },
    };

    let piece = position
        .piece_at(source)
        .ok_or_else(|| MoveParseError::EmptySquare(text[0..2].to_owned()))?;
    if piece.side() != position.side_to_move() {
        return Err(MoveParseError::WrongSide(text[0..2].to_owned()));
    }

    legal_moves(position, tables)
        .into_iter()
        .find(|mv| {
            mv.source() == source
                && mv.target() == target
                && mv.promoted_piece().map(|p| p.kind()) == promotion
        })
        .ok_or_else(|| MoveParseError::Illegal(text.to_owned()))
}
