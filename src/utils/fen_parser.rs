//! FEN-to-Position parser.
//!
//! Parsing is strict: all six fields must be present and well formed, and any
//! defect is reported as a [`FenError`] instead of producing a guessed board.

use crate::errors::FenError;
use crate::game_state::bitboard::BitBoard;
use crate::game_state::chess_types::{
    square_at, square_rank, CastlingRights, Piece, PieceKind, Side, Square,
};
use crate::game_state::position::Position;
use crate::utils::algebraic::parse_square;

/// A parsed FEN: the position plus the move counters it does not store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFen {
    pub position: Position,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

pub fn parse_fen(fen: &str) -> Result<ParsedFen, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let [board, side, castling, en_passant, halfmove, fullmove] = fields[..] else {
        return Err(FenError::FieldCount(fields.len()));
    };

    let pieces = parse_board(board)?;
    let side = parse_side_to_move(side)?;
    let castling = parse_castling_rights(castling)?;
    let en_passant = parse_en_passant_square(en_passant, side, &pieces)?;
    let halfmove_clock = halfmove
        .parse::<u16>()
        .map_err(|_| FenError::HalfMoveClock(halfmove.to_owned()))?;
    let fullmove_number = fullmove
        .parse::<u16>()
        .map_err(|_| FenError::FullMoveNumber(fullmove.to_owned()))?;

    Ok(ParsedFen {
        position: Position::from_parts(pieces, side, castling, en_passant),
        halfmove_clock,
        fullmove_number,
    })
}

fn parse_board(board: &str) -> Result<[BitBoard; 12], FenError> {
    let ranks: Vec<&str> = board.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    let mut pieces = [BitBoard::EMPTY; 12];
    for (fen_rank_idx, rank_text) in ranks.iter().enumerate() {
        let rank = 7 - fen_rank_idx as u8;
        let mut file = 0usize;

        for ch in rank_text.chars() {
            if let Some(run) = ch.to_digit(10) {
                if !(1..=8).contains(&run) {
                    return Err(FenError::PieceLetter(ch));
                }
                file += run as usize;
                continue;
            }

            let piece = Piece::from_fen_char(ch).ok_or(FenError::PieceLetter(ch))?;
            if file >= 8 {
                return Err(FenError::RankWidth {
                    rank: rank + 1,
                    files: file + 1,
                });
            }
            pieces[piece.index()].set(square_at(file as u8, rank));
            file += 1;
        }

        if file != 8 {
            return Err(FenError::RankWidth {
                rank: rank + 1,
                files: file,
            });
        }
    }

    Ok(pieces)
}

fn parse_side_to_move(text: &str) -> Result<Side, FenError> {
    match text {
        "w" => Ok(Side::White),
        "b" => Ok(Side::Black),
        _ => Err(FenError::SideToMove(text.to_owned())),
    }
}

fn parse_castling_rights(text: &str) -> Result<CastlingRights, FenError> {
    if text == "-" {
        return Ok(CastlingRights::NONE);
    }
    if text.is_empty() {
        return Err(FenError::CastlingRights(text.to_owned()));
    }

    let mut rights = CastlingRights::NONE;
    for ch in text.chars() {
        let right = match ch {
            'K' => CastlingRights::WHITE_KING_SIDE,
            'Q' => CastlingRights::WHITE_QUEEN_SIDE,
            'k' => CastlingRights::BLACK_KING_SIDE,
            'q' => CastlingRights::BLACK_QUEEN_SIDE,
            _ => return Err(FenError::CastlingRights(text.to_owned())),
        };
        rights.insert(right);
    }
    Ok(rights)
}

/// The target must sit behind a pawn of the side that just moved: rank 6
/// with White to move, rank 3 with Black to move.
fn parse_en_passant_square(
    text: &str,
    side: Side,
    pieces: &[BitBoard; 12],
) -> Result<Option<Square>, FenError> {
    if text == "-" {
        return Ok(None);
    }

    let square = parse_square(text).map_err(|_| FenError::EnPassantSquare(text.to_owned()))?;
    let (expected_rank, pawn_square) = match side {
        Side::White => (5, square.checked_sub(8)),
        _ => (2, square.checked_add(8)),
    };
    if square_rank(square) != expected_rank {
        return Err(FenError::EnPassantRank {
            square: text.to_owned(),
            expected_rank: expected_rank + 1,
        });
    }

    let pushed_pawn = pieces[Piece::new(side.opposite(), PieceKind::Pawn).index()];
    match pawn_square {
        Some(sq) if pushed_pawn.get(sq) => Ok(Some(square)),
        _ => Err(FenError::EnPassantPawnMissing(text.to_owned())),
    }
}
