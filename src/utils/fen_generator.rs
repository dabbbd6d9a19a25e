//! Position-to-FEN serializer.
//!
//! The inverse of [`crate::utils::fen_parser::parse_fen`] for every field a
//! `Position` stores. Move counters are supplied by the caller.

use std::fmt::Write;

use crate::game_state::chess_types::{square_at, Side};
use crate::game_state::position::Position;
use crate::utils::algebraic::square_name;

pub fn generate_fen(position: &Position, halfmove_clock: u16, fullmove_number: u16) -> String {
    let side = match position.side_to_move() {
        Side::Black => 'b',
        _ => 'w',
    };
    let en_passant = position
        .en_passant_square()
        .map_or_else(|| "-".to_owned(), square_name);

    format!(
        "{} {} {} {} {} {}",
        generate_board_field(position),
        side,
        position.castling_rights(),
        en_passant,
        halfmove_clock,
        fullmove_number
    )
}

fn generate_board_field(position: &Position) -> String {
    let mut out = String::with_capacity(72);

    for rank in (0..8u8).rev() {
        let mut empty_run = 0u8;
        for file in 0..8u8 {
            match position.piece_at(square_at(file, rank)) {
                Some(piece) => {
                    if empty_run > 0 {
                        let _ = write!(out, "{empty_run}");
                        empty_run = 0;
                    }
                    out.push(piece.to_fen_char());
                }
                None => empty_run += 1,
            }
        }
        if empty_run > 0 {
            let _ = write!(out, "{empty_run}");
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out
}
