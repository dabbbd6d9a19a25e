//! Zobrist hashing for transposition-table keys.
//!
//! Keys come from a fixed xoshiro seed so hashes are deterministic across
//! runs, which keeps search results reproducible in tests. The key set is a
//! plain value owned by the search engine rather than a global.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::game_state::chess_types::{square_file, Piece, Side};
use crate::game_state::position::Position;

const ZOBRIST_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub struct ZobristKeys {
    piece_square: [[u64; 64]; 12],
    side_to_move: u64,
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

impl ZobristKeys {
    pub fn new() -> Self {
        Self::from_seed(ZOBRIST_SEED)
    }

    pub fn from_seed(seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let mut piece_square = [[0u64; 64]; 12];
        for piece in &mut piece_square {
            for key in piece.iter_mut() {
                *key = rng.next_u64();
            }
        }
        let side_to_move = rng.next_u64();
        let mut castling = [0u64; 16];
        for key in &mut castling {
            *key = rng.next_u64();
        }
        let mut en_passant_file = [0u64; 8];
        for key in &mut en_passant_file {
            *key = rng.next_u64();
        }

        Self {
            piece_square,
            side_to_move,
            castling,
            en_passant_file,
        }
    }

    /// Full key of a position, recomputed from its piece boards.
    pub fn hash(&self, position: &Position) -> u64 {
        let mut key = 0u64;

        for piece in Piece::ALL {
            let mut board = position.piece_board(piece);
            while let Some(square) = board.pop_lsb() {
                key ^= self.piece_square[piece.index()][square as usize];
            }
        }

        if position.side_to_move() == Side::Black {
            key ^= self.side_to_move;
        }
        key ^= self.castling[usize::from(position.castling_rights().bits() & 0x0F)];
        if let Some(square) = position.en_passant_square() {
            key ^= self.en_passant_file[usize::from(square_file(square))];
        }

        key
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}
