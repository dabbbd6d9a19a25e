//! Static evaluation.
//!
//! Scores are tapered: every term carries a middlegame and an endgame value
//! and the two are blended by the remaining non-pawn material. Piece boards
//! are walked with `pop_lsb`, so the cost scales with the piece count rather
//! than with the 64 squares.
//!
//! [`evaluate_absolute`] is White-positive; [`BoardScorer`] implementations
//! score from the side to move's perspective, as negamax expects. Slider
//! mobility needs the magic lookups, so scorers receive the attack tables.

use crate::game_state::bitboard::BitBoard;
use crate::game_state::chess_types::{square_file, square_rank, Piece, PieceKind, Side, Square};
use crate::game_state::position::Position;
use crate::moves::attack_tables::AttackTables;
use crate::moves::leaper_attacks::KING_ATTACKS;

/// Base magnitude of a mate score. Static evaluations stay well below it.
pub const CHECKMATE_SCORE: i32 = 30_000;
/// Added per ply of remaining depth so that faster mates score higher.
pub const DEPTH_FACTOR: i32 = 10;
/// Bound larger than any reachable score.
pub const INFINITE_SCORE: i32 = 50_000;

#[inline]
pub const fn is_mate_score(score: i32) -> bool {
    score >= CHECKMATE_SCORE || score <= -CHECKMATE_SCORE
}

pub trait BoardScorer: Send + Sync {
    /// Score from the perspective of the side to move.
    fn score(&self, position: &Position, tables: &AttackTables) -> i32;
}

/// Material, piece-square tables, structure and slider mobility, tapered.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaperedScorer;

impl BoardScorer for TaperedScorer {
    #[inline]
    fn score(&self, position: &Position, tables: &AttackTables) -> i32 {
        evaluate_absolute(position, tables) * position.side_to_move().sign()
    }
}

/// Plain material count; handy when a test needs predictable scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialScorer;

impl MaterialScorer {
    #[inline]
    pub const fn piece_value(kind: PieceKind) -> i32 {
        match kind {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 320,
            PieceKind::Bishop => 330,
            PieceKind::Rook => 500,
            PieceKind::Queen => 900,
            PieceKind::King => 0,
        }
    }
}

impl BoardScorer for MaterialScorer {
    fn score(&self, position: &Position, _tables: &AttackTables) -> i32 {
        let white_minus_black: i32 = Piece::ALL
            .into_iter()
            .map(|piece| {
                piece.side().sign()
                    * Self::piece_value(piece.kind())
                    * position.piece_board(piece).count() as i32
            })
            .sum();
        white_minus_black * position.side_to_move().sign()
    }
}

/// Middlegame / endgame pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tapered(i32, i32);

impl std::ops::AddAssign for Tapered {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.1 += rhs.1;
    }
}

impl std::ops::Mul<i32> for Tapered {
    type Output = Self;
    fn mul(self, rhs: i32) -> Self {
        Self(self.0 * rhs, self.1 * rhs)
    }
}

const MATERIAL: [Tapered; 6] = [
    Tapered(82, 94),
    Tapered(337, 281),
    Tapered(365, 297),
    Tapered(477, 512),
    Tapered(1025, 936),
    Tapered(0, 0),
];

/// Phase weight per piece kind; a full board sums to `MAX_PHASE`.
const PHASE_WEIGHT: [i32; 6] = [0, 1, 1, 2, 4, 0];
const MAX_PHASE: i32 = 24;

const DOUBLED_PAWN: Tapered = Tapered(-6, -12);
const ISOLATED_PAWN: Tapered = Tapered(-17, -13);
const OPEN_FILE_ROOK: Tapered = Tapered(47, 10);
const SEMI_OPEN_FILE_ROOK: Tapered = Tapered(18, 17);
const OPEN_FILE_KING: Tapered = Tapered(-105, 8);
const SEMI_OPEN_FILE_KING: Tapered = Tapered(-36, 24);
const KING_SHIELD: Tapered = Tapered(16, -6);
const BISHOP_PAIR: Tapered = Tapered(31, 80);

/// Per reachable square that is empty or holds an enemy piece.
const BISHOP_MOBILITY: Tapered = Tapered(10, 9);
const ROOK_MOBILITY: Tapered = Tapered(5, 5);
const QUEEN_MOBILITY: Tapered = Tapered(4, 7);

/// Passed pawn bonus by rank relative to the pawn's own side.
const PASSED_PAWN: [Tapered; 8] = [
    Tapered(0, 0),
    Tapered(-2, 7),
    Tapered(-15, 13),
    Tapered(-14, 41),
    Tapered(20, 74),
    Tapered(60, 150),
    Tapered(98, 217),
    Tapered(0, 0),
];

// Piece-square tables from White's point of view, a1 first.
#[rustfmt::skip]
const PAWN_PST: [i32; 64] = [
     0,   0,   0,   0,   0,   0,   0,   0,
     5,  10,  10, -20, -20,  10,  10,   5,
     5,  -5, -10,   0,   0, -10,  -5,   5,
     0,   0,   0,  20,  20,   0,   0,   0,
     5,   5,  10,  25,  25,  10,   5,   5,
    10,  10,  20,  30,  30,  20,  10,  10,
    50,  50,  50,  50,  50,  50,  50,  50,
     0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
   -50, -40, -30, -30, -30, -30, -40, -50,
   -40, -20,   0,   5,   5,   0, -20, -40,
   -30,   5,  10,  15,  15,  10,   5, -30,
   -30,   0,  15,  20,  20,  15,   0, -30,
   -30,   5,  15,  20,  20,  15,   5, -30,
   -30,   0,  10,  15,  15,  10,   0, -30,
   -40, -20,   0,   0,   0,   0, -20, -40,
   -50, -40, -30, -30, -30, -30, -40, -50,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
   -20, -10, -10, -10, -10, -10, -10, -20,
   -10,   5,   0,   0,   0,   0,   5, -10,
   -10,  10,  10,  10,  10,  10,  10, -10,
   -10,   0,  10,  10,  10,  10,   0, -10,
   -10,   5,   5,  10,  10,   5,   5, -10,
   -10,   0,   5,  10,  10,   5,   0, -10,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -20, -10, -10, -10, -10, -10, -10, -20,
];

#[rustfmt::skip]
const ROOK_PST: [i32; 64] = [
     0,   0,   0,   5,   5,   0,   0,   0,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
    -5,   0,   0,   0,   0,   0,   0,  -5,
     5,  10,  10,  10,  10,  10,  10,   5,
     0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const QUEEN_PST: [i32; 64] = [
   -20, -10, -10,  -5,  -5, -10, -10, -20,
   -10,   0,   5,   0,   0,   0,   0, -10,
   -10,   5,   5,   5,   5,   5,   0, -10,
     0,   0,   5,   5,   5,   5,   0,  -5,
    -5,   0,   5,   5,   5,   5,   0,  -5,
   -10,   0,   5,   5,   5,   5,   0, -10,
   -10,   0,   0,   0,   0,   0,   0, -10,
   -20, -10, -10,  -5,  -5, -10, -10, -20,
];

#[rustfmt::skip]
const KING_MIDDLEGAME_PST: [i32; 64] = [
    20,  30,  10,   0,   0,  10,  30,  20,
    20,  20,   0,   0,   0,   0,  20,  20,
   -10, -20, -20, -20, -20, -20, -20, -10,
   -20, -30, -30, -40, -40, -30, -30, -20,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
   -30, -40, -40, -50, -50, -40, -40, -30,
];

#[rustfmt::skip]
const KING_ENDGAME_PST: [i32; 64] = [
   -50, -30, -30, -30, -30, -30, -30, -50,
   -30, -30,   0,   0,   0,   0, -30, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  30,  40,  40,  30, -10, -30,
   -30, -10,  20,  30,  30,  20, -10, -30,
   -30, -20, -10,   0,   0, -10, -20, -30,
   -50, -40, -30, -20, -20, -30, -40, -50,
];

const FILE_MASKS: [u64; 8] = build_file_masks();
const ADJACENT_FILE_MASKS: [u64; 8] = build_adjacent_file_masks();
/// Squares ahead of a pawn on its own and adjacent files, indexed by `[side][square]`.
const PASSED_PAWN_MASKS: [[u64; 64]; 2] = [build_passed_masks(true), build_passed_masks(false)];

const fn build_file_masks() -> [u64; 8] {
    let mut masks = [0u64; 8];
    let mut file = 0;
    while file < 8 {
        masks[file] = 0x0101_0101_0101_0101u64 << file;
        file += 1;
    }
    masks
}

const fn build_adjacent_file_masks() -> [u64; 8] {
    let files = build_file_masks();
    let mut masks = [0u64; 8];
    let mut file = 0;
    while file < 8 {
        if file > 0 {
            masks[file] |= files[file - 1];
        }
        if file < 7 {
            masks[file] |= files[file + 1];
        }
        file += 1;
    }
    masks
}

const fn build_passed_masks(white: bool) -> [u64; 64] {
    let files = build_file_masks();
    let adjacent = build_adjacent_file_masks();
    let mut masks = [0u64; 64];
    let mut sq = 0;
    while sq < 64 {
        let rank = sq / 8;
        let span = files[sq % 8] | adjacent[sq % 8];
        let ahead = if white {
            if rank == 7 {
                0
            } else {
                u64::MAX << ((rank + 1) * 8)
            }
        } else if rank == 0 {
            0
        } else {
            u64::MAX >> ((8 - rank) * 8)
        };
        masks[sq] = span & ahead;
        sq += 1;
    }
    masks
}

#[inline]
fn pst_value(kind: PieceKind, relative_square: usize) -> Tapered {
    match kind {
        PieceKind::Pawn => Tapered(PAWN_PST[relative_square], PAWN_PST[relative_square]),
        PieceKind::Knight => Tapered(KNIGHT_PST[relative_square], KNIGHT_PST[relative_square]),
        PieceKind::Bishop => Tapered(BISHOP_PST[relative_square], BISHOP_PST[relative_square]),
        PieceKind::Rook => Tapered(ROOK_PST[relative_square], ROOK_PST[relative_square]),
        PieceKind::Queen => Tapered(QUEEN_PST[relative_square], QUEEN_PST[relative_square]),
        PieceKind::King => Tapered(
            KING_MIDDLEGAME_PST[relative_square],
            KING_ENDGAME_PST[relative_square],
        ),
    }
}

/// Square seen from `side`'s point of view (Black is mirrored vertically).
#[inline]
fn relative_square(side: Side, square: Square) -> usize {
    match side {
        Side::Black => (square ^ 56) as usize,
        _ => square as usize,
    }
}

/// Static evaluation, positive when White is better.
pub fn evaluate_absolute(position: &Position, tables: &AttackTables) -> i32 {
    let mut total = Tapered::default();
    let mut phase = 0;

    for piece in Piece::ALL {
        let side = piece.side();
        let kind = piece.kind();
        let sign = side.sign();
        let mut board = position.piece_board(piece);
        while let Some(square) = board.pop_lsb() {
            let mut term = MATERIAL[kind.index()];
            term += pst_value(kind, relative_square(side, square));
            term += positional_term(position, side, kind, square);
            term += mobility_term(position, tables, side, kind, square);
            total += term * sign;
            phase += PHASE_WEIGHT[kind.index()];
        }
    }

    for side in [Side::White, Side::Black] {
        if position.piece_board(Piece::new(side, PieceKind::Bishop)).count() >= 2 {
            total += BISHOP_PAIR * side.sign();
        }
    }

    let phase = phase.min(MAX_PHASE);
    (total.0 * phase + total.1 * (MAX_PHASE - phase)) / MAX_PHASE
}

/// Pawn structure, rook files and king cover for one piece.
fn positional_term(position: &Position, side: Side, kind: PieceKind, square: Square) -> Tapered {
    let own_pawns = position.piece_board(Piece::new(side, PieceKind::Pawn)).bits();
    let enemy_pawns = position
        .piece_board(Piece::new(side.opposite(), PieceKind::Pawn))
        .bits();
    let file = square_file(square) as usize;

    match kind {
        PieceKind::Pawn => {
            let mut term = Tapered::default();
            // Applied to every pawn sharing its file.
            if (own_pawns & FILE_MASKS[file]).count_ones() > 1 {
                term += DOUBLED_PAWN;
            }
            if own_pawns & ADJACENT_FILE_MASKS[file] == 0 {
                term += ISOLATED_PAWN;
            }
            if enemy_pawns & PASSED_PAWN_MASKS[side.index()][square as usize] == 0 {
                let rank = square_rank(relative_square(side, square) as Square) as usize;
                term += PASSED_PAWN[rank];
            }
            term
        }
        PieceKind::Rook => file_term(own_pawns, enemy_pawns, file, OPEN_FILE_ROOK, SEMI_OPEN_FILE_ROOK),
        PieceKind::King => {
            let mut term = file_term(own_pawns, enemy_pawns, file, OPEN_FILE_KING, SEMI_OPEN_FILE_KING);
            let shield = BitBoard(KING_ATTACKS[square as usize] & own_pawns).count() as i32;
            term += KING_SHIELD * shield;
            term
        }
        _ => Tapered::default(),
    }
}

/// Slider mobility: attacked squares not occupied by friendly pieces.
fn mobility_term(
    position: &Position,
    tables: &AttackTables,
    side: Side,
    kind: PieceKind,
    square: Square,
) -> Tapered {
    let occupancy = position.occupancy_of(Side::Both);
    let (attacks, weight) = match kind {
        PieceKind::Bishop => (tables.bishop_attacks(square, occupancy), BISHOP_MOBILITY),
        PieceKind::Rook => (tables.rook_attacks(square, occupancy), ROOK_MOBILITY),
        PieceKind::Queen => (tables.queen_attacks(square, occupancy), QUEEN_MOBILITY),
        _ => return Tapered::default(),
    };
    let reachable = attacks.bits() & !position.occupancy_of(side).bits();
    weight * reachable.count_ones() as i32
}

#[inline]
fn file_term(own_pawns: u64, enemy_pawns: u64, file: usize, open: Tapered, semi_open: Tapered) -> Tapered {
    if (own_pawns | enemy_pawns) & FILE_MASKS[file] == 0 {
        open
    } else if own_pawns & FILE_MASKS[file] == 0 {
        semi_open
    } else {
        Tapered::default()
    }
}
