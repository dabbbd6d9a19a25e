//! Magic-bitboard construction for bishop and rook attacks.
//!
//! For each square a relevant-occupancy mask selects the squares whose
//! occupancy can cut a ray short (ray ends on the board edge are excluded).
//! Every subset of that mask is hashed with
//! `((occupancy & mask) * magic) >> (64 - relevant_bits)` into a per-square
//! slice of one shared attack vector.
//!
//! Magic multipliers are searched deterministically from a fixed seed, so a
//! given build always produces the same constants. Relevant-bit counts are
//! fixed tables. Both are checked exhaustively against brute-force ray casting
//! before a table is handed out.

use std::fmt;

use rand::RngCore;

use crate::errors::AttackTableError;
use crate::game_state::chess_types::{square_file, square_rank, Square};

/// Upper bound on candidates tried per square before giving up.
const MAX_MAGIC_ATTEMPTS: u32 = 50_000_000;

#[rustfmt::skip]
pub const BISHOP_RELEVANT_BITS: [u32; 64] = [
    6, 5, 5, 5, 5, 5, 5, 6,
    5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 7, 7, 7, 7, 5, 5,
    5, 5, 7, 9, 9, 7, 5, 5,
    5, 5, 7, 9, 9, 7, 5, 5,
    5, 5, 7, 7, 7, 7, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5,
    6, 5, 5, 5, 5, 5, 5, 6,
];

#[rustfmt::skip]
pub const ROOK_RELEVANT_BITS: [u32; 64] = [
    12, 11, 11, 11, 11, 11, 11, 12,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    12, 11, 11, 11, 11, 11, 11, 12,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slider {
    Bishop,
    Rook,
}

impl Slider {
    const fn directions(self) -> [(i32, i32); 4] {
        match self {
            Slider::Bishop => [(1, 1), (-1, 1), (1, -1), (-1, -1)],
            Slider::Rook => [(1, 0), (-1, 0), (0, 1), (0, -1)],
        }
    }

    #[inline]
    pub const fn relevant_bits(self, square: Square) -> u32 {
        match self {
            Slider::Bishop => BISHOP_RELEVANT_BITS[square as usize],
            Slider::Rook => ROOK_RELEVANT_BITS[square as usize],
        }
    }
}

impl fmt::Display for Slider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slider::Bishop => f.write_str("bishop"),
            Slider::Rook => f.write_str("rook"),
        }
    }
}

#[inline]
fn on_board(file: i32, rank: i32) -> bool {
    (0..8).contains(&file) && (0..8).contains(&rank)
}

/// Squares whose occupancy can block one of the slider's rays from `square`.
pub fn relevant_mask(slider: Slider, square: Square) -> u64 {
    let mut mask = 0u64;
    for (file_step, rank_step) in slider.directions() {
        let mut file = square_file(square) as i32 + file_step;
        let mut rank = square_rank(square) as i32 + rank_step;
        while on_board(file + file_step, rank + rank_step) {
            mask |= 1u64 << (rank * 8 + file);
            file += file_step;
            rank += rank_step;
        }
    }
    mask
}

/// Attack set by walking each ray until it leaves the board or hits a blocker.
pub fn ray_cast_attacks(slider: Slider, square: Square, occupancy: u64) -> u64 {
    let mut attacks = 0u64;
    for (file_step, rank_step) in slider.directions() {
        let mut file = square_file(square) as i32 + file_step;
        let mut rank = square_rank(square) as i32 + rank_step;
        while on_board(file, rank) {
            let bit = 1u64 << (rank * 8 + file);
            attacks |= bit;
            if occupancy & bit != 0 {
                break;
            }
            file += file_step;
            rank += rank_step;
        }
    }
    attacks
}

/// Every subset of a mask, starting with the empty set (carry-rippler order).
pub fn subsets(mask: u64) -> Subsets {
    Subsets {
        mask,
        next: Some(0),
    }
}

#[derive(Debug, Clone)]
pub struct Subsets {
    mask: u64,
    next: Option<u64>,
}

impl Iterator for Subsets {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let current = self.next?;
        let following = current.wrapping_sub(self.mask) & self.mask;
        self.next = (following != 0).then_some(following);
        Some(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicEntry {
    pub mask: u64,
    pub magic: u64,
    pub shift: u32,
    pub offset: usize,
}

impl MagicEntry {
    #[inline]
    pub fn index(&self, occupancy: u64) -> usize {
        self.offset + ((occupancy & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }
}

/// Magic lookup for one slider kind over all 64 squares.
#[derive(Debug, Clone)]
pub struct SliderTable {
    slider: Slider,
    entries: [MagicEntry; 64],
    attacks: Vec<u64>,
}

impl SliderTable {
    /// Builds and fills the table. The caller still runs [`SliderTable::verify`].
    pub fn build(slider: Slider, rng: &mut impl RngCore) -> Result<Self, AttackTableError> {
        let mut entries = [MagicEntry {
            mask: 0,
            magic: 0,
            shift: 64,
            offset: 0,
        }; 64];
        let mut attacks = Vec::new();

        for square in 0..64u8 {
            let mask = relevant_mask(slider, square);
            let expected = slider.relevant_bits(square);
            if mask.count_ones() != expected {
                return Err(AttackTableError::RelevantBits {
                    slider,
                    square,
                    expected,
                    actual: mask.count_ones(),
                });
            }

            let (magic, slots) = find_magic(slider, square, mask, expected, rng)?;
            entries[square as usize] = MagicEntry {
                mask,
                magic,
                shift: 64 - expected,
                offset: attacks.len(),
            };
            attacks.extend_from_slice(&slots);
        }

        Ok(Self {
            slider,
            entries,
            attacks,
        })
    }

    #[inline]
    pub fn slider(&self) -> Slider {
        self.slider
    }

    #[inline]
    pub fn entry(&self, square: Square) -> &MagicEntry {
        &self.entries[square as usize]
    }

    #[inline]
    pub fn attacks(&self, square: Square, occupancy: u64) -> u64 {
        self.attacks[self.entries[square as usize].index(occupancy)]
    }

    /// Total number of attack slots across all squares.
    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    /// Checks every square and every subset of its mask against ray casting.
    pub fn verify(&self) -> Result<(), AttackTableError> {
        for square in 0..64u8 {
            let entry = self.entry(square);
            let slot_count = 1usize << (64 - entry.shift);
            for occupancy in subsets(entry.mask) {
                let index = entry.index(occupancy);
                let in_range = index >= entry.offset && index < entry.offset + slot_count;
                if !in_range
                    || self.attacks[index] != ray_cast_attacks(self.slider, square, occupancy)
                {
                    return Err(AttackTableError::Verification {
                        slider: self.slider,
                        square,
                        occupancy,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Searches sparse random multipliers until one maps every subset without a
/// destructive collision. Subsets sharing an attack set may share a slot.
fn find_magic(
    slider: Slider,
    square: Square,
    mask: u64,
    bits: u32,
    rng: &mut impl RngCore,
) -> Result<(u64, Vec<u64>), AttackTableError> {
    let occupancies: Vec<u64> = subsets(mask).collect();
    let reference: Vec<u64> = occupancies
        .iter()
        .map(|&occupancy| ray_cast_attacks(slider, square, occupancy))
        .collect();

    let size = 1usize << bits;
    let shift = 64 - bits;
    let mut slots = vec![0u64; size];
    // Slot `i` is live for the current attempt only when `stamp[i] == attempt`.
    let mut stamp = vec![0u32; size];

    for attempt in 1..=MAX_MAGIC_ATTEMPTS {
        let magic = rng.next_u64() & rng.next_u64() & rng.next_u64();
        if (mask.wrapping_mul(magic) & 0xFF00_0000_0000_0000).count_ones() < 6 {
            continue;
        }

        let fits = occupancies
            .iter()
            .zip(&reference)
            .all(|(&occupancy, &attacks)| {
                let index = (occupancy.wrapping_mul(magic) >> shift) as usize;
                if stamp[index] != attempt {
                    stamp[index] = attempt;
                    slots[index] = attacks;
                    true
                } else {
                    slots[index] == attacks
                }
            });

        if fits {
            for (slot, &mark) in slots.iter_mut().zip(&stamp) {
                if mark != attempt {
                    *slot = 0;
                }
            }
            return Ok((magic, slots));
        }
    }

    Err(AttackTableError::MagicNotFound {
        slider,
        square,
        attempts: MAX_MAGIC_ATTEMPTS,
    })
}
