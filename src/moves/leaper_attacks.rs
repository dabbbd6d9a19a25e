//! Precomputed attack maps for the non-sliding pieces.
//!
//! Pawn, knight and king attacks do not depend on occupancy, so each is a
//! plain 64-entry table built at compile time.

/// Pawn capture targets, indexed by `[side][square]`.
pub const PAWN_ATTACKS: [[u64; 64]; 2] = [generate_pawn_attacks(1), generate_pawn_attacks(-1)];
pub const KNIGHT_ATTACKS: [u64; 64] = generate_knight_attacks();
pub const KING_ATTACKS: [u64; 64] = generate_king_attacks();

const KNIGHT_STEPS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_STEPS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const fn generate_pawn_attacks(forward: i32) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let file = (sq % 8) as i32;
        let rank = (sq / 8) as i32;
        table[sq] = set_if_valid(file - 1, rank + forward) | set_if_valid(file + 1, rank + forward);
        sq += 1;
    }

    table
}

const fn generate_knight_attacks() -> [u64; 64] {
    generate_step_attacks(&KNIGHT_STEPS)
}

const fn generate_king_attacks() -> [u64; 64] {
    generate_step_attacks(&KING_STEPS)
}

const fn generate_step_attacks(steps: &[(i32, i32); 8]) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let file = (sq % 8) as i32;
        let rank = (sq / 8) as i32;
        let mut attacks = 0u64;
        let mut i = 0usize;
        while i < steps.len() {
            attacks |= set_if_valid(file + steps[i].0, rank + steps[i].1);
            i += 1;
        }
        table[sq] = attacks;
        sq += 1;
    }

    table
}

const fn set_if_valid(file: i32, rank: i32) -> u64 {
    if file < 0 || file > 7 || rank < 0 || rank > 7 {
        return 0;
    }

    let square = (rank as usize) * 8 + (file as usize);
    1u64 << square
}

#[cfg(test)]
mod tests {
    use super::{KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};

    #[test]
    fn knight_attacks_from_d4_has_eight_targets() {
        let d4 = 27usize;
        assert_eq!(KNIGHT_ATTACKS[d4].count_ones(), 8);
        assert_eq!(KNIGHT_ATTACKS[0], (1u64 << 10) | (1u64 << 17));
    }

    #[test]
    fn king_attacks_from_a1_has_three_targets() {
        assert_eq!(KING_ATTACKS[0].count_ones(), 3);
        assert_eq!(KING_ATTACKS[27].count_ones(), 8);
    }

    #[test]
    fn pawn_attacks_point_forward_per_side() {
        let e2 = 12usize;
        let e7 = 52usize;
        assert_eq!(PAWN_ATTACKS[0][e2], (1u64 << 19) | (1u64 << 21));
        assert_eq!(PAWN_ATTACKS[1][e7], (1u64 << 43) | (1u64 << 45));
        // Edge files only attack inward.
        assert_eq!(PAWN_ATTACKS[0][8], 1u64 << 17);
        // Last rank has nothing ahead.
        assert_eq!(PAWN_ATTACKS[0][60], 0);
    }
}
