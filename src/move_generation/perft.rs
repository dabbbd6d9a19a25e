//! Perft node counting for move-generator validation.
//!
//! Counts leaf nodes of the legal move tree to a fixed depth, with optional
//! per-category tallies and a per-root-move divide for debugging mismatches.

use crate::game_state::position::Position;
use crate::move_generation::move_generator::{generate_moves, has_legal_move};
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::Move;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftCounts {
    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
        self.checks += rhs.checks;
        self.checkmates += rhs.checkmates;
    }
}

/// Leaf count of the legal move tree.
pub fn perft(position: &Position, tables: &AttackTables, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    for mv in generate_moves(position, tables, false) {
        let next = position.apply_move(mv);
        if !next.was_produced_by_valid_move(tables) {
            continue;
        }
        nodes += if depth == 1 {
            1
        } else {
            perft(&next, tables, depth - 1)
        };
    }
    nodes
}

/// Leaf count with capture/castle/check tallies on the final ply.
pub fn perft_detailed(position: &Position, tables: &AttackTables, depth: u8) -> PerftCounts {
    let mut total = PerftCounts::default();
    if depth == 0 {
        total.nodes = 1;
        return total;
    }

    for mv in generate_moves(position, tables, false) {
        let next = position.apply_move(mv);
        if !next.was_produced_by_valid_move(tables) {
            continue;
        }
        if depth == 1 {
            total.merge(leaf_counts(mv, &next, tables));
        } else {
            total.merge(perft_detailed(&next, tables, depth - 1));
        }
    }
    total
}

fn leaf_counts(mv: Move, next: &Position, tables: &AttackTables) -> PerftCounts {
    let check = next.is_in_check(tables);
    PerftCounts {
        nodes: 1,
        captures: u64::from(mv.is_capture()),
        en_passant: u64::from(mv.is_en_passant()),
        castles: u64::from(mv.is_castle()),
        promotions: u64::from(mv.is_promotion()),
        checks: u64::from(check),
        checkmates: u64::from(check && !has_legal_move(next, tables)),
    }
}

/// Per-root-move leaf counts, in generation order.
pub fn perft_divide(position: &Position, tables: &AttackTables, depth: u8) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }

    generate_moves(position, tables, false)
        .into_iter()
        .filter_map(|mv| {
            let next = position.apply_move(mv);
            next.was_produced_by_valid_move(tables)
                .then(|| (mv, perft(&next, tables, depth - 1)))
        })
        .collect()
}
