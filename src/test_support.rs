//! Shared helpers for unit tests.

use std::sync::OnceLock;

use crate::game_state::position::Position;
use crate::move_generation::move_generator::legal_moves;
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::Move;

/// One verified set of attack tables for the whole test binary.
pub fn tables() -> &'static AttackTables {
    static TABLES: OnceLock<AttackTables> = OnceLock::new();
    TABLES.get_or_init(AttackTables::new)
}

/// Legal move matching long algebraic text, panicking if there is none.
pub fn find_move(position: &Position, tables: &AttackTables, uci: &str) -> Move {
    legal_moves(position, tables)
        .into_iter()
        .find(|mv| mv.to_string() == uci)
        .unwrap_or_else(|| panic!("{uci} should be legal in {}", position.fen()))
}
