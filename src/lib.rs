//! Crate root module declarations for the Lynx Chess engine core.
//!
//! Exposes the board representation, attack tables, move generation, the
//! search and its control surface, the UCI front-end and text utilities
//! under stable module paths for the binary, benches and external tooling.

pub mod errors;

pub mod game_state {
    pub mod bitboard;
    pub mod chess_rules;
    pub mod chess_types;
    pub mod position;
}

pub mod moves {
    pub mod attack_tables;
    pub mod leaper_attacks;
    pub mod magic;
    pub mod move_descriptions;
}

pub mod move_generation {
    pub mod move_generator;
    pub mod perft;
}

pub mod search {
    pub mod alpha_beta;
    pub mod board_scoring;
    pub mod iterative_deepening;
    pub mod move_ordering;
    pub mod search_config;
    pub mod transposition_table;
    pub mod zobrist;
}

pub mod engines {
    pub mod engine_trait;
    pub mod search_controller;
    pub mod time_management;
}

pub mod uci {
    pub mod uci_top;
}

pub mod utils {
    pub mod algebraic;
    pub mod fen_generator;
    pub mod fen_parser;
    pub mod long_algebraic;
}

#[cfg(test)]
mod test_support;
