//! Errors used throughout the engine.
//!
//! Each concern gets its own enum so callers can match on the failure modes
//! they care about. `EngineError` collects them for the controller and the
//! UCI front-end. Attack-table errors describe construction defects and are
//! never expected once a build has verified.

use thiserror::Error;

use crate::game_state::chess_types::Square;
use crate::moves::magic::Slider;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid square '{0}'")]
pub struct InvalidSquare(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected 6 FEN fields, found {0}")]
    FieldCount(usize),
    #[error("expected 8 ranks in piece placement, found {0}")]
    RankCount(usize),
    #[error("rank {rank} describes {files} files instead of 8")]
    RankWidth { rank: u8, files: usize },
    #[error("invalid piece letter '{0}'")]
    PieceLetter(char),
    #[error("invalid side to move '{0}'")]
    SideToMove(String),
    #[error("invalid castling rights '{0}'")]
    CastlingRights(String),
    #[error("invalid en-passant square '{0}'")]
    EnPassantSquare(String),
    #[error("en-passant square {square} must be on rank {expected_rank}")]
    EnPassantRank { square: String, expected_rank: u8 },
    #[error("en-passant square {0} has no pawn that could have just double-pushed")]
    EnPassantPawnMissing(String),
    #[error("invalid half-move clock '{0}'")]
    HalfMoveClock(String),
    #[error("invalid full-move number '{0}'")]
    FullMoveNumber(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("malformed move text '{0}'")]
    Malformed(String),
    #[error(transparent)]
    Square(#[from] InvalidSquare),
    #[error("no piece on {0}")]
    EmptySquare(String),
    #[error("the piece on {0} belongs to the side not on move")]
    WrongSide(String),
    #[error("invalid promotion piece '{0}'")]
    Promotion(char),
    #[error("move {0} is not legal in this position")]
    Illegal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("invalid value '{value}' for option '{name}'")]
    InvalidValue { name: String, value: String },
    #[error("value {value} for option '{name}' is outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttackTableError {
    #[error("{slider} mask on square {square} has {actual} relevant bits, expected {expected}")]
    RelevantBits {
        slider: Slider,
        square: Square,
        expected: u32,
        actual: u32,
    },
    #[error("no {slider} magic found for square {square} after {attempts} candidates")]
    MagicNotFound {
        slider: Slider,
        square: Square,
        attempts: u32,
    },
    #[error("{slider} table on square {square} returns wrong attacks for occupancy {occupancy:#018x}")]
    Verification {
        slider: Slider,
        square: Square,
        occupancy: u64,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Move(#[from] MoveParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("position {0} is not a legal chess position")]
    InvalidPosition(String),
    #[error("malformed command: {0}")]
    Protocol(String),
    #[error("a search is already running")]
    SearchInProgress,
    #[error("search worker thread panicked")]
    WorkerPanicked,
}

pub type EngineResult<T> = Result<T, EngineError>;
