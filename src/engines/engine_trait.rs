//! Engine abstraction used by the search controller.
//!
//! Defines the `go` parameters and the best-move payload, and the `Engine`
//! trait the controller's worker thread drives. `SearchEngine` is the one
//! production implementation; tests can plug in lighter engines.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::errors::ConfigError;
use crate::game_state::position::Position;
use crate::moves::move_descriptions::Move;
use crate::search::board_scoring::BoardScorer;
use crate::search::iterative_deepening::{SearchEngine, SearchLimits, SearchResult};
use crate::search::search_config::SearchConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub movetime_ms: Option<u64>,
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: Option<u64>,
    pub binc_ms: Option<u64>,
    pub movestogo: Option<u32>,
    pub infinite: bool,
    pub ponder: bool,
}

/// Best move and expected reply from the last completed iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestMove {
    pub best: Option<Move>,
    pub ponder: Option<Move>,
}

impl From<&SearchResult> for BestMove {
    fn from(result: &SearchResult) -> Self {
        Self {
            best: result.best_move,
            ponder: result.ponder_move(),
        }
    }
}

/// UCI `bestmove` line; `0000` when there is no move to play.
impl fmt::Display for BestMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best {
            Some(best) => {
                write!(f, "bestmove {best}")?;
                if let Some(ponder) = self.ponder {
                    write!(f, " ponder {ponder}")?;
                }
                Ok(())
            }
            None => f.write_str("bestmove 0000"),
        }
    }
}

pub trait Engine: Send + 'static {
    fn config(&self) -> &SearchConfig;

    fn new_game(&mut self);

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError>;

    fn search(
        &mut self,
        position: &Position,
        limits: &SearchLimits,
        stop_flag: Arc<AtomicBool>,
        on_iteration: &mut dyn FnMut(&SearchResult),
    ) -> SearchResult;
}

impl<S: BoardScorer + 'static> Engine for SearchEngine<S> {
    fn config(&self) -> &SearchConfig {
        SearchEngine::config(self)
    }

    fn new_game(&mut self) {
        SearchEngine::new_game(self);
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        SearchEngine::set_option(self, name, value)
    }

    fn search(
        &mut self,
        position: &Position,
        limits: &SearchLimits,
        stop_flag: Arc<AtomicBool>,
        on_iteration: &mut dyn FnMut(&SearchResult),
    ) -> SearchResult {
        self.search_with(position, limits, Some(stop_flag), on_iteration)
    }
}
