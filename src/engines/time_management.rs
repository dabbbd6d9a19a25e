//! Clock handling for `go` commands.
//!
//! UCI passes raw clock data (`wtime/btime/winc/binc/movestogo/movetime`);
//! this module turns it into the soft and hard budgets the driver enforces.
//! The soft budget decides whether another iteration starts, the hard budget
//! cancels the running one.

use std::time::Duration;

use log::debug;

use crate::engines::engine_trait::GoParams;
use crate::game_state::chess_types::Side;
use crate::search::iterative_deepening::SearchLimits;
use crate::search::search_config::SearchConfig;

/// Resolve `go` parameters for `side_to_move` into search limits.
pub fn resolve_limits(side_to_move: Side, params: &GoParams, config: &SearchConfig) -> SearchLimits {
    let mut limits = SearchLimits {
        depth: params.depth,
        nodes: params.nodes,
        soft_time: None,
        hard_time: None,
    };

    // Pondering and infinite analysis run until told to stop.
    if params.infinite || params.ponder {
        return limits;
    }

    if let Some(movetime) = params.movetime_ms {
        let budget = Duration::from_millis(movetime.saturating_sub(config.move_overhead_ms).max(1));
        limits.soft_time = Some(budget);
        limits.hard_time = Some(budget);
        return limits;
    }

    let (remaining, increment) = match side_to_move {
        Side::Black => (params.btime_ms, params.binc_ms),
        _ => (params.wtime_ms, params.winc_ms),
    };
    if let Some(remaining) = remaining {
        let (soft, hard) = clock_budgets(remaining, increment.unwrap_or(0), params.movestogo, config);
        debug!("clock {remaining} ms: soft {soft} ms, hard {hard} ms");
        limits.soft_time = Some(Duration::from_millis(soft));
        limits.hard_time = Some(Duration::from_millis(hard));
    }

    limits
}

/// Soft and hard budgets in milliseconds for a running clock.
fn clock_budgets(
    remaining_ms: u64,
    increment_ms: u64,
    movestogo: Option<u32>,
    config: &SearchConfig,
) -> (u64, u64) {
    let left = remaining_ms.saturating_sub(config.move_overhead_ms).max(1) as f64;
    let moves_to_go = f64::from(movestogo.filter(|&m| m > 0).unwrap_or(config.default_moves_to_go).max(1));

    let base = left / moves_to_go + increment_ms as f64 * config.soft_time_base_increment_multiplier;
    let hard = (left * config.hard_time_bound_multiplier).max(1.0);
    let soft = (base * config.soft_time_bound_multiplier).clamp(1.0, hard);

    (soft as u64, hard as u64)
}
