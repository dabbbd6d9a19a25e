//! Negamax alpha-beta core with quiescence and pruning heuristics.
//!
//! The base algorithm is plain fail-soft negamax over pseudo-legal moves
//! that are kept only when `was_produced_by_valid_move` accepts the child.
//! Every refinement (PVS, LMR, null move, RFP, razoring, IIR, LMP, the
//! transposition table) is gated by [`SearchConfig`]; with all of them off
//! the root value equals unpruned minimax.
//!
//! Scores are from the side to move's point of view. A recursion returns
//! `None` once the search has been cancelled; callers unwind without using
//! any partial result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::trace;

use crate::game_state::position::Position;
use crate::move_generation::move_generator::{generate_moves, has_legal_move};
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::Move;
use crate::search::board_scoring::{is_mate_score, BoardScorer, INFINITE_SCORE};
use crate::search::move_ordering::{order_captures, MoveOrdering};
use crate::search::search_config::{SearchConfig, MAX_DEPTH_CEILING};
use crate::search::transposition_table::{Bound, TTEntry, TranspositionTable};
use crate::search::zobrist::ZobristKeys;

/// Hard stop for quiescence recursion, counted in plies from the root.
const MAX_PLY: usize = MAX_DEPTH_CEILING as usize * 2;

/// External reasons to abandon a search: a stop flag, a hard deadline and a node budget.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    stop_flag: Option<Arc<AtomicBool>>,
    hard_deadline: Option<Instant>,
    node_limit: Option<u64>,
}

impl Cancellation {
    pub fn new(
        stop_flag: Option<Arc<AtomicBool>>,
        hard_deadline: Option<Instant>,
        node_limit: Option<u64>,
    ) -> Self {
        Self {
            stop_flag,
            hard_deadline,
            node_limit,
        }
    }

    #[inline]
    pub fn should_stop(&self, nodes: u64) -> bool {
        if self.node_limit.is_some_and(|limit| nodes >= limit) {
            return true;
        }
        if self
            .stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return true;
        }
        self.hard_deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Whether a stop was requested through the flag, ignoring budgets.
    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// One search's borrowed view of the engine state.
pub(crate) struct Searcher<'a, S: BoardScorer> {
    tables: &'a AttackTables,
    scorer: &'a S,
    config: &'a SearchConfig,
    keys: &'a ZobristKeys,
    tt: &'a mut TranspositionTable,
    ordering: &'a mut MoveOrdering,
    cancellation: &'a Cancellation,
    nodes: u64,
    stoppable: bool,
    stopped: bool,
}

impl<'a, S: BoardScorer> Searcher<'a, S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tables: &'a AttackTables,
        scorer: &'a S,
        config: &'a SearchConfig,
        keys: &'a ZobristKeys,
        tt: &'a mut TranspositionTable,
        ordering: &'a mut MoveOrdering,
        cancellation: &'a Cancellation,
    ) -> Self {
        Self {
            tables,
            scorer,
            config,
            keys,
            tt,
            ordering,
            cancellation,
            nodes: 0,
            stoppable: true,
            stopped: false,
        }
    }

    #[inline]
    pub(crate) fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Whether cancellation is honoured; the first iteration runs with it off.
    #[inline]
    pub(crate) fn set_stoppable(&mut self, stoppable: bool) {
        self.stoppable = stoppable;
    }

    /// Age the transposition table and forget killers before a new depth.
    pub(crate) fn begin_iteration(&mut self) {
        self.tt.new_generation();
        self.ordering.clear_killers();
    }

    /// Root search; returns the score and principal variation.
    pub(crate) fn search_root(
        &mut self,
        position: &Position,
        depth: u8,
        alpha: i32,
        beta: i32,
    ) -> Option<(i32, Vec<Move>)> {
        let mut pv = Vec::with_capacity(usize::from(depth));
        let score = self.negamax(position, depth, 0, alpha, beta, &mut pv, true)?;
        Some((score, pv))
    }

    #[inline]
    fn poll_stop(&mut self) -> bool {
        if !self.stopped && self.stoppable && self.cancellation.should_stop(self.nodes) {
            self.stopped = true;
        }
        self.stopped
    }

    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        position: &Position,
        depth_left: u8,
        ply: usize,
        mut alpha: i32,
        beta: i32,
        pv: &mut Vec<Move>,
        allow_null: bool,
    ) -> Option<i32> {
        pv.clear();

        if depth_left == 0 || ply >= usize::from(MAX_DEPTH_CEILING) {
            return self.horizon(position, ply, alpha, beta);
        }
        self.nodes += 1;

        let config = self.config;
        let tables = self.tables;
        let root = ply == 0;
        let pv_node = beta - alpha > 1;
        let alpha_orig = alpha;

        let key = config.transposition_table.then(|| self.keys.hash(position));
        let tt_entry = key.and_then(|key| self.tt.probe(key));
        if !root {
            if let Some(score) = tt_entry
                .and_then(|entry| entry.cutoff_score(depth_left, alpha, beta))
                .filter(|score| !is_mate_score(*score))
            {
                return Some(score);
            }
        }
        let tt_move = tt_entry.and_then(|entry| entry.best_move);

        let in_check = position.is_in_check(tables);
        let mut depth = depth_left;

        if config.internal_iterative_reduction
            && !root
            && config.transposition_table
            && tt_move.is_none()
            && depth >= config.iir_min_depth.max(2)
        {
            depth -= 1;
        }

        if !root && !pv_node && !in_check {
            let static_eval = self.scorer.score(position, tables);

            if config.reverse_futility_pruning
                && depth <= config.rfp_max_depth
                && !is_mate_score(beta)
            {
                let margin = config.rfp_depth_scaling_factor * i32::from(depth);
                if static_eval - margin >= beta {
                    return Some(static_eval - margin);
                }
            }

            if config.razoring && depth <= config.razoring_max_depth && !is_mate_score(alpha) {
                let mut razor = static_eval + config.razoring_depth1_bonus;
                if razor < beta {
                    if depth == 1 {
                        let q = self.horizon(position, ply, alpha, beta)?;
                        return Some(q.max(razor));
                    }
                    razor += config.razoring_not_depth1_bonus;
                    if razor < beta {
                        let q = self.horizon(position, ply, alpha, beta)?;
                        if q < beta {
                            trace!("razored at depth {depth}: {q} < {beta}");
                            return Some(q.max(razor));
                        }
                    }
                }
            }

            if config.null_move_pruning
                && allow_null
                && depth >= config.nmp_min_depth
                && static_eval >= beta
                && !is_mate_score(beta)
                && position.has_non_pawn_material(position.side_to_move())
            {
                let reduction = config.nmp_base_depth_reduction + (depth + 1) / 3;
                let reduced = depth.saturating_sub(1 + reduction);
                let mut scratch = Vec::new();
                let null_position = position.with_null_move();
                let score =
                    -self.negamax(&null_position, reduced, ply + 1, -beta, -beta + 1, &mut scratch, false)?;

                if score >= beta && !is_mate_score(score) {
                    // Verify with a reduced real search before trusting the null-move fail-high.
                    let verified =
                        self.negamax(position, reduced, ply, beta - 1, beta, &mut scratch, false)?;
                    if verified >= beta {
                        trace!("null move cutoff at depth {depth}");
                        return Some(verified);
                    }
                }
            }
        }

        let moves = generate_moves(position, tables, false);
        let ordered = self
            .ordering
            .order(position, tables, &moves, tt_move, ply, config);

        let mut best = -INFINITE_SCORE;
        let mut best_move = None;
        let mut legal = 0usize;
        let mut quiets_tried = Vec::new();
        let mut child_pv = Vec::new();

        for scored in &ordered {
            if legal > 0 && self.poll_stop() {
                return None;
            }

            let mv = scored.mv;
            let child = position.apply_move(mv);
            if !child.was_produced_by_valid_move(tables) {
                continue;
            }
            legal += 1;
            let quiet = mv.is_quiet();

            if config.late_move_pruning
                && !root
                && !pv_node
                && !in_check
                && quiet
                && legal > 1
                && depth <= config.lmp_max_depth
                && !is_mate_score(best)
                && legal as i32
                    > config.lmp_base_moves_to_try
                        + config.lmp_moves_depth_multiplier * i32::from(depth)
            {
                continue;
            }

            let score = if legal == 1 {
                -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha, &mut child_pv, true)?
            } else {
                let reduction = self.reduction(
                    depth,
                    legal,
                    pv_node,
                    in_check,
                    quiet,
                    scored.is_bad_capture(),
                    &child,
                );
                let mut score = -self.negamax(
                    &child,
                    depth - 1 - reduction,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    &mut child_pv,
                    true,
                )?;

                if reduction > 0 && (score > alpha || is_mate_score(score)) {
                    trace!("re-search {mv} at full depth after reduced score {score}");
                    score = -self.negamax(
                        &child,
                        depth - 1,
                        ply + 1,
                        -alpha - 1,
                        -alpha,
                        &mut child_pv,
                        true,
                    )?;
                }
                if score > alpha && score < beta {
                    score = -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha, &mut child_pv, true)?;
                }
                score
            };

            if score > best {
                best = score;
                best_move = Some(mv);
            }
            if score > alpha {
                alpha = score;
                pv.clear();
                pv.push(mv);
                pv.extend_from_slice(&child_pv);

                if alpha >= beta {
                    if quiet && config.history_ordering {
                        self.ordering.record_killer(ply, mv);
                        self.ordering
                            .record_quiet_cutoff(mv, &quiets_tried, depth, config);
                    }
                    break;
                }
            }
            if quiet {
                quiets_tried.push(mv);
            }
        }

        if legal == 0 {
            return Some(position.evaluate_final_position(tables, depth_left));
        }

        if let Some(key) = key {
            let bound = if best <= alpha_orig {
                Bound::Upper
            } else if best >= beta {
                Bound::Lower
            } else {
                Bound::Exact
            };
            // Record the depth actually searched, after any IIR reduction.
            self.tt.store(TTEntry {
                key,
                depth,
                score: best,
                bound,
                best_move,
            });
        }

        Some(best)
    }

    /// Late-move reduction in plies for the `legal`-th legal move.
    #[allow(clippy::too_many_arguments)]
    fn reduction(
        &self,
        depth: u8,
        legal: usize,
        pv_node: bool,
        in_check: bool,
        quiet: bool,
        bad_capture: bool,
        child: &Position,
    ) -> u8 {
        let config = self.config;
        if !config.lmr
            || in_check
            || depth < config.lmr_min_depth
            || legal <= config.lmr_min_full_depth_searched_moves
            || !(quiet || bad_capture)
            || child.is_in_check(self.tables)
        {
            return 0;
        }

        let mut reduction = (config.lmr_base
            + f64::from(depth).ln() * (legal as f64).ln() / config.lmr_divisor)
            as i32;
        if pv_node {
            reduction -= 1;
        }
        if bad_capture && config.see_ordering {
            reduction += i32::from(config.see_bad_capture_reduction);
        }
        // Leave at least one ply for the child.
        reduction.min(i32::from(depth) - 2).max(0) as u8
    }

    /// Depth-zero value: quiescence when enabled, otherwise the static
    /// evaluation (or the terminal score if there is no legal move).
    fn horizon(&mut self, position: &Position, ply: usize, alpha: i32, beta: i32) -> Option<i32> {
        if self.config.quiescence {
            return self.quiescence(position, ply, alpha, beta);
        }
        self.nodes += 1;
        if has_legal_move(position, self.tables) {
            Some(self.scorer.score(position, self.tables))
        } else {
            Some(position.evaluate_final_position(self.tables, 0))
        }
    }

    fn quiescence(&mut self, position: &Position, ply: usize, mut alpha: i32, beta: i32) -> Option<i32> {
        self.nodes += 1;
        let tables = self.tables;

        let mut moves = generate_moves(position, tables, false);
        if !moves
            .iter()
            .any(|&mv| position.apply_move(mv).was_produced_by_valid_move(tables))
        {
            return Some(position.evaluate_final_position(tables, 0));
        }

        let in_check = position.is_in_check(tables);
        let mut best = if in_check {
            -INFINITE_SCORE
        } else {
            let stand_pat = self.scorer.score(position, tables);
            if stand_pat >= beta || ply >= MAX_PLY {
                return Some(stand_pat);
            }
            alpha = alpha.max(stand_pat);
            moves.retain(|mv| mv.is_capture());
            stand_pat
        };
        if in_check && ply >= MAX_PLY {
            return Some(self.scorer.score(position, tables));
        }
        order_captures(position, &mut moves);

        let mut searched = 0usize;
        for mv in moves {
            if searched > 0 && self.poll_stop() {
                return None;
            }
            let child = position.apply_move(mv);
            if !child.was_produced_by_valid_move(tables) {
                continue;
            }
            searched += 1;

            let score = -self.quiescence(&child, ply + 1, -beta, -alpha)?;
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
                if alpha >= beta {
                    break;
                }
            }
        }

        Some(best)
    }
}
