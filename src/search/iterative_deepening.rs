//! Iterative deepening driver.
//!
//! Searches depth 1, 2, ... until the depth limit, the soft time budget or a
//! cancellation. Each completed iteration replaces the reported result and is
//! handed to the progress callback; a cancelled iteration is discarded, so
//! the caller always sees the last fully searched depth. Depth 1 ignores
//! cancellation so there is always a move to report.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::errors::ConfigError;
use crate::game_state::position::Position;
use crate::move_generation::move_generator::has_legal_move;
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::Move;
use crate::search::alpha_beta::{Cancellation, Searcher};
use crate::search::board_scoring::{is_mate_score, BoardScorer, TaperedScorer, INFINITE_SCORE};
use crate::search::move_ordering::MoveOrdering;
use crate::search::search_config::SearchConfig;
use crate::search::transposition_table::TranspositionTable;
use crate::search::zobrist::ZobristKeys;

/// Budgets for one search. `None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    /// No new iteration starts once this much time has passed.
    pub soft_time: Option<Duration>,
    /// The running iteration is cancelled at this point.
    pub hard_time: Option<Duration>,
}

impl SearchLimits {
    pub fn depth(depth: u8) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub pv: Vec<Move>,
    pub score: i32,
    pub depth: u8,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl SearchResult {
    /// Second move of the principal variation, the expected reply.
    #[inline]
    pub fn ponder_move(&self) -> Option<Move> {
        self.pv.get(1).copied()
    }

    pub fn nps(&self) -> u64 {
        let millis = self.elapsed.as_millis() as u64;
        if millis == 0 {
            0
        } else {
            self.nodes.saturating_mul(1_000) / millis
        }
    }

    /// Signed moves to mate when the score is a mate, positive when the side
    /// to move delivers it.
    pub fn mate_in(&self) -> Option<i32> {
        if !is_mate_score(self.score) {
            return None;
        }
        let moves = (self.pv.len() as i32 + 1) / 2;
        Some(if self.score > 0 { moves } else { -moves })
    }
}

pub struct SearchEngine<S: BoardScorer = TaperedScorer> {
    tables: Arc<AttackTables>,
    scorer: S,
    config: SearchConfig,
    keys: ZobristKeys,
    tt: TranspositionTable,
    ordering: MoveOrdering,
}

impl SearchEngine<TaperedScorer> {
    pub fn new(tables: Arc<AttackTables>, config: SearchConfig) -> Self {
        Self::with_scorer(tables, TaperedScorer, config)
    }
}

impl<S: BoardScorer> SearchEngine<S> {
    pub fn with_scorer(tables: Arc<AttackTables>, scorer: S, config: SearchConfig) -> Self {
        let tt = TranspositionTable::new_with_mb(config.transposition_table_size_mb);
        Self {
            tables,
            scorer,
            config,
            keys: ZobristKeys::new(),
            tt,
            ordering: MoveOrdering::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[inline]
    pub fn tables(&self) -> &Arc<AttackTables> {
        &self.tables
    }

    /// Update a tunable by option name; a new `Hash` size reallocates the table.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let previous_size = self.config.transposition_table_size_mb;
        self.config.set_option(name, value)?;
        if self.config.transposition_table_size_mb != previous_size {
            self.tt = TranspositionTable::new_with_mb(self.config.transposition_table_size_mb);
        }
        Ok(())
    }

    /// Forget history, killers and the transposition table.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.ordering.clear();
    }

    pub fn search(&mut self, position: &Position, limits: &SearchLimits) -> SearchResult {
        self.search_with(position, limits, None, |_| {})
    }

    /// Iterative deepening search, calling `on_iteration` after every
    /// completed depth.
    pub fn search_with<F>(
        &mut self,
        position: &Position,
        limits: &SearchLimits,
        stop_flag: Option<Arc<AtomicBool>>,
        mut on_iteration: F,
    ) -> SearchResult
    where
        F: FnMut(&SearchResult),
    {
        let started = Instant::now();

        if !has_legal_move(position, &self.tables) {
            return SearchResult {
                score: position.evaluate_final_position(&self.tables, 0),
                nodes: 1,
                elapsed: started.elapsed(),
                ..SearchResult::default()
            };
        }

        let max_depth = limits
            .depth
            .map_or(self.config.effective_max_depth(), |depth| {
                depth.clamp(1, self.config.effective_max_depth())
            });
        let cancellation = Cancellation::new(
            stop_flag,
            limits.hard_time.map(|budget| started + budget),
            limits.nodes,
        );
        debug!(
            "search start: max depth {max_depth}, limits {limits:?}, fen {}",
            position.fen()
        );

        let mut searcher = Searcher::new(
            &self.tables,
            &self.scorer,
            &self.config,
            &self.keys,
            &mut self.tt,
            &mut self.ordering,
            &cancellation,
        );

        let mut best = SearchResult::default();
        for depth in 1..=max_depth {
            if depth > 1 {
                if cancellation.stop_requested() {
                    break;
                }
                if limits.soft_time.is_some_and(|soft| started.elapsed() >= soft) {
                    debug!("soft time budget reached before depth {depth}");
                    break;
                }
            }

            searcher.begin_iteration();
            searcher.set_stoppable(depth > 1);
            let previous = (depth > 1).then_some(best.score);
            let Some((score, pv)) = aspiration_search(&mut searcher, &self.config, position, depth, previous)
            else {
                debug!("depth {depth} cancelled, keeping depth {}", best.depth);
                break;
            };

            best = SearchResult {
                best_move: pv.first().copied(),
                pv,
                score,
                depth,
                nodes: searcher.nodes(),
                elapsed: started.elapsed(),
            };
            debug!(
                "depth {} score {} nodes {} pv {}",
                best.depth,
                best.score,
                best.nodes,
                best.pv.iter().map(|mv| mv.to_string()).collect::<Vec<_>>().join(" ")
            );
            on_iteration(&best);
        }

        best.nodes = searcher.nodes();
        best.elapsed = started.elapsed();
        best
    }
}

/// Root search inside a window around the previous iteration's score,
/// widening on failure until the score lands inside.
fn aspiration_search<S: BoardScorer>(
    searcher: &mut Searcher<'_, S>,
    config: &SearchConfig,
    position: &Position,
    depth: u8,
    previous: Option<i32>,
) -> Option<(i32, Vec<Move>)> {
    let Some(previous) = previous.filter(|score| {
        config.aspiration_windows && depth >= config.aspiration_window_min_depth && !is_mate_score(*score)
    }) else {
        return searcher.search_root(position, depth, -INFINITE_SCORE, INFINITE_SCORE);
    };

    let mut delta = config.aspiration_window_delta.max(1);
    let mut alpha = (previous - delta).max(-INFINITE_SCORE);
    let mut beta = (previous + delta).min(INFINITE_SCORE);

    loop {
        let (score, pv) = searcher.search_root(position, depth, alpha, beta)?;
        if score > alpha && score < beta {
            return Some((score, pv));
        }
        if alpha <= -INFINITE_SCORE && beta >= INFINITE_SCORE {
            return Some((score, pv));
        }

        if is_mate_score(score) {
            alpha = -INFINITE_SCORE;
            beta = INFINITE_SCORE;
        } else if score <= alpha {
            trace!("aspiration fail low at depth {depth}: {score} <= {alpha}");
            beta = (alpha + beta) / 2;
            alpha = (score - delta).max(-INFINITE_SCORE);
        } else {
            trace!("aspiration fail high at depth {depth}: {score} >= {beta}");
            beta = (score + delta).min(INFINITE_SCORE);
        }
        delta += delta / 2;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{SearchEngine, SearchLimits};
    use crate::game_state::position::Position;
    use crate::move_generation::move_generator::{generate_moves, has_legal_move, legal_moves};
    use crate::moves::attack_tables::AttackTables;
    use crate::search::board_scoring::{
        is_mate_score, BoardScorer, MaterialScorer, TaperedScorer, CHECKMATE_SCORE, DEPTH_FACTOR,
    };
    use crate::search::search_config::SearchConfig;
    use crate::test_support::tables;

    fn shared_tables() -> Arc<AttackTables> {
        Arc::new(tables().clone())
    }

    fn engine(config: SearchConfig) -> SearchEngine {
        SearchEngine::new(shared_tables(), config)
    }

    /// Unpruned negamax with the same depth-zero and terminal rules.
    fn minimax<S: BoardScorer>(position: &Position, scorer: &S, depth: u8) -> i32 {
        let tables = tables();
        if depth == 0 {
            return if has_legal_move(position, tables) {
                scorer.score(position, tables)
            } else {
                position.evaluate_final_position(tables, 0)
            };
        }

        generate_moves(position, tables, false)
            .into_iter()
            .map(|mv| position.apply_move(mv))
            .filter(|child| child.was_produced_by_valid_move(tables))
            .map(|child| -minimax(&child, scorer, depth - 1))
            .max()
            .unwrap_or_else(|| position.evaluate_final_position(tables, depth))
    }

    #[test]
    fn plain_alpha_beta_matches_minimax() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
            "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
        ];
        for fen in fens {
            let position = Position::from_fen(fen).expect("fen should parse");
            for depth in 1..=3u8 {
                let mut engine =
                    SearchEngine::with_scorer(shared_tables(), MaterialScorer, SearchConfig::plain());
                let result = engine.search(&position, &SearchLimits::depth(depth));
                assert_eq!(
                    result.score,
                    minimax(&position, &MaterialScorer, depth),
                    "{fen} at depth {depth}"
                );
            }
        }
    }

    #[test]
    fn finds_mate_in_one() {
        let position = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").expect("fen should parse");
        let result = engine(SearchConfig::default()).search(&position, &SearchLimits::depth(2));
        assert_eq!(result.best_move.map(|mv| mv.to_string()).as_deref(), Some("a1a8"));
        assert_eq!(result.score, CHECKMATE_SCORE + DEPTH_FACTOR);
        assert_eq!(result.mate_in(), Some(1));
    }

    #[test]
    fn prefers_the_faster_mate() {
        // Qg7 mates at once; slower mates are available too.
        let position = Position::from_fen("7k/8/5KQ1/8/8/8/8/8 w - - 0 1").expect("fen should parse");
        let tables = tables();
        let result = engine(SearchConfig::default()).search(&position, &SearchLimits::depth(4));
        let best = result.best_move.expect("a move is found");
        let after = position.apply_move(best);
        assert!(after.is_in_check(tables) && !has_legal_move(&after, tables));
        assert_eq!(result.score, CHECKMATE_SCORE + 3 * DEPTH_FACTOR);
        assert_eq!(result.pv.len(), 1);
        assert_eq!(result.mate_in(), Some(1));

        let plain = engine(SearchConfig::plain()).search(&position, &SearchLimits::depth(4));
        assert_eq!(plain.score, result.score);
        assert_eq!(plain.mate_in(), Some(1));
    }

    /// White mates in two: Rxd8+ Rxd8 Rxd8#.
    const DOUBLED_ROOK_MATE: &str = "2rr2k1/5ppp/8/8/8/8/3R4/3R2K1 w - - 0 1";

    #[test]
    fn plain_search_scores_a_mate_in_two_by_remaining_depth() {
        let position = Position::from_fen(DOUBLED_ROOK_MATE).expect("fen should parse");
        let result = engine(SearchConfig::plain()).search(&position, &SearchLimits::depth(4));
        let pv: Vec<String> = result.pv.iter().map(|mv| mv.to_string()).collect();
        assert_eq!(pv, ["d2d8", "c8d8", "d1d8"]);
        // Mated three plies down with one ply of depth left.
        assert_eq!(result.score, CHECKMATE_SCORE + DEPTH_FACTOR);
        assert_eq!(result.mate_in(), Some(2));
    }

    #[test]
    fn reductions_and_pruning_keep_the_forced_mate() {
        let position = Position::from_fen(DOUBLED_ROOK_MATE).expect("fen should parse");
        let plain = engine(SearchConfig::plain()).search(&position, &SearchLimits::depth(4));

        // Reduce every move after the first wherever depth allows.
        let mut aggressive = SearchConfig::default();
        aggressive.lmr_min_depth = 2;
        aggressive.lmr_min_full_depth_searched_moves = 1;
        aggressive.nmp_min_depth = 2;

        for config in [SearchConfig::default(), aggressive] {
            let full = engine(config).search(&position, &SearchLimits::depth(4));
            assert_eq!(full.best_move, plain.best_move);
            assert_eq!(full.mate_in(), plain.mate_in());
            assert!(is_mate_score(full.score) && full.score > 0);
        }
    }

    #[test]
    fn defender_sees_the_mate_it_cannot_avoid() {
        // Same position with Black to move after Rxd8+.
        let position =
            Position::from_fen("2rR2k1/5ppp/8/8/8/8/8/3R2K1 b - - 0 1").expect("fen should parse");
        let plain = engine(SearchConfig::plain()).search(&position, &SearchLimits::depth(3));
        let full = engine(SearchConfig::default()).search(&position, &SearchLimits::depth(3));
        assert_eq!(plain.best_move.map(|mv| mv.to_string()).as_deref(), Some("c8d8"));
        assert_eq!(full.best_move, plain.best_move);
        assert_eq!(plain.mate_in(), Some(-1));
        assert_eq!(full.mate_in(), Some(-1));
    }

    #[test]
    fn stalemate_scores_zero_with_empty_pv() {
        let position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").expect("fen should parse");
        let result = engine(SearchConfig::default()).search(&position, &SearchLimits::depth(3));
        assert_eq!(result.score, 0);
        assert!(result.pv.is_empty());
        assert_eq!(result.best_move, None);
    }

    #[test]
    fn mated_root_returns_terminal_score_and_no_move() {
        let position = Position::from_fen("6k1/6Q1/6K1/8/8/8/8/8 b - - 0 1").expect("fen should parse");
        let result = engine(SearchConfig::default()).search(&position, &SearchLimits::depth(3));
        assert_eq!(result.score, -CHECKMATE_SCORE);
        assert_eq!(result.best_move, None);
        assert_eq!(result.ponder_move(), None);
        assert_eq!(result.depth, 0);
    }

    #[test]
    fn reports_every_completed_iteration() {
        let mut depths = Vec::new();
        let result = engine(SearchConfig::default()).search_with(
            &Position::start(),
            &SearchLimits::depth(4),
            None,
            |iteration| depths.push(iteration.depth),
        );
        assert_eq!(depths, vec![1, 2, 3, 4]);
        assert_eq!(result.depth, 4);
        let tables = tables();
        let best = result.best_move.expect("start position has moves");
        assert!(legal_moves(&Position::start(), tables).contains(&best));
    }

    #[test]
    fn stop_flag_keeps_the_first_iteration() {
        let flag = Arc::new(AtomicBool::new(true));
        let result = engine(SearchConfig::default()).search_with(
            &Position::start(),
            &SearchLimits::depth(10),
            Some(flag.clone()),
            |_| {},
        );
        assert!(flag.load(Ordering::Relaxed));
        assert_eq!(result.depth, 1);
        assert!(result.best_move.is_some());
        assert_eq!(result.pv.len(), 1);
    }

    #[test]
    fn node_budget_returns_last_completed_iteration() {
        let mut completed = Vec::new();
        let limits = SearchLimits {
            nodes: Some(2_000),
            ..SearchLimits::default()
        };
        let result = engine(SearchConfig::default()).search_with(
            &Position::start(),
            &limits,
            None,
            |iteration| completed.push(iteration.clone()),
        );
        let last = completed.last().expect("depth one always completes");
        assert_eq!(result.depth, last.depth);
        assert_eq!(result.pv, last.pv);
        assert!(result.depth < 64);
    }

    #[test]
    fn soft_time_stops_new_iterations() {
        let limits = SearchLimits {
            soft_time: Some(Duration::ZERO),
            ..SearchLimits::default()
        };
        let result = engine(SearchConfig::default()).search(&Position::start(), &limits);
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn new_game_and_options_keep_the_engine_usable() {
        let mut engine = SearchEngine::with_scorer(shared_tables(), TaperedScorer, SearchConfig::default());
        engine.set_option("Hash", "2").expect("Hash accepts 2");
        assert_eq!(engine.config().transposition_table_size_mb, 2);
        assert!(engine.set_option("Hash", "0").is_err());

        let first = engine.search(&Position::start(), &SearchLimits::depth(3));
        engine.new_game();
        let second = engine.search(&Position::start(), &SearchLimits::depth(3));
        assert_eq!(first.score, second.score);
        assert_eq!(first.best_move, second.best_move);
    }
}
