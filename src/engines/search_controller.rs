//! Control surface between a protocol front-end and the search.
//!
//! The controller owns the current position and the engine. `start_search`
//! moves the engine onto a worker thread for the duration of one search and
//! takes it back once the worker has finished, so engine state is never
//! shared while a search is running. Only one search runs at a time.
//!
//! Timed and depth-limited searches report their best move through the
//! `on_best_move` callback when they finish. Infinite searches never report
//! on their own; the caller ends them with `stop_search`. A ponder search
//! stays silent until `ponder_hit` arms its clock budget, after which it
//! behaves like a timed search.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, warn};

use crate::engines::engine_trait::{BestMove, Engine, GoParams};
use crate::engines::time_management::resolve_limits;
use crate::errors::{EngineError, EngineResult};
use crate::game_state::position::Position;
use crate::moves::attack_tables::AttackTables;
use crate::search::iterative_deepening::{SearchEngine, SearchLimits, SearchResult};
use crate::search::search_config::SearchConfig;
use crate::utils::long_algebraic::parse_uci_move;

pub type IterationCallback = Box<dyn FnMut(&SearchResult) + Send>;
pub type BestMoveCallback = Box<dyn FnOnce(BestMove) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionBase {
    StartPos,
    Fen(String),
}

/// `position` command: a base position plus moves in long algebraic form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionCommand {
    pub base: PositionBase,
    pub moves: Vec<String>,
}

impl PositionCommand {
    pub fn startpos() -> Self {
        Self {
            base: PositionBase::StartPos,
            moves: Vec::new(),
        }
    }
}

// Who delivers the best move of a running search.
const REPORT_SILENT: u8 = 0;
const REPORT_AUTO: u8 = 1;
const REPORT_DONE: u8 = 2;
/// A silent search finished and nobody has reported it yet.
const REPORT_UNCLAIMED: u8 = 3;

struct RunningSearch<E> {
    handle: JoinHandle<(E, SearchResult)>,
    stop_flag: Arc<AtomicBool>,
    report: Arc<AtomicU8>,
    /// Clock limits a ponder search switches to on a ponder hit.
    ponder_limits: Option<SearchLimits>,
    /// Dropping this wakes the deadline thread without stopping the search.
    deadline: Option<Sender<()>>,
}

pub struct SearchController<E: Engine = SearchEngine> {
    tables: Arc<AttackTables>,
    position: Position,
    engine: Option<E>,
    running: Option<RunningSearch<E>>,
    last_result: Option<SearchResult>,
}

impl SearchController<SearchEngine> {
    pub fn new(tables: Arc<AttackTables>, config: SearchConfig) -> Self {
        let engine = SearchEngine::new(Arc::clone(&tables), config);
        Self::with_engine(tables, engine)
    }
}

impl<E: Engine> SearchController<E> {
    pub fn with_engine(tables: Arc<AttackTables>, engine: E) -> Self {
        Self {
            tables,
            position: Position::start(),
            engine: Some(engine),
            running: None,
            last_result: None,
        }
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Result of the most recent search that has been collected.
    #[inline]
    pub fn last_result(&self) -> Option<&SearchResult> {
        self.last_result.as_ref()
    }

    /// Whether a search worker is still running.
    pub fn is_searching(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Ready to accept commands; false only if a search worker panicked and
    /// took the engine with it.
    pub fn is_ready(&mut self) -> bool {
        if self.reclaim_finished().is_err() {
            return false;
        }
        self.engine.is_some() || self.is_searching()
    }

    pub fn apply_position(&mut self, command: &PositionCommand) -> EngineResult<()> {
        self.ensure_idle()?;

        let mut position = match &command.base {
            PositionBase::StartPos => Position::start(),
            PositionBase::Fen(fen) => Position::from_fen(fen)?,
        };
        if !position.is_valid(&self.tables) {
            return Err(EngineError::InvalidPosition(position.fen()));
        }
        for text in &command.moves {
            let mv = parse_uci_move(text, &position, &self.tables)?;
            position = position.apply_move(mv);
        }

        debug!("position set to {}", position.fen());
        self.position = position;
        Ok(())
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> EngineResult<()> {
        let engine = self.idle_engine()?;
        engine.set_option(name, value)?;
        debug!("option {name} set to {value}");
        Ok(())
    }

    pub fn config(&mut self) -> EngineResult<&SearchConfig> {
        Ok(self.idle_engine()?.config())
    }

    /// Reset history, killers and the transposition table.
    pub fn new_game(&mut self) -> EngineResult<()> {
        self.idle_engine()?.new_game();
        self.position = Position::start();
        self.last_result = None;
        Ok(())
    }

    /// Start searching the current position on a worker thread.
    pub fn start_search(
        &mut self,
        params: GoParams,
        mut on_iteration: IterationCallback,
        on_best_move: BestMoveCallback,
    ) -> EngineResult<()> {
        self.ensure_idle()?;
        let mut engine = self.engine.take().ok_or(EngineError::WorkerPanicked)?;

        let side = self.position.side_to_move();
        let limits = resolve_limits(side, &params, engine.config());
        let ponder_limits = (params.ponder && !params.infinite).then(|| {
            let timed = GoParams {
                ponder: false,
                ..params.clone()
            };
            resolve_limits(side, &timed, engine.config())
        });
        let auto_report = !(params.infinite || params.ponder);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let report = Arc::new(AtomicU8::new(if auto_report { REPORT_AUTO } else { REPORT_SILENT }));
        let position = self.position.clone();
        debug!("starting search with {limits:?}, auto report {auto_report}");

        let worker_stop = Arc::clone(&stop_flag);
        let worker_report = Arc::clone(&report);
        let spawned = thread::Builder::new()
            .name("search".to_owned())
            .spawn(move || {
                let result = engine.search(&position, &limits, worker_stop, &mut *on_iteration);
                let previous = worker_report.fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                    match state {
                        REPORT_AUTO => Some(REPORT_DONE),
                        REPORT_SILENT => Some(REPORT_UNCLAIMED),
                        _ => None,
                    }
                });
                if previous == Ok(REPORT_AUTO) {
                    on_best_move(BestMove::from(&result));
                }
                (engine, result)
            });

        match spawned {
            Ok(handle) => {
                self.running = Some(RunningSearch {
                    handle,
                    stop_flag,
                    report,
                    ponder_limits,
                    deadline: None,
                });
                Ok(())
            }
            Err(err) => {
                // The closure, and the engine inside it, is gone with the failed spawn.
                warn!("could not spawn search thread: {err}");
                Err(EngineError::WorkerPanicked)
            }
        }
    }

    /// Stop the running search and wait for it. Returns the best move of the
    /// last completed iteration unless the worker already reported it.
    pub fn stop_search(&mut self) -> EngineResult<Option<BestMove>> {
        let Some(running) = self.running.take() else {
            return Ok(None);
        };
        running.stop_flag.store(true, Ordering::Release);
        let already_reported = running.report.swap(REPORT_DONE, Ordering::AcqRel) == REPORT_DONE;

        let result = self.collect(running.handle)?;
        Ok((!already_reported).then(|| BestMove::from(&result)))
    }

    /// The opponent played the expected move: the ponder search keeps going
    /// and from now on runs against the clock it was started with.
    ///
    /// Returns the best move straight away when the ponder search had
    /// already finished; otherwise the worker reports through the
    /// `on_best_move` callback once the armed budget runs out.
    pub fn ponder_hit(&mut self) -> EngineResult<Option<BestMove>> {
        let Some(running) = self.running.as_mut() else {
            debug!("ponder hit without a running search");
            return Ok(None);
        };
        let Some(limits) = running.ponder_limits.take() else {
            debug!("ponder hit on a search that is not pondering");
            return Ok(None);
        };

        match running
            .report
            .compare_exchange(REPORT_SILENT, REPORT_AUTO, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                if let Some(budget) = limits.soft_time.or(limits.hard_time) {
                    running.deadline = Some(arm_deadline(Arc::clone(&running.stop_flag), budget));
                }
                debug!("ponder hit, searching with {limits:?}");
                Ok(None)
            }
            // The ponder search ran out of depth before the hit.
            Err(_) => self.stop_search(),
        }
    }

    /// Wait for the running search to finish on its own.
    pub fn wait(&mut self) -> EngineResult<Option<SearchResult>> {
        match self.running.take() {
            Some(running) => self.collect(running.handle).map(Some),
            None => Ok(None),
        }
    }

    fn collect(&mut self, handle: JoinHandle<(E, SearchResult)>) -> EngineResult<SearchResult> {
        let (engine, result) = handle.join().map_err(|_| {
            error!("search worker panicked; engine state is lost");
            EngineError::WorkerPanicked
        })?;
        self.engine = Some(engine);
        self.last_result = Some(result.clone());
        Ok(result)
    }

    fn reclaim_finished(&mut self) -> EngineResult<()> {
        if self
            .running
            .as_ref()
            .is_some_and(|running| running.handle.is_finished())
        {
            self.wait()?;
        }
        Ok(())
    }

    fn ensure_idle(&mut self) -> EngineResult<()> {
        self.reclaim_finished()?;
        if self.running.is_some() {
            return Err(EngineError::SearchInProgress);
        }
        Ok(())
    }

    fn idle_engine(&mut self) -> EngineResult<&mut E> {
        self.ensure_idle()?;
        self.engine.as_mut().ok_or(EngineError::WorkerPanicked)
    }
}

/// Raise `stop_flag` once `budget` has passed, unless the returned sender
/// is dropped first.
fn arm_deadline(stop_flag: Arc<AtomicBool>, budget: Duration) -> Sender<()> {
    let (cancel, wait) = mpsc::channel::<()>();
    let spawned = thread::Builder::new()
        .name("ponder-deadline".to_owned())
        .spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = wait.recv_timeout(budget) {
                stop_flag.store(true, Ordering::Release);
            }
        });
    if let Err(err) = spawned {
        // Without a timer the search only ends on `stop`.
        warn!("could not spawn ponder deadline thread: {err}");
    }
    cancel
}

impl<E: Engine> Drop for SearchController<E> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop_flag.store(true, Ordering::Release);
            if running.handle.join().is_err() {
                error!("search worker panicked during shutdown");
            }
        }
    }
}
