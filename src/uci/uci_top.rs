//! UCI protocol front-end and command loop.
//!
//! Parses UCI commands, keeps the controller's position current, routes
//! `go` requests to the background search and emits protocol output. All
//! output goes through a channel so search progress from the worker thread
//! and replies from the command loop are written by a single printer.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::engines::engine_trait::GoParams;
use crate::engines::search_controller::{PositionBase, PositionCommand, SearchController};
use crate::errors::{EngineError, EngineResult};
use crate::moves::attack_tables::AttackTables;
use crate::search::iterative_deepening::SearchResult;
use crate::search::search_config::SearchConfig;

const UCI_ENGINE_NAME: &str = concat!("Lynx Chess ", env!("CARGO_PKG_VERSION"));
const UCI_ENGINE_AUTHOR: &str = "the Lynx Chess developers";

pub fn run_stdio_loop(tables: Arc<AttackTables>, config: SearchConfig) -> io::Result<()> {
    let (out_tx, out_rx) = channel::<String>();
    let printer = thread::spawn(move || -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        for line in out_rx {
            writeln!(lock, "{line}")?;
            lock.flush()?;
        }
        Ok(())
    });

    let mut uci = UciState::new(tables, config, out_tx);
    for line in io::stdin().lock().lines() {
        let line = line?;
        if uci.handle_command(&line) {
            break;
        }
    }

    // Closing the channel lets the printer drain and exit.
    drop(uci);
    printer
        .join()
        .map_err(|_| io::Error::other("printer thread panicked"))?
}

struct UciState {
    controller: SearchController,
    out: Sender<String>,
    debug_mode: bool,
}

impl UciState {
    fn new(tables: Arc<AttackTables>, config: SearchConfig, out: Sender<String>) -> Self {
        Self {
            controller: SearchController::new(tables, config),
            out,
            debug_mode: false,
        }
    }

    fn send(&self, line: impl Into<String>) {
        // The printer only hangs up at shutdown.
        let _ = self.out.send(line.into());
    }

    fn report(&self, command: &str, err: &EngineError) {
        warn!("{command} failed: {err}");
        self.send(format!("info string {command} error: {err}"));
    }

    /// Handle one input line; returns true on `quit`.
    fn handle_command(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        let mut parts = trimmed.split_whitespace();
        let Some(cmd) = parts.next() else {
            return false;
        };
        debug!("uci <- {trimmed}");

        match cmd {
            "uci" => {
                self.send(format!("id name {UCI_ENGINE_NAME}"));
                self.send(format!("id author {UCI_ENGINE_AUTHOR}"));
                self.send("option name Ponder type check default false");
                for option in SearchConfig::options() {
                    self.send(option.to_string());
                }
                self.send("uciok");
            }
            "isready" => {
                if !self.controller.is_ready() {
                    warn!("engine is not ready; the search worker was lost");
                    self.send("info string engine state lost, restart required");
                }
                self.send("readyok");
            }
            "setoption" => {
                if let Err(err) = self.handle_setoption(trimmed) {
                    self.report("setoption", &err);
                }
            }
            "ucinewgame" => {
                self.stop_silently();
                if let Err(err) = self.controller.new_game() {
                    self.report("ucinewgame", &err);
                }
            }
            "position" => {
                self.stop_silently();
                let applied = parse_position(trimmed).and_then(|command| self.controller.apply_position(&command));
                if let Err(err) = applied {
                    self.report("position", &err);
                }
            }
            "go" => {
                if let Err(err) = self.handle_go(trimmed) {
                    self.report("go", &err);
                    self.send("bestmove 0000");
                }
            }
            "stop" => self.stop_and_report(),
            "ponderhit" => match self.controller.ponder_hit() {
                Ok(Some(best)) => self.send(best.to_string()),
                Ok(None) => {}
                Err(err) => {
                    self.report("ponderhit", &err);
                    self.send("bestmove 0000");
                }
            },
            "debug" => {
                self.debug_mode = parts.next().is_some_and(|mode| mode.eq_ignore_ascii_case("on"));
            }
            "quit" => {
                self.stop_silently();
                return true;
            }
            _ => info!("ignoring unknown command '{trimmed}'"),
        }

        false
    }

    fn handle_setoption(&mut self, line: &str) -> EngineResult<()> {
        let (name, value) = parse_setoption(line)?;
        if name.eq_ignore_ascii_case("Ponder") {
            // Pondering is driven by `go ponder`; nothing to configure.
            return Ok(());
        }
        self.controller.set_option(&name, &value)
    }

    fn handle_go(&mut self, line: &str) -> EngineResult<()> {
        let params = parse_go_params(line)?;
        let info_out = self.out.clone();
        let best_out = self.out.clone();
        let debug_mode = self.debug_mode;

        self.controller.start_search(
            params,
            Box::new(move |result| {
                let _ = info_out.send(info_line(result));
                if debug_mode {
                    let _ = info_out.send(format!("info string nps {}", result.nps()));
                }
            }),
            Box::new(move |best| {
                let _ = best_out.send(best.to_string());
            }),
        )
    }

    fn stop_and_report(&mut self) {
        match self.controller.stop_search() {
            Ok(Some(best)) => self.send(best.to_string()),
            Ok(None) => {}
            Err(err) => {
                self.report("stop", &err);
                self.send("bestmove 0000");
            }
        }
    }

    /// End any running search without emitting a `bestmove`.
    fn stop_silently(&mut self) {
        if let Err(err) = self.controller.stop_search() {
            warn!("stopping search failed: {err}");
        }
    }
}

/// `info` line for one completed iteration.
fn info_line(result: &SearchResult) -> String {
    let score = match result.mate_in() {
        Some(moves) => format!("mate {moves}"),
        None => format!("cp {}", result.score),
    };
    let mut line = format!(
        "info depth {} score {} nodes {} nps {} time {}",
        result.depth,
        score,
        result.nodes,
        result.nps(),
        result.elapsed.as_millis()
    );
    if !result.pv.is_empty() {
        line.push_str(" pv");
        for mv in &result.pv {
            line.push(' ');
            line.push_str(&mv.to_string());
        }
    }
    line
}

fn parse_setoption(line: &str) -> EngineResult<(String, String)> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Field {
        None,
        Name,
        Value,
    }

    let mut name_tokens = Vec::new();
    let mut value_tokens = Vec::new();
    let mut field = Field::None;

    for token in line.split_whitespace().skip(1) {
        match (token, field) {
            ("name", _) => field = Field::Name,
            ("value", _) => field = Field::Value,
            (_, Field::Name) => name_tokens.push(token),
            (_, Field::Value) => value_tokens.push(token),
            (_, Field::None) => return Err(EngineError::Protocol(line.to_owned())),
        }
    }

    if name_tokens.is_empty() {
        return Err(EngineError::Protocol(line.to_owned()));
    }
    Ok((name_tokens.join(" "), value_tokens.join(" ")))
}

fn parse_position(line: &str) -> EngineResult<PositionCommand> {
    let mut tokens = line.split_whitespace().skip(1).peekable();

    let base = match tokens.next() {
        Some("startpos") => PositionBase::StartPos,
        Some("fen") => {
            let mut fields = Vec::new();
            while let Some(field) = tokens.next_if(|token| *token != "moves") {
                fields.push(field);
            }
            if fields.is_empty() {
                return Err(EngineError::Protocol("missing FEN after 'position fen'".to_owned()));
            }
            PositionBase::Fen(fields.join(" "))
        }
        _ => return Err(EngineError::Protocol(line.to_owned())),
    };

    let moves = match tokens.next() {
        Some("moves") => tokens.map(str::to_owned).collect(),
        None => Vec::new(),
        Some(_) => return Err(EngineError::Protocol(line.to_owned())),
    };

    Ok(PositionCommand { base, moves })
}

fn parse_go_params(line: &str) -> EngineResult<GoParams> {
    fn number<T: std::str::FromStr>(keyword: &str, value: Option<&str>) -> EngineResult<T> {
        value
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| EngineError::Protocol(format!("'{keyword}' needs a numeric value")))
    }

    let mut params = GoParams::default();
    let mut tokens = line.split_whitespace().skip(1);
    while let Some(token) = tokens.next() {
        match token {
            "depth" => params.depth = Some(number(token, tokens.next())?),
            "nodes" => params.nodes = Some(number(token, tokens.next())?),
            "movetime" => params.movetime_ms = Some(number(token, tokens.next())?),
            "wtime" => params.wtime_ms = Some(number(token, tokens.next())?),
            "btime" => params.btime_ms = Some(number(token, tokens.next())?),
            "winc" => params.winc_ms = Some(number(token, tokens.next())?),
            "binc" => params.binc_ms = Some(number(token, tokens.next())?),
            "movestogo" => params.movestogo = Some(number(token, tokens.next())?),
            "infinite" => params.infinite = true,
            "ponder" => params.ponder = true,
            other => debug!("ignoring go token '{other}'"),
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{channel, Receiver};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::{info_line, parse_go_params, parse_position, parse_setoption, UciState};
    use crate::engines::search_controller::PositionBase;
    use crate::errors::EngineError;
    use crate::game_state::chess_types::Side;
    use crate::search::board_scoring::{CHECKMATE_SCORE, DEPTH_FACTOR};
    use crate::search::iterative_deepening::SearchResult;
    use crate::search::search_config::SearchConfig;
    use crate::test_support::{find_move, tables};

    fn state() -> (UciState, Receiver<String>) {
        let (tx, rx) = channel();
        (UciState::new(Arc::new(tables().clone()), SearchConfig::default(), tx), rx)
    }

    fn drain(rx: &Receiver<String>) -> Vec<String> {
        rx.try_iter().collect()
    }

    #[test]
    fn uci_lists_identity_and_options() {
        let (mut uci, rx) = state();
        assert!(!uci.handle_command("uci"));
        let lines = drain(&rx);
        assert!(lines[0].starts_with("id name Lynx Chess"));
        assert!(lines.iter().any(|line| line.starts_with("option name Hash type spin")));
        assert_eq!(lines.last().map(String::as_str), Some("uciok"));

        uci.handle_command("isready");
        assert_eq!(drain(&rx), vec!["readyok".to_owned()]);
    }

    #[test]
    fn position_startpos_with_moves_updates_state() {
        let (mut uci, rx) = state();
        uci.handle_command("position startpos moves e2e4 e7e5 g1f3");
        assert!(drain(&rx).is_empty());
        assert_eq!(uci.controller.position().side_to_move(), Side::Black);
    }

    #[test]
    fn position_fen_without_moves_updates_state() {
        let (mut uci, _rx) = state();
        uci.handle_command("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        assert_eq!(uci.controller.position().fen(), "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
    }

    #[test]
    fn bad_position_is_reported_and_ignored() {
        let (mut uci, rx) = state();
        uci.handle_command("position startpos moves e2e5");
        let lines = drain(&rx);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("info string position error"));
        assert_eq!(uci.controller.position().side_to_move(), Side::White);
    }

    #[test]
    fn go_depth_reports_info_and_bestmove() {
        let (mut uci, rx) = state();
        uci.handle_command("position fen 6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        uci.handle_command("go depth 2");

        let mut lines = Vec::new();
        while let Ok(line) = rx.recv_timeout(Duration::from_secs(30)) {
            let done = line.starts_with("bestmove");
            lines.push(line);
            if done {
                break;
            }
        }
        assert_eq!(lines.last().map(String::as_str), Some("bestmove a1a8"));
        assert!(lines[0].starts_with("info depth 1 "));
        assert!(lines.iter().any(|line| line.contains("score mate 1")));
    }

    #[test]
    fn go_infinite_waits_for_stop() {
        let (mut uci, rx) = state();
        uci.handle_command("go infinite");
        uci.handle_command("stop");
        let lines = drain(&rx);
        let bestmoves: Vec<_> = lines.iter().filter(|line| line.starts_with("bestmove")).collect();
        assert_eq!(bestmoves.len(), 1);
        assert_ne!(bestmoves[0], "bestmove 0000");
    }

    #[test]
    fn ponderhit_switches_the_search_to_the_clock() {
        let (mut uci, rx) = state();
        uci.handle_command("go ponder wtime 1000 btime 1000");
        thread::sleep(Duration::from_millis(20));
        assert!(!drain(&rx).iter().any(|line| line.starts_with("bestmove")));

        // The search keeps running and reports once the armed budget is spent.
        uci.handle_command("ponderhit");
        let mut bestmoves = 0;
        while let Ok(line) = rx.recv_timeout(Duration::from_secs(30)) {
            if line.starts_with("bestmove") {
                assert_ne!(line, "bestmove 0000");
                bestmoves += 1;
                break;
            }
        }
        assert_eq!(bestmoves, 1);

        uci.handle_command("stop");
        assert!(!drain(&rx).iter().any(|line| line.starts_with("bestmove")));
    }

    #[test]
    fn setoption_updates_the_engine_config() {
        let (mut uci, rx) = state();
        uci.handle_command("setoption name MaxDepth value 9");
        uci.handle_command("setoption name Ponder value true");
        assert!(drain(&rx).is_empty());
        assert_eq!(uci.controller.config().expect("idle").max_depth, 9);

        uci.handle_command("setoption name MaxDepth value banana");
        let lines = drain(&rx);
        assert!(lines[0].starts_with("info string setoption error"));
    }

    #[test]
    fn quit_ends_the_loop() {
        let (mut uci, _rx) = state();
        assert!(uci.handle_command("quit"));
    }

    #[test]
    fn parse_setoption_handles_multi_word_names() {
        assert_eq!(
            parse_setoption("setoption name Clear Hash").expect("valid"),
            ("Clear Hash".to_owned(), String::new())
        );
        assert_eq!(
            parse_setoption("setoption name Hash value 64").expect("valid"),
            ("Hash".to_owned(), "64".to_owned())
        );
        assert!(matches!(
            parse_setoption("setoption value 3"),
            Err(EngineError::Protocol(_))
        ));
    }

    #[test]
    fn parse_position_splits_fen_and_moves() {
        let command = parse_position("position fen 8/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4").expect("valid");
        assert_eq!(command.base, PositionBase::Fen("8/8/8/8/8/8/4P3/4K3 w - - 0 1".to_owned()));
        assert_eq!(command.moves, vec!["e2e4".to_owned()]);

        assert!(parse_position("position").is_err());
        assert!(parse_position("position fen").is_err());
        assert!(parse_position("position startpos e2e4").is_err());
    }

    #[test]
    fn parse_go_params_reads_clock_and_modes() {
        let params = parse_go_params("go wtime 120000 btime 60000 winc 1000 binc 1000 movestogo 24").expect("valid");
        assert_eq!(params.movetime_ms, None);
        assert_eq!(params.wtime_ms, Some(120_000));
        assert_eq!(params.btime_ms, Some(60_000));
        assert_eq!(params.winc_ms, Some(1_000));
        assert_eq!(params.binc_ms, Some(1_000));
        assert_eq!(params.movestogo, Some(24));

        let params = parse_go_params("go nodes 50000 depth 6 ponder infinite").expect("valid");
        assert_eq!(params.nodes, Some(50_000));
        assert_eq!(params.depth, Some(6));
        assert!(params.ponder);
        assert!(params.infinite);

        assert!(parse_go_params("go depth").is_err());
        assert!(parse_go_params("go movetime soon").is_err());
    }

    #[test]
    fn info_line_formats_mate_and_centipawns() {
        let tables = tables();
        let position = crate::game_state::position::Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1")
            .expect("fen should parse");
        let mate = SearchResult {
            best_move: Some(find_move(&position, tables, "a1a8")),
            pv: vec![find_move(&position, tables, "a1a8")],
            score: CHECKMATE_SCORE + DEPTH_FACTOR,
            depth: 2,
            nodes: 40,
            ..SearchResult::default()
        };
        assert_eq!(info_line(&mate), "info depth 2 score mate 1 nodes 40 nps 0 time 0 pv a1a8");

        let quiet = SearchResult {
            score: -35,
            depth: 1,
            ..SearchResult::default()
        };
        assert_eq!(info_line(&quiet), "info depth 1 score cp -35 nodes 0 nps 0 time 0");
    }
}
