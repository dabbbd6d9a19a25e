//! Command-line entry: the UCI loop by default, or a perft divide.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::{error, info};

use lynx_chess::game_state::position::Position;
use lynx_chess::move_generation::perft::perft_divide;
use lynx_chess::moves::attack_tables::AttackTables;
use lynx_chess::search::search_config::SearchConfig;
use lynx_chess::uci::uci_top::run_stdio_loop;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count leaf nodes per root move to a fixed depth
    Perft {
        #[arg(short, long, default_value_t = 4)]
        depth: u8,

        /// Position to count from; the standard start position when omitted
        #[arg(short, long)]
        fen: Option<String>,
    },
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level))
        .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Stderr)
        .init();
}

fn run_perft(tables: &AttackTables, depth: u8, fen: Option<&str>) -> Result<(), lynx_chess::errors::FenError> {
    let position = match fen {
        Some(fen) => Position::from_fen(fen)?,
        None => Position::start(),
    };

    let started = Instant::now();
    let divide = perft_divide(&position, tables, depth);
    let total: u64 = divide.iter().map(|(_, nodes)| nodes).sum();
    for (mv, nodes) in &divide {
        println!("{mv}: {nodes}");
    }
    println!();
    println!("Nodes searched: {total}");
    info!("perft {depth} took {:?}", started.elapsed());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let tables = match AttackTables::build() {
        Ok(tables) => Arc::new(tables),
        Err(err) => {
            error!("attack table construction failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match args.command {
        Some(Command::Perft { depth, fen }) => run_perft(&tables, depth, fen.as_deref()).map_err(|err| err.to_string()),
        None => run_stdio_loop(tables, SearchConfig::default()).map_err(|err| err.to_string()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
