//! Perft runner: leaf counts, per-move divide and detailed counters.
//!
//! Usage:
//! `cargo run --release --bin perft -- --depth 5`
//! `cargo run --release --bin perft -- --fen "<fen>" --depth 4 --divide`
//! `cargo run --release --bin perft -- --depth 4 --counts`
//! `cargo run --release --bin perft -- --depth 6 --threads 8`
//!
//! Set `RUST_LOG=debug` for worker logging.

use std::time::Instant;

use log::info;

use bitboard_chess::errors::{ChessError, ChessResult};
use bitboard_chess::game_state::chess_rules::STARTING_POSITION_FEN;
use bitboard_chess::game_state::chess_types::Position;
use bitboard_chess::move_generation::perft::perft_parallel;
use bitboard_chess::tables::engine_tables::EngineTables;

struct Options {
    fen: String,
    depth: u32,
    threads: usize,
    divide: bool,
    counts: bool,
}

fn parse_args() -> ChessResult<Options> {
    let mut options = Options {
        fen: STARTING_POSITION_FEN.to_string(),
        depth: 4,
        threads: 1,
        divide: false,
        counts: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| ChessError::malformed(format!("{flag} needs a value")))
        };
        match arg.as_str() {
            "--fen" => options.fen = value("--fen")?,
            "--depth" => {
                options.depth = value("--depth")?
                    .parse()
                    .map_err(|_| ChessError::malformed("--depth expects a number"))?
            }
            "--threads" => {
                options.threads = value("--threads")?
                    .parse()
                    .map_err(|_| ChessError::malformed("--threads expects a number"))?
            }
            "--divide" => options.divide = true,
            "--counts" => options.counts = true,
            other => return Err(ChessError::malformed(format!("unknown argument {other}"))),
        }
    }
    Ok(options)
}

fn main() -> ChessResult<()> {
    env_logger::init();
    let options = parse_args()?;
    let tables = EngineTables::new();
    let mut position = Position::from_fen(&tables, &options.fen)?;
    info!("perft depth {} on {}", options.depth, position.to_fen());

    let started = Instant::now();
    let nodes = if options.divide {
        let mut total = 0;
        for (mv, nodes) in position.divide(options.depth)? {
            println!("{mv}: {nodes}");
            total += nodes;
        }
        total
    } else if options.counts {
        let counts = position.perft_counts(options.depth)?;
        println!("{counts:#?}");
        counts.nodes
    } else {
        perft_parallel(&position, options.depth, options.threads)?
    };

    let elapsed = started.elapsed();
    let nps = (nodes as f64 / elapsed.as_secs_f64().max(1e-9)) as u64;
    println!("nodes {nodes} time {}ms nps {nps}", elapsed.as_millis());
    Ok(())
}
