//! Perft: legal leaf counting used as a move-generation oracle.

use std::thread;

use log::debug;

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_types::*;
use crate::move_generation::move_generator::{generate_moves, GenerationMode};
use crate::moves::move_descriptions::Move;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub discovery_checks: u64,
    pub double_checks: u64,
    pub checkmates: u64,
}

impl PerftCounts {
    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
        self.checks += rhs.checks;
        self.discovery_checks += rhs.discovery_checks;
        self.double_checks += rhs.double_checks;
        self.checkmates += rhs.checkmates;
    }
}

impl Position<'_> {
    /// Number of leaf nodes `depth` plies below this position.
    pub fn perft(&mut self, depth: u32) -> ChessResult<u64> {
        if depth == 0 {
            return Ok(1);
        }
        let moves = generate_moves(self, GenerationMode::All);
        if depth == 1 {
            return Ok(moves.len() as u64);
        }
        let mut nodes = 0;
        for &mv in moves.iter() {
            self.make_move(mv)?;
            let child = self.perft(depth - 1);
            self.unmake_move()?;
            nodes += child?;
        }
        Ok(nodes)
    }

    /// Per-root-move leaf counts, in generation order.
    pub fn divide(&mut self, depth: u32) -> ChessResult<Vec<(Move, u64)>> {
        let moves = generate_moves(self, GenerationMode::All);
        let mut out = Vec::with_capacity(moves.len());
        for &mv in moves.iter() {
            self.make_move(mv)?;
            let child = self.perft(depth.saturating_sub(1));
            self.unmake_move()?;
            out.push((mv, child?));
        }
        Ok(out)
    }

    /// Leaf counts broken down by the kind of the final move.
    pub fn perft_counts(&mut self, depth: u32) -> ChessResult<PerftCounts> {
        let mut counts = PerftCounts::default();
        if depth == 0 {
            counts.nodes = 1;
            return Ok(counts);
        }
        self.perft_counts_recurse(depth, &mut counts)?;
        Ok(counts)
    }

    fn perft_counts_recurse(&mut self, depth: u32, counts: &mut PerftCounts) -> ChessResult<()> {
        let moves = generate_moves(self, GenerationMode::All);
        for &mv in moves.iter() {
            if depth == 1 {
                self.classify_leaf(mv, counts)?;
                continue;
            }
            self.make_move(mv)?;
            let result = self.perft_counts_recurse(depth - 1, counts);
            self.unmake_move()?;
            result?;
        }
        Ok(())
    }

    fn classify_leaf(&mut self, mv: Move, counts: &mut PerftCounts) -> ChessResult<()> {
        counts.nodes += 1;
        if self.is_capture(mv) {
            counts.captures += 1;
        }
        if mv.is_en_passant() {
            counts.en_passant += 1;
        }
        if mv.is_castle() {
            counts.castles += 1;
        }
        if mv.is_promotion() {
            counts.promotions += 1;
        }
        if !self.move_gives_check(mv) {
            return Ok(());
        }

        self.make_move(mv)?;
        let checkers = self.checkers();
        counts.checks += 1;
        if checkers.more_than_one() {
            counts.double_checks += 1;
        } else if !checkers.contains(mv.to()) && !mv.is_castle() {
            counts.discovery_checks += 1;
        }
        if generate_moves(self, GenerationMode::All).is_empty() {
            counts.checkmates += 1;
        }
        self.unmake_move()
    }
}

/// Perft with root moves split across `threads` workers, each on its own
/// deep copy of `position`.
pub fn perft_parallel(position: &Position<'_>, depth: u32, threads: usize) -> ChessResult<u64> {
    if depth <= 1 || threads <= 1 {
        return position.clone().perft(depth);
    }

    let moves = generate_moves(position, GenerationMode::All);
    let chunk_size = moves.len().div_ceil(threads).max(1);
    debug!(
        "perft_parallel depth {depth}: {} root moves over {threads} workers",
        moves.len()
    );

    thread::scope(|scope| {
        let handles: Vec<_> = moves
            .as_slice()
            .chunks(chunk_size)
            .map(|chunk| {
                let mut local = position.clone();
                scope.spawn(move || -> ChessResult<u64> {
                    let mut nodes = 0;
                    for &mv in chunk {
                        local.make_move(mv)?;
                        nodes += local.perft(depth - 1)?;
                        local.unmake_move()?;
                    }
                    Ok(nodes)
                })
            })
            .collect();

        let mut total = 0;
        for handle in handles {
            total += handle
                .join()
                .map_err(|_| ChessError::invariant("perft worker thread panicked"))??;
        }
        Ok(total)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tables;

    const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn perft_of(fen: &str, depth: u32) -> u64 {
        let mut position = Position::from_fen(tables(), fen).expect("valid fen");
        position.perft(depth).expect("perft runs")
    }

    #[test]
    fn start_position_reference_counts() {
        let mut position = Position::start(tables()).expect("start");
        let expected = [1, 20, 400, 8_902, 197_281];
        for (depth, nodes) in expected.iter().enumerate() {
            assert_eq!(position.perft(depth as u32).expect("perft runs"), *nodes);
        }
    }

    #[test]
    fn kiwipete_reference_counts() {
        assert_eq!(perft_of(KIWIPETE, 1), 48);
        assert_eq!(perft_of(KIWIPETE, 2), 2_039);
        assert_eq!(perft_of(KIWIPETE, 3), 97_862);
    }

    #[test]
    fn standard_suite_shallow_counts() {
        assert_eq!(perft_of("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 4), 43_238);
        assert_eq!(
            perft_of("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", 3),
            9_467
        );
        assert_eq!(
            perft_of("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", 3),
            62_379
        );
        assert_eq!(
            perft_of(
                "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
                3
            ),
            89_890
        );
    }

    #[test]
    fn leaf_breakdown_matches_reference() {
        let mut start = Position::start(tables()).expect("start");
        let counts = start.perft_counts(4).expect("perft runs");
        assert_eq!(
            counts,
            PerftCounts {
                nodes: 197_281,
                captures: 1_576,
                en_passant: 0,
                castles: 0,
                promotions: 0,
                checks: 469,
                discovery_checks: 0,
                double_checks: 0,
                checkmates: 8,
            }
        );

        let mut kiwipete = Position::from_fen(tables(), KIWIPETE).expect("valid fen");
        let counts = kiwipete.perft_counts(2).expect("perft runs");
        assert_eq!(counts.nodes, 2_039);
        assert_eq!(counts.captures, 351);
        assert_eq!(counts.en_passant, 1);
        assert_eq!(counts.castles, 91);
        assert_eq!(counts.checks, 3);
        assert_eq!(counts.checkmates, 0);
    }

    #[test]
    fn divide_sums_to_perft_and_parallel_agrees() {
        let mut position = Position::from_fen(tables(), KIWIPETE).expect("valid fen");
        let divided = position.divide(2).expect("divide runs");
        assert_eq!(divided.len(), 48);
        assert_eq!(divided.iter().map(|(_, n)| n).sum::<u64>(), 2_039);
        assert_eq!(perft_parallel(&position, 3, 4).expect("parallel perft"), 97_862);
    }
}
