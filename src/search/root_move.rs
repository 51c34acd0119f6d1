//! Per-root-move bookkeeping kept across iterations.

use std::time::Duration;

use crate::moves::move_descriptions::Move;
use crate::search::score::Score;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMove {
    pub score: Score,
    pub previous_score: Score,
    /// Starts with the root move itself.
    pub pv: Vec<Move>,
    pub sel_depth: usize,
    pub depth: u32,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl RootMove {
    pub fn new(mv: Move) -> Self {
        Self {
            score: -Score::INFINITE,
            previous_score: -Score::INFINITE,
            pv: vec![mv],
            sel_depth: 0,
            depth: 0,
            nodes: 0,
            elapsed: Duration::ZERO,
        }
    }

    #[inline]
    pub fn first_move(&self) -> Move {
        self.pv[0]
    }

    /// Replaces the line below the root move.
    pub fn set_line(&mut self, child_pv: &[Move]) {
        self.pv.truncate(1);
        self.pv.extend_from_slice(child_pv);
    }
}

/// Stable: equal scores keep their previous relative order.
pub fn sort_root_moves(moves: &mut [RootMove]) {
    moves.sort_by(|a, b| b.score.cmp(&a.score).then(b.previous_score.cmp(&a.previous_score)));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// `Move::NONE` only when the root has no legal move.
    pub best_move: Move,
    pub ponder_move: Move,
    pub score: Score,
    /// Last fully completed depth.
    pub depth: u32,
    pub nodes: u64,
    pub root_moves: Vec<RootMove>,
}
