//! Move ordering: hash move, then captures by MVV-LVA, then killers, then
//! the counter move, then quiet moves by butterfly history.

use std::cmp::Reverse;

use crate::game_state::chess_rules::PIECE_VALUES;
use crate::game_state::chess_types::*;
use crate::moves::move_descriptions::Move;
use crate::search::score::MAX_PLY;

const HASH_MOVE: i32 = 1_000_000;
const TACTICAL: i32 = 100_000;
const FIRST_KILLER: i32 = 80_000;
const SECOND_KILLER: i32 = 70_000;
const COUNTER_MOVE: i32 = 60_000;
const HISTORY_LIMIT: i32 = 50_000;

type HistoryTable = [[[i32; 64]; 64]; 2];
/// Refutation indexed by the previous move's color, piece and destination.
type CounterMoveTable = [[[Move; 64]; 6]; 2];

/// Per-worker ordering memory, kept across iterations of one search.
#[derive(Debug, Clone)]
pub struct SearchHeuristics {
    killers: [[Move; 2]; MAX_PLY],
    history: Box<HistoryTable>,
    counter_moves: Box<CounterMoveTable>,
}

impl Default for SearchHeuristics {
    fn default() -> Self {
        Self {
            killers: [[Move::NONE; 2]; MAX_PLY],
            history: Box::new([[[0; 64]; 64]; 2]),
            counter_moves: Box::new([[[Move::NONE; 64]; 6]; 2]),
        }
    }
}

impl SearchHeuristics {
    #[inline]
    pub fn killers_at(&self, ply: usize) -> [Move; 2] {
        self.killers.get(ply).copied().unwrap_or([Move::NONE; 2])
    }

    #[inline]
    pub fn history(&self, side: Color, mv: Move) -> i32 {
        self.history[side.index()][mv.from() as usize][mv.to() as usize]
    }

    /// The move that last refuted the opponent's previous move, or
    /// `Move::NONE` at the root and after a null move.
    pub fn counter_move(&self, position: &Position<'_>) -> Move {
        previous_move_slot(position).map_or(Move::NONE, |(color, kind, to)| {
            self.counter_moves[color][kind][to]
        })
    }

    pub fn record_counter_move(&mut self, position: &Position<'_>, mv: Move) {
        if let Some((color, kind, to)) = previous_move_slot(position) {
            self.counter_moves[color][kind][to] = mv;
        }
    }

    /// Called when a quiet move fails high.
    pub fn record_cutoff(
        &mut self,
        side: Color,
        ply: usize,
        mv: Move,
        depth: i32,
        tried: &[Move],
    ) {
        if let Some(slot) = self.killers.get_mut(ply) {
            if slot[0] != mv {
                slot[1] = slot[0];
                slot[0] = mv;
            }
        }
        let bonus = depth * depth;
        self.adjust_history(side, mv, bonus);
        for &other in tried.iter().filter(|&&other| other != mv) {
            self.adjust_history(side, other, -bonus);
        }
    }

    fn adjust_history(&mut self, side: Color, mv: Move, delta: i32) {
        let entry = &mut self.history[side.index()][mv.from() as usize][mv.to() as usize];
        *entry = (*entry + delta).clamp(-HISTORY_LIMIT, HISTORY_LIMIT);
    }

    /// Killers are position-specific; history survives into the next search
    /// only in halved form.
    pub fn new_search(&mut self) {
        self.killers = [[Move::NONE; 2]; MAX_PLY];
        for entry in self.history.iter_mut().flatten().flatten() {
            *entry /= 2;
        }
    }
}

fn previous_move_slot(position: &Position<'_>) -> Option<(usize, usize, usize)> {
    let previous = position.last_move().filter(|mv| mv.is_some())?;
    let piece = position.piece_on(previous.to())?;
    Some((piece.color.index(), piece.kind.index(), previous.to() as usize))
}

/// Captures and promotions sort ahead of every quiet move.
#[inline]
pub fn is_tactical(position: &Position<'_>, mv: Move) -> bool {
    mv.is_promotion() || position.is_capture(mv)
}

#[inline]
pub fn mvv_lva(position: &Position<'_>, mv: Move) -> i32 {
    let victim = position
        .captured_piece(mv)
        .map_or(0, |kind| PIECE_VALUES[kind.index()]);
    let aggressor = position
        .moved_piece(mv)
        .map_or(100, |piece| PIECE_VALUES[piece.kind.index()]);
    let promotion = mv
        .promotion_kind()
        .map_or(0, |kind| PIECE_VALUES[kind.index()]);
    victim * 16 - aggressor / 10 + promotion
}

fn order_score(
    position: &Position<'_>,
    mv: Move,
    tt_move: Move,
    killers: [Move; 2],
    counter: Move,
    heuristics: &SearchHeuristics,
) -> i32 {
    if mv == tt_move {
        return HASH_MOVE;
    }
    if is_tactical(position, mv) {
        return TACTICAL + mvv_lva(position, mv);
    }
    if mv == killers[0] {
        FIRST_KILLER
    } else if mv == killers[1] {
        SECOND_KILLER
    } else if mv == counter {
        COUNTER_MOVE
    } else {
        heuristics.history(position.side_to_move(), mv)
    }
}

pub fn order_moves(
    position: &Position<'_>,
    moves: &mut [Move],
    tt_move: Move,
    killers: [Move; 2],
    heuristics: &SearchHeuristics,
) {
    let counter = heuristics.counter_move(position);
    moves.sort_by_cached_key(|&mv| {
        Reverse(order_score(position, mv, tt_move, killers, counter, heuristics))
    });
}

/// Quiescence ordering: hash move, then MVV-LVA; quiet checks last.
pub fn order_tactical_moves(position: &Position<'_>, moves: &mut [Move], tt_move: Move) {
    moves.sort_by_cached_key(|&mv| {
        Reverse(if mv == tt_move {
            HASH_MOVE
        } else if is_tactical(position, mv) {
            TACTICAL + mvv_lva(position, mv)
        } else {
            0
        })
    });
}
