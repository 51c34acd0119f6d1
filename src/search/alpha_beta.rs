//! Principal variation search and quiescence.
//!
//! Node kinds follow the usual PVS split: Root and PV nodes get full windows
//! and are never pruned; their later moves, and every move of Cut/All nodes,
//! are searched with a null window first. Pruning (hash cutoffs, static
//! futility, null move, move-count and futility pruning of quiet moves)
//! applies only to Cut/All nodes.
//!
//! Cancellation unwinds by returning a dummy score: every caller re-checks
//! the stop flag after each child and the driver discards the iteration.

use log::warn;

use crate::errors::{ChessError, ChessResult};
use crate::move_generation::move_generator::{generate_into, generate_moves, GenerationMode};
use crate::move_generation::move_list::MoveList;
use crate::moves::move_descriptions::Move;
use crate::search::iterative_deepening::Search;
use crate::search::move_ordering::{is_tactical, order_moves, order_tactical_moves};
use crate::search::score::{Score, MAX_PLY};
use crate::search::tablebase::Wdl;
use crate::search::transposition_table::{Bound, TTEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Pv,
    /// Expected to fail high.
    Cut,
    /// Expected to fail low.
    All,
}

impl NodeKind {
    #[inline]
    pub fn is_pv(self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Pv)
    }

    /// Kind of a child searched with a null window.
    #[inline]
    fn null_window_child(self) -> NodeKind {
        match self {
            NodeKind::Cut => NodeKind::All,
            _ => NodeKind::Cut,
        }
    }
}

/// Nodes between two polls of the time manager.
const TIME_POLL_INTERVAL: u64 = 1024;

impl Search<'_, '_> {
    /// Counts a node and reports whether the search must unwind.
    fn enter_node(&mut self, ply: usize) -> bool {
        self.nodes += 1;
        self.sel_depth = self.sel_depth.max(ply);
        if self.stopped() {
            return true;
        }
        let out_of_nodes = self.limits.nodes.is_some_and(|budget| self.nodes >= budget);
        let out_of_time = self.nodes % TIME_POLL_INTERVAL == 0
            && self
                .time_manager()
                .should_stop(self.started.elapsed(), self.nodes);
        if out_of_nodes || out_of_time {
            self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
            return true;
        }
        false
    }

    #[inline]
    fn evaluate(&self) -> Score {
        self.collaborators.evaluator.evaluate(&self.position)
    }

    pub(super) fn tablebase_covers_position(&self) -> bool {
        let limit = self
            .params
            .tablebase_probe_limit
            .min(self.collaborators.tablebase.max_pieces());
        self.tablebase_enabled && self.position.piece_count() <= limit
    }

    /// Missing tables switch probing off instead of failing the search.
    fn probe_wdl(&mut self) -> ChessResult<Option<Wdl>> {
        match self.collaborators.tablebase.probe_wdl(&self.position) {
            Ok(wdl) => Ok(wdl),
            Err(ChessError::ResourceUnavailable(reason)) => {
                warn!("tablebase unavailable, probing disabled: {reason}");
                self.tablebase_enabled = false;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub(super) fn alpha_beta(
        &mut self,
        node: NodeKind,
        ply: usize,
        depth: i32,
        mut alpha: Score,
        mut beta: Score,
        pv: &mut Vec<Move>,
    ) -> ChessResult<Score> {
        pv.clear();
        if depth <= 0 {
            return self.quiescence(node.is_pv(), ply, 0, alpha, beta, pv);
        }
        if self.enter_node(ply) {
            return Ok(Score::DRAW);
        }

        let root = node == NodeKind::Root;
        let pv_node = node.is_pv();
        let in_check = self.position.in_check();

        if !root {
            if self.position.is_draw(ply) {
                return Ok(Score::DRAW);
            }
            if ply >= MAX_PLY - 1 {
                return Ok(if in_check { Score::DRAW } else { self.evaluate() });
            }
            // Mate distance pruning.
            alpha = alpha.max(Score::mated_in(ply));
            beta = beta.min(Score::mate_in(ply + 1));
            if alpha >= beta {
                return Ok(alpha);
            }
        }

        let key = self.position.key();
        let tt_entry = self.tt.probe(key);
        let tt_move = if root {
            self.root_moves[self.pv_index].first_move()
        } else {
            tt_entry.map_or(Move::NONE, |entry| entry.best_move)
        };
        if !pv_node {
            if let Some(entry) = tt_entry {
                let tt_score = entry.score.from_tt(ply);
                if entry.depth >= depth && entry.bound.cuts(tt_score, beta) {
                    return Ok(tt_score);
                }
            }
        }

        if !root && self.position.halfmove_clock() == 0 && self.tablebase_covers_position() {
            if let Some(wdl) = self.probe_wdl()? {
                let score = wdl.to_score(ply);
                self.tt.store(
                    key,
                    TTEntry {
                        best_move: Move::NONE,
                        score: score.to_tt(ply),
                        depth: (depth + 6).min(MAX_PLY as i32),
                        bound: Bound::Exact,
                    },
                );
                return Ok(score);
            }
        }

        let us = self.position.side_to_move();
        let static_eval = if in_check {
            -Score::INFINITE
        } else {
            self.evaluate()
        };

        if !pv_node && !in_check {
            // Static futility: far enough above beta that no quiet reply
            // at this depth is expected to bring it back.
            if let Some(&margin) = self.params.futility_margin.get(depth as usize) {
                if !beta.is_mate() && static_eval - margin.0 >= beta {
                    return Ok(static_eval - margin.0);
                }
            }

            let after_null = self.position.last_move() == Some(Move::NONE);
            if depth >= 2
                && static_eval >= beta
                && !after_null
                && self.position.non_pawn_material(us) > 0
            {
                let reduction = 3 + depth / 4;
                let mut child_pv = Vec::new();
                self.position.make_null_move()?;
                let score = -self.alpha_beta(
                    node.null_window_child(),
                    ply + 1,
                    depth - 1 - reduction,
                    -beta,
                    -beta + 1,
                    &mut child_pv,
                )?;
                self.position.unmake_null_move()?;
                if self.stopped() {
                    return Ok(Score::DRAW);
                }
                if score >= beta {
                    // Unproven mates from a null move are not trusted.
                    return Ok(if score.is_winning_mate() { beta } else { score });
                }
            }
        }

        let mut moves = if root {
            let mut list = MoveList::new();
            for rm in &self.root_moves[self.pv_index..] {
                list.push(rm.first_move());
            }
            list
        } else {
            generate_moves(&self.position, GenerationMode::All)
        };
        if moves.is_empty() {
            return Ok(if in_check {
                Score::mated_in(ply)
            } else {
                Score::DRAW
            });
        }
        if !root {
            let killers = self.heuristics.killers_at(ply);
            order_moves(
                &self.position,
                moves.as_mut_slice(),
                tt_move,
                killers,
                &self.heuristics,
            );
        }

        let mut best = -Score::INFINITE;
        let mut best_move = Move::NONE;
        let mut quiets_tried = MoveList::new();
        let mut child_pv = Vec::new();
        let mut move_count = 0usize;

        for &mv in moves.iter() {
            move_count += 1;
            let tactical = is_tactical(&self.position, mv);
            let gives_check = self.position.move_gives_check(mv);
            let new_depth = depth - 1 + i32::from(gives_check);

            if !pv_node
                && !in_check
                && !tactical
                && !gives_check
                && mv != tt_move
                && best > Score::MATED_IN_MAX_PLY
            {
                let late = self
                    .params
                    .futility_move_counts
                    .get(depth as usize)
                    .is_some_and(|&count| move_count > count);
                if late {
                    continue;
                }
                if let Some(&margin) = self.params.futility_margin.get(new_depth.max(0) as usize) {
                    if static_eval + margin.0 <= alpha {
                        continue;
                    }
                }
            }

            let nodes_before = self.nodes;
            self.position.make_move(mv)?;
            let score = if move_count == 1 {
                let child = if pv_node {
                    NodeKind::Pv
                } else {
                    node.null_window_child()
                };
                -self.alpha_beta(child, ply + 1, new_depth, -beta, -alpha, &mut child_pv)?
            } else {
                let reduction = if depth >= 3 && !tactical && !in_check && !gives_check {
                    self.params.reduction(pv_node, depth, move_count)
                } else {
                    0
                };
                let reduced = (new_depth - reduction).max(1).min(new_depth);
                let child = node.null_window_child();
                let mut score =
                    -self.alpha_beta(child, ply + 1, reduced, -alpha - 1, -alpha, &mut child_pv)?;
                if reduced < new_depth && score > alpha && !self.stopped() {
                    score = -self.alpha_beta(
                        child,
                        ply + 1,
                        new_depth,
                        -alpha - 1,
                        -alpha,
                        &mut child_pv,
                    )?;
                }
                if pv_node && score > alpha && score < beta && !self.stopped() {
                    score = -self.alpha_beta(
                        NodeKind::Pv,
                        ply + 1,
                        new_depth,
                        -beta,
                        -alpha,
                        &mut child_pv,
                    )?;
                }
                score
            };
            self.position.unmake_move()?;
            if self.stopped() {
                return Ok(Score::DRAW);
            }

            if root {
                let exact = move_count == 1 || score > alpha;
                self.update_root_move(mv, exact, score, depth, &child_pv, nodes_before);
            }

            if score > best {
                best = score;
                if score > alpha {
                    best_move = mv;
                    if pv_node {
                        pv.clear();
                        pv.push(mv);
                        pv.extend_from_slice(&child_pv);
                    }
                    if score >= beta {
                        if !tactical {
                            self.heuristics.record_cutoff(
                                us,
                                ply,
                                mv,
                                depth,
                                quiets_tried.as_slice(),
                            );
                            self.heuristics.record_counter_move(&self.position, mv);
                        }
                        break;
                    }
                    alpha = score;
                }
            }
            if !tactical {
                quiets_tried.push(mv);
            }
        }

        // A root line that excludes better moves says nothing about the
        // position as a whole.
        if !(root && self.pv_index > 0) {
            let bound = if best >= beta {
                Bound::Lower
            } else if pv_node && best_move.is_some() {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt.store(
                key,
                TTEntry {
                    best_move,
                    score: best.to_tt(ply),
                    depth,
                    bound,
                },
            );
        }
        Ok(best)
    }

    fn update_root_move(
        &mut self,
        mv: Move,
        exact: bool,
        score: Score,
        depth: i32,
        child_pv: &[Move],
        nodes_before: u64,
    ) {
        let spent = self.nodes - nodes_before;
        let sel_depth = self.sel_depth;
        let elapsed = self.started.elapsed();
        let Some(rm) = self.root_moves.iter_mut().find(|rm| rm.first_move() == mv) else {
            return;
        };
        rm.nodes += spent;
        if exact {
            rm.score = score;
            rm.sel_depth = sel_depth;
            rm.depth = depth as u32;
            rm.elapsed = elapsed;
            rm.set_line(child_pv);
        } else {
            // Only a bound is known; sorts after every move with a score.
            rm.score = -Score::INFINITE;
        }
    }

    /// Captures and promotions until the position is quiet, plus quiet checks
    /// at the first ply and every evasion while in check.
    pub(super) fn quiescence(
        &mut self,
        pv_node: bool,
        ply: usize,
        qdepth: usize,
        mut alpha: Score,
        beta: Score,
        pv: &mut Vec<Move>,
    ) -> ChessResult<Score> {
        pv.clear();
        if self.enter_node(ply) {
            return Ok(Score::DRAW);
        }
        if self.position.is_draw(ply) {
            return Ok(Score::DRAW);
        }
        let in_check = self.position.in_check();
        if ply >= MAX_PLY - 1 {
            return Ok(if in_check { Score::DRAW } else { self.evaluate() });
        }

        let key = self.position.key();
        let tt_entry = self.tt.probe(key);
        if !pv_node {
            if let Some(entry) = tt_entry {
                let tt_score = entry.score.from_tt(ply);
                if entry.bound.cuts(tt_score, beta) {
                    return Ok(tt_score);
                }
            }
        }
        let tt_move = tt_entry.map_or(Move::NONE, |entry| entry.best_move);

        let mut best = -Score::INFINITE;
        if !in_check {
            let stand_pat = self.evaluate();
            if stand_pat >= beta || qdepth >= self.params.max_qsearch_depth {
                return Ok(stand_pat);
            }
            alpha = alpha.max(stand_pat);
            best = stand_pat;
        }

        let mut moves = if in_check {
            generate_moves(&self.position, GenerationMode::Evasions)
        } else {
            generate_moves(&self.position, GenerationMode::Captures)
        };
        if !in_check && qdepth == 0 {
            generate_into(&self.position, GenerationMode::ChecksOnly, &mut moves);
        }
        if in_check && moves.is_empty() {
            return Ok(Score::mated_in(ply));
        }
        order_tactical_moves(&self.position, moves.as_mut_slice(), tt_move);

        let mut best_move = Move::NONE;
        let mut child_pv = Vec::new();
        for &mv in moves.iter() {
            self.position.make_move(mv)?;
            let score =
                -self.quiescence(pv_node, ply + 1, qdepth + 1, -beta, -alpha, &mut child_pv)?;
            self.position.unmake_move()?;
            if self.stopped() {
                return Ok(Score::DRAW);
            }

            if score > best {
                best = score;
                if score > alpha {
                    best_move = mv;
                    if pv_node {
                        pv.clear();
                        pv.push(mv);
                        pv.extend_from_slice(&child_pv);
                    }
                    if score >= beta {
                        break;
                    }
                    alpha = score;
                }
            }
        }

        let bound = if best >= beta {
            Bound::Lower
        } else if pv_node && best_move.is_some() {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt.store(
            key,
            TTEntry {
                best_move,
                score: best.to_tt(ply),
                depth: 0,
                bound,
            },
        );
        Ok(best)
    }
}
