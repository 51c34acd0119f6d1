//! Iterative deepening driver.
//!
//! A [`Search`] owns a deep copy of the root position and everything one
//! worker mutates (heuristics, root moves, counters). The transposition table
//! and the stop flag are shared through `Arc`s so several workers can run on
//! the same root; see [`crate::search::threading`].
//!
//! Each depth searches `multi_pv` lines. Line `i` only considers root moves
//! from index `i` on, so it excludes the first moves of the better lines.
//! From depth 5 each line opens with an aspiration window around the
//! previous score, re-centred and doubled on every fail. An iteration cut
//! short by the stop flag is discarded and the last completed one reported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, trace, warn};

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_types::*;
use crate::move_generation::move_generator::{generate_moves, GenerationMode};
use crate::moves::move_descriptions::Move;
use crate::search::alpha_beta::NodeKind;
use crate::search::board_scoring::{Evaluator, PieceSquareEvaluator};
use crate::search::config::{EngineConfig, SearchParameters};
use crate::search::move_ordering::SearchHeuristics;
use crate::search::reporting::{IterationReport, SearchReporter, SilentReporter};
use crate::search::root_move::{sort_root_moves, RootMove, SearchOutcome};
use crate::search::score::Score;
use crate::search::search_limits::SearchLimits;
use crate::search::tablebase::{NoTablebase, TablebaseProbe};
use crate::search::time_management::{ClockTimeManager, NoTimeLimit, TimeManager};
use crate::search::transposition_table::{Bound, TranspositionTable};

/// Attempts before an aspiration window gives up and opens fully.
const ASPIRATION_ATTEMPTS: u32 = 8;

static DEFAULT_EVALUATOR: PieceSquareEvaluator = PieceSquareEvaluator;
static NO_TABLEBASE: NoTablebase = NoTablebase;
static NO_TIME_LIMIT: NoTimeLimit = NoTimeLimit;
static SILENT: SilentReporter = SilentReporter;

/// The pluggable parts a search consults but does not own.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub evaluator: &'a dyn Evaluator,
    pub tablebase: &'a dyn TablebaseProbe,
    /// `None` lets the search budget its own time from the limits.
    pub time: Option<&'a dyn TimeManager>,
    pub reporter: &'a dyn SearchReporter,
}

impl Default for Collaborators<'_> {
    /// Piece-square evaluation, no tablebases, a clock derived from the
    /// limits, no reporting.
    fn default() -> Self {
        Self {
            evaluator: &DEFAULT_EVALUATOR,
            tablebase: &NO_TABLEBASE,
            time: None,
            reporter: &SILENT,
        }
    }
}

pub struct Search<'a, 't> {
    pub(super) position: Position<'t>,
    pub(super) limits: SearchLimits,
    pub(super) params: SearchParameters,
    pub(super) heuristics: SearchHeuristics,
    pub(super) root_moves: Vec<RootMove>,
    /// Index of the multi-PV line being searched.
    pub(super) pv_index: usize,
    pub(super) nodes: u64,
    pub(super) sel_depth: usize,
    pub(super) stop: Arc<AtomicBool>,
    pub(super) tt: Arc<TranspositionTable>,
    pub(super) collaborators: Collaborators<'a>,
    pub(super) tablebase_enabled: bool,
    pub(super) started: Instant,
    /// Budget from `movetime` or the clock when no time manager was given.
    clock: Option<ClockTimeManager>,
    worker_id: usize,
    start_depth: u32,
}

impl<'a, 't> Search<'a, 't> {
    /// Rejects malformed limits and a `searchmoves` list with no legal move.
    pub fn new(
        position: Position<'t>,
        limits: SearchLimits,
        config: &EngineConfig,
        tt: Arc<TranspositionTable>,
        collaborators: Collaborators<'a>,
    ) -> ChessResult<Self> {
        limits.validate(position.side_to_move())?;
        let root_moves = root_moves_for(&position, &limits)?;
        let tablebase_enabled = collaborators.tablebase.max_pieces() > 0;
        let clock = match collaborators.time {
            Some(_) => None,
            None => ClockTimeManager::from_limits(
                &limits,
                position.side_to_move(),
                position.game_ply(),
                config.move_overhead_ms,
            ),
        };
        if let Some(clock) = &clock {
            debug!(
                "time budget optimum {}ms maximum {}ms",
                clock.optimum().as_millis(),
                clock.maximum().as_millis()
            );
        }
        Ok(Self {
            position,
            limits,
            params: SearchParameters::new(config),
            heuristics: SearchHeuristics::default(),
            root_moves,
            pv_index: 0,
            nodes: 0,
            sel_depth: 0,
            stop: Arc::new(AtomicBool::new(false)),
            tt,
            collaborators,
            tablebase_enabled,
            started: Instant::now(),
            clock,
            worker_id: 0,
            start_depth: 1,
        })
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Raising this flag makes the search return its last completed result.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Lazy SMP helpers open at a later depth so the workers' trees diverge.
    pub(crate) fn into_helper(mut self, worker_id: usize) -> Self {
        self.worker_id = worker_id;
        self.start_depth = 1 + (worker_id % 3) as u32;
        self
    }

    pub fn root_moves(&self) -> &[RootMove] {
        &self.root_moves
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub(super) fn time_manager(&self) -> &dyn TimeManager {
        match (self.collaborators.time, &self.clock) {
            (Some(time), _) => time,
            (None, Some(clock)) => clock as &dyn TimeManager,
            (None, None) => &NO_TIME_LIMIT,
        }
    }

    #[inline]
    pub(super) fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn think(&mut self) -> ChessResult<SearchOutcome> {
        self.started = Instant::now();
        self.nodes = 0;
        self.heuristics.new_search();
        if self.worker_id == 0 {
            self.tt.new_generation();
        }

        if self.root_moves.is_empty() {
            let score = if self.position.in_check() {
                Score::mated_in(0)
            } else {
                Score::DRAW
            };
            info!("no legal move at the root, score {score}");
            self.collaborators.reporter.on_best_move(Move::NONE, Move::NONE);
            return Ok(SearchOutcome {
                best_move: Move::NONE,
                ponder_move: Move::NONE,
                score,
                depth: 0,
                nodes: 0,
                root_moves: Vec::new(),
            });
        }

        self.order_root_by_tablebase()?;

        let multi_pv = self.params.multi_pv.min(self.root_moves.len());
        let max_depth = self.limits.max_depth();
        let mut completed: Option<(u32, Vec<RootMove>)> = None;
        let mut previous_best = Move::NONE;
        let mut iteration_started = self.started.elapsed();

        for depth in self.start_depth.min(max_depth)..=max_depth {
            for rm in &mut self.root_moves {
                rm.previous_score = rm.score;
            }
            for pv_index in 0..multi_pv {
                self.pv_index = pv_index;
                self.sel_depth = 0;
                self.search_line(depth)?;
                sort_root_moves(&mut self.root_moves[..=pv_index]);
                if self.stopped() {
                    break;
                }
            }
            if self.stopped() {
                break;
            }

            let elapsed = self.started.elapsed();
            for index in 0..multi_pv {
                self.report(depth, index, Bound::Exact);
            }
            let best = &self.root_moves[0];
            debug!(
                "worker {} depth {depth} score {} best {} nodes {} time {}ms",
                self.worker_id,
                best.score,
                best.first_move(),
                self.nodes,
                elapsed.as_millis()
            );

            let best_move = best.first_move();
            let best_score = best.score;
            completed = Some((depth, self.root_moves.clone()));

            if let Some(mate) = self.limits.mate {
                if best_score >= Score::mate_in(2 * mate as usize - 1) {
                    debug!("mate in {mate} found at depth {depth}");
                    break;
                }
            }
            let changed = depth > 1 && best_move != previous_best;
            previous_best = best_move;
            let time = self.time_manager();
            if !time.on_iteration_complete(depth, changed, elapsed) {
                break;
            }
            // The next iteration costs at least as much as this one.
            let last_iteration = elapsed.saturating_sub(iteration_started);
            if time.time_remaining(elapsed).is_some_and(|left| left < last_iteration) {
                debug!("not enough time left for depth {}", depth + 1);
                break;
            }
            iteration_started = elapsed;
        }

        let (depth, root_moves) = match completed {
            Some(done) => done,
            None => {
                warn!(
                    "worker {} stopped before completing depth {}",
                    self.worker_id,
                    self.start_depth.min(max_depth)
                );
                sort_root_moves(&mut self.root_moves);
                (0, self.root_moves.clone())
            }
        };
        self.root_moves = root_moves;

        let best = self.root_moves[0].clone();
        let ponder_move = self.ponder_move(&best)?;
        if self.worker_id == 0 {
            info!(
                "bestmove {} score {} depth {depth} nodes {} time {}ms",
                best.first_move(),
                best.score,
                self.nodes,
                self.started.elapsed().as_millis()
            );
        }
        self.collaborators
            .reporter
            .on_best_move(best.first_move(), ponder_move);

        Ok(SearchOutcome {
            best_move: best.first_move(),
            ponder_move,
            score: best.score,
            depth,
            nodes: self.nodes,
            root_moves: self.root_moves.clone(),
        })
    }

    /// One multi-PV line at `depth`, re-searched until the score falls
    /// inside the window or the search is stopped.
    fn search_line(&mut self, depth: u32) -> ChessResult<()> {
        let previous = self.root_moves[self.pv_index].previous_score;
        let mut window = self.params.aspiration_delta + depth as i32 * 10;
        // Unsearched moves still hold -INFINITE, which also counts as a mate.
        let (mut alpha, mut beta) =
            if depth >= self.params.aspiration_min_depth && !previous.is_mate() {
                (
                    (previous - window).max(-Score::INFINITE),
                    (previous + window).min(Score::INFINITE),
                )
            } else {
                (-Score::INFINITE, Score::INFINITE)
            };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut pv = Vec::new();
            let score = self.alpha_beta(NodeKind::Root, 0, depth as i32, alpha, beta, &mut pv)?;
            sort_root_moves(&mut self.root_moves[self.pv_index..]);
            if self.stopped() {
                return Ok(());
            }

            let full_window = alpha <= -Score::INFINITE && beta >= Score::INFINITE;
            if full_window || (score > alpha && score < beta) {
                return Ok(());
            }

            let bound = if score <= alpha {
                Bound::Upper
            } else {
                Bound::Lower
            };
            trace!(
                "depth {depth} line {} {} at {score}, window [{}, {}]",
                self.pv_index + 1,
                if bound == Bound::Upper { "fail low" } else { "fail high" },
                alpha.0,
                beta.0
            );
            if self.started.elapsed().as_secs() >= 3 {
                self.report(depth, self.pv_index, bound);
            }

            window = (window * 2).min(Score::MATE.0 / 2);
            alpha = (score - window).max(-Score::INFINITE);
            beta = (score + window).min(Score::INFINITE);
            if attempts >= ASPIRATION_ATTEMPTS {
                alpha = -Score::INFINITE;
                beta = Score::INFINITE;
            }
        }
    }

    fn report(&self, depth: u32, index: usize, bound: Bound) {
        let rm = &self.root_moves[index];
        self.collaborators.reporter.on_iteration(&IterationReport {
            depth,
            sel_depth: rm.sel_depth,
            multi_pv: index + 1,
            score: rm.score,
            bound,
            elapsed: self.started.elapsed(),
            nodes: self.nodes,
            hashfull: self.tt.hashfull(),
            pv: rm.pv.clone(),
        });
    }

    /// Moves the tablebase's preferred root move to the front.
    fn order_root_by_tablebase(&mut self) -> ChessResult<()> {
        if !self.tablebase_covers_position() {
            return Ok(());
        }
        let probe = match self.collaborators.tablebase.probe_root(&self.position) {
            Ok(probe) => probe,
            Err(ChessError::ResourceUnavailable(reason)) => {
                warn!("tablebase unavailable, probing disabled: {reason}");
                self.tablebase_enabled = false;
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if let Some(probe) = probe {
            if let Some(index) = self
                .root_moves
                .iter()
                .position(|rm| rm.first_move() == probe.best_move)
            {
                let preferred = self.root_moves.remove(index);
                self.root_moves.insert(0, preferred);
                debug!("tablebase root move {} ({:?})", probe.best_move, probe.wdl);
            }
        }
        Ok(())
    }

    /// Second move of the best line, or the hash move of the position after
    /// the best move when the line stops there.
    fn ponder_move(&mut self, best: &RootMove) -> ChessResult<Move> {
        if let Some(&reply) = best.pv.get(1) {
            return Ok(reply);
        }
        self.position.make_move(best.first_move())?;
        let candidate = self
            .tt
            .probe(self.position.key())
            .map_or(Move::NONE, |entry| entry.best_move);
        let reply = if self.position.is_legal(candidate) {
            candidate
        } else {
            Move::NONE
        };
        self.position.unmake_move()?;
        Ok(reply)
    }
}

fn root_moves_for(position: &Position<'_>, limits: &SearchLimits) -> ChessResult<Vec<RootMove>> {
    let legal = generate_moves(position, GenerationMode::All);
    let root_moves: Vec<RootMove> = legal
        .iter()
        .filter(|mv| limits.searchmoves.is_empty() || limits.searchmoves.contains(mv))
        .map(|&mv| RootMove::new(mv))
        .collect();
    if root_moves.is_empty() && !legal.is_empty() {
        return Err(ChessError::InvalidSearchLimits(
            "no legal move among searchmoves".to_string(),
        ));
    }
    Ok(root_moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::reporting::CollectingReporter;
    use crate::search::tablebase::{RootProbe, Wdl};
    use crate::test_support::tables;
    use crate::utils::long_algebraic::parse_move;

    fn search_for<'a>(
        fen: &str,
        limits: SearchLimits,
        config: &EngineConfig,
        collaborators: Collaborators<'a>,
    ) -> ChessResult<Search<'a, 'static>> {
        let position = Position::from_fen(tables(), fen).expect("valid fen");
        let tt = Arc::new(TranspositionTable::new_with_mb(1));
        Search::new(position, limits, config, tt, collaborators)
    }

    fn think(fen: &str, limits: SearchLimits) -> SearchOutcome {
        search_for(fen, limits, &EngineConfig::default(), Collaborators::default())
            .expect("valid search")
            .think()
            .expect("search runs")
    }

    #[test]
    fn single_legal_move_is_returned() {
        let outcome = think("7k/8/8/8/8/8/1q6/K7 w - - 0 1", SearchLimits::depth(4));
        assert_eq!(outcome.best_move, Move::new(0, 9));
        assert_eq!(outcome.root_moves.len(), 1);
        assert!(!outcome.root_moves[0].pv.is_empty());
    }

    #[test]
    fn checkmated_and_stalemated_roots() {
        let mated = think(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            SearchLimits::depth(3),
        );
        assert_eq!(mated.best_move, Move::NONE);
        assert_eq!(mated.score, Score::mated_in(0));

        let stalemate = think("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", SearchLimits::depth(3));
        assert_eq!(stalemate.best_move, Move::NONE);
        assert_eq!(stalemate.score, Score::DRAW);
    }

    #[test]
    fn finds_mate_in_one_and_two() {
        let fen = "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1";
        let outcome = think(fen, SearchLimits::depth(3));
        let position = Position::from_fen(tables(), fen).expect("valid fen");
        assert_eq!(outcome.best_move, parse_move(&position, "d1d8"));
        assert_eq!(outcome.score, Score::mate_in(1));
        assert_eq!(outcome.score.to_string(), "mate 1");

        let limits = SearchLimits {
            mate: Some(2),
            ..SearchLimits::default()
        };
        let two = think("7k/8/8/8/8/8/R7/1R4K1 w - - 0 1", limits);
        assert_eq!(two.score, Score::mate_in(3));
        assert!(two.depth < 10);
    }

    #[test]
    fn wins_hanging_queen() {
        let fen = "3qk3/8/8/8/8/8/3R4/3RK3 w - - 0 1";
        let outcome = think(fen, SearchLimits::depth(4));
        let mut position = Position::from_fen(tables(), fen).expect("valid fen");
        assert_eq!(outcome.best_move, parse_move(&position, "d2d8"));
        assert!(outcome.score > Score(400));
        position.make_move(outcome.best_move).expect("legal");
        assert!(position.is_legal(outcome.ponder_move));
    }

    #[test]
    fn node_budget_is_respected() {
        let mut search = search_for(
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
            SearchLimits::nodes(5_000),
            &EngineConfig::default(),
            Collaborators::default(),
        )
        .expect("valid search");
        let outcome = search.think().expect("search runs");
        assert!(outcome.nodes <= 5_000);
        let start = Position::start(tables()).expect("start");
        assert!(start.is_legal(outcome.best_move));
    }

    #[test]
    fn movetime_bounds_the_search_without_a_time_manager() {
        let started = Instant::now();
        let outcome = think(
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
            SearchLimits::movetime_ms(100),
        );
        assert!(started.elapsed() < std::time::Duration::from_millis(1_000));
        assert!(outcome.depth >= 1);
        let start = Position::start(tables()).expect("start");
        assert!(start.is_legal(outcome.best_move));
    }

    #[test]
    fn clock_limits_budget_a_fraction_of_the_remaining_time() {
        let limits = SearchLimits {
            btime_ms: Some(1_000),
            wtime_ms: Some(600_000),
            ..SearchLimits::default()
        };
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 2 2";
        let search = search_for(fen, limits, &EngineConfig::default(), Collaborators::default())
            .expect("valid search");
        let clock = search.clock.expect("clock from limits");
        assert!(clock.maximum() <= std::time::Duration::from_millis(1_000 / 3));

        let started = Instant::now();
        let outcome = search_for(
            fen,
            SearchLimits {
                btime_ms: Some(1_000),
                ..SearchLimits::default()
            },
            &EngineConfig::default(),
            Collaborators::default(),
        )
        .expect("valid search")
        .think()
        .expect("search runs");
        assert!(started.elapsed() < std::time::Duration::from_millis(1_000));
        assert!(outcome.best_move.is_some());
    }

    #[test]
    fn explicit_time_manager_replaces_the_clock() {
        let collaborators = Collaborators {
            time: Some(&NO_TIME_LIMIT),
            ..Collaborators::default()
        };
        let search = search_for(
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
            SearchLimits::movetime_ms(100),
            &EngineConfig::default(),
            collaborators,
        )
        .expect("valid search");
        assert!(search.clock.is_none());
        assert!(search.time_manager().time_remaining(std::time::Duration::ZERO).is_none());
    }

    #[test]
    fn stop_before_start_still_returns_a_legal_move() {
        let mut search = search_for(
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
            SearchLimits::infinite(),
            &EngineConfig::default(),
            Collaborators::default(),
        )
        .expect("valid search");
        search.stop_flag().store(true, Ordering::Relaxed);
        let outcome = search.think().expect("search runs");
        assert_eq!(outcome.depth, 0);
        let start = Position::start(tables()).expect("start");
        assert!(start.is_legal(outcome.best_move));
    }

    #[test]
    fn multi_pv_reports_distinct_lines() {
        let reporter = CollectingReporter::default();
        let collaborators = Collaborators {
            reporter: &reporter,
            ..Collaborators::default()
        };
        let mut config = EngineConfig::default();
        config.set_option("MultiPV", "3").expect("valid option");
        let mut search = search_for(
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
            SearchLimits::depth(3),
            &config,
            collaborators,
        )
        .expect("valid search");
        let outcome = search.think().expect("search runs");

        let last_depth: Vec<_> = reporter
            .reports()
            .into_iter()
            .filter(|r| r.depth == 3)
            .collect();
        assert_eq!(last_depth.len(), 3);
        assert_eq!(
            last_depth.iter().map(|r| r.multi_pv).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        let firsts: Vec<Move> = last_depth.iter().map(|r| r.pv[0]).collect();
        assert!(firsts[0] != firsts[1] && firsts[1] != firsts[2] && firsts[0] != firsts[2]);
        assert!(last_depth[0].score >= last_depth[1].score);
        assert!(last_depth[1].score >= last_depth[2].score);
        assert_eq!(outcome.best_move, firsts[0]);
        assert_eq!(reporter.best_moves().len(), 1);
    }

    #[test]
    fn searchmoves_restrict_the_root() {
        let start = Position::start(tables()).expect("start");
        let only = parse_move(&start, "a2a3");
        let limits = SearchLimits {
            searchmoves: vec![only],
            ..SearchLimits::depth(3)
        };
        let outcome = think(crate::game_state::chess_rules::STARTING_POSITION_FEN, limits);
        assert_eq!(outcome.best_move, only);

        let illegal = SearchLimits {
            searchmoves: vec![Move::new(12, 36)],
            ..SearchLimits::depth(3)
        };
        let rejected = search_for(
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
            illegal,
            &EngineConfig::default(),
            Collaborators::default(),
        );
        assert!(matches!(rejected, Err(ChessError::InvalidSearchLimits(_))));
    }

    #[test]
    fn invalid_limits_are_rejected_before_searching() {
        let result = search_for(
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
            SearchLimits::default(),
            &EngineConfig::default(),
            Collaborators::default(),
        );
        assert!(matches!(result, Err(ChessError::InvalidSearchLimits(_))));
    }

    struct FixedTablebase {
        root_move: Move,
    }

    impl TablebaseProbe for FixedTablebase {
        fn max_pieces(&self) -> u32 {
            5
        }

        fn probe_wdl(&self, _position: &Position<'_>) -> ChessResult<Option<Wdl>> {
            Err(ChessError::ResourceUnavailable("tables missing".into()))
        }

        fn probe_root(&self, _position: &Position<'_>) -> ChessResult<Option<RootProbe>> {
            Ok(Some(RootProbe {
                wdl: Wdl::Draw,
                dtz: 0,
                best_move: self.root_move,
            }))
        }
    }

    #[test]
    fn tablebase_root_move_goes_first_and_missing_tables_degrade() {
        let fen = "8/8/4k3/8/8/3K4/3P4/8 w - - 0 1";
        let position = Position::from_fen(tables(), fen).expect("valid fen");
        let preferred = parse_move(&position, "d3c4");
        let tablebase = FixedTablebase { root_move: preferred };
        let collaborators = Collaborators {
            tablebase: &tablebase,
            ..Collaborators::default()
        };
        let mut search =
            search_for(fen, SearchLimits::depth(2), &EngineConfig::default(), collaborators)
                .expect("valid search");
        search.order_root_by_tablebase().expect("root probe");
        assert_eq!(search.root_moves()[0].first_move(), preferred);

        let outcome = search.think().expect("probe failures are not fatal");
        assert!(position.is_legal(outcome.best_move));
        assert!(!search.tablebase_enabled);
    }
}
