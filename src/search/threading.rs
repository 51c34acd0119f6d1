//! Lazy SMP: several workers search the same root and cooperate only
//! through the shared transposition table and stop flag.
//!
//! Worker 0 owns the limits, the clock and the reporter. Helpers search with
//! no bound of their own, open at staggered depths, and are stopped as soon as
//! worker 0 returns. The result is always worker 0's.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error};

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_types::*;
use crate::search::config::EngineConfig;
use crate::search::iterative_deepening::{Collaborators, Search};
use crate::search::reporting::SilentReporter;
use crate::search::root_move::SearchOutcome;
use crate::search::search_limits::SearchLimits;
use crate::search::time_management::NoTimeLimit;
use crate::search::transposition_table::TranspositionTable;

static HELPER_TIME: NoTimeLimit = NoTimeLimit;
static HELPER_REPORTER: SilentReporter = SilentReporter;

pub struct ParallelSearch<'a, 't> {
    position: Position<'t>,
    limits: SearchLimits,
    config: EngineConfig,
    tt: Arc<TranspositionTable>,
    stop: Arc<AtomicBool>,
    collaborators: Collaborators<'a>,
}

impl<'a, 't> ParallelSearch<'a, 't> {
    pub fn new(
        position: Position<'t>,
        limits: SearchLimits,
        config: EngineConfig,
        tt: Arc<TranspositionTable>,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            position,
            limits,
            config,
            tt,
            stop: Arc::new(AtomicBool::new(false)),
            collaborators,
        }
    }

    /// Raising this flag stops every worker.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn helper_limits(&self) -> SearchLimits {
        SearchLimits {
            depth: self.limits.depth,
            searchmoves: self.limits.searchmoves.clone(),
            infinite: true,
            ..SearchLimits::default()
        }
    }

    /// Runs as many workers as the `Threads` option asks for.
    pub fn think(&self) -> ChessResult<SearchOutcome> {
        self.run(self.config.threads)
    }

    /// Runs `threads` workers and returns worker 0's outcome with the node
    /// counts of all workers.
    pub fn run(&self, threads: usize) -> ChessResult<SearchOutcome> {
        let threads = threads.max(1);
        self.stop.store(false, Ordering::Relaxed);

        let mut main = Search::new(
            self.position.clone(),
            self.limits.clone(),
            &self.config,
            Arc::clone(&self.tt),
            self.collaborators,
        )?
        .with_stop_flag(Arc::clone(&self.stop));

        let helper_collaborators = Collaborators {
            time: Some(&HELPER_TIME),
            reporter: &HELPER_REPORTER,
            ..self.collaborators
        };
        let mut helpers = Vec::with_capacity(threads - 1);
        for worker_id in 1..threads {
            let helper = Search::new(
                self.position.clone(),
                self.helper_limits(),
                &self.config,
                Arc::clone(&self.tt),
                helper_collaborators,
            )?
            .with_stop_flag(Arc::clone(&self.stop))
            .into_helper(worker_id);
            helpers.push(helper);
        }
        debug!("starting search with {threads} thread(s)");

        thread::scope(|scope| {
            let handles: Vec<_> = helpers
                .into_iter()
                .map(|mut helper| {
                    scope.spawn(move || helper.think().map(|outcome| outcome.nodes))
                })
                .collect();

            let result = main.think();
            self.stop.store(true, Ordering::Relaxed);

            let mut helper_nodes = 0u64;
            let mut helper_failure = None;
            for (index, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(nodes)) => helper_nodes += nodes,
                    Ok(Err(err)) => {
                        error!("helper {} failed: {err}", index + 1);
                        if err.is_fatal() {
                            helper_failure.get_or_insert(err);
                        }
                    }
                    Err(_) => {
                        error!("helper {} panicked", index + 1);
                        helper_failure.get_or_insert(ChessError::invariant(format!(
                            "search helper {} panicked",
                            index + 1
                        )));
                    }
                }
            }

            let mut outcome = result?;
            if let Some(err) = helper_failure {
                return Err(err);
            }
            outcome.nodes += helper_nodes;
            Ok(outcome)
        })
    }
}
