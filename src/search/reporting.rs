//! Progress reporting out of the search.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use log::info;

use crate::moves::move_descriptions::Move;
use crate::search::score::Score;
use crate::search::transposition_table::Bound;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    pub depth: u32,
    pub sel_depth: usize,
    /// 1-based index of the line among the multi-PV lines.
    pub multi_pv: usize,
    pub score: Score,
    /// `Lower`/`Upper` for a fail-high/fail-low inside an aspiration window.
    pub bound: Bound,
    pub elapsed: Duration,
    pub nodes: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

impl IterationReport {
    pub fn nps(&self) -> u64 {
        let micros = self.elapsed.as_micros().max(1);
        (u128::from(self.nodes) * 1_000_000 / micros) as u64
    }
}

impl fmt::Display for IterationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "depth {} seldepth {} multipv {} score {}",
            self.depth, self.sel_depth, self.multi_pv, self.score
        )?;
        match self.bound {
            Bound::Lower => write!(f, " lowerbound")?,
            Bound::Upper => write!(f, " upperbound")?,
            Bound::Exact => {}
        }
        write!(
            f,
            " nodes {} nps {} hashfull {} time {}",
            self.nodes,
            self.nps(),
            self.hashfull,
            self.elapsed.as_millis()
        )?;
        if !self.pv.is_empty() {
            write!(f, " pv")?;
            for mv in &self.pv {
                write!(f, " {mv}")?;
            }
        }
        Ok(())
    }
}

pub trait SearchReporter: Send + Sync {
    fn on_iteration(&self, report: &IterationReport);

    /// `ponder` is `Move::NONE` when there is no expected reply.
    fn on_best_move(&self, best: Move, ponder: Move);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl SearchReporter for SilentReporter {
    fn on_iteration(&self, _report: &IterationReport) {}

    fn on_best_move(&self, _best: Move, _ponder: Move) {}
}

/// Writes each report through the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl SearchReporter for LogReporter {
    fn on_iteration(&self, report: &IterationReport) {
        info!("info {report}");
    }

    fn on_best_move(&self, best: Move, ponder: Move) {
        if ponder.is_some() {
            info!("bestmove {best} ponder {ponder}");
        } else {
            info!("bestmove {best}");
        }
    }
}

/// Keeps every report in memory; used by tests and tooling.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<IterationReport>>,
    best_moves: Mutex<Vec<(Move, Move)>>,
}

impl CollectingReporter {
    pub fn reports(&self) -> Vec<IterationReport> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn best_moves(&self) -> Vec<(Move, Move)> {
        self.best_moves.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl SearchReporter for CollectingReporter {
    fn on_iteration(&self, report: &IterationReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.clone());
        }
    }

    fn on_best_move(&self, best: Move, ponder: Move) {
        if let Ok(mut best_moves) = self.best_moves.lock() {
            best_moves.push((best, ponder));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(bound: Bound, score: Score) -> IterationReport {
        IterationReport {
            depth: 7,
            sel_depth: 11,
            multi_pv: 1,
            score,
            bound,
            elapsed: Duration::from_millis(250),
            nodes: 50_000,
            hashfull: 12,
            pv: vec![Move::new(12, 28), Move::new(52, 36)],
        }
    }

    #[test]
    fn report_formats_like_an_info_line() {
        assert_eq!(
            report(Bound::Exact, Score(31)).to_string(),
            "depth 7 seldepth 11 multipv 1 score cp 31 nodes 50000 nps 200000 \
             hashfull 12 time 250 pv e2e4 e7e5"
        );
        let text = report(Bound::Lower, Score::mate_in(3)).to_string();
        assert!(text.contains("score mate 2 lowerbound"));
    }

    #[test]
    fn collecting_reporter_keeps_order() {
        let collector = CollectingReporter::default();
        collector.on_iteration(&report(Bound::Exact, Score(1)));
        collector.on_iteration(&report(Bound::Upper, Score(-4)));
        collector.on_best_move(Move::new(12, 28), Move::NONE);
        let reports = collector.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].bound, Bound::Upper);
        assert_eq!(collector.best_moves(), vec![(Move::new(12, 28), Move::NONE)]);
    }
}
