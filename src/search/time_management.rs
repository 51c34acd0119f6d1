//! Time control: when to stop mid-search and whether to start another
//! iteration.

use std::time::Duration;

use crate::game_state::chess_types::Color;
use crate::search::search_limits::SearchLimits;

pub trait TimeManager: Send + Sync {
    /// Polled during the search; `true` aborts the current iteration.
    fn should_stop(&self, elapsed: Duration, nodes: u64) -> bool;

    /// Time left before the hard limit, if there is one.
    fn time_remaining(&self, elapsed: Duration) -> Option<Duration>;

    /// Called after each completed iteration; `false` means do not start the
    /// next one.
    fn on_iteration_complete(&self, depth: u32, best_move_changed: bool, elapsed: Duration)
        -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoTimeLimit;

impl TimeManager for NoTimeLimit {
    fn should_stop(&self, _elapsed: Duration, _nodes: u64) -> bool {
        false
    }

    fn time_remaining(&self, _elapsed: Duration) -> Option<Duration> {
        None
    }

    fn on_iteration_complete(&self, _depth: u32, _changed: bool, _elapsed: Duration) -> bool {
        true
    }
}

/// Optimum/maximum budget for one move, from a fixed move time or from the
/// clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTimeManager {
    optimum: Duration,
    maximum: Duration,
}

impl ClockTimeManager {
    pub fn new(optimum: Duration, maximum: Duration) -> Self {
        Self {
            optimum: optimum.min(maximum),
            maximum,
        }
    }

    /// `None` when the limits carry no time information for `side`, or the
    /// search is infinite or pondering.
    pub fn from_limits(
        limits: &SearchLimits,
        side: Color,
        game_ply: u32,
        move_overhead_ms: u64,
    ) -> Option<Self> {
        if limits.infinite || limits.ponder {
            return None;
        }
        if let Some(movetime) = limits.movetime_ms {
            let budget = Duration::from_millis(movetime.saturating_sub(move_overhead_ms).max(1));
            return Some(Self::new(budget, budget));
        }
        let remaining = limits.clock_ms(side)?;
        let usable = remaining.saturating_sub(move_overhead_ms).max(1);
        let optimum = adaptive_budget_ms(
            game_ply,
            usable,
            limits.increment_ms(side),
            limits.movestogo,
        );
        let maximum = optimum.saturating_mul(3).min((usable / 3).max(1)).max(optimum);
        Some(Self::new(
            Duration::from_millis(optimum),
            Duration::from_millis(maximum),
        ))
    }

    pub fn optimum(&self) -> Duration {
        self.optimum
    }

    pub fn maximum(&self) -> Duration {
        self.maximum
    }
}

impl TimeManager for ClockTimeManager {
    fn should_stop(&self, elapsed: Duration, _nodes: u64) -> bool {
        elapsed >= self.maximum
    }

    fn time_remaining(&self, elapsed: Duration) -> Option<Duration> {
        Some(self.maximum.saturating_sub(elapsed))
    }

    fn on_iteration_complete(
        &self,
        _depth: u32,
        best_move_changed: bool,
        elapsed: Duration,
    ) -> bool {
        // An unstable best move earns more time; the next iteration usually
        // costs more than all previous ones combined.
        let budget = if best_move_changed {
            (self.optimum * 3 / 2).min(self.maximum)
        } else {
            self.optimum
        };
        elapsed < budget / 2
    }
}

/// Per-move budget from the clock: an even split over the expected number of
/// remaining moves after holding back a reserve, plus most of the increment.
fn adaptive_budget_ms(
    game_ply: u32,
    remaining_ms: u64,
    inc_ms: u64,
    movestogo: Option<u32>,
) -> u64 {
    let expected_moves_left = if let Some(mtg) = movestogo {
        u64::from(mtg.max(1))
    } else if game_ply < 20 {
        40
    } else if game_ply < 60 {
        28
    } else {
        18
    };

    let reserve = (remaining_ms / 25).max(100).min(remaining_ms / 2);
    let usable = remaining_ms.saturating_sub(reserve);
    let base = usable / expected_moves_left;
    let inc_bonus = inc_ms.saturating_mul(3) / 4;
    let panic = if remaining_ms < 2_000 {
        remaining_ms / 12
    } else {
        0
    };
    let target = base.saturating_add(inc_bonus).saturating_add(panic);

    let min_budget = if remaining_ms < 1_000 { 5 } else { 15 };
    let max_budget = (remaining_ms / 4).max(1);
    target.max(min_budget).min(max_budget).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movetime_is_both_optimum_and_maximum() {
        let limits = SearchLimits::movetime_ms(1_000);
        let tm = ClockTimeManager::from_limits(&limits, Color::Light, 0, 30).expect("timed");
        assert_eq!(tm.optimum(), Duration::from_millis(970));
        assert_eq!(tm.maximum(), Duration::from_millis(970));
        assert!(!tm.should_stop(Duration::from_millis(969), 0));
        assert!(tm.should_stop(Duration::from_millis(970), 0));
        assert_eq!(
            tm.time_remaining(Duration::from_millis(900)),
            Some(Duration::from_millis(70))
        );
    }

    #[test]
    fn clock_budget_is_bounded_by_remaining_time() {
        let limits = SearchLimits {
            wtime_ms: Some(60_000),
            winc_ms: Some(1_000),
            btime_ms: Some(500),
            ..SearchLimits::default()
        };
        let white = ClockTimeManager::from_limits(&limits, Color::Light, 10, 30).expect("timed");
        assert!(white.optimum() > Duration::from_millis(1_000));
        assert!(white.maximum() <= Duration::from_millis(60_000 / 3));
        assert!(white.optimum() <= white.maximum());

        let black = ClockTimeManager::from_limits(&limits, Color::Dark, 10, 30).expect("timed");
        assert!(black.maximum() <= Duration::from_millis(470 / 3));
    }

    #[test]
    fn untimed_limits_have_no_clock_manager() {
        let depth_only = SearchLimits::depth(5);
        assert!(ClockTimeManager::from_limits(&depth_only, Color::Light, 0, 0).is_none());
        let pondering = SearchLimits {
            ponder: true,
            wtime_ms: Some(10_000),
            ..SearchLimits::default()
        };
        assert!(ClockTimeManager::from_limits(&pondering, Color::Light, 0, 0).is_none());
    }

    #[test]
    fn unstable_best_move_extends_the_soft_limit() {
        let tm = ClockTimeManager::new(Duration::from_millis(1_000), Duration::from_millis(3_000));
        let elapsed = Duration::from_millis(600);
        assert!(!tm.on_iteration_complete(8, false, elapsed));
        assert!(tm.on_iteration_complete(8, true, elapsed));
        assert!(NoTimeLimit.on_iteration_complete(8, false, Duration::from_secs(3_600)));
    }

    #[test]
    fn adaptive_budget_uses_moves_to_go() {
        let spread = adaptive_budget_ms(0, 40_000, 0, None);
        let urgent = adaptive_budget_ms(0, 40_000, 0, Some(2));
        assert!(urgent > spread);
        assert!(urgent <= 10_000);
    }
}
