//! What the caller allows a search to spend.

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_types::Color;
use crate::moves::move_descriptions::Move;

/// Deepest iteration the driver will start.
pub const MAX_DEPTH: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: Option<u64>,
    pub binc_ms: Option<u64>,
    pub movestogo: Option<u32>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    /// Stop once a mate in this many moves is found.
    pub mate: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
    /// Restricts the root to these moves when non-empty.
    pub searchmoves: Vec<Move>,
}

impl SearchLimits {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn nodes(nodes: u64) -> Self {
        Self {
            nodes: Some(nodes),
            ..Self::default()
        }
    }

    pub fn movetime_ms(ms: u64) -> Self {
        Self {
            movetime_ms: Some(ms),
            ..Self::default()
        }
    }

    pub fn infinite() -> Self {
        Self {
            infinite: true,
            ..Self::default()
        }
    }

    pub fn clock_ms(&self, side: Color) -> Option<u64> {
        match side {
            Color::Light => self.wtime_ms,
            Color::Dark => self.btime_ms,
        }
    }

    pub fn increment_ms(&self, side: Color) -> u64 {
        match side {
            Color::Light => self.winc_ms,
            Color::Dark => self.binc_ms,
        }
        .unwrap_or(0)
    }

    /// Deepest iteration allowed, clamped to [`MAX_DEPTH`].
    pub fn max_depth(&self) -> u32 {
        self.depth.map_or(MAX_DEPTH, |d| d.min(MAX_DEPTH))
    }

    fn has_hard_bound(&self) -> bool {
        self.depth.is_some_and(|d| d > 0)
            || self.nodes.is_some_and(|n| n > 0)
            || self.mate.is_some_and(|m| m > 0)
    }

    /// Rejects limit sets that cannot describe a search: zero budgets with no
    /// other bound, or nothing bounding the search at all.
    pub fn validate(&self, side: Color) -> ChessResult<()> {
        let reject = |reason: &str| Err(ChessError::InvalidSearchLimits(reason.to_string()));

        if self.depth == Some(0) {
            return reject("depth 0");
        }
        if self.nodes == Some(0) {
            return reject("node budget of 0");
        }
        if self.mate == Some(0) {
            return reject("mate in 0 moves");
        }
        if self.movestogo == Some(0) {
            return reject("movestogo 0");
        }
        if self.infinite || self.ponder {
            return Ok(());
        }
        if self.movetime_ms == Some(0) && !self.has_hard_bound() {
            return reject("move time of 0 with no depth or node bound");
        }
        if self.clock_ms(side) == Some(0) && self.movetime_ms.is_none() && !self.has_hard_bound() {
            return reject("no time left on the clock and no depth or node bound");
        }
        let has_time = self.movetime_ms.is_some() || self.clock_ms(side).is_some();
        if !has_time && !self.has_hard_bound() {
            return reject("no depth, node, mate, time or infinite bound given");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_limits_validate() {
        assert!(SearchLimits::depth(6).validate(Color::Light).is_ok());
        assert!(SearchLimits::nodes(10_000).validate(Color::Dark).is_ok());
        assert!(SearchLimits::movetime_ms(50).validate(Color::Light).is_ok());
        assert!(SearchLimits::infinite().validate(Color::Light).is_ok());
        let clock = SearchLimits {
            btime_ms: Some(60_000),
            binc_ms: Some(1_000),
            ..SearchLimits::default()
        };
        assert!(clock.validate(Color::Dark).is_ok());
    }

    #[test]
    fn malformed_limits_are_rejected() {
        let cases = [
            SearchLimits::default(),
            SearchLimits::depth(0),
            SearchLimits::nodes(0),
            SearchLimits::movetime_ms(0),
            SearchLimits {
                wtime_ms: Some(0),
                ..SearchLimits::default()
            },
            SearchLimits {
                movestogo: Some(0),
                wtime_ms: Some(1_000),
                ..SearchLimits::default()
            },
            // White's clock says nothing about black to move.
            SearchLimits {
                wtime_ms: Some(1_000),
                ..SearchLimits::default()
            },
        ];
        let sides = [Color::Light; 6].into_iter().chain([Color::Dark]);
        for (limits, side) in cases.iter().zip(sides) {
            assert!(
                matches!(limits.validate(side), Err(ChessError::InvalidSearchLimits(_))),
                "{limits:?} should be rejected"
            );
        }
        let infinite_depth_zero = SearchLimits {
            depth: Some(0),
            ..SearchLimits::infinite()
        };
        assert!(matches!(
            infinite_depth_zero.validate(Color::Light),
            Err(ChessError::InvalidSearchLimits(_))
        ));
        let zero_time_with_depth = SearchLimits {
            movetime_ms: Some(0),
            depth: Some(3),
            ..SearchLimits::default()
        };
        assert!(zero_time_with_depth.validate(Color::Light).is_ok());
    }

    #[test]
    fn max_depth_clamps() {
        assert_eq!(SearchLimits::depth(7).max_depth(), 7);
        assert_eq!(SearchLimits::depth(1_000).max_depth(), MAX_DEPTH);
        assert_eq!(SearchLimits::nodes(5).max_depth(), MAX_DEPTH);
    }
}
