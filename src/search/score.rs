//! Search scores in centipawns, with mate scores encoded near the bounds.

use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Deepest ply the search can reach, quiescence included.
pub const MAX_PLY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Score(pub i32);

impl Score {
    pub const ZERO: Score = Score(0);
    pub const DRAW: Score = Score(0);
    pub const MATE: Score = Score(32_000);
    pub const INFINITE: Score = Score(32_001);
    pub const MATE_IN_MAX_PLY: Score = Score(32_000 - MAX_PLY as i32);
    pub const MATED_IN_MAX_PLY: Score = Score(-32_000 + MAX_PLY as i32);

    #[inline]
    pub const fn cp(value: i32) -> Self {
        Score(value)
    }

    /// Score for delivering mate `ply` plies from the root.
    #[inline]
    pub const fn mate_in(ply: usize) -> Self {
        Score(Self::MATE.0 - ply as i32)
    }

    /// Score for being mated `ply` plies from the root.
    #[inline]
    pub const fn mated_in(ply: usize) -> Self {
        Score(-Self::MATE.0 + ply as i32)
    }

    #[inline]
    pub const fn is_mate(self) -> bool {
        self.0 >= Self::MATE_IN_MAX_PLY.0 || self.0 <= Self::MATED_IN_MAX_PLY.0
    }

    #[inline]
    pub const fn is_winning_mate(self) -> bool {
        self.0 >= Self::MATE_IN_MAX_PLY.0
    }

    /// Signed number of full moves to mate (negative when being mated).
    pub const fn mate_moves(self) -> Option<i32> {
        if self.0 >= Self::MATE_IN_MAX_PLY.0 {
            Some((Self::MATE.0 - self.0 + 1) / 2)
        } else if self.0 <= Self::MATED_IN_MAX_PLY.0 {
            Some(-(Self::MATE.0 + self.0) / 2)
        } else {
            None
        }
    }

    /// Converts a node-relative mate score to root-independent form for the
    /// transposition table.
    #[inline]
    pub fn to_tt(self, ply: usize) -> Self {
        if self >= Self::MATE_IN_MAX_PLY {
            Score(self.0 + ply as i32)
        } else if self <= Self::MATED_IN_MAX_PLY {
            Score(self.0 - ply as i32)
        } else {
            self
        }
    }

    #[inline]
    pub fn from_tt(self, ply: usize) -> Self {
        if self >= Self::MATE_IN_MAX_PLY {
            Score(self.0 - ply as i32)
        } else if self <= Self::MATED_IN_MAX_PLY {
            Score(self.0 + ply as i32)
        } else {
            self
        }
    }
}

impl Neg for Score {
    type Output = Score;
    #[inline]
    fn neg(self) -> Score {
        Score(-self.0)
    }
}

impl Add<i32> for Score {
    type Output = Score;
    #[inline]
    fn add(self, rhs: i32) -> Score {
        Score(self.0 + rhs)
    }
}

impl Sub<i32> for Score {
    type Output = Score;
    #[inline]
    fn sub(self, rhs: i32) -> Score {
        Score(self.0 - rhs)
    }
}

impl fmt::Display for Score {
    /// `cp 35` or `mate 3` / `mate -2`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mate_moves() {
            Some(moves) => write!(f, "mate {moves}"),
            None => write!(f, "cp {}", self.0),
        }
    }
}
