//! Endgame tablebase probing seam.
//!
//! The search only needs win/draw/loss answers and a suggested root move;
//! file formats and decompression live behind [`TablebaseProbe`].

use crate::errors::ChessResult;
use crate::game_state::chess_types::Position;
use crate::moves::move_descriptions::Move;
use crate::search::score::Score;

/// Win/draw/loss from the side to move, with the fifty-move-rule variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Wdl {
    Loss,
    /// Lost, but drawn under the fifty-move rule.
    BlessedLoss,
    Draw,
    /// Won, but drawn under the fifty-move rule.
    CursedWin,
    Win,
}

impl Wdl {
    /// Decisive results sit just inside the mate range so a real mate still
    /// outranks them.
    pub fn to_score(self, ply: usize) -> Score {
        let decisive = Score::MATE_IN_MAX_PLY.0 - 1 - ply as i32;
        match self {
            Wdl::Loss => Score(-decisive),
            Wdl::BlessedLoss => Score(-1),
            Wdl::Draw => Score::DRAW,
            Wdl::CursedWin => Score(1),
            Wdl::Win => Score(decisive),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootProbe {
    pub wdl: Wdl,
    /// Distance to the next zeroing move, in plies.
    pub dtz: i32,
    pub best_move: Move,
}

/// `ChessError::ResourceUnavailable` from either probe turns probing off for
/// the rest of the search; any other error ends the search.
pub trait TablebaseProbe: Send + Sync {
    /// Largest piece count (kings included) the tables cover; 0 for none.
    fn max_pieces(&self) -> u32;

    fn probe_wdl(&self, position: &Position<'_>) -> ChessResult<Option<Wdl>>;

    fn probe_root(&self, position: &Position<'_>) -> ChessResult<Option<RootProbe>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoTablebase;

impl TablebaseProbe for NoTablebase {
    fn max_pieces(&self) -> u32 {
        0
    }

    fn probe_wdl(&self, _position: &Position<'_>) -> ChessResult<Option<Wdl>> {
        Ok(None)
    }

    fn probe_root(&self, _position: &Position<'_>) -> ChessResult<Option<RootProbe>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisive_scores_stay_below_mate_range() {
        let win = Wdl::Win.to_score(3);
        assert!(win.0 > 0 && !win.is_mate());
        assert!(Score::mate_in(100) > win);
        assert_eq!(Wdl::Loss.to_score(3), -win);
        assert_eq!(Wdl::Draw.to_score(9), Score::DRAW);
        assert!(Wdl::CursedWin.to_score(0) > Wdl::BlessedLoss.to_score(0));
    }
}
