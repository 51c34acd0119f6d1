//! Pluggable static evaluation.
//!
//! Search delegates leaf scoring to [`Evaluator`], so heuristics can be
//! swapped without touching search code.

use crate::game_state::chess_rules::PIECE_VALUES;
use crate::game_state::chess_types::*;
use crate::moves::bitboard::Bitboard;
use crate::search::score::Score;

pub trait Evaluator: Send + Sync {
    /// Score from the perspective of the side to move.
    fn evaluate(&self, position: &Position<'_>) -> Score;
}

#[inline]
fn from_side_to_move(position: &Position<'_>, light_minus_dark: i32) -> Score {
    match position.side_to_move() {
        Color::Light => Score(light_minus_dark),
        Color::Dark => Score(-light_minus_dark),
    }
}

fn material_light_minus_dark(position: &Position<'_>) -> i32 {
    PieceKind::ALL
        .iter()
        .map(|&kind| {
            let light = position.pieces(Color::Light, kind).count() as i32;
            let dark = position.pieces(Color::Dark, kind).count() as i32;
            (light - dark) * PIECE_VALUES[kind.index()]
        })
        .sum()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialEvaluator;

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, position: &Position<'_>) -> Score {
        from_side_to_move(position, material_light_minus_dark(position))
    }
}

/// Material plus piece-square terms, blended between middlegame and endgame
/// tables by the remaining non-pawn material.
#[derive(Debug, Clone, Copy, Default)]
pub struct PieceSquareEvaluator;

const FULL_PHASE: i32 = 24;
const TEMPO: i32 = 10;

impl PieceSquareEvaluator {
    /// 24 with all minor and major pieces on the board, 0 with none.
    pub fn phase(position: &Position<'_>) -> i32 {
        let weight = |kind, w: i32| position.pieces_of_kind(kind).count() as i32 * w;
        (weight(PieceKind::Queen, 4)
            + weight(PieceKind::Rook, 2)
            + weight(PieceKind::Bishop, 1)
            + weight(PieceKind::Knight, 1))
        .clamp(0, FULL_PHASE)
    }
}

impl Evaluator for PieceSquareEvaluator {
    fn evaluate(&self, position: &Position<'_>) -> Score {
        let mut middlegame = 0;
        let mut endgame = 0;
        for color in Color::ALL {
            let sign = if color == Color::Light { 1 } else { -1 };
            let enemy_pawns = position.pieces(color.opposite(), PieceKind::Pawn);
            for kind in PieceKind::ALL {
                for square in position.pieces(color, kind) {
                    middlegame += sign * middlegame_bonus(kind, color, square);
                    endgame += sign * endgame_bonus(kind, color, square, enemy_pawns);
                }
            }
        }

        let phase = Self::phase(position);
        let positional = (middlegame * phase + endgame * (FULL_PHASE - phase)) / FULL_PHASE;
        from_side_to_move(position, material_light_minus_dark(position) + positional) + TEMPO
    }
}

#[inline]
fn relative_rank_and_file(color: Color, square: Square) -> (i32, i32) {
    (
        i32::from(color.relative_rank(rank_of(square))),
        i32::from(file_of(square)),
    )
}

fn middlegame_bonus(kind: PieceKind, color: Color, square: Square) -> i32 {
    let (r, file) = relative_rank_and_file(color, square);
    let dist_center = (file - 3).abs() + (r - 3).abs();
    let center_bonus = 4 - dist_center;

    match kind {
        PieceKind::Pawn => r * 8 - (file - 3).abs() * 2,
        PieceKind::Knight => center_bonus * 6,
        PieceKind::Bishop => center_bonus * 4 + r,
        PieceKind::Rook => r * 2,
        PieceKind::Queen => center_bonus * 2,
        PieceKind::King => {
            if r <= 1 {
                8 - (file - 4).abs() * 2
            } else {
                -center_bonus * 4
            }
        }
    }
}

fn endgame_bonus(kind: PieceKind, color: Color, square: Square, enemy_pawns: Bitboard) -> i32 {
    let (r, file) = relative_rank_and_file(color, square);
    let centrality = 7 - ((file - 3).abs() + (r - 3).abs());

    match kind {
        PieceKind::Pawn => {
            let passed = is_passed_pawn(color, square, enemy_pawns);
            r * 10 + if passed { (r + 1) * 12 } else { 0 }
        }
        PieceKind::Knight => centrality * 3,
        PieceKind::Bishop => centrality * 2,
        PieceKind::Rook => 0,
        PieceKind::Queen => centrality * 2,
        PieceKind::King => centrality * 6,
    }
}

/// No enemy pawn ahead on the pawn's own or adjacent files.
fn is_passed_pawn(color: Color, square: Square, enemy_pawns: Bitboard) -> bool {
    let file = file_of(square);
    let rank = rank_of(square);
    let mut files = Bitboard::file_mask(file);
    if file > 0 {
        files |= Bitboard::file_mask(file - 1);
    }
    if file < 7 {
        files |= Bitboard::file_mask(file + 1);
    }
    let mut ahead = Bitboard::EMPTY;
    for r in 0..8u8 {
        let in_front = match color {
            Color::Light => r > rank,
            Color::Dark => r < rank,
        };
        if in_front {
            ahead |= Bitboard::rank_mask(r);
        }
    }
    (files & ahead & enemy_pawns).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tables;

    fn eval_of(evaluator: &dyn Evaluator, fen: &str) -> Score {
        let position = Position::from_fen(tables(), fen).expect("valid fen");
        evaluator.evaluate(&position)
    }

    #[test]
    fn material_reflects_side_to_move_perspective() {
        assert_eq!(eval_of(&MaterialEvaluator, "4k3/8/8/8/8/8/8/4KQ2 w - - 0 1"), Score(900));
        assert_eq!(eval_of(&MaterialEvaluator, "4k3/8/8/8/8/8/8/4KQ2 b - - 0 1"), Score(-900));
    }

    #[test]
    fn start_position_is_balanced_up_to_tempo() {
        let white = eval_of(
            &PieceSquareEvaluator,
            crate::game_state::chess_rules::STARTING_POSITION_FEN,
        );
        assert_eq!(white, Score(TEMPO));
        let black = eval_of(
            &PieceSquareEvaluator,
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1",
        );
        assert_eq!(black, Score(TEMPO));
    }

    #[test]
    fn central_knight_beats_rim_knight() {
        let center = eval_of(&PieceSquareEvaluator, "4k3/8/8/3N4/8/8/8/4K3 w - - 0 1");
        let rim = eval_of(&PieceSquareEvaluator, "4k3/8/8/8/8/8/N7/4K3 w - - 0 1");
        assert!(center > rim);
    }

    #[test]
    fn endgame_rewards_passed_pawns_and_active_king() {
        let passed = eval_of(&PieceSquareEvaluator, "4k3/8/8/3P4/8/8/8/4K3 w - - 0 1");
        let blocked = eval_of(&PieceSquareEvaluator, "4k3/3p4/8/3P4/8/8/8/4K3 w - - 0 1");
        assert!(passed.0 > blocked.0 + 100);

        let active = eval_of(&PieceSquareEvaluator, "7k/8/8/8/3K4/8/8/8 w - - 0 1");
        let passive = eval_of(&PieceSquareEvaluator, "7k/8/8/8/8/8/8/K7 w - - 0 1");
        assert!(active > passive);
    }

    #[test]
    fn passed_pawn_detection() {
        let dark_pawn_on_e6 = Bitboard::from_square(44);
        assert!(!is_passed_pawn(Color::Light, 35, dark_pawn_on_e6));
        assert!(is_passed_pawn(Color::Light, 33, dark_pawn_on_e6));
        assert!(is_passed_pawn(Color::Dark, 44, Bitboard::EMPTY));
    }
}
