//! Coordinate move text (`e2e4`, `e7e8q`, castling as `e1g1`).
//!
//! Text is only ever matched against the legal move list of the position, so
//! an unknown or malformed string simply yields `Move::NONE`.

use crate::errors::ChessResult;
use crate::game_state::chess_types::Position;
use crate::move_generation::move_generator::{generate_moves, GenerationMode};
use crate::moves::move_descriptions::Move;

pub fn move_to_long_algebraic(mv: Move) -> String {
    mv.to_string()
}

/// The legal move whose text is `text`, or `Move::NONE`.
pub fn parse_move(position: &Position<'_>, text: &str) -> Move {
    let text = text.trim();
    if text.len() != 4 && text.len() != 5 {
        return Move::NONE;
    }
    // Accept an uppercase promotion letter.
    let normalized = text.to_ascii_lowercase();
    generate_moves(position, GenerationMode::All)
        .iter()
        .copied()
        .find(|mv| mv.to_string() == normalized)
        .unwrap_or(Move::NONE)
}

/// Applies moves in order until one does not match a legal move.
///
/// Returns how many were applied. An unmatched move ends the sequence and is
/// not an error.
pub fn apply_move_sequence<'a, I>(position: &mut Position<'_>, texts: I) -> ChessResult<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut applied = 0;
    for text in texts {
        let mv = parse_move(position, text);
        if mv.is_none() {
            break;
        }
        position.make_move(mv)?;
        applied += 1;
    }
    Ok(applied)
}
