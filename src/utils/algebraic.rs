//! Square name conversions (`e4` <-> 28).

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_types::{file_of, rank_of, Square};

/// Convert a square name (for example: "e4") to a square index.
#[inline]
pub fn algebraic_to_square(square: &str) -> ChessResult<Square> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 {
        return Err(ChessError::malformed(format!("invalid square name: {square}")));
    }

    let file = bytes[0];
    let rank = bytes[1];

    if !(b'a'..=b'h').contains(&file) {
        return Err(ChessError::malformed(format!("invalid file: {}", file as char)));
    }
    if !(b'1'..=b'8').contains(&rank) {
        return Err(ChessError::malformed(format!("invalid rank: {}", rank as char)));
    }

    Ok((rank - b'1') * 8 + (file - b'a'))
}

/// Square index (`0..=63`) to its two-character name.
#[inline]
pub fn square_name(square: Square) -> String {
    debug_assert!(square < 64);
    let file_char = char::from(b'a' + file_of(square));
    let rank_char = char::from(b'1' + rank_of(square));
    format!("{file_char}{rank_char}")
}
