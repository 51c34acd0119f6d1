//! Canonical chess-rule constants.
//!
//! Starting position, castling geometry and draw-rule limits.

use crate::game_state::chess_types::squares::*;
use crate::game_state::chess_types::*;
use crate::moves::bitboard::Bitboard;

/// Standard chess starting position in Forsyth-Edwards Notation (FEN).
pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule applies.
pub const FIFTY_MOVE_LIMIT: u16 = 100;

/// Nominal piece values in centipawns, indexed by `PieceKind::index()`.
pub const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 0];

/// Geometry of one castling option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastlingMove {
    pub right: CastlingRights,
    pub color: Color,
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
    /// Squares strictly between king and rook; all must be empty.
    pub empty_path: Bitboard,
    /// Squares the king crosses, destination included; none may be attacked.
    pub king_path: Bitboard,
}

const fn bb(squares: &[Square]) -> Bitboard {
    let mut bits = 0u64;
    let mut i = 0;
    while i < squares.len() {
        bits |= 1u64 << squares[i];
        i += 1;
    }
    Bitboard(bits)
}

pub const CASTLING_MOVES: [CastlingMove; 4] = [
    CastlingMove {
        right: CASTLE_LIGHT_KINGSIDE,
        color: Color::Light,
        king_from: E1,
        king_to: G1,
        rook_from: H1,
        rook_to: F1,
        empty_path: bb(&[F1, G1]),
        king_path: bb(&[F1, G1]),
    },
    CastlingMove {
        right: CASTLE_LIGHT_QUEENSIDE,
        color: Color::Light,
        king_from: E1,
        king_to: C1,
        rook_from: A1,
        rook_to: D1,
        empty_path: bb(&[B1, C1, D1]),
        king_path: bb(&[C1, D1]),
    },
    CastlingMove {
        right: CASTLE_DARK_KINGSIDE,
        color: Color::Dark,
        king_from: E8,
        king_to: G8,
        rook_from: H8,
        rook_to: F8,
        empty_path: bb(&[F8, G8]),
        king_path: bb(&[F8, G8]),
    },
    CastlingMove {
        right: CASTLE_DARK_QUEENSIDE,
        color: Color::Dark,
        king_from: E8,
        king_to: C8,
        rook_from: A8,
        rook_to: D8,
        empty_path: bb(&[B8, C8, D8]),
        king_path: bb(&[C8, D8]),
    },
];

/// Kingside then queenside option for `color`.
#[inline]
pub fn castling_moves_for(color: Color) -> &'static [CastlingMove] {
    match color {
        Color::Light => &CASTLING_MOVES[0..2],
        Color::Dark => &CASTLING_MOVES[2..4],
    }
}

/// The castling option whose king lands on `king_to`.
#[inline]
pub fn castling_move_to(king_to: Square) -> Option<&'static CastlingMove> {
    CASTLING_MOVES.iter().find(|c| c.king_to == king_to)
}

/// Rights lost when a move starts or ends on each square.
pub const CASTLING_RIGHTS_LOST: [CastlingRights; 64] = {
    let mut table = [0u8; 64];
    table[A1 as usize] = CASTLE_LIGHT_QUEENSIDE;
    table[H1 as usize] = CASTLE_LIGHT_KINGSIDE;
    table[E1 as usize] = CASTLE_LIGHT_KINGSIDE | CASTLE_LIGHT_QUEENSIDE;
    table[A8 as usize] = CASTLE_DARK_QUEENSIDE;
    table[H8 as usize] = CASTLE_DARK_KINGSIDE;
    table[E8 as usize] = CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE;
    table
};
