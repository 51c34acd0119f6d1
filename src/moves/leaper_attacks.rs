//! Compile-time attack tables for knights, kings and pawns.
//!
//! These pieces never depend on occupancy, so each table is a plain `const`
//! array indexed by origin square.

use crate::game_state::chess_types::{Color, Square};
use crate::moves::bitboard::Bitboard;

const KNIGHT_DELTAS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_DELTAS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const LIGHT_PAWN_DELTAS: [(i32, i32); 2] = [(-1, 1), (1, 1)];
const DARK_PAWN_DELTAS: [(i32, i32); 2] = [(-1, -1), (1, -1)];

pub const KNIGHT_ATTACKS: [u64; 64] = generate_table(&KNIGHT_DELTAS);
pub const KING_ATTACKS: [u64; 64] = generate_table(&KING_DELTAS);
pub const PAWN_ATTACKS: [[u64; 64]; 2] = [
    generate_table(&LIGHT_PAWN_DELTAS),
    generate_table(&DARK_PAWN_DELTAS),
];

#[inline]
pub const fn knight_attacks(square: Square) -> Bitboard {
    Bitboard(KNIGHT_ATTACKS[square as usize])
}

#[inline]
pub const fn king_attacks(square: Square) -> Bitboard {
    Bitboard(KING_ATTACKS[square as usize])
}

/// Squares a pawn of `color` standing on `square` attacks.
#[inline]
pub const fn pawn_attacks(color: Color, square: Square) -> Bitboard {
    Bitboard(PAWN_ATTACKS[color.index()][square as usize])
}

const fn generate_table(deltas: &[(i32, i32)]) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let file = (sq % 8) as i32;
        let rank = (sq / 8) as i32;
        let mut attacks = 0u64;
        let mut i = 0usize;
        while i < deltas.len() {
            attacks |= set_if_valid(file + deltas[i].0, rank + deltas[i].1);
            i += 1;
        }
        table[sq] = attacks;
        sq += 1;
    }

    table
}

const fn set_if_valid(file: i32, rank: i32) -> u64 {
    if file < 0 || file > 7 || rank < 0 || rank > 7 {
        return 0;
    }

    let square = (rank as usize) * 8 + (file as usize);
    1u64 << square
}
