//! Reference ray tracing for sliding pieces.
//!
//! These loops are far too slow for move generation; they are used once at
//! startup to fill the magic lookup tables and the between/line tables, and
//! by tests as an oracle for the magic lookups.

use crate::game_state::chess_types::Square;
use crate::moves::bitboard::Bitboard;

pub const ROOK_DIRECTIONS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
pub const BISHOP_DIRECTIONS: [(i32, i32); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

/// Attacks along `directions`, each ray stopping on (and including) the first
/// occupied square.
pub fn sliding_attacks(square: Square, occupancy: Bitboard, directions: &[(i32, i32)]) -> Bitboard {
    let mut attacks = Bitboard::EMPTY;
    for &(file_step, rank_step) in directions {
        attacks |= trace_ray(square, file_step, rank_step, occupancy);
    }
    attacks
}

#[inline]
pub fn rook_attacks_slow(square: Square, occupancy: Bitboard) -> Bitboard {
    sliding_attacks(square, occupancy, &ROOK_DIRECTIONS)
}

#[inline]
pub fn bishop_attacks_slow(square: Square, occupancy: Bitboard) -> Bitboard {
    sliding_attacks(square, occupancy, &BISHOP_DIRECTIONS)
}

/// Occupancy bits that can change a slider's attack set from `square`: every
/// ray square except the last one before the board edge.
pub fn relevant_occupancy_mask(square: Square, directions: &[(i32, i32)]) -> Bitboard {
    let mut mask = Bitboard::EMPTY;
    for &(file_step, rank_step) in directions {
        let mut file = i32::from(square % 8) + file_step;
        let mut rank = i32::from(square / 8) + rank_step;
        while (0..8).contains(&(file + file_step)) && (0..8).contains(&(rank + rank_step)) {
            mask.insert((rank * 8 + file) as Square);
            file += file_step;
            rank += rank_step;
        }
    }
    mask
}

fn trace_ray(square: Square, file_step: i32, rank_step: i32, occupancy: Bitboard) -> Bitboard {
    let mut file = i32::from(square % 8) + file_step;
    let mut rank = i32::from(square / 8) + rank_step;
    let mut attacks = Bitboard::EMPTY;

    while (0..8).contains(&file) && (0..8).contains(&rank) {
        let target = (rank * 8 + file) as Square;
        attacks.insert(target);

        if occupancy.contains(target) {
            break;
        }

        file += file_step;
        rank += rank_step;
    }

    attacks
}
