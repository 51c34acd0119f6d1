//! Zobrist keys for incremental position hashing.
//!
//! The keys are generated from a fixed seed so hashes are deterministic across
//! runs, which is useful for testing and debugging.

use crate::game_state::chess_types::*;

#[derive(Debug, Clone)]
pub struct ZobristKeys {
    piece_square: [[[u64; 64]; 6]; 2],
    side_to_move: u64,
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

impl ZobristKeys {
    pub fn new() -> Self {
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;

        let mut piece_square = [[[0u64; 64]; 6]; 2];
        for color in &mut piece_square {
            for piece in color {
                for sq in piece {
                    *sq = next_random_u64(&mut seed);
                }
            }
        }

        let side_to_move = next_random_u64(&mut seed);

        // Castling keys are the xor of one key per individual right so that
        // toggling a single right is a single xor.
        let mut single_rights = [0u64; 4];
        for key in &mut single_rights {
            *key = next_random_u64(&mut seed);
        }
        let mut castling = [0u64; 16];
        for (mask, key) in castling.iter_mut().enumerate() {
            for (bit, single) in single_rights.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    *key ^= *single;
                }
            }
        }

        let mut en_passant_file = [0u64; 8];
        for key in &mut en_passant_file {
            *key = next_random_u64(&mut seed);
        }

        Self {
            piece_square,
            side_to_move,
            castling,
            en_passant_file,
        }
    }

    /// Key for a `(color, piece, square)` occupancy term.
    #[inline]
    pub fn piece_square(&self, color: Color, piece: PieceKind, square: Square) -> u64 {
        self.piece_square[color.index()][piece.index()][square as usize]
    }

    /// Key contribution for a castling rights mask (`0..=15`).
    #[inline]
    pub fn castling(&self, castling_rights: CastlingRights) -> u64 {
        self.castling[(castling_rights & CASTLE_ALL) as usize]
    }

    #[inline]
    pub fn en_passant_file(&self, file: u8) -> u64 {
        self.en_passant_file[file as usize]
    }

    /// Side-to-move toggle (xor in when dark to move).
    #[inline]
    pub fn side_to_move(&self) -> u64 {
        self.side_to_move
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn next_random_u64(state: &mut u64) -> u64 {
    // splitmix64
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic() {
        let a = ZobristKeys::new();
        let b = ZobristKeys::new();
        assert_eq!(
            a.piece_square(Color::Dark, PieceKind::Queen, 42),
            b.piece_square(Color::Dark, PieceKind::Queen, 42)
        );
        assert_eq!(a.side_to_move(), b.side_to_move());
    }

    #[test]
    fn castling_keys_compose_per_right() {
        let keys = ZobristKeys::new();
        let both = keys.castling(CASTLE_LIGHT_KINGSIDE | CASTLE_DARK_QUEENSIDE);
        let split = keys.castling(CASTLE_LIGHT_KINGSIDE) ^ keys.castling(CASTLE_DARK_QUEENSIDE);
        assert_eq!(both, split);
        assert_eq!(keys.castling(0), 0);
    }
}
