//! Immutable constant tables built once at startup.
//!
//! `EngineTables` bundles everything move generation, position updates and
//! search look up but never modify: magic sliding attacks, between/line
//! geometry and Zobrist keys. It is constructed once and shared by reference
//! (it is `Sync`), so parallel workers read it concurrently without locks.

use crate::game_state::chess_types::{PieceKind, Square};
use crate::moves::bitboard::Bitboard;
use crate::moves::leaper_attacks::{king_attacks, knight_attacks};
use crate::moves::slider_rays::{
    bishop_attacks_slow, rook_attacks_slow, BISHOP_DIRECTIONS, ROOK_DIRECTIONS,
};
use crate::tables::magic::SlidingAttacks;
use crate::tables::zobrist::ZobristKeys;

#[derive(Debug, Clone)]
pub struct EngineTables {
    pub(crate) rook: SlidingAttacks,
    pub(crate) bishop: SlidingAttacks,
    between: Vec<Bitboard>,
    line: Vec<Bitboard>,
    pub zobrist: ZobristKeys,
}

impl EngineTables {
    pub fn new() -> Self {
        let rook = SlidingAttacks::new(&ROOK_DIRECTIONS, 0x52);
        let bishop = SlidingAttacks::new(&BISHOP_DIRECTIONS, 0x42);

        let mut between = vec![Bitboard::EMPTY; 64 * 64];
        let mut line = vec![Bitboard::EMPTY; 64 * 64];
        for a in 0..64u8 {
            for b in 0..64u8 {
                if a == b {
                    continue;
                }
                let idx = usize::from(a) * 64 + usize::from(b);
                let a_bb = Bitboard::from_square(a);
                let b_bb = Bitboard::from_square(b);
                if rook_attacks_slow(a, Bitboard::EMPTY).contains(b) {
                    line[idx] = (rook_attacks_slow(a, Bitboard::EMPTY)
                        & rook_attacks_slow(b, Bitboard::EMPTY))
                        | a_bb
                        | b_bb;
                    between[idx] = rook_attacks_slow(a, b_bb) & rook_attacks_slow(b, a_bb);
                } else if bishop_attacks_slow(a, Bitboard::EMPTY).contains(b) {
                    line[idx] = (bishop_attacks_slow(a, Bitboard::EMPTY)
                        & bishop_attacks_slow(b, Bitboard::EMPTY))
                        | a_bb
                        | b_bb;
                    between[idx] = bishop_attacks_slow(a, b_bb) & bishop_attacks_slow(b, a_bb);
                }
            }
        }

        Self {
            rook,
            bishop,
            between,
            line,
            zobrist: ZobristKeys::new(),
        }
    }

    #[inline]
    pub fn rook_attacks(&self, square: Square, occupancy: Bitboard) -> Bitboard {
        self.rook.attacks(square, occupancy)
    }

    #[inline]
    pub fn bishop_attacks(&self, square: Square, occupancy: Bitboard) -> Bitboard {
        self.bishop.attacks(square, occupancy)
    }

    #[inline]
    pub fn queen_attacks(&self, square: Square, occupancy: Bitboard) -> Bitboard {
        self.rook.attacks(square, occupancy) | self.bishop.attacks(square, occupancy)
    }

    /// Attacks of a non-pawn piece of `kind` on `square` given `occupancy`.
    #[inline]
    pub fn attacks_from(&self, kind: PieceKind, square: Square, occupancy: Bitboard) -> Bitboard {
        match kind {
            PieceKind::Knight => knight_attacks(square),
            PieceKind::Bishop => self.bishop_attacks(square, occupancy),
            PieceKind::Rook => self.rook_attacks(square, occupancy),
            PieceKind::Queen => self.queen_attacks(square, occupancy),
            PieceKind::King => king_attacks(square),
            PieceKind::Pawn => Bitboard::EMPTY,
        }
    }

    /// Squares strictly between two aligned squares, empty otherwise.
    #[inline]
    pub fn between(&self, a: Square, b: Square) -> Bitboard {
        self.between[usize::from(a) * 64 + usize::from(b)]
    }

    /// Full board line through two aligned squares, empty otherwise.
    #[inline]
    pub fn line(&self, a: Square, b: Square) -> Bitboard {
        self.line[usize::from(a) * 64 + usize::from(b)]
    }

    #[inline]
    pub fn aligned(&self, a: Square, b: Square, c: Square) -> bool {
        self.line(a, b).contains(c)
    }
}

impl Default for EngineTables {
    fn default() -> Self {
        Self::new()
    }
}
