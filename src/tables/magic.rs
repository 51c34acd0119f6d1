//! Magic-bitboard lookup for sliding pieces.
//!
//! For each square the relevant occupancy bits are multiplied by a magic
//! number; the top bits of the product index a per-square slice of a shared
//! attack table. Magics are searched at startup from a fixed seed, so the
//! tables are identical on every run.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::game_state::chess_types::Square;
use crate::moves::bitboard::Bitboard;
use crate::moves::slider_rays::{relevant_occupancy_mask, sliding_attacks};

const MAGIC_SEED: u64 = 0x5EED_CAFE_F00D_0001;

#[derive(Debug, Clone, Copy)]
struct MagicEntry {
    mask: u64,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl MagicEntry {
    #[inline]
    fn index(&self, occupancy: Bitboard) -> usize {
        self.offset + ((occupancy.0 & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }
}

/// Attack lookup for one slider type (rook or bishop).
#[derive(Debug, Clone)]
pub struct SlidingAttacks {
    entries: Vec<MagicEntry>,
    table: Vec<Bitboard>,
}

impl SlidingAttacks {
    /// Build tables for a slider moving along `directions`.
    pub fn new(directions: &[(i32, i32)], seed_offset: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(MAGIC_SEED ^ seed_offset);
        let mut entries = Vec::with_capacity(64);
        let mut table = Vec::new();

        for square in 0..64u8 {
            let (mask, magic, shift, attacks) = find_magic(square, directions, &mut rng);
            entries.push(MagicEntry {
                mask,
                magic,
                shift,
                offset: table.len(),
            });
            table.extend_from_slice(&attacks);
        }

        Self { entries, table }
    }

    #[inline]
    pub fn attacks(&self, square: Square, occupancy: Bitboard) -> Bitboard {
        self.table[self.entries[square as usize].index(occupancy)]
    }

    /// Empty-board attacks.
    #[inline]
    pub fn pseudo_attacks(&self, square: Square) -> Bitboard {
        self.attacks(square, Bitboard::EMPTY)
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }
}

fn find_magic(
    square: Square,
    directions: &[(i32, i32)],
    rng: &mut StdRng,
) -> (u64, u64, u32, Vec<Bitboard>) {
    let mask = relevant_occupancy_mask(square, directions).0;
    let bits = mask.count_ones();
    let shift = 64 - bits;
    let size = 1usize << bits;

    // Carry-rippler walk over every subset of the mask.
    let mut occupancies = Vec::with_capacity(size);
    let mut reference = Vec::with_capacity(size);
    let mut subset = 0u64;
    loop {
        occupancies.push(subset);
        reference.push(sliding_attacks(square, Bitboard(subset), directions));
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }

    let mut table = vec![Bitboard::EMPTY; size];
    let mut epoch = vec![0u32; size];
    let mut attempt = 0u32;

    loop {
        let magic = rng.random::<u64>() & rng.random::<u64>() & rng.random::<u64>();
        if (mask.wrapping_mul(magic) >> 56).count_ones() < 6 {
            continue;
        }
        attempt += 1;

        let mut collision = false;
        for (occupancy, attacks) in occupancies.iter().zip(reference.iter()) {
            let idx = (occupancy.wrapping_mul(magic) >> shift) as usize;
            if epoch[idx] < attempt {
                epoch[idx] = attempt;
                table[idx] = *attacks;
            } else if table[idx] != *attacks {
                collision = true;
                break;
            }
        }

        if !collision {
            return (mask, magic, shift, table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::slider_rays::{bishop_attacks_slow, rook_attacks_slow};
    use crate::test_support::tables;

    #[test]
    fn magic_lookup_matches_ray_tracing() {
        let t = tables();
        let occupancies = [
            Bitboard(0),
            Bitboard(0x0000_0010_0800_2400),
            Bitboard(0x00FF_0000_0000_FF00),
            Bitboard(0x8142_2418_1824_4281),
        ];
        for square in 0..64u8 {
            for &occ in &occupancies {
                assert_eq!(t.rook_attacks(square, occ), rook_attacks_slow(square, occ));
                assert_eq!(t.bishop_attacks(square, occ), bishop_attacks_slow(square, occ));
            }
        }
    }

    #[test]
    fn table_sizes_match_relevant_bit_counts() {
        let t = tables();
        assert_eq!(t.rook.table_len(), 102_400);
        assert_eq!(t.bishop.table_len(), 5_248);
    }
}
