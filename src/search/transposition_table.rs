//! Shared, lock-free transposition table keyed by Zobrist hash.
//!
//! Each slot is two atomics: the packed entry and `key ^ entry`. A torn write
//! from a racing thread fails the key check and reads as a miss, so workers
//! never lock and never see a half-written entry as valid.
//!
//! Buckets are 4-way set associative. Replacement favours deep, exact and
//! recent entries; a same-key store only loses to a deeper resident.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::moves::move_descriptions::Move;
use crate::search::config::EngineConfig;
use crate::search::score::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

impl Bound {
    const fn code(self) -> u64 {
        match self {
            Bound::Upper => 1,
            Bound::Lower => 2,
            Bound::Exact => 3,
        }
    }

    const fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Bound::Upper),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Exact),
            _ => None,
        }
    }

    /// Whether a stored score with this bound settles a node searched with
    /// window `beta` (null window around `beta - 1 .. beta`).
    #[inline]
    pub fn cuts(self, score: Score, beta: Score) -> bool {
        match self {
            Bound::Exact => true,
            Bound::Lower => score >= beta,
            Bound::Upper => score < beta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub best_move: Move,
    /// Root-independent score; convert with [`Score::from_tt`].
    pub score: Score,
    pub depth: i32,
    pub bound: Bound,
}

// data layout: move 0-15, score 16-31, depth 32-39, bound 40-41,
// generation 42-47.
const GENERATION_BITS: u32 = 6;
const GENERATION_MASK: u8 = (1 << GENERATION_BITS) - 1;

fn pack(entry: TTEntry, generation: u8) -> u64 {
    let depth = entry.depth.clamp(0, u8::MAX as i32) as u64;
    u64::from(entry.best_move.raw())
        | (u64::from(entry.score.0 as i16 as u16) << 16)
        | (depth << 32)
        | (entry.bound.code() << 40)
        | (u64::from(generation & GENERATION_MASK) << 42)
}

fn unpack(data: u64) -> Option<(TTEntry, u8)> {
    let bound = Bound::from_code((data >> 40) & 0b11)?;
    let entry = TTEntry {
        best_move: Move::from_raw(data as u16),
        score: Score(i32::from((data >> 16) as u16 as i16)),
        depth: ((data >> 32) & 0xFF) as i32,
        bound,
    };
    Some((entry, ((data >> 42) as u8) & GENERATION_MASK))
}

#[derive(Debug, Default)]
struct TTSlot {
    key_xor_data: AtomicU64,
    data: AtomicU64,
}

impl TTSlot {
    #[inline]
    fn load(&self) -> (u64, u64) {
        let data = self.data.load(Ordering::Relaxed);
        let key = self.key_xor_data.load(Ordering::Relaxed) ^ data;
        (key, data)
    }

    #[inline]
    fn write(&self, key: u64, data: u64) {
        self.data.store(data, Ordering::Relaxed);
        self.key_xor_data.store(key ^ data, Ordering::Relaxed);
    }
}

type Bucket = [TTSlot; TranspositionTable::BUCKET_SIZE];

#[derive(Debug)]
pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    bucket_mask: usize,
    generation: AtomicU8,
}

impl TranspositionTable {
    const BUCKET_SIZE: usize = 4;

    /// Largest power-of-two bucket count that fits in `size_mb` MiB.
    pub fn new_with_mb(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let raw_bucket_count = (bytes / std::mem::size_of::<Bucket>()).max(1);
        let bucket_count = if raw_bucket_count.is_power_of_two() {
            raw_bucket_count
        } else {
            raw_bucket_count.next_power_of_two() / 2
        };
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, Bucket::default);
        Self {
            buckets,
            bucket_mask: bucket_count - 1,
            generation: AtomicU8::new(0),
        }
    }

    /// Table sized by the `Hash` option.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new_with_mb(config.hash_mb)
    }

    /// Ages every resident entry by one search.
    #[inline]
    pub fn new_generation(&self) {
        let next = (self.generation.load(Ordering::Relaxed) + 1) & GENERATION_MASK;
        self.generation.store(next, Ordering::Relaxed);
    }

    /// Not meant to race with a running search.
    pub fn clear(&self) {
        for slot in self.buckets.iter().flatten() {
            slot.write(0, 0);
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len() * Self::BUCKET_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[inline]
    fn bucket(&self, key: u64) -> &Bucket {
        &self.buckets[(key as usize) & self.bucket_mask]
    }

    pub fn probe(&self, key: u64) -> Option<TTEntry> {
        self.bucket(key).iter().find_map(|slot| {
            let (slot_key, data) = slot.load();
            if slot_key != key {
                return None;
            }
            unpack(data).map(|(entry, _)| entry)
        })
    }

    pub fn store(&self, key: u64, entry: TTEntry) {
        let generation = self.generation.load(Ordering::Relaxed);
        let bucket = self.bucket(key);

        let mut victim = &bucket[0];
        let mut victim_priority = i32::MAX;
        for slot in bucket {
            let (slot_key, data) = slot.load();
            let Some((existing, existing_generation)) = unpack(data) else {
                slot.write(key, pack(entry, generation));
                return;
            };
            if slot_key == key {
                if entry.depth >= existing.depth || entry.bound == Bound::Exact {
                    let mut entry = entry;
                    if entry.best_move.is_none() {
                        entry.best_move = existing.best_move;
                    }
                    slot.write(key, pack(entry, generation));
                }
                return;
            }
            let priority = replacement_priority(existing, existing_generation, generation);
            if priority < victim_priority {
                victim_priority = priority;
                victim = slot;
            }
        }
        victim.write(key, pack(entry, generation));
    }

    /// Permille of a sample of slots written during the current search.
    pub fn hashfull(&self) -> u32 {
        let generation = self.generation.load(Ordering::Relaxed);
        let sample = self.buckets.iter().take(250).flatten();
        let mut total = 0u32;
        let mut used = 0u32;
        for slot in sample {
            total += 1;
            if let Some((_, slot_generation)) = unpack(slot.load().1) {
                if slot_generation == generation {
                    used += 1;
                }
            }
        }
        if total == 0 {
            0
        } else {
            used * 1000 / total
        }
    }
}

#[inline]
fn replacement_priority(entry: TTEntry, generation: u8, current_generation: u8) -> i32 {
    let age = i32::from(current_generation.wrapping_sub(generation) & GENERATION_MASK);
    let bound_bonus = match entry.bound {
        Bound::Exact => 8,
        Bound::Lower | Bound::Upper => 4,
    };
    entry.depth * 16 + bound_bonus - age * 48
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(depth: i32, score: i32, bound: Bound, best_move: Move) -> TTEntry {
        TTEntry {
            best_move,
            score: Score(score),
            depth,
            bound,
        }
    }

    #[test]
    fn store_and_probe_round_trip() {
        let tt = TranspositionTable::new_with_mb(1);
        let stored = entry(5, -31_500, Bound::Exact, Move::new(12, 28));
        tt.store(123, stored);
        assert_eq!(tt.probe(123), Some(stored));
        assert_eq!(tt.probe(124), None);
    }

    #[test]
    fn size_is_a_power_of_two_within_budget() {
        let tt = TranspositionTable::new_with_mb(3);
        assert!(tt.len().is_power_of_two());
        assert!(tt.len() * 16 <= 3 * 1024 * 1024);
    }

    #[test]
    fn hash_option_sizes_the_table() {
        let mut config = EngineConfig::default();
        config.set_option("Hash", "2").expect("valid option");
        let tt = TranspositionTable::from_config(&config);
        assert_eq!(tt.len(), TranspositionTable::new_with_mb(2).len());
        assert!(tt.len() > TranspositionTable::new_with_mb(1).len());
    }

    #[test]
    fn same_key_depth_preferred_replacement() {
        let tt = TranspositionTable::new_with_mb(1);
        let key = 555;
        tt.store(key, entry(4, 1, Bound::Upper, Move::new(1, 2)));
        tt.store(key, entry(1, 9, Bound::Lower, Move::NONE));
        assert_eq!(tt.probe(key).map(|e| e.score), Some(Score(1)));

        tt.store(key, entry(6, 3, Bound::Lower, Move::NONE));
        let got = tt.probe(key).expect("exists");
        assert_eq!(got.depth, 6);
        assert_eq!(got.score, Score(3));
        assert_eq!(got.best_move, Move::new(1, 2));
    }

    #[test]
    fn full_bucket_evicts_shallowest_old_entry() {
        let tt = TranspositionTable::new_with_mb(1);
        let stride = (tt.bucket_mask + 1) as u64;
        for i in 0..4u64 {
            tt.store(7 + i * stride, entry(10 + i as i32, 0, Bound::Exact, Move::NONE));
        }
        tt.new_generation();
        tt.store(7 + 4 * stride, entry(1, 0, Bound::Upper, Move::NONE));
        assert!(tt.probe(7 + 4 * stride).is_some());
        assert!(tt.probe(7).is_none());
        assert!(tt.probe(7 + 3 * stride).is_some());
    }

    #[test]
    fn clear_and_hashfull() {
        let tt = TranspositionTable::new_with_mb(1);
        for key in 0..64u64 {
            tt.store(key, entry(3, 0, Bound::Exact, Move::NONE));
        }
        assert!(tt.hashfull() > 0);
        tt.clear();
        assert_eq!(tt.hashfull(), 0);
        assert_eq!(tt.probe(5), None);
    }

    #[test]
    fn concurrent_writers_never_yield_foreign_entries() {
        let tt = TranspositionTable::new_with_mb(1);
        std::thread::scope(|scope| {
            for worker in 0..4i32 {
                let tt = &tt;
                scope.spawn(move || {
                    for key in 0..10_000u64 {
                        let score = (key % 1000) as i32;
                        tt.store(key, entry(worker + 1, score, Bound::Exact, Move::NONE));
                    }
                });
            }
        });
        for key in 0..10_000u64 {
            if let Some(found) = tt.probe(key) {
                assert_eq!(found.score, Score((key % 1000) as i32));
            }
        }
    }
}
