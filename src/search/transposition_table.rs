//! Fixed-size transposition table keyed by Zobrist hash.
//!
//! Direct-mapped slots with depth-preferred replacement. Each slot remembers
//! the search generation that last wrote or hit it, so entries left over
//! from earlier iterations can be evicted by shallower new ones.

use crate::moves::move_descriptions::Move;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Fail-high: the true score is at least `score`.
    Lower,
    /// Fail-low: the true score is at most `score`.
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTEntry {
    pub key: u64,
    pub depth: u8,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

impl TTEntry {
    /// Score usable as a cutoff at `depth` inside `(alpha, beta)`, if any.
    #[inline]
    pub fn cutoff_score(&self, depth: u8, alpha: i32, beta: i32) -> Option<i32> {
        if self.depth < depth {
            return None;
        }
        match self.bound {
            Bound::Exact => Some(self.score),
            Bound::Lower if self.score >= beta => Some(self.score),
            Bound::Upper if self.score <= alpha => Some(self.score),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TTStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    entry: TTEntry,
    generation: u8,
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    slots: Vec<Option<Slot>>,
    current_generation: u8,
    stats: TTStats,
}

impl TranspositionTable {
    const AGE_REPLACE_THRESHOLD: u8 = 4;
    const DEPTH_REPLACE_MARGIN: u8 = 2;

    pub fn new_with_mb(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let slot_size = std::mem::size_of::<Option<Slot>>().max(1);
        let count = (bytes / slot_size).max(1);
        Self {
            slots: vec![None; count],
            current_generation: 0,
            stats: TTStats::default(),
        }
    }

    /// Advance the generation; called once per iterative-deepening iteration.
    #[inline]
    pub fn new_generation(&mut self) {
        self.current_generation = self.current_generation.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.current_generation = 0;
        self.stats = TTStats::default();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> TTStats {
        self.stats
    }

    /// Occupancy in permille, sampled over the first thousand slots.
    pub fn hashfull(&self) -> u32 {
        let sample = self.slots.len().min(1_000);
        let used = self.slots[..sample]
            .iter()
            .filter(|slot| matches!(slot, Some(s) if s.generation == self.current_generation))
            .count();
        (used * 1_000 / sample.max(1)) as u32
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key % self.slots.len() as u64) as usize
    }

    pub fn probe(&mut self, key: u64) -> Option<TTEntry> {
        self.stats.probes += 1;
        let generation = self.current_generation;
        let idx = self.index(key);
        let slot = self.slots[idx].as_mut().filter(|s| s.entry.key == key)?;
        self.stats.hits += 1;
        slot.generation = generation;
        Some(slot.entry)
    }

    pub fn store(&mut self, entry: TTEntry) {
        self.stats.stores += 1;
        let idx = self.index(entry.key);
        let replace = match &self.slots[idx] {
            None => true,
            Some(existing) if existing.entry.key == entry.key => {
                entry.depth >= existing.entry.depth || entry.bound == Bound::Exact
            }
            Some(existing) => {
                let age = self.current_generation.wrapping_sub(existing.generation);
                age >= Self::AGE_REPLACE_THRESHOLD
                    || entry.depth.saturating_add(Self::DEPTH_REPLACE_MARGIN) >= existing.entry.depth
            }
        };

        if replace {
            // Keep the old move when the new result has none to offer.
            let best_move = entry.best_move.or_else(|| {
                self.slots[idx]
                    .filter(|s| s.entry.key == entry.key)
                    .and_then(|s| s.entry.best_move)
            });
            self.slots[idx] = Some(Slot {
                entry: TTEntry { best_move, ..entry },
                generation: self.current_generation,
            });
        }
    }
}
