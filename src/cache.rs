//! Position-indexed result cache.
//!
//! An open-addressed hash table keyed by input position, with Robin-Hood
//! probing. Each slot packs `(pos + 1, displacement)` into one 64-bit
//! word (the `+ 1` reserves zero for "empty") beside a parallel array of
//! results. `max_displacement` is maintained as an upper bound on any live
//! entry's probe distance, so lookups terminate after a bounded scan.
//! There is no removal; the owning token set clears the table wholesale.

use tracing::trace;

const INITIAL_SLOTS: usize = 1024;
const DISP_MASK: u64 = 0xFFFF_FFFF;

pub(crate) struct PosCache<V> {
    words: Vec<u64>,
    values: Vec<Option<V>>,
    live: usize,
    max_displacement: u64,
}

impl<V> PosCache<V> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(INITIAL_SLOTS)
    }

    pub(crate) fn with_capacity(slots: usize) -> Self {
        let slots = slots.next_power_of_two().max(2);
        Self {
            words: vec![0; slots],
            values: std::iter::repeat_with(|| None).take(slots).collect(),
            live: 0,
            max_displacement: 0,
        }
    }

    #[allow(dead_code)]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    fn slot_of(pos: usize, mask: usize) -> usize {
        // Fibonacci hashing; positions are dense, the multiply spreads
        // them across the table.
        (((pos as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize) & mask
    }

    fn pack(pos: usize) -> u64 {
        (pos as u64 + 1) << 32
    }

    pub(crate) fn get(&self, pos: usize) -> Option<&V> {
        let mask = self.words.len() - 1;
        let target = Self::pack(pos) >> 32;
        let mut index = Self::slot_of(pos, mask);
        for probed in 0..=self.max_displacement {
            let word = self.words[index];
            if word == 0 {
                return None;
            }
            if word >> 32 == target {
                return self.values[index].as_ref();
            }
            if (word & DISP_MASK) < probed {
                // Robin-Hood order: a richer resident means our entry
                // would have evicted it, so it is not here.
                return None;
            }
            index = (index + 1) & mask;
        }
        None
    }

    pub(crate) fn insert(&mut self, pos: usize, value: V) {
        if (self.live + 1) * 5 > self.words.len() * 4 {
            self.grow();
        }
        let mask = self.words.len() - 1;
        let mut index = Self::slot_of(pos, mask);
        let mut word = Self::pack(pos);
        let mut value = Some(value);
        loop {
            let resident = self.words[index];
            if resident == 0 {
                self.words[index] = word;
                self.values[index] = value;
                self.live += 1;
                self.max_displacement = self.max_displacement.max(word & DISP_MASK);
                return;
            }
            if resident >> 32 == word >> 32 {
                // Same position: last write wins.
                self.values[index] = value;
                return;
            }
            if (resident & DISP_MASK) < (word & DISP_MASK) {
                // Robin Hood: the poorer entry takes the slot, the
                // resident moves on.
                self.words[index] = word;
                std::mem::swap(&mut self.values[index], &mut value);
                self.max_displacement = self.max_displacement.max(word & DISP_MASK);
                word = resident;
            }
            word += 1;
            index = (index + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let slots = self.words.len() * 2;
        trace!(slots, "position cache grown");
        let old_words = std::mem::replace(&mut self.words, vec![0; slots]);
        let old_values = std::mem::replace(
            &mut self.values,
            std::iter::repeat_with(|| None).take(slots).collect(),
        );
        self.live = 0;
        // Displacements are relative to the table size; rehashing
        // invalidates them all, so the bound restarts from zero.
        self.max_displacement = 0;
        for (word, value) in old_words.into_iter().zip(old_values) {
            if word != 0 {
                let pos = (word >> 32) as usize - 1;
                let value = value.expect("internal error: live slot without a value");
                self.insert(pos, value);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.words.fill(0);
        for value in &mut self.values {
            *value = None;
        }
        self.live = 0;
        self.max_displacement = 0;
    }
}
