//! Hierarchical bitmap with "first zero at or after" lookup.
//!
//! Level 0 stores one bit per slot in 64-bit words. Every level above stores
//! one bit per word of the level beneath it, set when that word is full. The
//! top level is a single word, so a lookup touches at most two words per level.
//!
//! Summary padding (bits past the end of the level beneath) is kept set, which
//! makes it look full and keeps lookups from descending into words that do not
//! exist.

const WORD_BITS: usize = 64;

#[derive(Debug, Clone)]
pub(crate) struct HierarchicalBitmap {
    levels: Vec<Vec<u64>>,
    ones: usize,
}

impl HierarchicalBitmap {
    /// Allocate a bitmap with room for at least `bits` slots, all clear.
    pub(crate) fn with_capacity(bits: usize) -> Self {
        let words = bits.div_ceil(WORD_BITS).max(1);
        let mut map = Self {
            levels: vec![vec![0; words]],
            ones: 0,
        };
        map.rebuild_summaries();
        map
    }

    pub(crate) fn capacity(&self) -> usize {
        self.levels[0].len() * WORD_BITS
    }

    pub(crate) fn count_ones(&self) -> usize {
        self.ones
    }

    pub(crate) fn get(&self, bit: usize) -> bool {
        self.levels[0]
            .get(bit / WORD_BITS)
            .is_some_and(|word| word & (1 << (bit % WORD_BITS)) != 0)
    }

    /// Set `bit`, returning whether it was previously clear.
    ///
    /// `bit` must be below `capacity()`.
    pub(crate) fn set(&mut self, bit: usize) -> bool {
        debug_assert!(bit < self.capacity());
        let mut idx = bit;
        for (depth, level) in self.levels.iter_mut().enumerate() {
            let word = &mut level[idx / WORD_BITS];
            let mask = 1u64 << (idx % WORD_BITS);
            if depth == 0 && *word & mask != 0 {
                return false;
            }
            *word |= mask;
            if *word != u64::MAX {
                break;
            }
            idx /= WORD_BITS;
        }
        self.ones += 1;
        true
    }

    /// Clear `bit`, returning whether it was previously set.
    pub(crate) fn clear(&mut self, bit: usize) -> bool {
        if bit >= self.capacity() {
            return false;
        }
        let mut idx = bit;
        for (depth, level) in self.levels.iter_mut().enumerate() {
            let word = &mut level[idx / WORD_BITS];
            let mask = 1u64 << (idx % WORD_BITS);
            if depth == 0 && *word & mask == 0 {
                return false;
            }
            let was_full = *word == u64::MAX;
            *word &= !mask;
            if !was_full {
                break;
            }
            idx /= WORD_BITS;
        }
        self.ones -= 1;
        true
    }

    /// Index of the first clear bit at or after `from`, if any.
    pub(crate) fn next_zero(&self, from: usize) -> Option<usize> {
        let mut level = 0;
        let mut idx = from;
        loop {
            let words = &self.levels[level];
            let w = idx / WORD_BITS;
            if w >= words.len() {
                return None;
            }
            let word = words[w] | low_mask(idx % WORD_BITS);
            if word != u64::MAX {
                let mut pos = w * WORD_BITS + (!word).trailing_zeros() as usize;
                for lower in self.levels[..level].iter().rev() {
                    pos = pos * WORD_BITS + (!lower[pos]).trailing_zeros() as usize;
                }
                return Some(pos);
            }
            // Whole word is taken: continue with the next word via the summary.
            if level + 1 == self.levels.len() {
                return None;
            }
            level += 1;
            idx = w + 1;
        }
    }

    /// Grow so that at least `bits` slots exist. Existing bits are preserved.
    ///
    /// Capacity doubles, but the doubling never goes past `ceiling` slots
    /// (rounded up to a whole word); `bits` itself always fits.
    pub(crate) fn grow_to(&mut self, bits: usize, ceiling: usize) {
        if bits <= self.capacity() {
            return;
        }
        let needed = bits.div_ceil(WORD_BITS);
        let words = (self.levels[0].len() * 2)
            .min(ceiling.div_ceil(WORD_BITS))
            .max(needed);
        self.levels[0].resize(words, 0);
        self.rebuild_summaries();
    }

    fn rebuild_summaries(&mut self) {
        self.levels.truncate(1);
        loop {
            let below = &self.levels[self.levels.len() - 1];
            if below.len() <= 1 {
                break;
            }
            let mut above = vec![0u64; below.len().div_ceil(WORD_BITS)];
            for (i, word) in below.iter().enumerate() {
                if *word == u64::MAX {
                    above[i / WORD_BITS] |= 1 << (i % WORD_BITS);
                }
            }
            let used = below.len() % WORD_BITS;
            if used != 0 {
                if let Some(last) = above.last_mut() {
                    *last |= u64::MAX << used;
                }
            }
            self.levels.push(above);
        }
    }
}

fn low_mask(bits: usize) -> u64 {
    (1u64 << bits) - 1
}
