#![forbid(unsafe_code)]

//! Growable bit vector used for index marking.
//!
//! A flat `Vec<u64>` bitset: dense, amortized O(1) growth on `set`, and
//! word-at-a-time scans for the nearest set bit in either direction.
//! [`ObservableVec::remove_where`](crate::ObservableVec::remove_where) marks
//! doomed indices here and then sweeps them highest-first so earlier removals
//! never shift later marks.

const WORD_BITS: usize = u64::BITS as usize;

/// A growable bitset over `usize` indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Set bit `i`, growing the backing storage as needed.
    pub fn set(&mut self, i: usize) {
        let word = i / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (i % WORD_BITS);
    }

    /// Clear bit `i`. Out-of-range bits are already clear.
    pub fn clear_bit(&mut self, i: usize) {
        let word = i / WORD_BITS;
        if word < self.words.len() {
            self.words[word] &= !(1u64 << (i % WORD_BITS));
        }
    }

    /// Whether bit `i` is set.
    #[must_use]
    pub fn test(&self, i: usize) -> bool {
        let word = i / WORD_BITS;
        word < self.words.len() && self.words[word] & (1u64 << (i % WORD_BITS)) != 0
    }

    /// Highest set bit at or before `k`, if any.
    #[must_use]
    pub fn prev_set_bit(&self, k: usize) -> Option<usize> {
        let mut word = (k / WORD_BITS).min(self.words.len().saturating_sub(1));
        if self.words.is_empty() {
            return None;
        }
        // Mask off bits above k in the starting word.
        let mut bits = self.words[word];
        if word == k / WORD_BITS {
            let offset = k % WORD_BITS;
            if offset < WORD_BITS - 1 {
                bits &= (1u64 << (offset + 1)) - 1;
            }
        }
        loop {
            if bits != 0 {
                let top = WORD_BITS - 1 - bits.leading_zeros() as usize;
                return Some(word * WORD_BITS + top);
            }
            if word == 0 {
                return None;
            }
            word -= 1;
            bits = self.words[word];
        }
    }

    /// Lowest set bit at or after `k`, if any.
    #[must_use]
    pub fn next_set_bit(&self, k: usize) -> Option<usize> {
        let start = k / WORD_BITS;
        for word in start..self.words.len() {
            let mut bits = self.words[word];
            if word == start {
                bits &= !0u64 << (k % WORD_BITS);
            }
            if bits != 0 {
                return Some(word * WORD_BITS + bits.trailing_zeros() as usize);
            }
        }
        None
    }

    /// Number of set bits.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}
