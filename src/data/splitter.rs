// ============================================================
// Layer 4 - Train/Valid/Test Splitter
// ============================================================
// Cuts one stratum (LP, hidden positives UP, or negatives N)
// into train / valid / test at 50% / 25% / 25%.
//
//   train = floor(n * 0.50)
//   valid = floor(n * 0.25)
//   test  = everything else (absorbs the rounding remainder)
//
// Splitting each stratum on its own keeps the LP : UP : N mix
// of every split close to the corpus-wide mix. The caller is
// responsible for shuffling before the cut; this module only
// slices, so the same input always gives the same split.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation (SliceRandom)

use rand::seq::SliceRandom;
use rand::Rng;

/// Three disjoint partitions of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splits<T> {
    pub train: Vec<T>,
    pub valid: Vec<T>,
    pub test:  Vec<T>,
}

impl<T> Default for Splits<T> {
    fn default() -> Self {
        Self { train: Vec::new(), valid: Vec::new(), test: Vec::new() }
    }
}

impl<T> Splits<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.valid.len() + self.test.len()
    }

    /// Append another stratum split-by-split
    pub fn absorb(&mut self, other: Splits<T>) {
        self.train.extend(other.train);
        self.valid.extend(other.valid);
        self.test.extend(other.test);
    }

    /// Shuffle each split independently so strata are interleaved
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.train.shuffle(rng);
        self.valid.shuffle(rng);
        self.test.shuffle(rng);
    }
}

/// Slice `items` at 50/25/25 with integer truncation.
pub fn split_stratum<T>(mut items: Vec<T>) -> Splits<T> {
    let total      = items.len();
    let train_size = total / 2;
    let valid_size = total / 4;

    // split_off(n) keeps [0..n) and returns [n..)
    let mut rest = items.split_off(train_size);
    let test     = rest.split_off(valid_size);

    tracing::debug!(
        "Stratum of {} split into {} / {} / {}",
        total,
        items.len(),
        rest.len(),
        test.len()
    );

    Splits { train: items, valid: rest, test }
}
