// ============================================================
// Layer 4 - Proportional Batch Scheduler
// ============================================================
// Builds minibatches with a fixed minority:majority ratio out
// of a heavily skewed two-class pool (a few labeled positives
// against a large unlabeled pool).
//
// Per memory chunk:
//   1. shuffle the chunk
//   2. resolve the two slots {minority, majority} once
//      (tie: the first label seen is the minority)
//   3. minority_per_batch = max(1, ceil(|minority| * batch / |chunk|))
//      majority_per_batch = batch - minority_per_batch
//   4. draw minority_per_batch + majority_per_batch per step.
//      When the minority pool runs short, a reshuffled copy of
//      the whole minority set is appended and the cycle budget
//      shrinks by one; a spent budget ends the chunk and the
//      majority instances not yet drawn are dropped.
//   5. cut the sequence into batches of batch_size, the last
//      one may be short
//   6. with maximum_samples_per_batch, every batch is re-cut so
//      that (widest cost in batch) * (batch length) <= limit.
//      The fragment that does not fill a batch is carried into
//      the next one and flushed when the chunk ends.
//
// Batches are produced lazily, one chunk resident at a time.
// All randomness comes from the RNG handed in by the caller.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            rand crate documentation (SliceRandom)

use std::collections::VecDeque;
use std::fmt::Display;
use std::iter::Fuse;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("proportional batching supports exactly two labels, found: {}", labels.join(", "))]
    TooManyLabels { labels: Vec<String> },

    #[error("chunk of {chunk} instances only carries label '{label}': the minority class is empty")]
    MissingClass { label: String, chunk: usize },

    #[error("invalid batching configuration: {0}")]
    InvalidConfig(String),
}

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProportionalConfig {
    pub batch_size:                usize,
    /// Passes allowed over the minority class per chunk
    pub cycle_limit:               usize,
    /// Chunk size; None keeps the whole input resident
    pub max_instances_in_memory:   Option<usize>,
    /// Upper bound on padded cost per batch
    pub maximum_samples_per_batch: Option<usize>,
}

impl Default for ProportionalConfig {
    fn default() -> Self {
        Self {
            batch_size:                32,
            cycle_limit:               1,
            max_instances_in_memory:   None,
            maximum_samples_per_batch: None,
        }
    }
}

impl ProportionalConfig {
    pub fn new(batch_size: usize, cycle_limit: usize) -> Self {
        Self { batch_size, cycle_limit, ..Self::default() }
    }

    pub fn with_max_instances_in_memory(mut self, n: usize) -> Self {
        self.max_instances_in_memory = Some(n);
        self
    }

    pub fn with_maximum_samples_per_batch(mut self, limit: usize) -> Self {
        self.maximum_samples_per_batch = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.batch_size == 0 {
            return Err(BatchError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.cycle_limit == 0 {
            return Err(BatchError::InvalidConfig("cycle_limit must be at least 1".into()));
        }
        if self.max_instances_in_memory == Some(0) {
            return Err(BatchError::InvalidConfig("max_instances_in_memory must be at least 1".into()));
        }
        if self.maximum_samples_per_batch == Some(0) {
            return Err(BatchError::InvalidConfig("maximum_samples_per_batch must be at least 1".into()));
        }
        Ok(())
    }
}

// ─── Two-slot class split ─────────────────────────────────────────────────────
struct Classes<T> {
    minority: Vec<T>,
    majority: Vec<T>,
}

fn resolve_classes<T, L, K>(chunk: Vec<T>, key: &K) -> Result<Classes<T>, BatchError>
where
    K: Fn(&T) -> L,
    L: PartialEq + Display,
{
    let chunk_len = chunk.len();
    let mut slots: Vec<(L, Vec<T>)> = Vec::with_capacity(2);

    for item in chunk {
        let label = key(&item);
        match slots.iter().position(|(seen, _)| *seen == label) {
            Some(i) => slots[i].1.push(item),
            None if slots.len() < 2 => slots.push((label, vec![item])),
            None => {
                let mut labels: Vec<String> = slots.iter().map(|(l, _)| l.to_string()).collect();
                labels.push(label.to_string());
                return Err(BatchError::TooManyLabels { labels });
            }
        }
    }

    let mut slots = slots.into_iter();
    match (slots.next(), slots.next()) {
        (Some((_, first)), Some((_, second))) => Ok(if first.len() <= second.len() {
            Classes { minority: first, majority: second }
        } else {
            Classes { minority: second, majority: first }
        }),
        (Some((label, _)), None) => Err(BatchError::MissingClass {
            label: label.to_string(),
            chunk: chunk_len,
        }),
        _ => Err(BatchError::MissingClass { label: String::new(), chunk: 0 }),
    }
}

// ─── ProportionalBatches ──────────────────────────────────────────────────────
pub struct ProportionalBatches<I: Iterator, K, R> {
    source:      Fuse<I>,
    key:         K,
    rng:         R,
    config:      ProportionalConfig,
    sample_cost: Option<Box<dyn Fn(&I::Item) -> usize>>,
    ready:       VecDeque<Vec<I::Item>>,
    failed:      bool,
}

impl<I, K, L, R> ProportionalBatches<I, K, R>
where
    I: Iterator,
    I::Item: Clone,
    K: Fn(&I::Item) -> L,
    L: PartialEq + Display,
    R: Rng,
{
    pub fn new<S>(source: S, key: K, config: ProportionalConfig, rng: R) -> Result<Self, BatchError>
    where
        S: IntoIterator<IntoIter = I>,
    {
        config.validate()?;
        Ok(Self {
            source: source.into_iter().fuse(),
            key,
            rng,
            config,
            sample_cost: None,
            ready: VecDeque::new(),
            failed: false,
        })
    }

    /// Per-instance cost used by `maximum_samples_per_batch`
    /// (typically a padded sequence length). Without one every
    /// instance costs 1 and the limit caps the batch length.
    pub fn with_sample_cost(mut self, cost: impl Fn(&I::Item) -> usize + 'static) -> Self {
        self.sample_cost = Some(Box::new(cost));
        self
    }

    fn cost_of(&self, item: &I::Item) -> usize {
        self.sample_cost.as_ref().map_or(1, |cost| cost(item))
    }

    fn next_chunk(&mut self) -> Vec<I::Item> {
        match self.config.max_instances_in_memory {
            Some(n) => self.source.by_ref().take(n).collect(),
            None    => self.source.by_ref().collect(),
        }
    }

    /// Turn one chunk into ready-to-yield batches.
    fn schedule_chunk(&mut self, mut chunk: Vec<I::Item>) -> Result<(), BatchError> {
        chunk.shuffle(&mut self.rng);
        let total = chunk.len();
        let Classes { minority, majority } = resolve_classes(chunk, &self.key)?;

        let batch_size         = self.config.batch_size;
        let minority_per_batch = (minority.len() * batch_size).div_ceil(total).max(1);
        if minority_per_batch >= batch_size {
            return Err(BatchError::InvalidConfig(format!(
                "batch_size {batch_size} leaves no room for the majority class \
                 ({minority_per_batch} minority instances per batch)"
            )));
        }
        let majority_per_batch = batch_size - minority_per_batch;
        tracing::info!("Batching proportionally: {}:{}", minority_per_batch, majority_per_batch);

        // ── Interleave with minority replay ───────────────────────────────────
        let replay_source = minority.clone();
        let mut minority: VecDeque<I::Item> = minority.into();
        let mut majority = majority.into_iter();
        let mut budget   = self.config.cycle_limit;
        let mut ordered  = Vec::with_capacity(total);

        while majority.len() > 0 {
            if minority.len() < minority_per_batch {
                let mut replay = replay_source.clone();
                replay.shuffle(&mut self.rng);
                minority.extend(replay);
                budget -= 1;

                if budget == 0 {
                    tracing::debug!(
                        "Cycle limit reached: dropping {} majority instances from this chunk",
                        majority.len()
                    );
                    break;
                }
            }
            let take = minority_per_batch.min(minority.len());
            ordered.extend(minority.drain(..take));
            ordered.extend(majority.by_ref().take(majority_per_batch));
        }

        // ── Fixed-size slicing ────────────────────────────────────────────────
        let mut items  = ordered.into_iter();
        let mut excess = VecDeque::new();
        loop {
            let batch: Vec<I::Item> = items.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            match self.config.maximum_samples_per_batch {
                Some(limit) => self.limit_samples(batch, limit, &mut excess),
                None        => self.ready.push_back(batch),
            }
        }
        if !excess.is_empty() {
            self.ready.push_back(excess.into_iter().collect());
        }
        Ok(())
    }

    /// Re-cut `batch` (plus the carried fragment) so that padded
    /// cost stays within `limit`. The unfinished tail stays in
    /// `excess` for the next call.
    fn limit_samples(&mut self, batch: Vec<I::Item>, limit: usize, excess: &mut VecDeque<I::Item>) {
        excess.extend(batch);
        let mut current: Vec<I::Item> = Vec::new();
        let mut widest = 0usize;

        while let Some(item) = excess.pop_front() {
            let cost     = self.cost_of(&item);
            let proposed = current.len() + 1;
            let padded   = widest.max(cost) * proposed;

            if proposed <= self.config.batch_size && padded <= limit {
                widest = widest.max(cost);
                current.push(item);
                continue;
            }
            if current.is_empty() {
                tracing::warn!("Instance with cost {} exceeds the per-batch limit {}", cost, limit);
                self.ready.push_back(vec![item]);
                continue;
            }
            self.ready.push_back(std::mem::take(&mut current));
            widest = 0;
            excess.push_front(item);
        }
        excess.extend(current);
    }
}

impl<I, K, L, R> Iterator for ProportionalBatches<I, K, R>
where
    I: Iterator,
    I::Item: Clone,
    K: Fn(&I::Item) -> L,
    L: PartialEq + Display,
    R: Rng,
{
    type Item = Result<Vec<I::Item>, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(batch) = self.ready.pop_front() {
                return Some(Ok(batch));
            }
            if self.failed {
                return None;
            }
            let chunk = self.next_chunk();
            if chunk.is_empty() {
                return None;
            }
            if let Err(e) = self.schedule_chunk(chunk) {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }
}
