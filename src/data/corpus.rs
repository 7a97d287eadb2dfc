// ============================================================
// Layer 4 - PU Corpus Constructor
// ============================================================
// Turns a MeSH conjunction into a PU benchmark task.
//
// build_pu_task:
//   1. P  = every document admitting the conjunction (AND match)
//   2. shuffle P together with its compact references
//   3. LP = first `target_labeled` documents of P
//   4. U  = more-like-this over LP's references. U is biased
//           towards text that resembles the known positives,
//           the way a real unlabeled pool would be.
//
// assemble_splits:
//   1. shuffle LP and U independently
//   2. LP -> 50/25/25, label = label_true = positive
//   3. U  -> UP (conjunction ⊆ mesh_set) and N (the rest),
//            label = unlabeled, label_true from membership
//   4. UP and N -> 50/25/25 each, recombined per split,
//            every split reshuffled
//   5. precision = |UP| / |U|, recall = |UP| / (|P| - |LP|)
//
// Every shuffle uses the caller's RNG, so a fixed seed gives
// identical tasks across runs.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::data::scroll::{Scroll, DEFAULT_PAGE_SIZE};
use crate::data::splitter::{split_stratum, Splits};
use crate::domain::corpus::{CorpusMetadata, CorpusSplit, PuCorpus};
use crate::domain::document::{DocRef, Document, LabeledDocument, PuLabel, RetrievedDocument};
use crate::domain::query::{Conjunction, MinimumShouldMatch, Query};
use crate::domain::traits::{SearchError, SearchIndex};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("no indexed document admits the conjunction {0}")]
    NoPositives(String),

    /// A corpus statistic has a zero denominator: the task is unusable
    #[error("cannot compute {ratio}: {numerator} / {denominator} (degenerate corpus)")]
    DegenerateRatio {
        ratio:       &'static str,
        numerator:   usize,
        denominator: usize,
    },
}

/// Raw material of a PU task before splitting.
#[derive(Debug, Clone)]
pub struct PuTask {
    /// Labeled positives (LP)
    pub labeled:             Vec<Document>,
    /// Unlabeled pool (U) with retrieval score and rank
    pub unlabeled:           Vec<RetrievedDocument>,
    /// |P|, the size of the full positive set
    pub true_positive_count: usize,
}

// ─── CorpusBuilder ────────────────────────────────────────────────────────────
pub struct CorpusBuilder<'a, S: SearchIndex + ?Sized> {
    index:     &'a S,
    page_size: usize,
}

impl<'a, S: SearchIndex + ?Sized> CorpusBuilder<'a, S> {
    pub fn new(index: &'a S) -> Self {
        Self { index, page_size: DEFAULT_PAGE_SIZE }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Lazily retrieve every document matching `query`.
    pub fn scroll(&self, query: &Query) -> Result<Scroll<'a, S>, SearchError> {
        Scroll::open(self.index, query, self.page_size)
    }

    pub fn build_pu_task<R: Rng + ?Sized>(
        &self,
        conjunction:          &Conjunction,
        target_labeled:       usize,
        minimum_should_match: MinimumShouldMatch,
        rng:                  &mut R,
    ) -> Result<PuTask, CorpusError> {
        // ── Step 1: full positive set P ───────────────────────────────────────
        let mut positives: Vec<RetrievedDocument> = self
            .scroll(&Query::conjunction(conjunction))?
            .collect::<Result<_, _>>()?;
        let true_positive_count = positives.len();
        tracing::info!("Size of P: {}", true_positive_count);

        if positives.is_empty() {
            return Err(CorpusError::NoPositives(conjunction.to_string()));
        }
        if target_labeled >= true_positive_count {
            tracing::warn!(
                "Requested {} labeled positives but P only has {}: no hidden positives will remain",
                target_labeled,
                true_positive_count
            );
        }

        // ── Steps 2-3: documents and references shuffle as pairs ──────────────
        positives.shuffle(rng);
        positives.truncate(target_labeled);

        let (labeled, seeds): (Vec<Document>, Vec<DocRef>) = positives
            .into_iter()
            .map(|r| (r.document, r.reference))
            .unzip();
        tracing::info!("Size of LP: {}", labeled.len());

        // ── Step 4: retrieval-biased unlabeled pool U ─────────────────────────
        let unlabeled: Vec<RetrievedDocument> = self
            .scroll(&Query::similarity(&seeds, minimum_should_match))?
            .collect::<Result<_, _>>()?;
        tracing::info!("Size of U: {}", unlabeled.len());

        Ok(PuTask { labeled, unlabeled, true_positive_count })
    }
}

// ─── Split assembly ───────────────────────────────────────────────────────────
/// `numerator / denominator`, refusing a zero denominator
fn ratio(name: &'static str, numerator: usize, denominator: usize) -> Result<f64, CorpusError> {
    if denominator == 0 {
        return Err(CorpusError::DegenerateRatio { ratio: name, numerator, denominator });
    }
    Ok(numerator as f64 / denominator as f64)
}

fn count_labeled(docs: &[LabeledDocument]) -> usize {
    docs.iter().filter(|d| d.label == PuLabel::Positive).count()
}

pub fn assemble_splits<R: Rng + ?Sized>(
    task:          PuTask,
    conjunction:   &Conjunction,
    mesh_names:    Vec<String>,
    u_target_size: Option<usize>,
    rng:           &mut R,
) -> Result<PuCorpus, CorpusError> {
    let PuTask { mut labeled, mut unlabeled, true_positive_count } = task;
    labeled.shuffle(rng);
    unlabeled.shuffle(rng);

    let lp_size = labeled.len();
    let u_size  = unlabeled.len();

    // ── LP: positive by construction ─────────────────────────────────────────
    let lp_splits = split_stratum(
        labeled.into_iter().map(LabeledDocument::labeled_positive).collect(),
    );

    // ── U: ground truth from conjunction membership only ─────────────────────
    let (hidden, negatives): (Vec<LabeledDocument>, Vec<LabeledDocument>) = unlabeled
        .into_iter()
        .map(|r| LabeledDocument::unlabeled(r, conjunction))
        .partition(|d| d.label_true == PuLabel::Positive);
    let up_size = hidden.len();

    tracing::info!("Number of positives in U: {}", up_size);
    tracing::info!("Size of P in dataset: {}", lp_size + up_size);

    let precision = ratio("precision", up_size, u_size)?;
    let recall    = ratio("recall", up_size, true_positive_count.saturating_sub(lp_size))?;
    tracing::info!("Recall: {recall:.4}, Precision: {precision:.4}");

    // ── Stratified recombination ─────────────────────────────────────────────
    let mut splits: Splits<LabeledDocument> = Splits::default();
    splits.absorb(lp_splits);
    splits.absorb(split_stratum(hidden));
    splits.absorb(split_stratum(negatives));
    splits.shuffle(rng);

    let Splits { train, valid, test } = splits;

    let train_lp_size = count_labeled(&train);
    let valid_lp_size = count_labeled(&valid);
    let test_lp_size  = count_labeled(&test);

    let metadata = CorpusMetadata {
        p_size:   true_positive_count,
        lp_size,
        u_size,
        up_size,
        u_target_size,

        train_lp_size,
        train_u_size: train.len() - train_lp_size,
        valid_lp_size,
        valid_u_size: valid.len() - valid_lp_size,
        test_lp_size,
        test_u_size:  test.len() - test_lp_size,

        train_size: train.len(),
        valid_size: valid.len(),
        test_size:  test.len(),

        precision,
        recall,

        mesh_conjunction:     conjunction.terms().to_vec(),
        mesh_conjunction_str: mesh_names,
    };

    Ok(PuCorpus { split: CorpusSplit { train, valid, test }, metadata })
}
