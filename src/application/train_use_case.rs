// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Parse the train / valid split specs   (Layer 4 - data)
//   Step 2: Build the vocabulary from train       (Layer 6 - infra)
//   Step 3: Read both splits into instances       (Layer 4 - data)
//   Step 4: Resolve the class prior               (Layer 6 - infra)
//   Step 5: Save the resolved config              (Layer 6 - infra)
//   Step 6: Run the epoch loop                    (Layer 5 - ml)
//
// The class prior π is the share of positives hidden in the
// unlabeled pool. When --prior is not given, the PU risks read
// it from the task's metadata.json (its `precision`,
// |UP| / |U|). The pn baseline only uses an explicit --prior,
// for class weighting, and is unweighted otherwise.
//
// The vocabulary is always rebuilt, and the epoch loop clears
// the previous run's weights and metrics, so a checkpoint
// directory only ever describes its latest run.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::PuDataset,
    proportional::ProportionalConfig,
    reader::{ReaderSpec, SplitReader},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    corpus_store::{read_metadata, read_split},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    loss::{LossKind, PnLoss, TrainingLoss},
    model::PuClassifierConfig,
    nnpu::NnPuLossConfig,
    trainer::{run_training, TrainingSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to repeat a run or rebuild the model for
// evaluation. Saved as train_config.json next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Reader spec of the training split, e.g. `task/train.jsonl?label=label`
    pub train:          String,
    pub valid:          String,
    pub checkpoint_dir: String,

    /// Class prior π. None = take it from the task metadata.
    pub prior:          Option<f64>,
    pub loss:           LossKind,
    pub beta:           f64,
    pub gamma:          f64,

    pub batch_size:                usize,
    pub cycle_limit:               usize,
    pub max_instances_in_memory:   Option<usize>,
    pub maximum_samples_per_batch: Option<usize>,

    pub epochs:         usize,
    pub lr:             f64,
    pub d_embed:        usize,
    pub d_hidden:       usize,
    pub dropout:        f64,
    pub vocab_size:     usize,
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train:          "data/tasks/train.jsonl?label=label".to_string(),
            valid:          "data/tasks/valid.jsonl?label=label&evaluation=true".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            prior:          None,
            loss:           LossKind::Nnpu,
            beta:           0.0,
            gamma:          1.0,
            batch_size:                32,
            cycle_limit:               1,
            max_instances_in_memory:   None,
            maximum_samples_per_batch: None,
            epochs:         10,
            lr:             1e-3,
            d_embed:        128,
            d_hidden:       128,
            dropout:        0.2,
            vocab_size:     30000,
            seed:           42,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> PuClassifierConfig {
        PuClassifierConfig::new(self.vocab_size)
            .with_d_embed(self.d_embed)
            .with_d_hidden(self.d_hidden)
            .with_dropout(self.dropout)
    }

    pub fn training_loss(&self) -> Result<TrainingLoss> {
        if self.loss == LossKind::Pn {
            return Ok(TrainingLoss::Pn(PnLoss::new(self.prior)?));
        }
        let prior = self
            .prior
            .with_context(|| format!("The {} loss needs a class prior", self.loss))?;
        let risk = NnPuLossConfig::new(prior)
            .with_beta(self.beta)
            .with_gamma(self.gamma)
            .with_nnpu(self.loss == LossKind::Nnpu)
            .init()?;
        Ok(TrainingLoss::Pu(risk))
    }

    pub fn batching(&self) -> ProportionalConfig {
        ProportionalConfig {
            batch_size:                self.batch_size,
            cycle_limit:               self.cycle_limit,
            max_instances_in_memory:   self.max_instances_in_memory,
            maximum_samples_per_batch: self.maximum_samples_per_batch,
        }
    }
}

/// Titles and abstracts of a persisted split, the vocabulary source
fn split_texts(path: &Path) -> Result<Vec<String>> {
    let docs = read_split(path)?;
    Ok(docs
        .into_iter()
        .flat_map(|d| [d.document.title, d.document.abstract_text])
        .collect())
}

/// π from `metadata.json` in the split's task directory
fn prior_from_metadata(split_path: &Path) -> Result<f64> {
    let dir = split_path
        .parent()
        .with_context(|| format!("'{}' has no task directory", split_path.display()))?;
    let md = read_metadata(dir)?;
    tracing::info!("Using class prior {:.6} from '{}'", md.precision, dir.display());
    Ok(md.precision)
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainingSummary> {
        let mut cfg = self.config.clone();

        // ── Step 1: split specs ──────────────────────────────────────────────
        let train_spec: ReaderSpec = cfg
            .train
            .parse()
            .with_context(|| format!("Invalid train split '{}'", cfg.train))?;
        let valid_spec: ReaderSpec = cfg
            .valid
            .parse()
            .with_context(|| format!("Invalid valid split '{}'", cfg.valid))?;

        // ── Step 2: vocabulary ───────────────────────────────────────────────
        let ckpt      = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let texts     = split_texts(&train_spec.path)?;
        let tokenizer = TokenizerStore::new(ckpt.dir()).build(&texts, cfg.vocab_size)?;
        cfg.vocab_size = tokenizer.get_vocab_size(true);
        tracing::info!("Vocabulary size: {}", cfg.vocab_size);

        // ── Step 3: instances ────────────────────────────────────────────────
        let (train, _) = SplitReader::new(train_spec.clone(), &tokenizer).read()?;
        let (valid, _) = SplitReader::new(valid_spec, &tokenizer).read()?;
        log_split("train", &train);
        log_split("valid", &valid);

        // ── Step 4: class prior ──────────────────────────────────────────────
        if cfg.prior.is_none() && cfg.loss.needs_prior() {
            cfg.prior = Some(prior_from_metadata(&train_spec.path)?);
        }
        let loss = cfg.training_loss()?;
        tracing::info!("Objective: {}", loss);

        // ── Step 5: config for evaluation ────────────────────────────────────
        ckpt.save_config(&cfg)?;

        // ── Step 6: epoch loop (Layer 5) ─────────────────────────────────────
        run_training(&cfg, loss, &train, &valid, &ckpt)
    }
}

fn log_split(name: &str, dataset: &PuDataset) {
    let (positives, unlabeled) = dataset.label_counts();
    tracing::info!("{} split: {} labeled, {} unlabeled", name, positives, unlabeled);
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batching_carries_scheduler_fields() {
        let cfg = TrainConfig {
            batch_size: 16,
            cycle_limit: 3,
            maximum_samples_per_batch: Some(4000),
            ..TrainConfig::default()
        };
        let batching = cfg.batching();
        assert_eq!(batching.batch_size, 16);
        assert_eq!(batching.cycle_limit, 3);
        assert_eq!(batching.max_instances_in_memory, None);
        assert_eq!(batching.maximum_samples_per_batch, Some(4000));
        assert!(batching.validate().is_ok());
    }

    #[test]
    fn test_pu_losses_need_a_prior() {
        let cfg = TrainConfig::default();
        assert!(cfg.training_loss().is_err());
        assert!(TrainConfig { loss: LossKind::Upu, ..cfg.clone() }.training_loss().is_err());

        let cfg  = TrainConfig { prior: Some(0.3), beta: 0.1, loss: LossKind::Upu, ..cfg };
        let loss = cfg.training_loss().unwrap();
        assert_eq!(loss.kind(), LossKind::Upu);
        let TrainingLoss::Pu(risk) = loss else { panic!("expected a PU risk") };
        assert_eq!(risk.prior(), 0.3);
        assert!(!risk.non_negative());

        let bad = TrainConfig { gamma: 2.0, loss: LossKind::Nnpu, ..cfg };
        assert!(bad.training_loss().is_err());
    }

    #[test]
    fn test_pn_baseline_weights_only_with_a_prior() {
        let cfg = TrainConfig { loss: LossKind::Pn, ..TrainConfig::default() };
        let TrainingLoss::Pn(plain) = cfg.training_loss().unwrap() else { panic!("expected pn") };
        assert_eq!(plain.weights(), None);

        let cfg = TrainConfig { prior: Some(0.25), ..cfg };
        let TrainingLoss::Pn(weighted) = cfg.training_loss().unwrap() else { panic!("expected pn") };
        assert_eq!(weighted.weights(), Some([0.25, 0.75]));
    }

    #[test]
    fn test_prior_read_from_task_metadata() {
        use crate::data::corpus::{assemble_splits, CorpusBuilder};
        use crate::domain::document::Document;
        use crate::domain::query::{Conjunction, MinimumShouldMatch};
        use crate::infra::{corpus_store::CorpusStore, memory_index::MemoryIndex};
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;

        let mut docs = Vec::new();
        for i in 0..20 {
            docs.push(Document::new(format!("p{i}"), "heart repair", format!("stem cells {i}"), ["D1", "D2"]));
            docs.push(Document::new(format!("n{i}"), "heart failure", format!("stem cells {i}"), ["D1"]));
        }
        let index = MemoryIndex::new(docs);
        let conj  = Conjunction::new(["D1", "D2"]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let task = CorpusBuilder::new(&index)
            .build_pu_task(&conj, 8, MinimumShouldMatch::Count(2), &mut rng)
            .unwrap();
        let corpus = assemble_splits(task, &conj, vec!["A".into(), "B".into()], None, &mut rng).unwrap();

        let root  = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(root.path());
        let dir   = store.task_dir(4, 10, &conj);
        store.write(&dir, &corpus).unwrap();

        let prior = prior_from_metadata(&dir.join("train.jsonl")).unwrap();
        assert_eq!(prior, corpus.metadata.precision);
        assert!(prior > 0.0 && prior < 1.0);

        let texts = split_texts(&dir.join("train.jsonl")).unwrap();
        assert_eq!(texts.len(), 2 * corpus.split.train.len());
    }
}
