// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Scores PU instances with a trained classifier.
//
// A document is predicted positive when its logit is > 0
// (sigmoid > 0.5). Every prediction is counted twice:
//
//   against_true  - vs label_true, the metric that matters:
//                   how many hidden positives in U are found
//   against_noisy - vs the noisy label the model was trained
//                   on; high agreement here with low recall
//                   above means the model only learned LP
//
// Batches are plain consecutive slices. Proportional
// scheduling is a training-time concern only.
//
// Reference: Burn Book §5 (Inference)

use anyhow::{anyhow, Result};
use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::PuBatcher, dataset::{PuDataset, PuInstance}};
use crate::infra::{checkpoint::CheckpointManager, metrics::BinaryCounts, tokenizer_store::TokenizerStore};
use crate::ml::model::PuClassifier;
use crate::ml::loss::TrainingLoss;

/// Aggregate result of scoring one set of instances
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Mean training objective over the scoring batches
    pub loss:          f64,
    pub against_true:  BinaryCounts,
    pub against_noisy: BinaryCounts,
}

pub fn score_instances<B: Backend>(
    model:      &PuClassifier<B>,
    instances:  &[PuInstance],
    batch_size: usize,
    loss:       &TrainingLoss,
    device:     &B::Device,
) -> Result<Evaluation> {
    let batcher = PuBatcher::<B>::new(device.clone());
    let mut eval     = Evaluation::default();
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;

    for items in instances.chunks(batch_size.max(1)) {
        let batch  = batcher.batch(items);
        let logits = model.forward(&batch);

        let step = loss.forward(logits.clone(), batch.labels);
        loss_sum += step.objective.into_scalar().elem::<f64>();
        batches  += 1;

        let logits: Vec<f32> = logits
            .into_data()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;

        for (logit, instance) in logits.iter().zip(items) {
            let predicted = *logit > 0.0;
            eval.against_true.record(predicted, instance.label_true.is_positive());
            eval.against_noisy.record(predicted, instance.label.is_positive());
        }
    }

    eval.loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
    Ok(eval)
}

// ─── Scorer ───────────────────────────────────────────────────────────────────
/// A checkpointed classifier with the vocabulary and loss it was trained with
pub struct Scorer<B: Backend> {
    model:     PuClassifier<B>,
    tokenizer: Tokenizer,
    config:    TrainConfig,
    loss:      TrainingLoss,
    device:    B::Device,
}

impl<B: Backend> Scorer<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let config    = ckpt.load_config()?;
        let tokenizer = TokenizerStore::new(ckpt.dir()).load()?;
        let loss      = config.training_loss()?;

        let model = config.model_config().init::<B>(&device);
        let model = ckpt.load_model(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt.dir().display());

        Ok(Self { model, tokenizer, config, loss, device })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn score(&self, dataset: &PuDataset, batch_size: usize) -> Result<Evaluation> {
        score_instances(&self.model, dataset.instances(), batch_size, &self.loss, &self.device)
    }
}
