// ============================================================
// Layer 5 - Training Loop
// ============================================================
// PU training with proportional batches and Adam.
//
// Before the first epoch the checkpoint directory is cleared of
// an earlier run's weights, epoch markers and metrics.csv.
//
// Per epoch:
//   1. ProportionalBatches re-schedules the whole train split
//      with a fresh ChaCha8 stream seeded by seed + epoch, so
//      every epoch sees a different but reproducible order
//   2. forward → objective → backward → Adam step
//   3. model.valid() scores the valid split (no dropout, no
//      autodiff graph) against label_true
//   4. weights saved; best_epoch.json moves when F1 improves;
//      one metrics CSV row appended
//
// Key Burn 0.20 insight:
//   - Training runs on an AutodiffBackend (Autodiff<Wgpu>)
//   - model.valid() returns the model on its InnerBackend
//   - Validation batches must be built on that inner backend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::PuBatcher,
    dataset::{PuDataset, PuInstance},
    proportional::ProportionalBatches,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::inferencer::score_instances;
use crate::ml::model::PuClassifier;
use crate::ml::loss::TrainingLoss;

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Outcome of a full run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub epochs:     usize,
    /// None when validation F1 never rose above 0
    pub best_epoch: Option<usize>,
    pub best_f1:    f64,
}

pub fn run_training(
    cfg:   &TrainConfig,
    loss:  TrainingLoss,
    train: &PuDataset,
    valid: &PuDataset,
    ckpt:  &CheckpointManager,
) -> Result<TrainingSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, loss, train, valid, ckpt, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    loss:   TrainingLoss,
    train:  &PuDataset,
    valid:  &PuDataset,
    ckpt:   &CheckpointManager,
    device: B::Device,
) -> Result<TrainingSummary> {
    ckpt.clear_run()?;

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: PuClassifier<B> = cfg.model_config().init(&device);
    tracing::info!(
        "Model ready: vocab={}, d_embed={}, d_hidden={}, loss={}",
        cfg.vocab_size, cfg.d_embed, cfg.d_hidden, loss
    );

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let batcher  = PuBatcher::<B>::new(device.clone());
    let batching = cfg.batching();
    let logger   = MetricsLogger::new(ckpt.dir())?;

    let mut summary = TrainingSummary { epochs: cfg.epochs, best_epoch: None, best_f1: 0.0 };

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(epoch as u64));
        let mut batches = ProportionalBatches::new(
            train.instances().iter().cloned(),
            |instance: &PuInstance| instance.label,
            batching.clone(),
            rng,
        )?;
        if batching.maximum_samples_per_batch.is_some() {
            batches = batches.with_sample_cost(PuInstance::padded_length);
        }

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum    = 0.0f64;
        let mut train_batches     = 0usize;
        let mut corrected_batches = 0usize;

        for items in batches {
            let items  = items?;
            let batch  = batcher.batch(&items);
            let logits = model.forward(&batch);
            let step   = loss.forward(logits, batch.labels);

            train_loss_sum += step.objective.clone().into_scalar().elem::<f64>();
            train_batches  += 1;
            if step.corrected {
                corrected_batches += 1;
            }

            let grads = step.objective.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let eval = score_instances(&model.valid(), valid.instances(), cfg.batch_size, &loss, &device)?;

        let metrics = EpochMetrics {
            epoch,
            train_loss,
            val_loss: eval.loss,
            counts:   eval.against_true,
            corrected_batches,
        };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | P={:.3} R={:.3} F1={:.3} | corrected {}/{}",
            epoch, cfg.epochs, train_loss, eval.loss,
            metrics.counts.precision(), metrics.counts.recall(), metrics.counts.f1(),
            corrected_batches, train_batches,
        );

        ckpt.save_model(&model, epoch)?;
        if metrics.is_improvement(summary.best_f1) {
            summary.best_f1    = metrics.counts.f1();
            summary.best_epoch = Some(epoch);
            ckpt.mark_best(epoch)?;
            tracing::info!("New best validation F1 {:.4} at epoch {}", summary.best_f1, epoch);
        }
        logger.log(&metrics)?;
    }

    tracing::info!("Training complete!");
    Ok(summary)
}
