// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Scores a persisted split with the checkpoint selected by
// CheckpointManager (best validation F1, else latest epoch),
// using the vocabulary and prior saved at training time.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::reader::{ReaderSpec, SplitReader};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{Evaluation, Scorer};

type EvalBackend = burn::backend::Wgpu;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    pub checkpoint_dir: String,
    /// Reader spec of the split to score
    pub split:          String,
    pub batch_size:     usize,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Evaluation> {
        let cfg = &self.config;
        let spec: ReaderSpec = cfg
            .split
            .parse()
            .with_context(|| format!("Invalid split '{}'", cfg.split))?;

        let ckpt   = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let device = burn::backend::wgpu::WgpuDevice::default();
        let scorer = Scorer::<EvalBackend>::from_checkpoint(&ckpt, device)?;
        tracing::info!(
            "Checkpoint trained on '{}' with prior {:?}",
            scorer.config().train,
            scorer.config().prior
        );

        let (dataset, _) = SplitReader::new(spec, scorer.tokenizer()).read()?;
        scorer.score(&dataset, cfg.batch_size)
    }
}
