// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores classifier weights with Burn's
// CompactRecorder, plus the JSON needed to rebuild the model.
//
//   checkpoints/
//     model_epoch_1.mpk     weights after epoch 1
//     model_epoch_2.mpk
//     ...
//     latest_epoch.json     number of the last saved epoch
//     best_epoch.json       epoch with the best validation F1
//     train_config.json     hyperparameters and vocabulary size
//     tokenizer.json        (written by TokenizerStore)
//
// Loading prefers best_epoch.json and falls back to the latest
// epoch when no epoch was ever marked best.
//
// A new training run starts with clear_run(): weights, epoch
// markers and metrics.csv of an earlier run in the same
// directory are removed so they can never be mistaken for the
// new run's output.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::infra::metrics::METRICS_FILE;
use crate::ml::model::PuClassifier;

const LATEST: &str = "latest_epoch.json";
const BEST: &str   = "best_epoch.json";
const CONFIG: &str = "train_config.json";
const MODEL_PREFIX: &str = "model_epoch_";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every artifact of a previous run. Returns how many files went.
    pub fn clear_run(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read checkpoint directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let stale = name == LATEST
                || name == BEST
                || name == METRICS_FILE
                || (name.starts_with(MODEL_PREFIX) && name.ends_with(".mpk"));
            if stale && path.is_file() {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove stale '{}'", path.display()))?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::warn!("Removed {} files of a previous run from '{}'", removed, self.dir.display());
        }
        Ok(removed)
    }

    fn write_epoch(&self, file: &str, epoch: usize) -> Result<()> {
        fs::write(self.dir.join(file), serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {file}"))
    }

    fn read_epoch(&self, file: &str) -> Result<Option<usize>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str::<usize>(&s)?))
    }

    pub fn save_model<B: Backend>(&self, model: &PuClassifier<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("{MODEL_PREFIX}{epoch}"));
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_epoch(LATEST, epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        self.write_epoch(BEST, epoch)
    }

    /// Epoch whose weights `load_model` restores
    pub fn selected_epoch(&self) -> Result<usize> {
        match self.read_epoch(BEST)? {
            Some(epoch) => Ok(epoch),
            None => self
                .read_epoch(LATEST)?
                .context("No checkpoint found. Have you run 'train' first?"),
        }
    }

    /// `model` must have the architecture of the saved checkpoint.
    pub fn load_model<B: Backend>(&self, model: PuClassifier<B>, device: &B::Device) -> Result<PuClassifier<B>> {
        let epoch = self.selected_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'evaluate'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json).with_context(|| format!("Malformed config '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::PuClassifierConfig;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_best_epoch_wins_over_latest() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.selected_epoch().is_err());

        ckpt.write_epoch(LATEST, 3).unwrap();
        assert_eq!(ckpt.selected_epoch().unwrap(), 3);

        ckpt.mark_best(2).unwrap();
        assert_eq!(ckpt.selected_epoch().unwrap(), 2);
    }

    #[test]
    fn test_weights_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = PuClassifierConfig::new(10).with_d_embed(4).with_d_hidden(3);

        let trained: PuClassifier<B> = config.init(&device);
        ckpt.save_model(&trained, 1).unwrap();

        let restored = ckpt.load_model(config.init::<B>(&device), &device).unwrap();
        let a: Vec<f32> = trained.embedding.weight.val().into_data().to_vec().unwrap();
        let b: Vec<f32> = restored.embedding.weight.val().into_data().to_vec().unwrap();
        // CompactRecorder stores half precision
        assert_eq!(a.len(), b.len());
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() <= 1e-2 * x.abs().max(1.0)));
    }

    #[test]
    fn test_clear_run_forgets_the_previous_best() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: PuClassifier<B> = PuClassifierConfig::new(10).with_d_embed(2).with_d_hidden(2).init(&device);

        let first = CheckpointManager::new(dir.path()).unwrap();
        first.save_model(&model, 1).unwrap();
        first.save_model(&model, 2).unwrap();
        first.mark_best(2).unwrap();
        fs::write(dir.path().join(METRICS_FILE), "epoch\n1\n2\n").unwrap();
        first.save_config(&TrainConfig::default()).unwrap();

        let second = CheckpointManager::new(dir.path()).unwrap();
        assert_eq!(second.clear_run().unwrap(), 5);
        assert!(second.selected_epoch().is_err());
        assert!(!dir.path().join(METRICS_FILE).exists());
        assert!(dir.path().join(CONFIG).exists());

        second.save_model(&model, 1).unwrap();
        assert_eq!(second.selected_epoch().unwrap(), 1);
        assert!(!dir.path().join("model_epoch_2.mpk").exists());
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig::default();
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);
    }
}
