// ============================================================
// Layer 6 - Metrics
// ============================================================
// Binary classification counts and the per-epoch CSV log.
//
// A document is predicted positive when its logit is > 0.
// Validation and evaluation compare predictions against
// label_true, so the numbers measure how well the hidden
// positives in the unlabeled pool are recovered, not how well
// the noisy labels are reproduced.
//
// Output file: {checkpoint_dir}/metrics.csv
//
//   epoch,train_loss,val_loss,accuracy,precision,recall,f1,corrected_batches
//   1,0.412300,0.398100,0.912000,0.540000,0.610000,0.572870,3
//
// An undefined ratio (no predicted or no actual positives) is
// reported as 0.0.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const METRICS_FILE: &str = "metrics.csv";

// ─── BinaryCounts ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryCounts {
    pub true_positive:  usize,
    pub false_positive: usize,
    pub true_negative:  usize,
    pub false_negative: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

impl BinaryCounts {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true)   => self.true_positive += 1,
            (true, false)  => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
            (false, true)  => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// One row of the metrics CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:             usize,
    /// Mean training objective over training batches
    pub train_loss:        f64,
    /// Mean training objective over validation batches
    pub val_loss:          f64,
    /// Validation predictions against label_true
    pub counts:            BinaryCounts,
    /// Training batches where the non-negative correction fired
    pub corrected_batches: usize,
}

impl EpochMetrics {
    /// Returns true if this epoch improved over the previous best F1
    pub fn is_improvement(&self, best_f1: f64) -> bool {
        self.counts.f1() > best_f1
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,accuracy,precision,recall,f1,corrected_batches")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.counts.accuracy(),
            m.counts.precision(),
            m.counts.recall(),
            m.counts.f1(),
            m.corrected_batches,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
