// ============================================================
// Layer 3 - Corpus Types
// ============================================================
// The output of one PU task: three disjoint splits and the
// statistics computed once at construction time.

use serde::{Deserialize, Serialize};

use crate::domain::document::LabeledDocument;

/// Train / valid / test partitions of one PU task.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSplit {
    pub train: Vec<LabeledDocument>,
    pub valid: Vec<LabeledDocument>,
    pub test:  Vec<LabeledDocument>,
}

impl CorpusSplit {
    pub fn len(&self) -> usize {
        self.train.len() + self.valid.len() + self.test.len()
    }

    /// (file stem, documents) in persistence order
    pub fn named(&self) -> [(&'static str, &[LabeledDocument]); 3] {
        [
            ("train", self.train.as_slice()),
            ("valid", self.valid.as_slice()),
            ("test",  self.test.as_slice()),
        ]
    }
}

/// Corpus-level counts and statistics, written as `metadata.json`.
///
/// recall    = |UP| / (P_size - LP_size)
/// precision = |UP| / U_size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetadata {
    #[serde(rename = "P_size")]
    pub p_size: usize,
    #[serde(rename = "LP_size")]
    pub lp_size: usize,
    #[serde(rename = "U_size")]
    pub u_size: usize,
    /// Hidden true positives found in U
    #[serde(rename = "UP_size")]
    pub up_size: usize,
    /// Requested unlabeled pool size, when one was requested
    #[serde(rename = "U_target_size", default, skip_serializing_if = "Option::is_none")]
    pub u_target_size: Option<usize>,

    #[serde(rename = "train_LP_size")]
    pub train_lp_size: usize,
    #[serde(rename = "train_U_size")]
    pub train_u_size: usize,
    #[serde(rename = "valid_LP_size")]
    pub valid_lp_size: usize,
    #[serde(rename = "valid_U_size")]
    pub valid_u_size: usize,
    #[serde(rename = "test_LP_size")]
    pub test_lp_size: usize,
    #[serde(rename = "test_U_size")]
    pub test_u_size: usize,

    pub train_size: usize,
    pub valid_size: usize,
    pub test_size:  usize,

    pub precision: f64,
    pub recall:    f64,

    pub mesh_conjunction:     Vec<String>,
    pub mesh_conjunction_str: Vec<String>,
}

/// A finished PU task, ready to be written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PuCorpus {
    pub split:    CorpusSplit,
    pub metadata: CorpusMetadata,
}
