use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::document::PuLabel;

/// One tokenised document ready for batching.
/// Title and abstract keep their own (unpadded) id sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuInstance {
    pub pmid:         String,
    pub title_ids:    Vec<u32>,
    pub abstract_ids: Vec<u32>,
    /// Label the model is trained on
    pub label:        PuLabel,
    /// Ground truth, only used for metrics
    pub label_true:   PuLabel,
    pub evaluation:   bool,
}

impl PuInstance {
    /// Longest of the two sequences, i.e. the padded width it forces on a batch
    pub fn padded_length(&self) -> usize {
        self.title_ids.len().max(self.abstract_ids.len())
    }
}

#[derive(Debug)]
pub struct PuDataset {
    instances: Vec<PuInstance>,
}

impl PuDataset {
    pub fn new(instances: Vec<PuInstance>) -> Self { Self { instances } }

    pub fn instances(&self) -> &[PuInstance] { &self.instances }

    /// (labeled positives, unlabeled) under the training label
    pub fn label_counts(&self) -> (usize, usize) {
        let positives = self.instances.iter().filter(|i| i.label.is_positive()).count();
        (positives, self.instances.len() - positives)
    }
}

impl Dataset<PuInstance> for PuDataset {
    fn get(&self, index: usize) -> Option<PuInstance> {
        self.instances.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.instances.len()
    }
}
