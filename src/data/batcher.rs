// ============================================================
// Layer 4 - PU Batcher
// ============================================================
// Converts a slice of PuInstances into tensors for one
// forward pass.
//
// Unlike fixed-width inputs, titles and abstracts vary in
// length, so padding is dynamic: every batch is padded to its
// own longest title and longest abstract (at least 1 so that
// an empty title still yields a valid [N, 1] tensor).
//
//   title_ids      [N, T]  Int,   [PAD] = 0 beyond each title
//   title_mask     [N, T]  Float, 1.0 real token / 0.0 padding
//   abstract_ids   [N, A]  Int
//   abstract_mask  [N, A]  Float
//   labels         [N]     Int,   1 = positive/labeled
//   labels_true    [N]     Int,   ground truth, metrics only
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::prelude::*;

use crate::data::dataset::PuInstance;
use crate::infra::tokenizer_store::PAD_ID;

// ─── PuBatch ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PuBatch<B: Backend> {
    pub title_ids:     Tensor<B, 2, Int>,
    pub title_mask:    Tensor<B, 2>,
    pub abstract_ids:  Tensor<B, 2, Int>,
    pub abstract_mask: Tensor<B, 2>,
    pub labels:        Tensor<B, 1, Int>,
    pub labels_true:   Tensor<B, 1, Int>,
}

// ─── PuBatcher ────────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct PuBatcher<B: Backend> {
    pub device: B::Device,
}

/// Right-pad every sequence to the longest one.
/// Returns (flat ids, flat mask, width).
fn pad(sequences: &[&[u32]]) -> (Vec<i32>, Vec<f32>, usize) {
    let width = sequences.iter().map(|s| s.len()).max().unwrap_or(0).max(1);
    let mut ids  = Vec::with_capacity(sequences.len() * width);
    let mut mask = Vec::with_capacity(sequences.len() * width);

    for seq in sequences {
        ids.extend(seq.iter().map(|&t| t as i32));
        ids.extend(std::iter::repeat(PAD_ID as i32).take(width - seq.len()));
        mask.extend(std::iter::repeat(1.0f32).take(seq.len()));
        mask.extend(std::iter::repeat(0.0f32).take(width - seq.len()));
    }
    (ids, mask, width)
}

impl<B: Backend> PuBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, items: &[PuInstance]) -> PuBatch<B> {
        let n = items.len();

        let titles: Vec<&[u32]>    = items.iter().map(|i| i.title_ids.as_slice()).collect();
        let abstracts: Vec<&[u32]> = items.iter().map(|i| i.abstract_ids.as_slice()).collect();
        let (title_flat, title_mask_flat, t_len)       = pad(&titles);
        let (abstract_flat, abstract_mask_flat, a_len) = pad(&abstracts);

        let labels: Vec<i32>      = items.iter().map(|i| i.label.class_index()).collect();
        let labels_true: Vec<i32> = items.iter().map(|i| i.label_true.class_index()).collect();

        PuBatch {
            title_ids: Tensor::<B, 1, Int>::from_ints(title_flat.as_slice(), &self.device)
                .reshape([n, t_len]),
            title_mask: Tensor::<B, 1>::from_floats(title_mask_flat.as_slice(), &self.device)
                .reshape([n, t_len]),
            abstract_ids: Tensor::<B, 1, Int>::from_ints(abstract_flat.as_slice(), &self.device)
                .reshape([n, a_len]),
            abstract_mask: Tensor::<B, 1>::from_floats(abstract_mask_flat.as_slice(), &self.device)
                .reshape([n, a_len]),
            labels:      Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
            labels_true: Tensor::<B, 1, Int>::from_ints(labels_true.as_slice(), &self.device),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::PuLabel;
    use burn::backend::NdArray;

    fn instance(title: Vec<u32>, abstract_ids: Vec<u32>, label: PuLabel, label_true: PuLabel) -> PuInstance {
        PuInstance {
            pmid: "1".into(),
            title_ids: title,
            abstract_ids,
            label,
            label_true,
            evaluation: false,
        }
    }

    #[test]
    fn test_dynamic_padding_and_masks() {
        let batcher = PuBatcher::<NdArray>::new(Default::default());
        let batch   = batcher.batch(&[
            instance(vec![5, 6, 7], vec![9], PuLabel::Positive, PuLabel::Positive),
            instance(vec![8], vec![2, 3], PuLabel::Negative, PuLabel::Positive),
        ]);

        assert_eq!(batch.title_ids.dims(), [2, 3]);
        assert_eq!(batch.abstract_ids.dims(), [2, 2]);
        assert_eq!(
            batch.title_ids.into_data().to_vec::<i64>().unwrap(),
            vec![5, 6, 7, 8, 0, 0]
        );
        assert_eq!(
            batch.title_mask.into_data().to_vec::<f32>().unwrap(),
            vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0]
        );
        assert_eq!(batch.labels.into_data().to_vec::<i64>().unwrap(), vec![1, 0]);
        assert_eq!(batch.labels_true.into_data().to_vec::<i64>().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_empty_sequences_still_have_width_one() {
        let batcher = PuBatcher::<NdArray>::new(Default::default());
        let batch   = batcher.batch(&[instance(vec![], vec![], PuLabel::Negative, PuLabel::Negative)]);
        assert_eq!(batch.title_ids.dims(), [1, 1]);
        assert_eq!(batch.abstract_mask.into_data().to_vec::<f32>().unwrap(), vec![0.0]);
    }
}
