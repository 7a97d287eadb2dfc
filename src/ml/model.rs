// ============================================================
// Layer 5 - PU Document Classifier
// ============================================================
// Scores a PubMed article with one positive-class logit.
//
//   title_ids    [N, T] ─┐
//                        ├─ shared Embedding ─ masked mean ─┐
//   abstract_ids [N, A] ─┘                                  ├─ cat [N, 2D]
//                                                           │
//                      Linear(2D, H) ─ ReLU ─ Dropout ─ Linear(H, 1) ─ [N]
//
// Mean pooling divides by the number of real tokens, so the
// [PAD] positions added by the batcher never leak into the
// document vector. A fully padded row (empty title) pools to
// the zero vector.
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::data::batcher::PuBatch;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct PuClassifierConfig {
    pub vocab_size: usize,
    #[config(default = 128)]
    pub d_embed:    usize,
    #[config(default = 128)]
    pub d_hidden:   usize,
    #[config(default = 0.2)]
    pub dropout:    f64,
}

impl PuClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PuClassifier<B> {
        PuClassifier {
            embedding: EmbeddingConfig::new(self.vocab_size, self.d_embed).init(device),
            hidden:    LinearConfig::new(2 * self.d_embed, self.d_hidden).init(device),
            output:    LinearConfig::new(self.d_hidden, 1).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct PuClassifier<B: Backend> {
    pub embedding: Embedding<B>,
    pub hidden:    Linear<B>,
    pub output:    Linear<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> PuClassifier<B> {
    /// ids: [N, L], mask: [N, L] → [N, D]
    fn encode(&self, ids: Tensor<B, 2, Int>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
        let embedded   = self.embedding.forward(ids); // [N, L, D]
        let [n, _, d]  = embedded.dims();
        let weights    = mask.clone().unsqueeze_dim::<3>(2); // [N, L, 1]
        let summed     = (embedded * weights).sum_dim(1).reshape([n, d]);
        let counts     = mask.sum_dim(1).clamp_min(1.0); // [N, 1]
        summed / counts
    }

    /// Positive-class logits, shape [N]
    pub fn forward(&self, batch: &PuBatch<B>) -> Tensor<B, 1> {
        let title = self.encode(batch.title_ids.clone(), batch.title_mask.clone());
        let body  = self.encode(batch.abstract_ids.clone(), batch.abstract_mask.clone());

        let x = Tensor::cat(vec![title, body], 1);
        let x = self.dropout.forward(relu(self.hidden.forward(x)));
        let logits = self.output.forward(x); // [N, 1]

        let [n, _] = logits.dims();
        logits.reshape([n])
    }
}
