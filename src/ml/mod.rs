// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All model, loss and optimiser code lives here.
//
//   model.rs      - PuClassifier: a shared token embedding,
//                   masked mean pooling over title and abstract,
//                   and a feedforward head emitting one
//                   positive-class logit per document
//
//   nnpu.rs       - The non-negative PU risk. Unlabeled data is
//                   treated as negative, and the bias this adds is
//                   removed using the class prior. When the
//                   negative risk goes below -β, the gradient of
//                   -γ·negative_risk is used instead
//
//   loss.rs       - The objective of a run: nnPU, the unbiased
//                   PU risk, or the weighted cross-entropy PN
//                   baseline on the noisy labels
//
//   trainer.rs    - Epoch loop: proportional batches, the
//                   configured objective, Adam, validation against
//                   label_true, checkpoints and metrics CSV
//
//   inferencer.rs - Scores a split with a trained checkpoint and
//                   counts predictions against both labels
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Kiryo et al. (2017) Positive-Unlabeled Learning
//            with Non-Negative Risk Estimator

/// Title + abstract document classifier
pub mod model;

/// Non-negative PU risk estimator
pub mod nnpu;

/// Objective selection and the PN baseline
pub mod loss;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Checkpoint loading and split scoring
pub mod inferencer;
