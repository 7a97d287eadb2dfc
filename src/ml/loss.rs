// ============================================================
// Layer 5 - Training Objectives
// ============================================================
// A run trains with one of three objectives:
//
//   nnpu - non-negative PU risk (default)
//   upu  - unbiased PU risk, never corrected
//   pn   - supervised baseline: cross-entropy on the noisy
//          label, every unlabeled document taken as negative
//
// The classifier emits one logit s per document. The pn
// baseline feeds burn's CrossEntropyLoss the two-class logits
// [-s, s], so P(positive) = sigmoid(2s) and the decision rule
// s > 0 is shared with the PU risks.
//
// Given a prior π the pn classes are weighted
//
//   class 0 (unlabeled/negative): π
//   class 1 (labeled positive):   1 - π
//
// and the batch loss is Σ w_y · nll / Σ w_y. Without a prior
// it is the plain mean.
//
// Reference: Burn Book §5 (Loss functions)
//            Kiryo et al. (2017), PN baseline

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ml::nnpu::{NnPuLoss, RiskError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    #[default]
    Nnpu,
    Upu,
    Pn,
}

impl LossKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossKind::Nnpu => "nnpu",
            LossKind::Upu  => "upu",
            LossKind::Pn   => "pn",
        }
    }

    /// The PU risks cannot be computed without π; pn only uses it for weighting.
    pub fn needs_prior(&self) -> bool {
        !matches!(self, LossKind::Pn)
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── PN cross-entropy ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PnLoss {
    /// [negative, positive]
    weights: Option<[f32; 2]>,
}

impl PnLoss {
    pub fn new(prior: Option<f64>) -> Result<Self, RiskError> {
        match prior {
            Some(p) if !(p > 0.0 && p < 1.0) => Err(RiskError::InvalidPrior(p)),
            Some(p) => Ok(Self { weights: Some([p as f32, (1.0 - p) as f32]) }),
            None    => Ok(Self { weights: None }),
        }
    }

    pub fn weights(&self) -> Option<[f32; 2]> {
        self.weights
    }

    pub fn forward<B: Backend>(&self, scores: Tensor<B, 1>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let [n]    = scores.dims();
        let device = scores.device();
        let logits = Tensor::cat(vec![scores.clone().neg().reshape([n, 1]), scores.reshape([n, 1])], 1);

        CrossEntropyLossConfig::new()
            .with_weights(self.weights.map(|w| w.to_vec()))
            .init::<B>(&device)
            .forward(logits, labels)
    }
}

// ─── TrainingLoss ─────────────────────────────────────────────────────────────
/// The objective a run was configured with
#[derive(Debug, Clone)]
pub enum TrainingLoss {
    Pu(NnPuLoss),
    Pn(PnLoss),
}

/// One batch's objective
#[derive(Debug, Clone)]
pub struct LossStep<B: Backend> {
    /// Shape [1]
    pub objective: Tensor<B, 1>,
    /// Only the nnPU risk is ever corrected
    pub corrected: bool,
}

impl TrainingLoss {
    pub fn kind(&self) -> LossKind {
        match self {
            TrainingLoss::Pu(loss) if loss.non_negative() => LossKind::Nnpu,
            TrainingLoss::Pu(_) => LossKind::Upu,
            TrainingLoss::Pn(_) => LossKind::Pn,
        }
    }

    pub fn forward<B: Backend>(&self, scores: Tensor<B, 1>, labels: Tensor<B, 1, Int>) -> LossStep<B> {
        match self {
            TrainingLoss::Pu(loss) => {
                let risk = loss.forward(scores, labels);
                LossStep { objective: risk.objective, corrected: risk.corrected }
            }
            TrainingLoss::Pn(loss) => LossStep { objective: loss.forward(scores, labels), corrected: false },
        }
    }
}

impl fmt::Display for TrainingLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingLoss::Pu(loss) => write!(f, "{} (prior {:.4})", self.kind(), loss.prior()),
            TrainingLoss::Pn(loss) => match loss.weights() {
                Some([neg, pos]) => write!(f, "pn (weights {neg:.4}/{pos:.4})"),
                None             => f.write_str("pn (unweighted)"),
            },
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::nnpu::NnPuLossConfig;
    use burn::backend::{Autodiff, NdArray};

    type B = NdArray;

    fn softplus(x: f64) -> f64 {
        (1.0 + x.exp()).ln()
    }

    /// -log P(label) with P(positive) = sigmoid(2s)
    fn nll(score: f64, label: i32) -> f64 {
        if label == 1 { softplus(-2.0 * score) } else { softplus(2.0 * score) }
    }

    fn pn_value(loss: &PnLoss, scores: [f32; 3], labels: [i32; 3]) -> f64 {
        let device = Default::default();
        loss.forward(
            Tensor::<B, 1>::from_floats(scores, &device),
            Tensor::<B, 1, Int>::from_ints(labels, &device),
        )
        .into_scalar()
        .elem::<f64>()
    }

    #[test]
    fn test_prior_weights_positive_by_one_minus_prior() {
        let scores = [0.0, 1.0, -0.5];
        let labels = [1, 0, 0];
        let loss   = PnLoss::new(Some(0.2)).unwrap();
        assert_eq!(loss.weights(), Some([0.2, 0.8]));

        let terms: Vec<f64> = scores.iter().zip(labels).map(|(&s, l)| nll(s as f64, l)).collect();
        let expected = (0.8 * terms[0] + 0.2 * terms[1] + 0.2 * terms[2]) / 1.2;

        let actual = pn_value(&loss, scores, labels);
        assert!((actual - expected).abs() < 1e-5, "{actual} vs {expected}");
    }

    #[test]
    fn test_no_prior_gives_plain_mean() {
        let scores = [0.0, 1.0, -0.5];
        let labels = [1, 0, 0];
        let expected = scores.iter().zip(labels).map(|(&s, l)| nll(s as f64, l)).sum::<f64>() / 3.0;

        let actual = pn_value(&PnLoss::new(None).unwrap(), scores, labels);
        assert!((actual - expected).abs() < 1e-5);
    }

    #[test]
    fn test_pn_rejects_prior_outside_unit_interval() {
        assert!(matches!(PnLoss::new(Some(0.0)), Err(RiskError::InvalidPrior(_))));
        assert!(matches!(PnLoss::new(Some(1.0)), Err(RiskError::InvalidPrior(_))));
    }

    #[test]
    fn test_pn_gradient_pushes_labels_apart() {
        type AD = Autodiff<NdArray>;
        let device = Default::default();
        let input  = Tensor::<AD, 1>::from_floats([0.0, 0.0], &device).require_grad();
        let step   = TrainingLoss::Pn(PnLoss::new(Some(0.3)).unwrap())
            .forward(input.clone(), Tensor::<AD, 1, Int>::from_ints([1, 0], &device));
        assert!(!step.corrected);

        let grads = step.objective.backward();
        let grad  = input.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();
        // Descending the gradient raises the labeled score and lowers the other
        assert!(grad[0] < 0.0 && grad[1] > 0.0);
    }

    #[test]
    fn test_kind_follows_the_risk() {
        let nnpu = TrainingLoss::Pu(NnPuLossConfig::new(0.3).init().unwrap());
        let upu  = TrainingLoss::Pu(NnPuLossConfig::new(0.3).with_nnpu(false).init().unwrap());
        let pn   = TrainingLoss::Pn(PnLoss::new(None).unwrap());
        assert_eq!((nnpu.kind(), upu.kind(), pn.kind()), (LossKind::Nnpu, LossKind::Upu, LossKind::Pn));
        assert_eq!(pn.to_string(), "pn (unweighted)");
        assert_eq!(nnpu.to_string(), "nnpu (prior 0.3000)");
    }

    #[test]
    fn test_kind_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&LossKind::Pn).unwrap(), "\"pn\"");
        assert_eq!(serde_json::from_str::<LossKind>("\"upu\"").unwrap(), LossKind::Upu);
        assert!(LossKind::Nnpu.needs_prior() && !LossKind::Pn.needs_prior());
    }
}
