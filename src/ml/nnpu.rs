// ============================================================
// Layer 5 - Non-negative PU Risk
// ============================================================
// Turns positive-class logits and noisy PU labels into a
// scalar training objective (Kiryo et al., 2017).
//
// With ψ(z) = sigmoid(-z), prior π and the counts nP, nU
// (each floored at 1):
//
//   positive_risk = π / nP · Σ_P ψ(s)
//   negative_risk = 1 / nU · Σ_U ψ(-s)  -  π / nP · Σ_P ψ(-s)
//
//   negative_risk >= -β:  objective = positive_risk + negative_risk
//   negative_risk <  -β:  value     = positive_risk - β
//                         gradient  = ∇(-γ · negative_risk)
//
// The corrected branch is built as
//
//   (positive_risk - β + γ·negative_risk).detach() - γ·negative_risk
//
// whose forward value and backward gradient deliberately differ:
// detach() stops the gradient of the first term, so only
// -γ·negative_risk is differentiated.
//
// The estimator keeps no state between calls.
//
// Reference: Kiryo et al. (2017) Positive-Unlabeled Learning
//            with Non-Negative Risk Estimator
//            Burn Book §5 (Autodiff)

use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("class prior must lie in (0, 1), got {0}")]
    InvalidPrior(f64),

    #[error("beta must be >= 0, got {0}")]
    InvalidBeta(f64),

    #[error("gamma must lie in (0, 1], got {0}")]
    InvalidGamma(f64),
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct NnPuLossConfig {
    /// Probability that an unlabeled instance is truly positive
    pub prior: f64,
    /// Non-negativity margin
    #[config(default = 0.0)]
    pub beta:  f64,
    /// Scale of the correction gradient
    #[config(default = 1.0)]
    pub gamma: f64,
    /// false gives the plain unbiased PU risk
    #[config(default = true)]
    pub nnpu:  bool,
}

impl NnPuLossConfig {
    pub fn init(&self) -> Result<NnPuLoss, RiskError> {
        if !(self.prior > 0.0 && self.prior < 1.0) {
            return Err(RiskError::InvalidPrior(self.prior));
        }
        if !(self.beta >= 0.0) {
            return Err(RiskError::InvalidBeta(self.beta));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(RiskError::InvalidGamma(self.gamma));
        }
        Ok(NnPuLoss {
            prior: self.prior,
            beta:  self.beta,
            gamma: self.gamma,
            nnpu:  self.nnpu,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NnPuLoss {
    prior: f64,
    beta:  f64,
    gamma: f64,
    nnpu:  bool,
}

/// Objective plus the scalar parts reported for logging.
#[derive(Debug, Clone)]
pub struct PuRisk<B: Backend> {
    /// Shape [1], the tensor to call backward() on
    pub objective:     Tensor<B, 1>,
    pub positive_risk: f64,
    pub negative_risk: f64,
    /// true when the non-negative correction replaced the plain risk
    pub corrected:     bool,
}

impl NnPuLoss {
    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn non_negative(&self) -> bool {
        self.nnpu
    }

    /// scores: [n] positive-class logits
    /// labels: [n] noisy labels, 1 = positive/labeled, 0 = unlabeled
    pub fn forward<B: Backend>(&self, scores: Tensor<B, 1>, labels: Tensor<B, 1, Int>) -> PuRisk<B> {
        let positive  = labels.clone().equal_elem(1).float();
        let unlabeled = labels.equal_elem(0).float();

        let n_positive  = positive.clone().sum().into_scalar().elem::<f64>().max(1.0);
        let n_unlabeled = unlabeled.clone().sum().into_scalar().elem::<f64>().max(1.0);

        // ψ(s) and ψ(-s)
        let loss_as_positive = sigmoid(scores.clone().neg());
        let loss_as_negative = sigmoid(scores);

        let positive_risk = (positive.clone() * loss_as_positive)
            .sum()
            .mul_scalar(self.prior / n_positive);

        let negative_weight = unlabeled.div_scalar(n_unlabeled) - positive.mul_scalar(self.prior / n_positive);
        let negative_risk   = (negative_weight * loss_as_negative).sum();

        let pr = positive_risk.clone().into_scalar().elem::<f64>();
        let nr = negative_risk.clone().into_scalar().elem::<f64>();

        let corrected = self.nnpu && nr < -self.beta;
        let objective = if corrected {
            let reported = (positive_risk - negative_risk.clone().mul_scalar(-self.gamma))
                .sub_scalar(self.beta)
                .detach();
            reported - negative_risk.mul_scalar(self.gamma)
        } else {
            positive_risk + negative_risk
        };

        PuRisk { objective, positive_risk: pr, negative_risk: nr, corrected }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type B  = NdArray;
    type AD = Autodiff<NdArray>;

    fn value<Bk: Backend>(t: Tensor<Bk, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    fn sig(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    /// negative_risk evaluated in plain f64
    fn negative_risk(scores: &[f64], labels: &[i32], prior: f64) -> f64 {
        let n_p = labels.iter().filter(|&&l| l == 1).count().max(1) as f64;
        let n_u = labels.iter().filter(|&&l| l == 0).count().max(1) as f64;
        scores
            .iter()
            .zip(labels)
            .map(|(&s, &l)| if l == 1 { -prior * sig(s) / n_p } else { sig(s) / n_u })
            .sum()
    }

    #[test]
    fn test_zero_scores_use_plain_risk() {
        let device = Default::default();
        let loss   = NnPuLossConfig::new(0.3).init().unwrap();
        let risk   = loss.forward(
            Tensor::<B, 1>::from_floats([0.0, 0.0, 0.0, 0.0], &device),
            Tensor::<B, 1, Int>::from_ints([1, 1, 0, 0], &device),
        );

        assert!(!risk.corrected);
        assert!((risk.positive_risk - 0.15).abs() < 1e-6);
        assert!((risk.negative_risk - 0.35).abs() < 1e-6);
        assert!((value(risk.objective) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_confident_separation_triggers_correction() {
        // P scored far positive, U far negative: negative_risk -> -π
        let device = Default::default();
        let loss   = NnPuLossConfig::new(0.4).init().unwrap();
        let risk   = loss.forward(
            Tensor::<B, 1>::from_floats([20.0, 20.0, -20.0, -20.0], &device),
            Tensor::<B, 1, Int>::from_ints([1, 1, 0, 0], &device),
        );

        assert!(risk.corrected);
        assert!((risk.negative_risk + 0.4).abs() < 1e-4);
        assert!(risk.positive_risk.abs() < 1e-6);
        assert!((value(risk.objective) - risk.positive_risk).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_correction_keeps_negative_risk() {
        let device = Default::default();
        let loss   = NnPuLossConfig::new(0.4).with_nnpu(false).init().unwrap();
        let risk   = loss.forward(
            Tensor::<B, 1>::from_floats([20.0, -20.0], &device),
            Tensor::<B, 1, Int>::from_ints([1, 0], &device),
        );

        assert!(!risk.corrected);
        assert!(risk.negative_risk < 0.0);
        assert!((value(risk.objective) - (risk.positive_risk + risk.negative_risk)).abs() < 1e-6);
    }

    #[test]
    fn test_beta_margin_moves_the_boundary() {
        let device = Default::default();
        let scores = [2.0, 1.5, -1.0, -2.0, 0.5];
        let labels = [1, 1, 0, 0, 0];
        let nr     = negative_risk(&scores, &labels, 0.5);
        assert!(nr < 0.0 && nr > -0.2);

        let risk = NnPuLossConfig::new(0.5)
            .with_beta(0.2)
            .init()
            .unwrap()
            .forward(
                Tensor::<B, 1>::from_floats(scores.map(|s| s as f32), &device),
                Tensor::<B, 1, Int>::from_ints(labels, &device),
            );
        assert!(!risk.corrected);
    }

    #[test]
    fn test_correction_gradient_matches_scaled_negative_risk() {
        let device = Default::default();
        let prior  = 0.5;
        let gamma  = 0.7;
        let scores = [2.0, 1.5, -1.0, -2.0, 0.5];
        let labels = [1, 1, 0, 0, 0];

        let input = Tensor::<AD, 1>::from_floats(scores.map(|s| s as f32), &device).require_grad();
        let risk  = NnPuLossConfig::new(prior)
            .with_gamma(gamma)
            .init()
            .unwrap()
            .forward(input.clone(), Tensor::<AD, 1, Int>::from_ints(labels, &device));

        assert!(risk.corrected);
        // Reported value is positive_risk - β with β = 0
        assert!((value(risk.objective.clone()) - risk.positive_risk).abs() < 1e-5);

        let grads    = risk.objective.backward();
        let analytic = input.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();

        // Central differences of -γ · negative_risk
        let h = 1e-4;
        for i in 0..scores.len() {
            let mut up   = scores;
            let mut down = scores;
            up[i]   += h;
            down[i] -= h;
            let numeric = -gamma
                * (negative_risk(&up, &labels, prior) - negative_risk(&down, &labels, prior))
                / (2.0 * h);
            assert!(
                (analytic[i] as f64 - numeric).abs() < 1e-4,
                "score {i}: autodiff {} vs numeric {numeric}",
                analytic[i]
            );
        }
    }

    #[test]
    fn test_counts_are_floored_at_one() {
        let device = Default::default();
        let risk   = NnPuLossConfig::new(0.2).init().unwrap().forward(
            Tensor::<B, 1>::from_floats([0.0, 0.0], &device),
            Tensor::<B, 1, Int>::from_ints([0, 0], &device),
        );
        assert_eq!(risk.positive_risk, 0.0);
        assert!((risk.negative_risk - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_invalid_hyperparameters() {
        assert_eq!(NnPuLossConfig::new(0.0).init().unwrap_err(), RiskError::InvalidPrior(0.0));
        assert_eq!(NnPuLossConfig::new(1.0).init().unwrap_err(), RiskError::InvalidPrior(1.0));
        assert!(matches!(NnPuLossConfig::new(0.3).with_beta(-0.1).init(), Err(RiskError::InvalidBeta(_))));
        assert!(matches!(NnPuLossConfig::new(0.3).with_gamma(0.0).init(), Err(RiskError::InvalidGamma(_))));
        assert!(matches!(NnPuLossConfig::new(0.3).with_gamma(1.5).init(), Err(RiskError::InvalidGamma(_))));
        assert!(NnPuLossConfig::new(0.3).with_gamma(1.0).init().is_ok());
    }
}
