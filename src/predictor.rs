//! Prediction with a trained weight vector

use crate::core::{Prediction, Result, SSVMError, StructuredOracle};
use serde::{Deserialize, Serialize};

/// Applies a fixed weight vector to the examples of an oracle
#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    weights: Vec<f64>,
}

impl Predictor {
    /// Create a predictor from trained weights
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    /// Get the weight vector
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Predict every example held by `oracle`
    ///
    /// Predictions are returned in example order.
    pub fn apply<O: StructuredOracle>(&self, oracle: &O) -> Result<Vec<Prediction<O::Output>>> {
        self.check_dims(oracle)?;
        Ok((0..oracle.sample_count())
            .map(|i| Prediction::from(oracle.predict(&self.weights, i)))
            .collect())
    }

    /// Mean loss and exact-match rate of the predictions on `oracle`
    pub fn evaluate<O: StructuredOracle>(&self, oracle: &O) -> Result<EvaluationMetrics> {
        let predictions = self.apply(oracle)?;
        let losses: Vec<f64> = predictions
            .iter()
            .enumerate()
            .map(|(i, prediction)| oracle.loss(i, &prediction.output))
            .collect();
        Ok(EvaluationMetrics::from_losses(&losses))
    }

    fn check_dims<O: StructuredOracle>(&self, oracle: &O) -> Result<()> {
        let dims = oracle.feature_dims();
        if self.weights.len() != dims {
            return Err(SSVMError::DimensionMismatch {
                expected: dims,
                actual: self.weights.len(),
            });
        }
        Ok(())
    }
}

/// Evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Number of evaluated examples
    pub n_samples: usize,
    /// Loss summed over all examples
    pub total_loss: f64,
    /// Examples predicted with zero loss
    pub exact_matches: usize,
}

impl EvaluationMetrics {
    fn from_losses(losses: &[f64]) -> Self {
        Self {
            n_samples: losses.len(),
            total_loss: losses.iter().sum(),
            exact_matches: losses.iter().filter(|&&loss| loss == 0.0).count(),
        }
    }

    /// Average loss per example
    pub fn mean_loss(&self) -> f64 {
        if self.n_samples == 0 {
            0.0
        } else {
            self.total_loss / self.n_samples as f64
        }
    }

    /// Fraction of examples predicted with zero loss
    pub fn exact_match_rate(&self) -> f64 {
        if self.n_samples == 0 {
            0.0
        } else {
            self.exact_matches as f64 / self.n_samples as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MulticlassOracle;

    fn create_oracle() -> MulticlassOracle {
        MulticlassOracle::new(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            vec![0, 1, 1],
            2,
        )
        .expect("Valid oracle")
    }

    #[test]
    fn test_apply() {
        let oracle = create_oracle();
        let predictor = Predictor::new(vec![1.0, 0.0, 0.0, 1.0]);
        let predictions = predictor.apply(&oracle).expect("Prediction should succeed");

        let outputs: Vec<usize> = predictions.iter().map(|p| p.output).collect();
        // Third example ties between both classes and falls to class 0
        assert_eq!(outputs, vec![0, 1, 0]);
        assert_eq!(predictions[0].score, 1.0);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let oracle = create_oracle();
        let predictor = Predictor::new(vec![0.3, -0.2, 0.7, 0.1]);
        let first = predictor.apply(&oracle).expect("Prediction should succeed");
        let second = predictor.apply(&oracle).expect("Prediction should succeed");
        assert_eq!(first, second);
        assert_eq!(predictor.weights(), &[0.3, -0.2, 0.7, 0.1]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let oracle = create_oracle();
        let predictor = Predictor::new(vec![1.0, 2.0]);
        assert!(matches!(
            predictor.apply(&oracle),
            Err(SSVMError::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_evaluate() {
        let oracle = create_oracle();
        let predictor = Predictor::new(vec![1.0, 0.0, 0.0, 1.0]);
        let metrics = predictor.evaluate(&oracle).expect("Evaluation should succeed");

        assert_eq!(metrics.n_samples, 3);
        assert_eq!(metrics.exact_matches, 2);
        assert_eq!(metrics.total_loss, 1.0);
        assert_eq!(metrics.mean_loss(), 1.0 / 3.0);
        assert_eq!(metrics.exact_match_rate(), 2.0 / 3.0);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = EvaluationMetrics::from_losses(&[]);
        assert_eq!(metrics.mean_loss(), 0.0);
        assert_eq!(metrics.exact_match_rate(), 0.0);
    }
}
