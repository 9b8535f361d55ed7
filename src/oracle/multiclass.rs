//! Multiclass classification as a structured problem
//!
//! ψ(x, y) places x in block y of a `n_classes * n_features` vector; the
//! loss is 0/1.

use crate::core::{Candidate, Result, SSVMError, StructuredOracle};
use crate::utils::{all_finite, argmax, dot};

/// Multiclass oracle over dense feature vectors
#[derive(Debug, Clone)]
pub struct MulticlassOracle {
    samples: Vec<Vec<f64>>,
    labels: Vec<usize>,
    n_classes: usize,
    n_features: usize,
}

impl MulticlassOracle {
    /// Create an oracle from samples and their class labels
    pub fn new(samples: Vec<Vec<f64>>, labels: Vec<usize>, n_classes: usize) -> Result<Self> {
        if n_classes < 2 {
            return Err(SSVMError::InvalidParameter(format!(
                "Need at least 2 classes, got: {n_classes}"
            )));
        }
        if samples.len() != labels.len() {
            return Err(SSVMError::InvalidDataset(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }

        let n_features = samples.first().map_or(0, Vec::len);
        for (i, sample) in samples.iter().enumerate() {
            if sample.len() != n_features {
                return Err(SSVMError::DimensionMismatch {
                    expected: n_features,
                    actual: sample.len(),
                });
            }
            if !all_finite(sample) {
                return Err(SSVMError::InvalidDataset(format!(
                    "Sample {i} contains non-finite features"
                )));
            }
        }
        if let Some(&label) = labels.iter().find(|&&label| label >= n_classes) {
            return Err(SSVMError::InvalidLabel {
                label,
                n_labels: n_classes,
            });
        }

        Ok(Self {
            samples,
            labels,
            n_classes,
            n_features,
        })
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of features per sample
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class labels
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// ψ(x_i, class)
    pub fn joint_feature_map(&self, i: usize, class: usize) -> Vec<f64> {
        let mut psi = vec![0.0; self.feature_dims()];
        let offset = class * self.n_features;
        psi[offset..offset + self.n_features].copy_from_slice(&self.samples[i]);
        psi
    }

    fn class_scores(&self, w: &[f64], i: usize) -> Vec<f64> {
        (0..self.n_classes)
            .map(|class| {
                let offset = class * self.n_features;
                dot(&w[offset..offset + self.n_features], &self.samples[i])
            })
            .collect()
    }

    fn best(&self, i: usize, scores: &[f64]) -> Candidate<usize> {
        let class = argmax(scores).unwrap_or(0);
        Candidate::new(scores[class], class, self.joint_feature_map(i, class))
    }
}

impl StructuredOracle for MulticlassOracle {
    type Output = usize;

    fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn feature_dims(&self) -> usize {
        self.n_classes * self.n_features
    }

    fn true_feature_map(&self, i: usize) -> Vec<f64> {
        self.joint_feature_map(i, self.labels[i])
    }

    fn argmax(&self, w: &[f64], i: usize) -> Candidate<usize> {
        let mut scores = self.class_scores(w, i);
        for (class, score) in scores.iter_mut().enumerate() {
            if class != self.labels[i] {
                *score += 1.0;
            }
        }
        self.best(i, &scores)
    }

    fn loss(&self, i: usize, output: &usize) -> f64 {
        if *output == self.labels[i] {
            0.0
        } else {
            1.0
        }
    }

    fn predict(&self, w: &[f64], i: usize) -> Candidate<usize> {
        let scores = self.class_scores(w, i);
        self.best(i, &scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_oracle() -> MulticlassOracle {
        MulticlassOracle::new(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            vec![0, 1, 2],
            3,
        )
        .expect("Valid oracle")
    }

    #[test]
    fn test_block_feature_map() {
        let oracle = create_oracle();
        assert_eq!(oracle.feature_dims(), 6);
        assert_eq!(
            oracle.true_feature_map(1),
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]
        );
        assert_eq!(
            oracle.joint_feature_map(2, 0),
            vec![-1.0, -1.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_loss_augmented_argmax() {
        let oracle = create_oracle();
        let w = vec![0.0; 6];
        // All classes score 0; the wrong ones gain the unit loss, lowest wins ties
        let candidate = oracle.argmax(&w, 0);
        assert_eq!(candidate.output, 1);
        assert_eq!(candidate.score, 1.0);
        assert_eq!(oracle.loss(0, &candidate.output), 1.0);

        // A confident correct model makes the truth the argmax
        let w = vec![5.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let candidate = oracle.argmax(&w, 0);
        assert_eq!(candidate.output, 0);
        assert_eq!(candidate.score, 5.0);
    }

    #[test]
    fn test_predict_ignores_loss() {
        let oracle = create_oracle();
        let w = vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        assert_eq!(oracle.predict(&w, 1).output, 1);
        assert_eq!(oracle.predict(&vec![0.0; 6], 1).output, 0);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            MulticlassOracle::new(vec![vec![1.0]], vec![3], 3),
            Err(SSVMError::InvalidLabel {
                label: 3,
                n_labels: 3
            })
        ));
        assert!(MulticlassOracle::new(vec![vec![1.0]], vec![0], 1).is_err());
        assert!(MulticlassOracle::new(vec![vec![1.0]], vec![0, 1], 2).is_err());
        assert!(MulticlassOracle::new(vec![vec![1.0], vec![1.0, 2.0]], vec![0, 1], 2).is_err());
    }
}
