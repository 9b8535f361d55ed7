//! Hidden-Markov sequence labelling oracle
//!
//! Joint feature map of a sequence x = (x_1..x_T) with state labels
//! y = (y_1..y_T), `S` states and `F` features per position:
//!
//! - `S x S` transition counts: entry `(a, b)` counts positions t >= 1 with
//!   y_{t-1} = a and y_t = b
//! - `S x F` emission sums: entry `(s, f)` sums x_t[f] over positions with
//!   y_t = s
//!
//! Inference is Viterbi decoding; the loss-augmented variant adds the
//! Hamming loss term per position.

use crate::core::{Candidate, Result, SSVMError, StructuredOracle};
use crate::utils::{all_finite, argmax, dot};
use serde::{Deserialize, Serialize};

/// One observed sequence and its state labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSequence {
    /// Feature vector per position (T x F)
    pub features: Vec<Vec<f64>>,
    /// State label per position (T)
    pub labels: Vec<usize>,
}

impl LabeledSequence {
    /// Create a new labeled sequence
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Self {
        Self { features, labels }
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the sequence has no positions
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Sequence labelling oracle over a set of labeled sequences
#[derive(Debug, Clone)]
pub struct SequenceOracle {
    sequences: Vec<LabeledSequence>,
    n_states: usize,
    n_features: usize,
}

impl SequenceOracle {
    /// Create an oracle, inferring the number of features from the data
    pub fn new(sequences: Vec<LabeledSequence>, n_states: usize) -> Result<Self> {
        let n_features = sequences
            .iter()
            .flat_map(|seq| seq.features.first())
            .map(|position| position.len())
            .next()
            .ok_or_else(|| {
                SSVMError::InvalidDataset("No sequence has any position".to_string())
            })?;
        Self::with_features(sequences, n_states, n_features)
    }

    /// Create an oracle with an explicit feature count
    ///
    /// Useful for test sets that must match the dimensions of a trained model.
    pub fn with_features(
        sequences: Vec<LabeledSequence>,
        n_states: usize,
        n_features: usize,
    ) -> Result<Self> {
        if n_states == 0 {
            return Err(SSVMError::InvalidParameter(
                "Number of states must be at least 1".to_string(),
            ));
        }

        for (i, seq) in sequences.iter().enumerate() {
            if seq.features.len() != seq.labels.len() {
                return Err(SSVMError::InvalidDataset(format!(
                    "Sequence {i} has {} positions but {} labels",
                    seq.features.len(),
                    seq.labels.len()
                )));
            }
            for position in &seq.features {
                if position.len() != n_features {
                    return Err(SSVMError::DimensionMismatch {
                        expected: n_features,
                        actual: position.len(),
                    });
                }
                if !all_finite(position) {
                    return Err(SSVMError::InvalidDataset(format!(
                        "Sequence {i} contains non-finite features"
                    )));
                }
            }
            if let Some(&label) = seq.labels.iter().find(|&&label| label >= n_states) {
                return Err(SSVMError::InvalidLabel {
                    label,
                    n_labels: n_states,
                });
            }
        }

        Ok(Self {
            sequences,
            n_states,
            n_features,
        })
    }

    /// Number of hidden states
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Number of features per position
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// The sequences held by the oracle
    pub fn sequences(&self) -> &[LabeledSequence] {
        &self.sequences
    }

    /// Subtract the mean feature vector (over all positions of all
    /// sequences) from every position; returns the subtracted mean
    pub fn center_features(&mut self) -> Vec<f64> {
        let mut mean = vec![0.0; self.n_features];
        let mut count = 0usize;
        for position in self.sequences.iter().flat_map(|seq| &seq.features) {
            for (m, &v) in mean.iter_mut().zip(position) {
                *m += v;
            }
            count += 1;
        }
        if count == 0 {
            return mean;
        }
        for m in &mut mean {
            *m /= count as f64;
        }
        self.subtract_mean(&mean);
        mean
    }

    /// Subtract a previously computed feature mean from every position
    pub fn subtract_mean(&mut self, mean: &[f64]) {
        for position in self.sequences.iter_mut().flat_map(|seq| &mut seq.features) {
            for (v, m) in position.iter_mut().zip(mean) {
                *v -= m;
            }
        }
    }

    fn transition_index(&self, from: usize, to: usize) -> usize {
        from * self.n_states + to
    }

    fn emission_offset(&self, state: usize) -> usize {
        self.n_states * self.n_states + state * self.n_features
    }

    /// Joint feature map ψ(x_i, labels)
    pub fn joint_feature_map(&self, i: usize, labels: &[usize]) -> Vec<f64> {
        let seq = &self.sequences[i];
        let mut psi = vec![0.0; self.feature_dims()];
        for (t, (&state, position)) in labels.iter().zip(&seq.features).enumerate() {
            if t > 0 {
                psi[self.transition_index(labels[t - 1], state)] += 1.0;
            }
            let offset = self.emission_offset(state);
            for (f, &value) in position.iter().enumerate() {
                psi[offset + f] += value;
            }
        }
        psi
    }

    /// Viterbi decoding, optionally adding the Hamming loss per position
    fn viterbi(&self, w: &[f64], i: usize, loss_augmented: bool) -> Candidate<Vec<usize>> {
        let seq = &self.sequences[i];
        let len = seq.len();
        let n_states = self.n_states;
        if len == 0 {
            return Candidate::new(0.0, Vec::new(), vec![0.0; self.feature_dims()]);
        }

        let emission = |t: usize, state: usize| -> f64 {
            let offset = self.emission_offset(state);
            let mut score = dot(&w[offset..offset + self.n_features], &seq.features[t]);
            if loss_augmented && state != seq.labels[t] {
                score += 1.0;
            }
            score
        };

        let mut delta = vec![vec![0.0; n_states]; len];
        let mut backpointer = vec![vec![0usize; n_states]; len];

        for state in 0..n_states {
            delta[0][state] = emission(0, state);
        }
        for t in 1..len {
            for state in 0..n_states {
                let mut best_prev = 0;
                let mut best_score = f64::NEG_INFINITY;
                for prev in 0..n_states {
                    let score = delta[t - 1][prev] + w[self.transition_index(prev, state)];
                    if score > best_score {
                        best_score = score;
                        best_prev = prev;
                    }
                }
                delta[t][state] = best_score + emission(t, state);
                backpointer[t][state] = best_prev;
            }
        }

        let last = argmax(&delta[len - 1]).unwrap_or(0);
        let score = delta[len - 1][last];

        let mut path = vec![0usize; len];
        path[len - 1] = last;
        for t in (1..len).rev() {
            path[t - 1] = backpointer[t][path[t]];
        }

        let psi = self.joint_feature_map(i, &path);
        Candidate::new(score, path, psi)
    }
}

/// Number of positions where two label sequences differ
pub fn hamming_loss(truth: &[usize], predicted: &[usize]) -> f64 {
    let mismatched = truth
        .iter()
        .zip(predicted)
        .filter(|(a, b)| a != b)
        .count();
    (mismatched + truth.len().abs_diff(predicted.len())) as f64
}

impl StructuredOracle for SequenceOracle {
    type Output = Vec<usize>;

    fn sample_count(&self) -> usize {
        self.sequences.len()
    }

    fn feature_dims(&self) -> usize {
        self.n_states * self.n_states + self.n_states * self.n_features
    }

    fn true_feature_map(&self, i: usize) -> Vec<f64> {
        self.joint_feature_map(i, &self.sequences[i].labels)
    }

    fn argmax(&self, w: &[f64], i: usize) -> Candidate<Vec<usize>> {
        self.viterbi(w, i, true)
    }

    fn loss(&self, i: usize, output: &Vec<usize>) -> f64 {
        hamming_loss(&self.sequences[i].labels, output)
    }

    fn predict(&self, w: &[f64], i: usize) -> Candidate<Vec<usize>> {
        self.viterbi(w, i, false)
    }
}
