//! High-level API for structured SVM training
//!
//! This module wraps the cutting-plane trainer in a builder and bundles the
//! trained weights with their training record.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rssvm::api::SSVM;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Train a sequence labeller on a labeled sequence file
//! let model = SSVM::new()
//!     .with_c(1.0)
//!     .with_precision(0.001)
//!     .train_from_file("train.seq", None)?;
//!
//! let metrics = model.evaluate_from_file("test.seq")?;
//! println!("Exact match: {:.2}%", metrics.exact_match_rate() * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    Prediction, Result, SolverConfig, StructuredOracle, TrainerConfig, TrainingStatus, WeightInit,
};
use crate::data::SequenceDataset;
use crate::optimizer::{CuttingPlaneTrainer, TrainingResult};
use crate::oracle::SequenceOracle;
use crate::predictor::{EvaluationMetrics, Predictor};
use crate::solver::InteriorPointSolver;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// High-level structured SVM interface with builder pattern
#[derive(Debug, Clone, Default)]
pub struct SSVM {
    config: TrainerConfig,
    solver_config: SolverConfig,
    center_features: bool,
}

impl SSVM {
    /// Create a new SSVM with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set the violation tolerance
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.config.precision = precision;
        self
    }

    /// Set maximum number of QP solves
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the constraint pruning threshold
    pub fn with_prune_threshold(mut self, threshold: f64) -> Self {
        self.config.prune_threshold = Some(threshold);
        self
    }

    /// Hand every constraint to every solve
    pub fn without_pruning(mut self) -> Self {
        self.config.prune_threshold = None;
        self
    }

    /// Run the oracle calls of each sweep in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Set the weight initialisation
    pub fn with_weight_init(mut self, weight_init: WeightInit) -> Self {
        self.config.weight_init = weight_init;
        self
    }

    /// Seed the random weight initialisation
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_weight_init(WeightInit::Random { seed })
    }

    /// Set the number of cached true feature maps
    pub fn with_feature_cache_size(mut self, size: usize) -> Self {
        self.config.feature_cache_size = size;
        self
    }

    /// Set the interior-point solver configuration
    pub fn with_solver_config(mut self, solver_config: SolverConfig) -> Self {
        self.solver_config = solver_config;
        self
    }

    /// Mean-center sequence features before training from a file
    pub fn with_centering(mut self, center: bool) -> Self {
        self.center_features = center;
        self
    }

    /// Get the trainer configuration
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train on the examples held by an oracle
    pub fn train<O: StructuredOracle>(self, oracle: &O) -> Result<TrainedModel> {
        let trainer = CuttingPlaneTrainer::with_solver(
            self.config.clone(),
            InteriorPointSolver::new(self.solver_config),
        );
        let result = trainer.train(oracle)?;
        Ok(TrainedModel::new(result, self.config))
    }

    /// Train a sequence labeller from a labeled sequence file
    ///
    /// `n_states` defaults to the largest label in the file plus one.
    pub fn train_from_file<P: AsRef<Path>>(
        self,
        path: P,
        n_states: Option<usize>,
    ) -> Result<TrainedModel> {
        let mut oracle = SequenceDataset::from_file(path)?.into_oracle(n_states)?;
        let feature_mean = self.center_features.then(|| oracle.center_features());
        let shape = SequenceShape {
            n_states: oracle.n_states(),
            n_features: oracle.n_features(),
            feature_mean,
        };
        Ok(self.train(&oracle)?.with_sequence_shape(Some(shape)))
    }
}

/// Trained structured SVM
#[derive(Debug, Clone)]
pub struct TrainedModel {
    predictor: Predictor,
    result: TrainingResult,
    config: TrainerConfig,
    sequence_shape: Option<SequenceShape>,
}

impl TrainedModel {
    pub(crate) fn new(result: TrainingResult, config: TrainerConfig) -> Self {
        Self {
            predictor: Predictor::new(result.weights.clone()),
            result,
            config,
            sequence_shape: None,
        }
    }

    /// Trained weight vector
    pub fn weights(&self) -> &[f64] {
        self.predictor.weights()
    }

    /// Predictor over the trained weights
    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Predict every example held by an oracle
    pub fn apply<O: StructuredOracle>(&self, oracle: &O) -> Result<Vec<Prediction<O::Output>>> {
        self.predictor.apply(oracle)
    }

    /// Evaluate on the examples held by an oracle
    pub fn evaluate<O: StructuredOracle>(&self, oracle: &O) -> Result<EvaluationMetrics> {
        self.predictor.evaluate(oracle)
    }

    /// Evaluate a sequence model on a labeled sequence file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<EvaluationMetrics> {
        let oracle = self.load_sequences(path)?;
        self.evaluate(&oracle)
    }

    /// Predict label sequences for a sequence file
    pub fn predict_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Vec<usize>>> {
        let oracle = self.load_sequences(path)?;
        Ok(self
            .apply(&oracle)?
            .into_iter()
            .map(|prediction| prediction.output)
            .collect())
    }

    fn load_sequences<P: AsRef<Path>>(&self, path: P) -> Result<SequenceOracle> {
        let dataset = SequenceDataset::from_file(path)?;
        match &self.sequence_shape {
            Some(shape) => shape.oracle(dataset),
            None => dataset.into_oracle(None),
        }
    }

    /// Whether training reached a violation-free sweep
    pub fn converged(&self) -> bool {
        self.result.status == TrainingStatus::Converged
    }

    /// Full training record
    pub fn result(&self) -> &TrainingResult {
        &self.result
    }

    /// Configuration the model was trained with
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Shape of a sequence model, if known
    pub fn sequence_shape(&self) -> Option<&SequenceShape> {
        self.sequence_shape.as_ref()
    }

    pub(crate) fn with_sequence_shape(mut self, shape: Option<SequenceShape>) -> Self {
        self.sequence_shape = shape;
        self
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            dims: self.weights().len(),
            iterations: self.result.iterations,
            converged: self.converged(),
            objective: self.result.objective,
            n_constraints: self.result.working_set.len(),
            support_constraints: self.result.support_constraints,
        }
    }
}

/// Layout of a sequence labelling model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceShape {
    /// Number of hidden states
    pub n_states: usize,
    /// Number of features per position
    pub n_features: usize,
    /// Mean subtracted from the training features, if they were centered
    pub feature_mean: Option<Vec<f64>>,
}

impl SequenceShape {
    /// Build an oracle over a dataset, matching this shape
    pub fn oracle(&self, dataset: SequenceDataset) -> Result<SequenceOracle> {
        let mut oracle = SequenceOracle::with_features(
            dataset.sequences().to_vec(),
            self.n_states,
            self.n_features,
        )?;
        if let Some(mean) = &self.feature_mean {
            oracle.subtract_mean(mean);
        }
        Ok(oracle)
    }
}

/// Model information
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub dims: usize,
    pub iterations: usize,
    pub converged: bool,
    pub objective: f64,
    pub n_constraints: usize,
    pub support_constraints: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MulticlassOracle;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn separable_oracle() -> MulticlassOracle {
        MulticlassOracle::new(
            vec![
                vec![2.0, 0.0],
                vec![1.5, 0.2],
                vec![0.0, 2.0],
                vec![0.1, 1.5],
            ],
            vec![0, 0, 1, 1],
            2,
        )
        .expect("Valid oracle")
    }

    #[test]
    fn test_ssvm_builder_pattern() {
        let svm = SSVM::new()
            .with_c(2.0)
            .with_precision(0.01)
            .with_max_iterations(50)
            .with_prune_threshold(0.5)
            .with_parallel(true)
            .with_seed(7)
            .with_feature_cache_size(16);

        assert_eq!(svm.config.c, 2.0);
        assert_eq!(svm.config.precision, 0.01);
        assert_eq!(svm.config.max_iterations, 50);
        assert_eq!(svm.config.prune_threshold, Some(0.5));
        assert!(svm.config.parallel);
        assert_eq!(svm.config.weight_init, WeightInit::Random { seed: 7 });
        assert_eq!(svm.config.feature_cache_size, 16);

        let svm = svm.without_pruning();
        assert_eq!(svm.config().prune_threshold, None);
    }

    #[test]
    fn test_train_and_predict() {
        let oracle = separable_oracle();
        let model = SSVM::new()
            .with_c(10.0)
            .train(&oracle)
            .expect("Training should succeed");

        assert!(model.converged());
        assert_eq!(model.weights().len(), 4);

        let outputs: Vec<usize> = model
            .apply(&oracle)
            .expect("Prediction should succeed")
            .into_iter()
            .map(|p| p.output)
            .collect();
        assert_eq!(outputs, vec![0, 0, 1, 1]);

        let metrics = model.evaluate(&oracle).expect("Evaluation should succeed");
        assert_eq!(metrics.exact_match_rate(), 1.0);

        let info = model.info();
        assert_eq!(info.dims, 4);
        assert!(info.converged);
        assert!(info.n_constraints > 0);
    }

    #[test]
    fn test_file_operations() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "0 2.0\n1 -2.0\n0 2.0\n\n1 -1.5\n0 1.5").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let model = SSVM::new()
            .with_c(10.0)
            .train_from_file(temp_file.path(), None)
            .expect("Training should succeed");
        let shape = model.sequence_shape().expect("Sequence model");
        assert_eq!((shape.n_states, shape.n_features), (2, 1));
        assert_eq!(shape.feature_mean, None);
        assert_eq!(model.weights().len(), 2 * 2 + 2);

        let metrics = model
            .evaluate_from_file(temp_file.path())
            .expect("Evaluation should succeed");
        assert_eq!(metrics.n_samples, 2);

        let predictions = model
            .predict_from_file(temp_file.path())
            .expect("Prediction should succeed");
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].len(), 3);
    }

    #[test]
    fn test_centered_training_from_file() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "0 3.0\n1 -1.0\n\n0 2.5\n1 -0.5").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let model = SSVM::new()
            .with_c(10.0)
            .with_centering(true)
            .train_from_file(temp_file.path(), None)
            .expect("Training should succeed");
        let shape = model.sequence_shape().expect("Sequence model");
        assert_eq!(shape.feature_mean, Some(vec![1.0]));

        // The same mean is applied when evaluating
        let metrics = model
            .evaluate_from_file(temp_file.path())
            .expect("Evaluation should succeed");
        assert_eq!(metrics.n_samples, 2);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let oracle = separable_oracle();
        assert!(SSVM::new().with_c(-1.0).train(&oracle).is_err());
        assert!(SSVM::new().with_precision(0.0).train(&oracle).is_err());
    }
}
