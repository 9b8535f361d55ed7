//! Model serialization and persistence
//!
//! This module provides functionality to save and load trained structured SVM
//! models for use with the CLI application and other scenarios where model
//! persistence is needed.

use crate::api::{SequenceShape, TrainedModel};
use crate::core::{IterationRecord, Result, SSVMError, TrainerConfig, TrainingStatus};
use crate::optimizer::{TrainingResult, WorkingSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Serializable representation of a trained structured SVM
#[derive(Debug, Serialize, Deserialize)]
pub struct SerializableModel {
    /// Trained weight vector
    pub weights: Vec<f64>,
    /// What the weights score
    pub domain: ModelDomain,
    /// Model metadata
    pub metadata: ModelMetadata,
}

/// Structured problem the weights belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDomain {
    /// Hidden-Markov sequence labelling
    Sequence(SequenceShape),
    /// Weights trained against a caller-supplied oracle
    Custom,
}

/// Model metadata for tracking and validation
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Training parameters used
    pub training_params: TrainingParams,
    /// Number of QP solves
    pub iterations: usize,
    /// Whether the final sweep was violation-free
    pub converged: bool,
    /// Final primal objective
    pub objective: f64,
    /// Constraints tight at the final solution
    pub support_constraints: usize,
    /// One record per QP solve
    pub history: Vec<IterationRecord>,
    /// Creation timestamp
    pub created_at: String,
}

/// Training parameters for reference
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingParams {
    pub c: f64,
    pub precision: f64,
    pub max_iterations: usize,
    pub prune_threshold: Option<f64>,
}

impl SerializableModel {
    /// Create a serializable model from a trained model
    pub fn from_trained_model(model: &TrainedModel) -> Self {
        let config = model.config();
        let result = model.result();

        let domain = match model.sequence_shape() {
            Some(shape) => ModelDomain::Sequence(shape.clone()),
            None => ModelDomain::Custom,
        };

        Self {
            weights: model.weights().to_vec(),
            domain,
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                training_params: TrainingParams {
                    c: config.c,
                    precision: config.precision,
                    max_iterations: config.max_iterations,
                    prune_threshold: config.prune_threshold,
                },
                iterations: result.iterations,
                converged: model.converged(),
                objective: result.objective,
                support_constraints: result.support_constraints,
                history: result.history.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SSVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SSVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SSVMError::IoError)?;
        let reader = BufReader::new(file);
        let model: Self = serde_json::from_reader(reader)
            .map_err(|e| SSVMError::SerializationError(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if let ModelDomain::Sequence(shape) = &self.domain {
            let dims = shape
                .n_states
                .checked_mul(shape.n_states)
                .zip(shape.n_states.checked_mul(shape.n_features))
                .and_then(|(transitions, emissions)| transitions.checked_add(emissions))
                .ok_or_else(|| {
                    SSVMError::SerializationError(format!(
                        "Sequence shape with {} states and {} features is too large",
                        shape.n_states, shape.n_features
                    ))
                })?;
            if self.weights.len() != dims {
                return Err(SSVMError::DimensionMismatch {
                    expected: dims,
                    actual: self.weights.len(),
                });
            }
            if let Some(mean) = &shape.feature_mean {
                if mean.len() != shape.n_features {
                    return Err(SSVMError::DimensionMismatch {
                        expected: shape.n_features,
                        actual: mean.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Convert back to a trained model
    ///
    /// The working set and slacks are not persisted; the restored training
    /// record carries the weights, status and history only.
    pub fn to_trained_model(&self) -> Result<TrainedModel> {
        self.validate()?;

        let params = &self.metadata.training_params;
        let config = TrainerConfig {
            c: params.c,
            precision: params.precision,
            max_iterations: params.max_iterations,
            prune_threshold: params.prune_threshold,
            ..TrainerConfig::default()
        };

        let status = if self.metadata.converged {
            TrainingStatus::Converged
        } else {
            TrainingStatus::NonConvergence
        };
        let result = TrainingResult {
            weights: self.weights.clone(),
            slacks: Vec::new(),
            status,
            iterations: self.metadata.iterations,
            objective: self.metadata.objective,
            history: self.metadata.history.clone(),
            working_set: WorkingSet::new(),
            support_constraints: self.metadata.support_constraints,
        };

        let shape = match &self.domain {
            ModelDomain::Sequence(shape) => Some(shape.clone()),
            ModelDomain::Custom => None,
        };
        Ok(TrainedModel::new(result, config).with_sequence_shape(shape))
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== Structured SVM Model Summary ===");
        match &self.domain {
            ModelDomain::Sequence(shape) => {
                println!("Domain: sequence labelling");
                println!("  States: {}", shape.n_states);
                println!("  Features: {}", shape.n_features);
                println!("  Centered: {}", shape.feature_mean.is_some());
            }
            ModelDomain::Custom => println!("Domain: custom"),
        }
        println!("Dimensions: {}", self.weights.len());
        println!("Iterations: {}", self.metadata.iterations);
        println!("Converged: {}", self.metadata.converged);
        println!("Objective: {:.6}", self.metadata.objective);
        println!("Support Constraints: {}", self.metadata.support_constraints);
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Training Parameters:");
        println!("  C: {}", self.metadata.training_params.c);
        println!("  Precision: {}", self.metadata.training_params.precision);
        println!(
            "  Max Iterations: {}",
            self.metadata.training_params.max_iterations
        );
        match self.metadata.training_params.prune_threshold {
            Some(threshold) => println!("  Prune Threshold: {threshold}"),
            None => println!("  Prune Threshold: disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SSVM;
    use crate::oracle::{LabeledSequence, SequenceOracle};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_oracle() -> SequenceOracle {
        SequenceOracle::new(
            vec![
                LabeledSequence::new(vec![vec![2.0], vec![-2.0]], vec![0, 1]),
                LabeledSequence::new(vec![vec![-1.0], vec![1.5]], vec![1, 0]),
            ],
            2,
        )
        .expect("Valid oracle")
    }

    #[test]
    fn test_model_serialization() -> Result<()> {
        let oracle = create_oracle();
        let model = SSVM::new().with_c(10.0).train(&oracle)?;
        let serializable = SerializableModel::from_trained_model(&model);
        assert_eq!(serializable.domain, ModelDomain::Custom);

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        serializable.save_to_file(temp_file.path())?;
        let loaded = SerializableModel::load_from_file(temp_file.path())?;

        assert_eq!(loaded.weights, serializable.weights);
        assert_eq!(loaded.metadata.training_params.c, 10.0);
        assert_eq!(loaded.metadata.iterations, model.result().iterations);
        assert_eq!(loaded.metadata.history.len(), model.result().history.len());

        let restored = loaded.to_trained_model()?;
        assert_eq!(restored.weights(), model.weights());
        assert_eq!(restored.converged(), model.converged());
        assert_eq!(
            restored.apply(&oracle)?,
            model.apply(&oracle)?
        );
        Ok(())
    }

    #[test]
    fn test_sequence_domain_round_trip() -> Result<()> {
        let shape = SequenceShape {
            n_states: 2,
            n_features: 1,
            feature_mean: Some(vec![0.5]),
        };
        let model = SSVM::new()
            .with_c(10.0)
            .train(&create_oracle())?
            .with_sequence_shape(Some(shape.clone()));

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        SerializableModel::from_trained_model(&model).save_to_file(temp_file.path())?;

        let loaded = SerializableModel::load_from_file(temp_file.path())?;
        assert_eq!(loaded.domain, ModelDomain::Sequence(shape.clone()));
        let restored = loaded.to_trained_model()?;
        assert_eq!(restored.sequence_shape(), Some(&shape));
        Ok(())
    }

    #[test]
    fn test_rejects_inconsistent_weights() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(
            temp_file,
            r#"{{
                "weights": [1.0, 2.0],
                "domain": {{"type": "sequence", "n_states": 2, "n_features": 1, "feature_mean": null}},
                "metadata": {{
                    "library_version": "0.1.0",
                    "training_params": {{"c": 1.0, "precision": 0.001, "max_iterations": 10, "prune_threshold": null}},
                    "iterations": 1,
                    "converged": true,
                    "objective": 0.5,
                    "support_constraints": 1,
                    "history": [],
                    "created_at": "2024-01-01T00:00:00Z"
                }}
            }}"#
        )
        .expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        assert!(matches!(
            SerializableModel::load_from_file(temp_file.path()),
            Err(SSVMError::DimensionMismatch {
                expected: 6,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_rejects_oversized_sequence_shape() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(
            temp_file,
            r#"{{
                "weights": [1.0],
                "domain": {{"type": "sequence", "n_states": {}, "n_features": 3, "feature_mean": null}},
                "metadata": {{
                    "library_version": "0.1.0",
                    "training_params": {{"c": 1.0, "precision": 0.001, "max_iterations": 10, "prune_threshold": null}},
                    "iterations": 1,
                    "converged": true,
                    "objective": 0.5,
                    "support_constraints": 1,
                    "history": [],
                    "created_at": "2024-01-01T00:00:00Z"
                }}
            }}"#,
            usize::MAX
        )
        .expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        assert!(matches!(
            SerializableModel::load_from_file(temp_file.path()),
            Err(SSVMError::SerializationError(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(temp_file, "{{ not json").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        assert!(matches!(
            SerializableModel::load_from_file(temp_file.path()),
            Err(SSVMError::SerializationError(_))
        ));
    }
}
