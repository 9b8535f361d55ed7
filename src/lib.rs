//! Structured output Support Vector Machine (SSVM) in Rust
//!
//! Trains the primal n-slack structured SVM with a cutting-plane working-set
//! algorithm, in the spirit of "Cutting-Plane Training of Structural SVMs"
//! by Joachims, Finley and Yu.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod optimizer;
pub mod oracle;
pub mod persistence;
pub mod predictor;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{ModelInfo, SequenceShape, TrainedModel, SSVM};
pub use crate::cache::{CacheStats, FeatureMapCache};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::SequenceDataset;
pub use crate::optimizer::{CuttingPlaneTrainer, TrainingResult};
pub use crate::oracle::{LabeledSequence, MulticlassOracle, SequenceOracle};
pub use crate::predictor::{EvaluationMetrics, Predictor};
pub use crate::solver::{InteriorPointSolver, QpSolution, QuadraticProgram};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
