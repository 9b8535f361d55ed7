//! Core type definitions for structured SVM

use crate::core::{Result, SSVMError};
use serde::{Deserialize, Serialize};

/// Slack value assigned before the first solve
///
/// Far below any reachable margin violation so the first sweep treats every
/// positively violated example as violated.
pub const SLACK_SENTINEL: f64 = -1e10;

/// Output of one oracle inference call
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<Y> {
    /// Score of the returned output (including the loss term for `argmax`)
    pub score: f64,
    /// The structured output
    pub output: Y,
    /// Joint feature map ψ(x_i, output)
    pub feature_map: Vec<f64>,
}

impl<Y> Candidate<Y> {
    /// Create a new candidate
    pub fn new(score: f64, output: Y, feature_map: Vec<f64>) -> Self {
        Self {
            score,
            output,
            feature_map,
        }
    }
}

/// Prediction result containing the decoded output and its score
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<Y> {
    /// Score wᵀψ(x, output)
    pub score: f64,
    /// Predicted structured output
    pub output: Y,
}

impl<Y> Prediction<Y> {
    /// Create a new prediction
    pub fn new(score: f64, output: Y) -> Self {
        Self { score, output }
    }
}

impl<Y> From<Candidate<Y>> for Prediction<Y> {
    fn from(candidate: Candidate<Y>) -> Self {
        Self::new(candidate.score, candidate.output)
    }
}

/// How the weight vector is initialised before the first sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Uniform draws from [-1, 1) using a seeded generator
    Random { seed: u64 },
    /// All zeros
    Zeros,
    /// Caller-supplied weights (must match the feature dimension)
    Given(Vec<f64>),
}

impl Default for WeightInit {
    fn default() -> Self {
        Self::Random { seed: 42 }
    }
}

/// Configuration for the interior-point QP solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Tolerance on primal/dual residuals and the duality gap
    pub tolerance: f64,
    /// Maximum number of interior-point iterations
    pub max_iterations: usize,
    /// Relative tolerance for accepting infeasibility/unboundedness certificates
    pub certificate_tolerance: f64,
    /// Looser tolerance at which the last iterate is returned when the
    /// solver stalls or runs out of iterations
    pub relaxed_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 100,
            certificate_tolerance: 1e-7,
            relaxed_tolerance: 1e-5,
        }
    }
}

/// Configuration for the cutting-plane trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Regularization parameter (slack penalty)
    pub c: f64,
    /// Tolerance for margin violations and support constraints
    pub precision: f64,
    /// Maximum number of QP solves before reporting non-convergence
    pub max_iterations: usize,
    /// Constraints satisfied by at least this margin are left out of the next
    /// solve; `None` keeps every constraint
    pub prune_threshold: Option<f64>,
    /// Run the oracle calls of one sweep on the rayon thread pool
    pub parallel: bool,
    /// Initial weight vector
    pub weight_init: WeightInit,
    /// Number of true feature maps kept in the cache
    pub feature_cache_size: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            precision: 0.001,
            max_iterations: 1000,
            prune_threshold: Some(0.1),
            parallel: false,
            weight_init: WeightInit::default(),
            feature_cache_size: 10_000,
        }
    }
}

impl TrainerConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(SSVMError::InvalidParameter(format!(
                "C must be positive and finite, got: {}",
                self.c
            )));
        }
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(SSVMError::InvalidParameter(format!(
                "Precision must be positive and finite, got: {}",
                self.precision
            )));
        }
        if self.max_iterations == 0 {
            return Err(SSVMError::InvalidParameter(
                "Maximum number of iterations must be at least 1".to_string(),
            ));
        }
        if let Some(threshold) = self.prune_threshold {
            if threshold.is_nan() || threshold < 0.0 {
                return Err(SSVMError::InvalidParameter(format!(
                    "Prune threshold must be non-negative, got: {threshold}"
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingStatus {
    /// A full sweep found no violated example
    Converged,
    /// The iteration cap was hit while examples were still violated
    NonConvergence,
}

/// Bookkeeping for one outer iteration (one QP solve)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration number
    pub iteration: usize,
    /// Constraints added by the sweep preceding this solve
    pub new_constraints: usize,
    /// Constraints handed to the solver after pruning
    pub active_constraints: usize,
    /// Size of the working set
    pub total_constraints: usize,
    /// Primal objective returned by the solver
    pub objective: f64,
}
