//! Error types for structured SVM training

use thiserror::Error;

/// Contract violations detected on values returned by a [`StructuredOracle`].
///
/// [`StructuredOracle`]: crate::core::StructuredOracle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Feature map of example {example} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        example: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Oracle returned a non-finite score for example {example}")]
    NonFiniteScore { example: usize },

    #[error("Oracle returned a non-finite feature map for example {example}")]
    NonFiniteFeature { example: usize },

    #[error("Oracle returned invalid loss {loss} for example {example}")]
    InvalidLoss { example: usize, loss: f64 },
}

/// Failures reported by a [`QpSolver`].
///
/// [`QpSolver`]: crate::core::QpSolver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Quadratic program is infeasible")]
    Infeasible,

    #[error("Quadratic program is unbounded")]
    Unbounded,

    #[error("Solver stopped after {iterations} iterations without converging")]
    MaxIterations { iterations: usize },

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Problem dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum SSVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Training did not converge within {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label {label}: model has {n_labels} labels")]
    InvalidLabel { label: usize, n_labels: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SSVMError {
    /// Whether the error came from the QP solver reporting an infeasible problem
    pub fn is_infeasible(&self) -> bool {
        matches!(self, SSVMError::Solver(SolverError::Infeasible))
    }
}

pub type Result<T> = std::result::Result<T, SSVMError>;
