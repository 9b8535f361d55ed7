//! Core traits for structured SVM training

use crate::core::{Candidate, SolverError};
use crate::solver::{QpSolution, QuadraticProgram};
use std::fmt::Debug;

/// Structured output domain plugged into the trainer
///
/// An oracle owns the examples of one structured prediction problem
/// (sequence labelling, multiclass, ...) and knows how to map an
/// (input, output) pair into the joint feature space.
pub trait StructuredOracle: Send + Sync {
    /// Structured output type (a label sequence, a class index, ...)
    type Output: Clone + Debug + PartialEq + Send;

    /// Number of examples
    fn sample_count(&self) -> usize;

    /// Dimensionality of the joint feature map
    fn feature_dims(&self) -> usize;

    /// Joint feature map ψ(x_i, y_i) of example `i` with its true output
    ///
    /// # Panics
    /// May panic if `i >= sample_count()`
    fn true_feature_map(&self, i: usize) -> Vec<f64>;

    /// Loss-augmented inference
    ///
    /// Returns an output maximising `wᵀψ(x_i, y) + loss(i, y)` together with
    /// its score and feature map.
    fn argmax(&self, w: &[f64], i: usize) -> Candidate<Self::Output>;

    /// Structured loss of predicting `output` for example `i`; zero for the truth
    fn loss(&self, i: usize, output: &Self::Output) -> f64;

    /// Prediction mode inference used on unseen data
    ///
    /// Defaults to [`argmax`](Self::argmax); domains that can decode without
    /// the loss term should override it.
    fn predict(&self, w: &[f64], i: usize) -> Candidate<Self::Output> {
        self.argmax(w, i)
    }

    /// Check if the oracle holds no examples
    fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }
}

/// Quadratic program solver
///
/// Solves `minimize 0.5 xᵀPx + qᵀx subject to Gx <= h`.
pub trait QpSolver: Send + Sync {
    /// Solve the problem, reporting infeasible and unbounded problems distinctly
    fn solve(&self, problem: &QuadraticProgram) -> std::result::Result<QpSolution, SolverError>;
}

impl<S: QpSolver + ?Sized> QpSolver for &S {
    fn solve(&self, problem: &QuadraticProgram) -> std::result::Result<QpSolution, SolverError> {
        (**self).solve(problem)
    }
}
