//! Quadratic program representation
//!
//! minimize    0.5 xᵀPx + qᵀx
//! subject to  Gx <= h

use crate::core::SolverError;
use ndarray::{Array1, Array2};

/// Dense quadratic program with linear inequality constraints
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticProgram {
    /// Quadratic term (n x n, symmetric positive semi-definite)
    pub p: Array2<f64>,
    /// Linear term (n)
    pub q: Array1<f64>,
    /// Constraint matrix (m x n)
    pub g: Array2<f64>,
    /// Constraint bounds (m)
    pub h: Array1<f64>,
}

impl QuadraticProgram {
    /// Create a problem, checking that all shapes agree
    pub fn new(
        p: Array2<f64>,
        q: Array1<f64>,
        g: Array2<f64>,
        h: Array1<f64>,
    ) -> Result<Self, SolverError> {
        let problem = Self { p, q, g, h };
        problem.validate()?;
        Ok(problem)
    }

    /// Check shapes and finiteness of all entries
    pub fn validate(&self) -> Result<(), SolverError> {
        let n = self.q.len();
        if self.p.nrows() != n || self.p.ncols() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                actual: self.p.nrows().max(self.p.ncols()),
            });
        }
        if self.g.ncols() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                actual: self.g.ncols(),
            });
        }
        if self.g.nrows() != self.h.len() {
            return Err(SolverError::DimensionMismatch {
                expected: self.g.nrows(),
                actual: self.h.len(),
            });
        }
        let finite = self.p.iter().all(|v| v.is_finite())
            && self.q.iter().all(|v| v.is_finite())
            && self.g.iter().all(|v| v.is_finite())
            && self.h.iter().all(|v| v.is_finite());
        if !finite {
            return Err(SolverError::Numerical(
                "problem data contains non-finite entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of variables (n)
    pub fn num_variables(&self) -> usize {
        self.q.len()
    }

    /// Number of inequality constraints (m)
    pub fn num_constraints(&self) -> usize {
        self.h.len()
    }

    /// Objective value 0.5 xᵀPx + qᵀx
    pub fn objective(&self, x: &Array1<f64>) -> f64 {
        0.5 * x.dot(&self.p.dot(x)) + self.q.dot(x)
    }

    /// Largest constraint violation max(Gx - h), clamped at zero
    pub fn max_violation(&self, x: &Array1<f64>) -> f64 {
        (&self.g.dot(x) - &self.h)
            .iter()
            .fold(0.0_f64, |acc, &v| acc.max(v))
    }
}

/// Primal solution returned by a QP solver
#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    /// Primal optimum
    pub x: Array1<f64>,
    /// Primal objective at `x`
    pub objective: f64,
    /// Number of solver iterations
    pub iterations: usize,
}
