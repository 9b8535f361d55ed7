//! QP formulation of the n-slack structured SVM
//!
//! Variables are laid out as `x = [ξ_1..ξ_N, w_1..w_DIMS]`:
//!
//! minimize    0.5 wᵀw + C Σ ξ_i
//! subject to  -ξ_i <= 0                       for every example i
//!             -Δψ_kᵀw - ξ_i <= -δ_k           for every active row k of example i

use crate::core::{SolverError, SLACK_SENTINEL};
use crate::optimizer::working_set::WorkingSet;
use crate::solver::QuadraticProgram;
use ndarray::{s, Array1, Array2};

/// Build the QP over the non-negativity block and the selected rows
pub fn build_problem(
    n_samples: usize,
    dims: usize,
    c: f64,
    working_set: &WorkingSet,
    active: &[usize],
) -> Result<QuadraticProgram, SolverError> {
    let n_vars = n_samples + dims;
    let n_constraints = n_samples + active.len();

    // Quadratic regularizer on w only
    let mut p = Array2::<f64>::zeros((n_vars, n_vars));
    for j in n_samples..n_vars {
        p[[j, j]] = 1.0;
    }

    // Linear penalty on slacks
    let mut q = Array1::<f64>::zeros(n_vars);
    q.slice_mut(s![..n_samples]).fill(c);

    let mut g = Array2::<f64>::zeros((n_constraints, n_vars));
    let mut h = Array1::<f64>::zeros(n_constraints);

    for i in 0..n_samples {
        g[[i, i]] = -1.0;
    }

    for (offset, &k) in active.iter().enumerate() {
        let row = working_set.get(k);
        if row.dpsi.len() != dims {
            return Err(SolverError::DimensionMismatch {
                expected: dims,
                actual: row.dpsi.len(),
            });
        }
        let r = n_samples + offset;
        g[[r, row.example]] = -1.0;
        for (j, &value) in row.dpsi.iter().enumerate() {
            g[[r, n_samples + j]] = -value;
        }
        h[r] = -row.delta;
    }

    QuadraticProgram::new(p, q, g, h)
}

/// Split a solution vector into (slacks, weights)
pub fn split_solution(x: &Array1<f64>, n_samples: usize) -> (Vec<f64>, Vec<f64>) {
    let slacks = x.slice(s![..n_samples]).to_vec();
    let weights = x.slice(s![n_samples..]).to_vec();
    (slacks, weights)
}

/// Slack values reported to callers
///
/// Before the first solve every slack still holds the sentinel; an example
/// without constraints has a zero optimal slack.
pub fn reported_slacks(slacks: &[f64]) -> Vec<f64> {
    slacks
        .iter()
        .map(|&s| if s <= SLACK_SENTINEL { 0.0 } else { s.max(0.0) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::working_set::ConstraintRow;
    use ndarray::array;

    #[test]
    fn test_problem_layout() {
        let mut ws = WorkingSet::new();
        ws.push(ConstraintRow::new(1, vec![1.0, -2.0], 3.0, 0));
        ws.push(ConstraintRow::new(0, vec![0.5, 0.5], 1.0, 0));

        let problem = build_problem(2, 2, 0.5, &ws, &[0, 1]).expect("Valid problem");

        assert_eq!(problem.num_variables(), 4);
        assert_eq!(problem.num_constraints(), 4);
        assert_eq!(problem.q, array![0.5, 0.5, 0.0, 0.0]);
        assert_eq!(
            problem.p.diag().to_vec(),
            vec![0.0, 0.0, 1.0, 1.0]
        );

        // Non-negativity block
        assert_eq!(problem.g.row(0).to_vec(), vec![-1.0, 0.0, 0.0, 0.0]);
        assert_eq!(problem.g.row(1).to_vec(), vec![0.0, -1.0, 0.0, 0.0]);

        // Margin rows
        assert_eq!(problem.g.row(2).to_vec(), vec![0.0, -1.0, -1.0, 2.0]);
        assert_eq!(problem.g.row(3).to_vec(), vec![-1.0, 0.0, -0.5, -0.5]);
        assert_eq!(problem.h, array![0.0, 0.0, -3.0, -1.0]);
    }

    #[test]
    fn test_only_active_rows_are_used() {
        let mut ws = WorkingSet::new();
        ws.push(ConstraintRow::new(0, vec![1.0], 1.0, 0));
        ws.push(ConstraintRow::new(0, vec![2.0], 2.0, 1));

        let problem = build_problem(1, 1, 1.0, &ws, &[1]).expect("Valid problem");
        assert_eq!(problem.num_constraints(), 2);
        assert_eq!(problem.h, array![0.0, -2.0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut ws = WorkingSet::new();
        ws.push(ConstraintRow::new(0, vec![1.0, 2.0, 3.0], 1.0, 0));
        let result = build_problem(1, 2, 1.0, &ws, &[0]);
        assert!(matches!(
            result,
            Err(SolverError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_split_solution() {
        let x = array![0.1, 0.2, 1.0, 2.0, 3.0];
        let (slacks, weights) = split_solution(&x, 2);
        assert_eq!(slacks, vec![0.1, 0.2]);
        assert_eq!(weights, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_reported_slacks() {
        assert_eq!(
            reported_slacks(&[SLACK_SENTINEL, -1e-12, 0.3]),
            vec![0.0, 0.0, 0.3]
        );
    }
}
