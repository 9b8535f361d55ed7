//! Working set of violated margin constraints
//!
//! Rows are stored in an append-only arena; the index a row receives when
//! it is pushed stays valid for the whole training run. Pruning never
//! removes rows, it only selects which indices are handed to the solver.

use crate::utils::dot;

/// One margin constraint `ξ_i >= δ_k - wᵀΔψ_k`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    /// Example the constraint belongs to (selects the slack variable ξ_i)
    pub example: usize,
    /// Feature difference Δψ_k = ψ(x_i, y_i) - ψ(x_i, ŷ)
    pub dpsi: Vec<f64>,
    /// Loss margin δ_k = loss(i, ŷ)
    pub delta: f64,
    /// Outer iteration that discovered the constraint
    pub iteration: usize,
}

impl ConstraintRow {
    /// Create a new constraint row
    pub fn new(example: usize, dpsi: Vec<f64>, delta: f64, iteration: usize) -> Self {
        Self {
            example,
            dpsi,
            delta,
            iteration,
        }
    }

    /// How comfortably the constraint is satisfied: ξ_i + wᵀΔψ_k - δ_k
    ///
    /// Negative values mean the constraint is violated.
    pub fn margin(&self, w: &[f64], slacks: &[f64]) -> f64 {
        slacks[self.example] + dot(w, &self.dpsi) - self.delta
    }
}

/// Append-only collection of constraint rows
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    rows: Vec<ConstraintRow>,
}

impl WorkingSet {
    /// Create an empty working set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row and return its stable index
    pub fn push(&mut self, row: ConstraintRow) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Number of rows ever added
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no row has been added yet
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at a stable index
    ///
    /// # Panics
    /// Panics if index >= len()
    pub fn get(&self, index: usize) -> &ConstraintRow {
        &self.rows[index]
    }

    /// All rows in insertion order
    pub fn rows(&self) -> &[ConstraintRow] {
        &self.rows
    }

    /// Every stable index, in insertion order
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.rows.len()).collect()
    }

    /// Number of rows tied to one example
    pub fn count_for(&self, example: usize) -> usize {
        self.rows.iter().filter(|row| row.example == example).count()
    }

    /// Margins of all rows against a solution
    pub fn margins(&self, w: &[f64], slacks: &[f64]) -> Vec<f64> {
        self.rows.iter().map(|row| row.margin(w, slacks)).collect()
    }

    /// Rows that are tight (support constraints) within `precision`
    pub fn support_constraints(&self, w: &[f64], slacks: &[f64], precision: f64) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.margin(w, slacks).abs() <= precision)
            .map(|(k, _)| k)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_indices() {
        let mut ws = WorkingSet::new();
        assert!(ws.is_empty());

        let a = ws.push(ConstraintRow::new(0, vec![1.0, 0.0], 1.0, 0));
        let b = ws.push(ConstraintRow::new(1, vec![0.0, 1.0], 2.0, 0));
        let c = ws.push(ConstraintRow::new(0, vec![1.0, 1.0], 1.0, 1));

        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(ws.len(), 3);
        assert_eq!(ws.get(b).delta, 2.0);
        assert_eq!(ws.count_for(0), 2);
        assert_eq!(ws.count_for(1), 1);
        assert_eq!(ws.all_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_margin() {
        let row = ConstraintRow::new(1, vec![1.0, -1.0], 2.0, 0);
        let w = [3.0, 1.0];
        let slacks = [0.0, 0.5];
        // 0.5 + (3 - 1) - 2
        assert_eq!(row.margin(&w, &slacks), 0.5);
    }

    #[test]
    fn test_support_constraints() {
        let mut ws = WorkingSet::new();
        ws.push(ConstraintRow::new(0, vec![1.0], 1.0, 0)); // margin 0
        ws.push(ConstraintRow::new(0, vec![2.0], 1.0, 0)); // margin 1
        ws.push(ConstraintRow::new(0, vec![1.0], 1.0005, 1)); // margin -0.0005

        let w = [1.0];
        let slacks = [0.0];
        assert_eq!(ws.margins(&w, &slacks)[1], 1.0);
        assert_eq!(ws.support_constraints(&w, &slacks, 1e-3), vec![0, 2]);
    }
}
