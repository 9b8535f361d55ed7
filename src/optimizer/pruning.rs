//! Constraint pruning heuristic
//!
//! Before each solve after the first one, rows that the latest solution
//! already satisfies by at least `threshold` are left out of the QP. They
//! stay in the working set: if a later weight vector violates them again,
//! the next sweep over the oracle rediscovers the violation.
//!
//! A higher threshold keeps more rows in each solve; a lower threshold
//! prunes more aggressively.

use crate::optimizer::working_set::WorkingSet;
use log::debug;

/// Presentation-time filter over the working set
#[derive(Debug, Clone)]
pub struct ConstraintPruner {
    /// Rows with margin >= threshold are skipped; `None` keeps everything
    threshold: Option<f64>,
    /// Rows skipped in the most recent selection
    last_pruned: usize,
    /// Rows skipped summed over all selections
    total_pruned: usize,
}

impl ConstraintPruner {
    /// Create a new pruner
    ///
    /// # Arguments
    /// * `threshold` - margin above which a row counts as comfortably satisfied
    pub fn new(threshold: Option<f64>) -> Self {
        Self {
            threshold,
            last_pruned: 0,
            total_pruned: 0,
        }
    }

    /// Pruning threshold in use
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Select the rows handed to the next solve
    ///
    /// `w` and `slacks` are the latest QP solution. Returns stable indices
    /// into `working_set` in insertion order.
    pub fn select(&mut self, working_set: &WorkingSet, w: &[f64], slacks: &[f64]) -> Vec<usize> {
        let Some(threshold) = self.threshold else {
            self.last_pruned = 0;
            return working_set.all_indices();
        };

        let active: Vec<usize> = working_set
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.margin(w, slacks) < threshold)
            .map(|(k, _)| k)
            .collect();

        self.last_pruned = working_set.len() - active.len();
        self.total_pruned += self.last_pruned;
        debug!(
            "Pruned {} of {} constraints (threshold {threshold})",
            self.last_pruned,
            working_set.len()
        );
        active
    }

    /// Rows skipped in the most recent selection
    pub fn last_pruned(&self) -> usize {
        self.last_pruned
    }

    /// Rows skipped summed over all selections
    pub fn total_pruned(&self) -> usize {
        self.total_pruned
    }
}
