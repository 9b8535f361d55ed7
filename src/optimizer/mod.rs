//! Cutting-plane training of the primal structured SVM
//!
//! The trainer alternates between two phases until a sweep over all
//! examples finds nothing new:
//!
//! 1. **Scan**: ask the oracle for the most violating output of every
//!    example under the current weights and append a margin constraint for
//!    each example whose violation exceeds its slack.
//! 2. **Solve**: hand the non-negativity block plus the (pruned) working set
//!    to the QP solver and take the new slacks and weights.

pub mod formulation;
pub mod pruning;
pub mod working_set;

pub use self::pruning::ConstraintPruner;
pub use self::working_set::{ConstraintRow, WorkingSet};

use crate::cache::FeatureMapCache;
use crate::core::{
    Candidate, IterationRecord, OracleError, QpSolver, Result, SSVMError, StructuredOracle,
    TrainerConfig, TrainingStatus, WeightInit, SLACK_SENTINEL,
};
use crate::solver::InteriorPointSolver;
use crate::utils::{all_finite, difference, dot, norm_squared};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;

/// Cutting-plane trainer generic over the QP solver
pub struct CuttingPlaneTrainer<S: QpSolver = InteriorPointSolver> {
    config: TrainerConfig,
    solver: S,
}

impl CuttingPlaneTrainer<InteriorPointSolver> {
    /// Create a trainer using the default interior-point solver
    pub fn new(config: TrainerConfig) -> Self {
        Self::with_solver(config, InteriorPointSolver::default())
    }
}

impl Default for CuttingPlaneTrainer<InteriorPointSolver> {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

impl<S: QpSolver> CuttingPlaneTrainer<S> {
    /// Create a trainer with a custom QP solver
    pub fn with_solver(config: TrainerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    /// Get the trainer configuration
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Get the QP solver
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Train on the examples held by `oracle`
    ///
    /// Returns an error for invalid parameters, oracle contract violations
    /// and solver failures. Hitting `max_iterations` is not an error: the
    /// result carries [`TrainingStatus::NonConvergence`] and the last weights.
    pub fn train<O: StructuredOracle>(&self, oracle: &O) -> Result<TrainingResult> {
        self.config.validate()?;

        let n = oracle.sample_count();
        let dims = oracle.feature_dims();
        if n == 0 {
            return Err(SSVMError::EmptyDataset);
        }
        if dims == 0 {
            return Err(SSVMError::InvalidParameter(
                "Oracle reports a zero-dimensional feature map".to_string(),
            ));
        }

        let mut state = TrainingState::new(n, initial_weights(&self.config.weight_init, dims)?);
        let mut cache = FeatureMapCache::new(self.config.feature_cache_size);
        let mut pruner = ConstraintPruner::new(self.config.prune_threshold);

        info!(
            "Training structured SVM: {n} examples, {dims} dimensions, C={}",
            self.config.c
        );

        let status = loop {
            let new_constraints = self.scan_violations(oracle, &mut state, &mut cache)?;
            if new_constraints == 0 {
                break TrainingStatus::Converged;
            }
            if state.iteration >= self.config.max_iterations {
                warn!(
                    "Stopping after {} iterations with {new_constraints} violated examples",
                    state.iteration
                );
                break TrainingStatus::NonConvergence;
            }

            // The first solve sees every row; later ones skip satisfied rows
            let active = if state.iteration > 0 {
                pruner.select(&state.working_set, &state.weights, &state.slacks)
            } else {
                state.working_set.all_indices()
            };
            if state.iteration > 0 {
                info!(
                    "Iter{}: Solving with {} of {} constraints.",
                    state.iteration,
                    active.len(),
                    state.working_set.len()
                );
            }

            let problem =
                formulation::build_problem(n, dims, self.config.c, &state.working_set, &active)?;
            let solution = self.solver.solve(&problem)?;
            let (slacks, weights) = formulation::split_solution(&solution.x, n);
            state.slacks = slacks;
            state.weights = weights;

            info!(
                "Iter{}: objective {:.6} #new constraints {new_constraints}",
                state.iteration, solution.objective
            );
            state.history.push(IterationRecord {
                iteration: state.iteration,
                new_constraints,
                active_constraints: active.len(),
                total_constraints: state.working_set.len(),
                objective: solution.objective,
            });
            state.iteration += 1;
        };

        let slacks = formulation::reported_slacks(&state.slacks);
        let support_constraints = state
            .working_set
            .support_constraints(&state.weights, &slacks, self.config.precision)
            .len();
        let objective =
            0.5 * norm_squared(&state.weights) + self.config.c * slacks.iter().sum::<f64>();

        info!(
            "Training finished ({status:?}) after {} iterations: {} constraints, {support_constraints} support constraints, objective {objective:.6}",
            state.iteration,
            state.working_set.len()
        );
        debug!(
            "Feature map cache hit rate: {:.2}%",
            cache.hit_rate() * 100.0
        );

        Ok(TrainingResult {
            weights: state.weights,
            slacks,
            status,
            iterations: state.iteration,
            objective,
            history: state.history,
            working_set: state.working_set,
            support_constraints,
        })
    }

    /// One sweep over all examples; returns the number of rows added
    fn scan_violations<O: StructuredOracle>(
        &self,
        oracle: &O,
        state: &mut TrainingState,
        cache: &mut FeatureMapCache,
    ) -> Result<usize> {
        let n = oracle.sample_count();
        let dims = oracle.feature_dims();
        let w = &state.weights;

        // Oracle calls are independent given w; results keep example order
        let candidates: Vec<Candidate<O::Output>> = if self.config.parallel {
            (0..n).into_par_iter().map(|i| oracle.argmax(w, i)).collect()
        } else {
            (0..n).map(|i| oracle.argmax(w, i)).collect()
        };

        let mut new_constraints = 0;
        for (i, candidate) in candidates.into_iter().enumerate() {
            let psi_true = true_feature_map(oracle, cache, i, dims)?;
            validate_candidate(&candidate, i, dims)?;

            let loss = oracle.loss(i, &candidate.output);
            if !loss.is_finite() || loss < 0.0 {
                return Err(OracleError::InvalidLoss { example: i, loss }.into());
            }

            let violation = loss - dot(w, &psi_true) + dot(w, &candidate.feature_map);
            let slack = state.slacks[i];
            if violation > self.config.precision && slack + self.config.precision < violation {
                debug!(
                    "Example {i}: violation {violation:.6} exceeds slack {:.6}",
                    slack.max(0.0)
                );
                state.working_set.push(ConstraintRow::new(
                    i,
                    difference(&psi_true, &candidate.feature_map),
                    loss,
                    state.iteration,
                ));
                new_constraints += 1;
            }
        }

        Ok(new_constraints)
    }
}

/// Mutable state of one training run
struct TrainingState {
    weights: Vec<f64>,
    slacks: Vec<f64>,
    working_set: WorkingSet,
    history: Vec<IterationRecord>,
    iteration: usize,
}

impl TrainingState {
    fn new(n_samples: usize, weights: Vec<f64>) -> Self {
        Self {
            weights,
            slacks: vec![SLACK_SENTINEL; n_samples],
            working_set: WorkingSet::new(),
            history: Vec::new(),
            iteration: 0,
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// Trained weight vector
    pub weights: Vec<f64>,
    /// Final slack per example (zero for examples without constraints)
    pub slacks: Vec<f64>,
    /// Whether the last sweep was violation-free
    pub status: TrainingStatus,
    /// Number of QP solves
    pub iterations: usize,
    /// Primal objective 0.5 wᵀw + C Σ ξ_i at the final solution
    pub objective: f64,
    /// One record per QP solve
    pub history: Vec<IterationRecord>,
    /// Every constraint discovered during training
    pub working_set: WorkingSet,
    /// Number of constraints tight at the final solution
    pub support_constraints: usize,
}

impl TrainingResult {
    /// Whether training reached a violation-free sweep
    pub fn converged(&self) -> bool {
        self.status == TrainingStatus::Converged
    }

    /// Turn a non-converged result into [`SSVMError::NonConvergence`]
    pub fn ensure_converged(self) -> Result<Self> {
        match self.status {
            TrainingStatus::Converged => Ok(self),
            TrainingStatus::NonConvergence => Err(SSVMError::NonConvergence {
                iterations: self.iterations,
            }),
        }
    }

    /// Primal objective recorded after each solve
    pub fn objectives(&self) -> Vec<f64> {
        self.history.iter().map(|record| record.objective).collect()
    }
}

fn initial_weights(init: &WeightInit, dims: usize) -> Result<Vec<f64>> {
    match init {
        WeightInit::Random { seed } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            Ok((0..dims).map(|_| rng.random_range(-1.0..1.0)).collect())
        }
        WeightInit::Zeros => Ok(vec![0.0; dims]),
        WeightInit::Given(weights) => {
            if weights.len() != dims {
                return Err(SSVMError::DimensionMismatch {
                    expected: dims,
                    actual: weights.len(),
                });
            }
            if !all_finite(weights) {
                return Err(SSVMError::InvalidParameter(
                    "Initial weights must be finite".to_string(),
                ));
            }
            Ok(weights.clone())
        }
    }
}

fn true_feature_map<O: StructuredOracle>(
    oracle: &O,
    cache: &mut FeatureMapCache,
    i: usize,
    dims: usize,
) -> Result<Arc<Vec<f64>>> {
    cache.get_or_try_insert(i, || {
        let psi = oracle.true_feature_map(i);
        if psi.len() != dims {
            return Err(SSVMError::from(OracleError::DimensionMismatch {
                example: i,
                expected: dims,
                actual: psi.len(),
            }));
        }
        if !all_finite(&psi) {
            return Err(OracleError::NonFiniteFeature { example: i }.into());
        }
        Ok(psi)
    })
}

fn validate_candidate<Y>(candidate: &Candidate<Y>, i: usize, dims: usize) -> Result<()> {
    if candidate.feature_map.len() != dims {
        return Err(OracleError::DimensionMismatch {
            example: i,
            expected: dims,
            actual: candidate.feature_map.len(),
        }
        .into());
    }
    if !candidate.score.is_finite() {
        return Err(OracleError::NonFiniteScore { example: i }.into());
    }
    if !all_finite(&candidate.feature_map) {
        return Err(OracleError::NonFiniteFeature { example: i }.into());
    }
    Ok(())
}
