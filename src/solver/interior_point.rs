//! Primal-dual interior-point solver for convex quadratic programs
//!
//! Solves `minimize 0.5 xᵀPx + qᵀx subject to Gx + s = h, s >= 0` with
//! Mehrotra's predictor-corrector method. The starting point is the
//! least-squares solution of the KKT system shifted into the positive
//! orthant, so it scales with the problem data.
//!
//! Each iteration factors the reduced Newton system
//! `(P + Gᵀ diag(z/s) G) dx = r` with a dense Cholesky decomposition. Near
//! the optimum this matrix becomes badly conditioned; the factorization is
//! retried with a growing diagonal shift and the solve is refined against
//! the unshifted matrix. Every variable must be covered by P or by at least
//! one constraint.

use crate::core::{QpSolver, SolverConfig, SolverError};
use crate::solver::{QpSolution, QuadraticProgram};
use log::{debug, trace};
use ndarray::{Array1, Array2, Axis};

/// Fraction of the maximal step taken towards the boundary
const STEP_FRACTION: f64 = 0.99;

/// Initial diagonal shift, relative to the largest diagonal entry
const REGULARIZATION: f64 = 1e-13;

/// Growth of the diagonal shift between factorization attempts
const REGULARIZATION_GROWTH: f64 = 100.0;

/// Factorization attempts before giving up
const REGULARIZATION_ATTEMPTS: usize = 6;

/// Iterative refinement steps per Newton solve
const REFINEMENT_STEPS: usize = 3;

/// Entries below this (relative) level count as non-positive in the starting point
const POSITIVITY_MARGIN: f64 = 1e-8;

/// Dense primal-dual interior-point QP solver
#[derive(Debug, Clone, Default)]
pub struct InteriorPointSolver {
    config: SolverConfig,
}

impl InteriorPointSolver {
    /// Create a new solver with the given configuration
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Get the solver configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Minimize without constraints: P x = -q
    fn solve_unconstrained(&self, problem: &QuadraticProgram) -> Result<QpSolution, SolverError> {
        let factor = cholesky(&problem.p).ok_or_else(|| {
            SolverError::Numerical(
                "unconstrained problem requires a positive definite P".to_string(),
            )
        })?;
        let rhs = problem.q.mapv(|v| -v);
        let x = cholesky_solve(&factor, &rhs);
        let objective = problem.objective(&x);
        Ok(QpSolution {
            x,
            objective,
            iterations: 0,
        })
    }

    /// Return the iterate if it meets the relaxed tolerance
    fn accept_relaxed(
        &self,
        iterate: Iterate,
        residuals: &Residuals,
        scales: &Scales,
        iterations: usize,
    ) -> Option<QpSolution> {
        if !residuals.within(self.config.relaxed_tolerance, scales) {
            return None;
        }
        debug!(
            "Accepting QP iterate at relaxed tolerance after {iterations} iterations (mu={:.3e})",
            residuals.mu
        );
        Some(iterate.into_solution(residuals.objective, iterations))
    }
}

impl QpSolver for InteriorPointSolver {
    fn solve(&self, problem: &QuadraticProgram) -> Result<QpSolution, SolverError> {
        problem.validate()?;

        let n = problem.num_variables();
        let m = problem.num_constraints();
        if m == 0 {
            return self.solve_unconstrained(problem);
        }

        let tol = self.config.tolerance;
        let cert_tol = self.config.certificate_tolerance;
        let scales = Scales::new(problem);
        let mut iterate = Iterate::initial(problem)?;

        for iteration in 0..self.config.max_iterations {
            let residuals = iterate.residuals(problem);

            trace!(
                "IPM iter {iteration}: |rp|={:.3e} |rd|={:.3e} mu={:.3e}",
                norm_inf(&residuals.rp),
                norm_inf(&residuals.rd),
                residuals.mu
            );

            if residuals.within(tol, &scales) {
                debug!(
                    "QP solved in {iteration} iterations ({n} variables, {m} constraints), objective {:.6}",
                    residuals.objective
                );
                return Ok(iterate.into_solution(residuals.objective, iteration));
            }

            // Farkas certificate of primal infeasibility: z >= 0, Gᵀz = 0, hᵀz < 0
            let hz = problem.h.dot(&iterate.z);
            if hz < 0.0 && norm_inf(&residuals.gtz) <= cert_tol * -hz {
                debug!("QP infeasible (certificate found at iteration {iteration})");
                return Err(SolverError::Infeasible);
            }

            // Recession direction from a feasible iterate: Px = 0, Gx <= 0, qᵀx < 0
            let qx = problem.q.dot(&iterate.x);
            if qx < 0.0
                && norm_inf(&residuals.px) <= cert_tol * -qx
                && max_entry(&residuals.gx) <= cert_tol * -qx
                && max_entry(&(&residuals.gx - &problem.h)) <= cert_tol * scales.h
            {
                debug!("QP unbounded (certificate found at iteration {iteration})");
                return Err(SolverError::Unbounded);
            }

            let weights = &iterate.z / &iterate.s;
            let system = match NewtonSystem::factor(problem, weights) {
                Ok(system) => system,
                Err(err) => {
                    return self
                        .accept_relaxed(iterate, &residuals, &scales, iteration)
                        .ok_or(err)
                }
            };

            // Predictor (affine scaling) step
            let rc = &iterate.s * &iterate.z;
            let affine =
                system.direction(problem, &residuals.rd, &residuals.rp, &rc, &iterate.s);
            let alpha_aff = step_length(&iterate.s, &affine.ds)
                .min(step_length(&iterate.z, &affine.dz))
                .min(1.0);
            let s_aff = &iterate.s + &(&affine.ds * alpha_aff);
            let z_aff = &iterate.z + &(&affine.dz * alpha_aff);
            let mu_aff = s_aff.dot(&z_aff) / m as f64;
            let sigma = (mu_aff / residuals.mu).powi(3).clamp(0.0, 1.0);

            // Corrector step with centering
            let rc = rc + &(&affine.ds * &affine.dz) - sigma * residuals.mu;
            let step = system.direction(problem, &residuals.rd, &residuals.rp, &rc, &iterate.s);
            let alpha = (STEP_FRACTION
                * step_length(&iterate.s, &step.ds).min(step_length(&iterate.z, &step.dz)))
            .min(1.0);

            iterate.x.scaled_add(alpha, &step.dx);
            iterate.s.scaled_add(alpha, &step.ds);
            iterate.z.scaled_add(alpha, &step.dz);
        }

        let iterations = self.config.max_iterations;
        let residuals = iterate.residuals(problem);
        if residuals.within(tol, &scales) {
            return Ok(iterate.into_solution(residuals.objective, iterations));
        }
        self.accept_relaxed(iterate, &residuals, &scales, iterations)
            .ok_or(SolverError::MaxIterations { iterations })
    }
}

/// Normalisation of the residuals by the problem data
struct Scales {
    h: f64,
    q: f64,
}

impl Scales {
    fn new(problem: &QuadraticProgram) -> Self {
        Self {
            h: 1.0 + norm_inf(&problem.h),
            q: 1.0 + norm_inf(&problem.q),
        }
    }
}

/// Primal iterate x, slacks s and duals z
struct Iterate {
    x: Array1<f64>,
    s: Array1<f64>,
    z: Array1<f64>,
}

impl Iterate {
    /// Solve `[P Gᵀ; G -I] [x; z] = [-q; h]` and shift s = -z and z into the
    /// positive orthant
    fn initial(problem: &QuadraticProgram) -> Result<Self, SolverError> {
        let matrix = &problem.p + &problem.g.t().dot(&problem.g);
        let factor = regularized_cholesky(&matrix).ok_or_else(|| {
            SolverError::Numerical("starting point system is not positive definite".to_string())
        })?;
        let rhs = problem.g.t().dot(&problem.h) - &problem.q;
        let x = cholesky_solve(&factor, &rhs);
        let gx = problem.g.dot(&x);
        let s = shift_positive(&problem.h - &gx);
        let z = shift_positive(gx - &problem.h);
        Ok(Self { x, s, z })
    }

    fn residuals(&self, problem: &QuadraticProgram) -> Residuals {
        let px = problem.p.dot(&self.x);
        let gx = problem.g.dot(&self.x);
        let gtz = problem.g.t().dot(&self.z);
        let rd = &px + &problem.q + &gtz;
        let rp = &gx + &self.s - &problem.h;
        let mu = self.s.dot(&self.z) / self.s.len() as f64;
        let objective = 0.5 * self.x.dot(&px) + problem.q.dot(&self.x);
        Residuals {
            px,
            gx,
            gtz,
            rd,
            rp,
            mu,
            objective,
        }
    }

    fn into_solution(self, objective: f64, iterations: usize) -> QpSolution {
        QpSolution {
            x: self.x,
            objective,
            iterations,
        }
    }
}

/// KKT residuals of an iterate
struct Residuals {
    px: Array1<f64>,
    gx: Array1<f64>,
    gtz: Array1<f64>,
    /// Dual residual Px + q + Gᵀz
    rd: Array1<f64>,
    /// Primal residual Gx + s - h
    rp: Array1<f64>,
    /// Average complementarity sᵀz / m
    mu: f64,
    objective: f64,
}

impl Residuals {
    /// Residuals scaled by the data, gap relative to the objective
    fn within(&self, tol: f64, scales: &Scales) -> bool {
        norm_inf(&self.rp) <= tol * scales.h
            && norm_inf(&self.rd) <= tol * scales.q
            && self.mu <= tol * (1.0 + self.objective.abs())
    }
}

/// Search direction for (x, s, z)
struct Direction {
    dx: Array1<f64>,
    ds: Array1<f64>,
    dz: Array1<f64>,
}

/// Factored reduced Newton system for one iteration
struct NewtonSystem {
    matrix: Array2<f64>,
    factor: Array2<f64>,
    weights: Array1<f64>,
}

impl NewtonSystem {
    /// Factor P + Gᵀ diag(weights) G
    fn factor(problem: &QuadraticProgram, weights: Array1<f64>) -> Result<Self, SolverError> {
        let scaled_g = &problem.g * &weights.view().insert_axis(Axis(1));
        let matrix = &problem.p + &problem.g.t().dot(&scaled_g);
        let factor = regularized_cholesky(&matrix).ok_or_else(|| {
            SolverError::Numerical("reduced Newton system is not positive definite".to_string())
        })?;
        Ok(Self {
            matrix,
            factor,
            weights,
        })
    }

    /// Solve with the (possibly shifted) factor and refine against the matrix
    fn solve(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let mut x = cholesky_solve(&self.factor, rhs);
        for _ in 0..REFINEMENT_STEPS {
            let residual = rhs - &self.matrix.dot(&x);
            x += &cholesky_solve(&self.factor, &residual);
        }
        x
    }

    /// Solve the linearized KKT conditions
    ///
    /// P dx + Gᵀdz = -rd, G dx + ds = -rp, Z ds + S dz = -rc
    fn direction(
        &self,
        problem: &QuadraticProgram,
        rd: &Array1<f64>,
        rp: &Array1<f64>,
        rc: &Array1<f64>,
        s: &Array1<f64>,
    ) -> Direction {
        let rc_over_s = rc / s;
        let weighted = &self.weights * rp - &rc_over_s;
        let rhs = -(rd + &problem.g.t().dot(&weighted));
        let dx = self.solve(&rhs);
        let gdx = problem.g.dot(&dx);
        let dz = &self.weights * &(&gdx + rp) - &rc_over_s;
        let ds = -(rp + &gdx);
        Direction { dx, ds, dz }
    }
}

/// Largest step keeping `v + alpha * dv` non-negative
fn step_length(v: &Array1<f64>, dv: &Array1<f64>) -> f64 {
    v.iter()
        .zip(dv.iter())
        .filter(|&(_, &d)| d < 0.0)
        .map(|(&vi, &d)| -vi / d)
        .fold(f64::INFINITY, f64::min)
}

/// Move `v` so its smallest entry is one unless it is already safely positive
fn shift_positive(mut v: Array1<f64>) -> Array1<f64> {
    let low = v.iter().fold(f64::INFINITY, |acc, &e| acc.min(e));
    if low <= POSITIVITY_MARGIN * (1.0 + norm_inf(&v)) {
        v.mapv_inplace(|e| e + 1.0 - low);
    }
    v
}

fn norm_inf(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()))
}

fn max_entry(v: &Array1<f64>) -> f64 {
    v.iter().fold(f64::NEG_INFINITY, |acc, &x| acc.max(x))
}

/// Cholesky factor of `a + δI` for the smallest δ in a growing sequence
/// that makes the factorization succeed
fn regularized_cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let scale = 1.0 + a.diag().iter().fold(0.0_f64, |acc, &d| acc.max(d.abs()));
    if !scale.is_finite() {
        return None;
    }
    let mut shift = REGULARIZATION * scale;
    for _ in 0..REGULARIZATION_ATTEMPTS {
        let mut shifted = a.clone();
        shifted.diag_mut().mapv_inplace(|d| d + shift);
        if let Some(factor) = cholesky(&shifted) {
            return Some(factor);
        }
        trace!("Cholesky failed with shift {shift:.3e}, retrying");
        shift *= REGULARIZATION_GROWTH;
    }
    None
}

/// Lower-triangular Cholesky factor L with A = LLᵀ, or None if A is not
/// numerically positive definite
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !(diag > 0.0 && diag.is_finite()) {
            return None;
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;
        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }
    Some(l)
}

/// Solve LLᵀx = b by forward and backward substitution
fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}
