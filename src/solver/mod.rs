//! Quadratic program solvers
//!
//! The cutting-plane trainer talks to solvers through the
//! [`QpSolver`](crate::core::QpSolver) trait. This module provides the
//! problem representation and a dense primal-dual interior-point solver
//! used by default.

pub mod interior_point;
pub mod problem;

pub use self::interior_point::*;
pub use self::problem::*;
