//! Optimization algorithms.
//!
//! This module provides the vector solver used when a whole curve is fitted
//! at once instead of pillar by pillar.

mod gauss_newton;

pub use gauss_newton::{damped_gauss_newton, GaussNewtonConfig};

/// Result of an optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// Best parameters found.
    pub parameters: Vec<f64>,
    /// Euclidean norm of the residual vector at `parameters`.
    pub objective_value: f64,
    /// Number of outer iterations used.
    pub iterations: u32,
    /// Whether the residual norm fell below tolerance.
    pub converged: bool,
}
