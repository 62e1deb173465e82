//! Secant root-finding algorithm.

use crate::solvers::{SolverConfig, SolverResult};

/// Denominator used in place of an exactly flat secant.
const FLAT_SLOPE: f64 = 1e-18;

/// Secant iteration from two seeds.
///
/// `x_next = x_curr - f_curr * (x_curr - x_prev) / (f_curr - f_prev)`, with a
/// tiny stand-in for an exactly zero slope. Stops once
/// `|x_next - x_curr| <= tol * (1 + |x_curr|)`.
///
/// Never fails: when the budget runs out, or the residual turns non-finite,
/// the last iterate comes back with `converged == false` and its residual,
/// and the caller decides what that means.
///
/// # Example
///
/// ```rust
/// use tenor_math::solvers::{secant, SolverConfig};
///
/// let result = secant(|x: f64| x * x * x - 27.0, 2.0, 4.0, &SolverConfig::default());
/// assert!((result.root - 3.0).abs() < 1e-10);
/// ```
pub fn secant<F>(mut f: F, x0: f64, x1: f64, config: &SolverConfig) -> SolverResult
where
    F: FnMut(f64) -> f64,
{
    let mut x_prev = x0;
    let mut x_curr = x1;
    let mut f_prev = f(x_prev);
    let mut f_curr = f(x_curr);

    for iteration in 0..config.max_iterations {
        if !f_curr.is_finite() || !f_prev.is_finite() {
            log::debug!("secant stopped on non-finite residual at x = {x_curr}");
            return SolverResult {
                root: x_curr,
                iterations: iteration,
                residual: f_curr,
                converged: false,
            };
        }

        let mut slope = f_curr - f_prev;
        if slope == 0.0 {
            slope = FLAT_SLOPE;
        }
        let x_next = x_curr - f_curr * (x_curr - x_prev) / slope;

        if (x_next - x_curr).abs() <= config.tolerance * (1.0 + x_curr.abs()) {
            let residual = f(x_next);
            log::trace!("secant converged in {} steps: x = {x_next}", iteration + 1);
            return SolverResult {
                root: x_next,
                iterations: iteration + 1,
                residual,
                converged: true,
            };
        }

        x_prev = x_curr;
        f_prev = f_curr;
        x_curr = x_next;
        f_curr = f(x_curr);
    }

    log::debug!(
        "secant exhausted {} iterations at x = {x_curr}",
        config.max_iterations
    );
    SolverResult {
        root: x_curr,
        iterations: config.max_iterations,
        residual: f_curr,
        converged: false,
    }
}
