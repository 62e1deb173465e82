//! Damped Gauss-Newton with box constraints.

use nalgebra::{DMatrix, DVector};

use super::OptimizationResult;
use crate::error::{MathError, MathResult};
use crate::linear_algebra::least_squares;

/// Configuration for [`damped_gauss_newton`].
#[derive(Debug, Clone, PartialEq)]
pub struct GaussNewtonConfig {
    /// Stop once the residual norm is at or below this.
    pub tolerance: f64,
    /// Maximum outer iterations.
    pub max_iterations: u32,
    /// Forward-difference step for the Jacobian.
    pub jacobian_step: f64,
    /// Halvings tried before giving up on a direction.
    pub max_backtracks: u32,
    /// Per-parameter lower bounds.
    pub lower: Vec<f64>,
    /// Per-parameter upper bounds.
    pub upper: Vec<f64>,
}

impl GaussNewtonConfig {
    /// Creates a configuration with the same box on every parameter.
    #[must_use]
    pub fn with_uniform_bounds(n: usize, lower: f64, upper: f64) -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 50,
            jacobian_step: 1e-6,
            max_backtracks: 12,
            lower: vec![lower; n],
            upper: vec![upper; n],
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn clip(&self, x: &mut [f64]) {
        for ((xi, lo), hi) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *xi = xi.clamp(*lo, *hi);
        }
    }
}

fn norm(r: &[f64]) -> f64 {
    let sum: f64 = r.iter().map(|v| v * v).sum();
    if sum.is_finite() {
        sum.sqrt()
    } else {
        f64::INFINITY
    }
}

/// Minimises `‖r(x)‖₂` inside a box.
///
/// Each iteration builds a forward-difference Jacobian, takes the
/// least-squares Gauss-Newton step, clips the trial point into the box and
/// halves the step until the residual norm strictly decreases. When no
/// halving improves, the best point so far is returned with
/// `converged == false`; the function does not raise for that.
///
/// # Errors
///
/// Only for malformed input: bound vectors whose length differs from the
/// initial point, or inverted bounds.
pub fn damped_gauss_newton<F>(
    mut residuals: F,
    initial: &[f64],
    config: &GaussNewtonConfig,
) -> MathResult<OptimizationResult>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let n = initial.len();
    if config.lower.len() != n || config.upper.len() != n {
        return Err(MathError::invalid_input(format!(
            "bounds have length {}/{} for {n} parameters",
            config.lower.len(),
            config.upper.len()
        )));
    }
    if config.lower.iter().zip(&config.upper).any(|(lo, hi)| lo > hi) {
        return Err(MathError::invalid_input("lower bound above upper bound"));
    }

    let mut x = initial.to_vec();
    config.clip(&mut x);
    let mut r = residuals(&x);
    let mut best = norm(&r);

    for iteration in 0..config.max_iterations {
        if best <= config.tolerance {
            return Ok(OptimizationResult {
                parameters: x,
                objective_value: best,
                iterations: iteration,
                converged: true,
            });
        }
        if !best.is_finite() {
            break;
        }

        let m = r.len();
        let mut jacobian = DMatrix::zeros(m, n);
        for j in 0..n {
            let mut bumped = x.clone();
            bumped[j] += config.jacobian_step;
            let r_bumped = residuals(&bumped);
            if r_bumped.len() != m {
                return Err(MathError::DimensionMismatch {
                    rows1: m,
                    cols1: 1,
                    rows2: r_bumped.len(),
                    cols2: 1,
                });
            }
            for i in 0..m {
                jacobian[(i, j)] = (r_bumped[i] - r[i]) / config.jacobian_step;
            }
        }

        let rhs = -DVector::from_column_slice(&r);
        let Ok(step) = least_squares(&jacobian, &rhs, 1e-12) else {
            log::debug!("gauss-newton: least-squares step failed at iteration {iteration}");
            break;
        };

        let mut scale = 1.0;
        let mut improved = false;
        for _ in 0..=config.max_backtracks {
            let mut trial: Vec<f64> = x.iter().zip(step.iter()).map(|(xi, si)| xi + scale * si).collect();
            config.clip(&mut trial);
            let r_trial = residuals(&trial);
            let trial_norm = norm(&r_trial);
            if trial_norm < best {
                x = trial;
                r = r_trial;
                best = trial_norm;
                improved = true;
                break;
            }
            scale *= 0.5;
        }

        log::trace!("gauss-newton iteration {iteration}: |r| = {best:.3e}, step scale {scale}");

        if !improved {
            log::debug!("gauss-newton: no backtracking trial improved at iteration {iteration}");
            return Ok(OptimizationResult {
                parameters: x,
                objective_value: best,
                iterations: iteration + 1,
                converged: best <= config.tolerance,
            });
        }
    }

    Ok(OptimizationResult {
        converged: best <= config.tolerance,
        parameters: x,
        objective_value: best,
        iterations: config.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solves_square_nonlinear_system() {
        // x^2 + y^2 = 4, x - y = 0  ->  x = y = sqrt(2)
        let f = |p: &[f64]| vec![p[0] * p[0] + p[1] * p[1] - 4.0, p[0] - p[1]];
        let config = GaussNewtonConfig::with_uniform_bounds(2, 0.0, 10.0);
        let result = damped_gauss_newton(f, &[1.0, 2.0], &config).unwrap();
        assert!(result.converged);
        assert_relative_eq!(result.parameters[0], std::f64::consts::SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(result.parameters[1], std::f64::consts::SQRT_2, epsilon = 1e-6);
    }

    #[test]
    fn test_box_keeps_point_feasible() {
        // root at x = -1 lies outside [0, 5]; best feasible point is the bound
        let f = |p: &[f64]| vec![p[0] + 1.0];
        let config = GaussNewtonConfig::with_uniform_bounds(1, 0.0, 5.0);
        let result = damped_gauss_newton(f, &[3.0], &config).unwrap();
        assert!(!result.converged);
        assert_relative_eq!(result.parameters[0], 0.0);
        assert_relative_eq!(result.objective_value, 1.0);
    }

    #[test]
    fn test_overdetermined_returns_best_fit() {
        // inconsistent equations x = 1 and x = 3
        let f = |p: &[f64]| vec![p[0] - 1.0, p[0] - 3.0];
        let config = GaussNewtonConfig::with_uniform_bounds(1, -10.0, 10.0);
        let result = damped_gauss_newton(f, &[0.0], &config).unwrap();
        assert!(!result.converged);
        assert_relative_eq!(result.parameters[0], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bad_bounds_rejected() {
        let f = |p: &[f64]| vec![p[0]];
        let mut config = GaussNewtonConfig::with_uniform_bounds(1, 1.0, 0.0);
        assert!(damped_gauss_newton(f, &[0.5], &config).is_err());
        config.lower = vec![];
        assert!(damped_gauss_newton(f, &[0.5], &config).is_err());
    }
}
