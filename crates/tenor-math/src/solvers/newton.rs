//! Newton-Raphson root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{SolverConfig, SolverResult};

/// Newton-Raphson with fail-fast guards.
///
/// Converges when `|f(x)| <= tol`. Raises immediately on a non-finite
/// residual, or on a derivative that is non-finite or no larger than
/// `config.min_slope` in magnitude.
///
/// # Errors
///
/// - `MathError::NonFiniteResidual` on NaN/inf residuals
/// - `MathError::FlatDerivative` on an unusable derivative
/// - `MathError::ConvergenceFailed` when the budget runs out
pub fn newton<F, DF>(
    mut f: F,
    mut df: DF,
    initial_guess: f64,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: FnMut(f64) -> f64,
    DF: FnMut(f64) -> f64,
{
    let mut x = initial_guess;
    let mut residual = f64::NAN;

    for iteration in 0..config.max_iterations {
        residual = f(x);
        if !residual.is_finite() {
            return Err(MathError::NonFiniteResidual { x, value: residual });
        }
        if residual.abs() <= config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration,
                residual,
                converged: true,
            });
        }

        let slope = df(x);
        if !slope.is_finite() || slope.abs() <= config.min_slope {
            return Err(MathError::FlatDerivative { x, value: slope });
        }

        x -= residual / slope;
    }

    Err(MathError::convergence_failed(
        config.max_iterations,
        residual.abs(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sqrt_2() {
        let result = newton(|x| x * x - 2.0, |x| 2.0 * x, 1.5, &SolverConfig::default()).unwrap();
        assert_relative_eq!(result.root, std::f64::consts::SQRT_2, epsilon = 1e-12);
        assert!(result.converged);
    }

    #[test]
    fn test_flat_derivative_fails_fast() {
        let err = newton(|x| x * x + 1.0, |x| 2.0 * x, 0.0, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, MathError::FlatDerivative { .. }));
    }

    #[test]
    fn test_non_finite_residual_fails_fast() {
        let err = newton(|x: f64| x.ln(), |x| 1.0 / x, -1.0, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, MathError::NonFiniteResidual { .. }));
    }

    #[test]
    fn test_budget_exhausted() {
        // Newton cycles between 0 and 1 on x^3 - 2x + 2
        let err = newton(
            |x| x * x * x - 2.0 * x + 2.0,
            |x| 3.0 * x * x - 2.0,
            0.0,
            &SolverConfig::default().with_max_iterations(20),
        )
        .unwrap_err();
        assert!(matches!(err, MathError::ConvergenceFailed { iterations: 20, .. }));
    }
}
