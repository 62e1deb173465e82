//! Correlation-blend ("bottom-up") effective SABR parameters.

use tenor_math::interpolation::BilinearSurface;

use super::hagan::SabrVolParams;
use crate::error::{ModelError, ModelResult};

/// Terminal correlation between the first and last fixing of a period,
/// over (expiry, period length).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationSurface {
    surface: BilinearSurface,
}

impl CorrelationSurface {
    /// Creates a surface from a grid.
    ///
    /// # Errors
    ///
    /// `ModelError::Math` for unsorted axes or a ragged grid.
    pub fn new(axis1: Vec<f64>, axis2: Vec<f64>, grid: Vec<Vec<f64>>) -> ModelResult<Self> {
        Ok(Self {
            surface: BilinearSurface::new(axis1, axis2, grid)?,
        })
    }

    /// Correlation at `(expiry, tenor)`.
    pub fn corr(&self, expiry: f64, tenor: f64) -> f64 {
        self.surface.interpolate(expiry, tenor)
    }
}

/// Blends per-period parameters `(Tᵢ, αᵢ, βᵢ, νᵢ, ρᵢ)` into one set for
/// the whole horizon `T = ΣTᵢ`.
///
/// Correlation decays linearly in the distance between cumulative fixing
/// times, from 1 to `gamma_corr` across the horizon. A single period
/// returns its parameters with `γ̄ = 1`.
///
/// # Errors
///
/// `ModelError::Data` for an empty schedule or a non-positive horizon.
pub fn correlation_blend(
    periods: &[(f64, SabrVolParams)],
    gamma_corr: f64,
) -> ModelResult<SabrVolParams> {
    let n = periods.len();
    let total: f64 = periods.iter().map(|(t, _)| t).sum();
    if n == 0 || total <= 0.0 {
        return Err(ModelError::data(format!(
            "correlation blend needs a positive horizon, got {n} periods over {total}"
        )));
    }

    let gamma_bar = if n == 1 {
        1.0
    } else {
        let mu = (1.0 - gamma_corr) / (n - 1) as f64;
        let taus: Vec<f64> = periods
            .iter()
            .scan(0.0, |acc, (t, _)| {
                *acc += t;
                Some(*acc)
            })
            .collect();
        let mut sum = 0.0;
        for ti in &taus {
            for tj in &taus {
                sum += (1.0 - mu * (ti - tj).abs()).max(0.0);
            }
        }
        sum / (n * n) as f64
    };

    let mut blended = SabrVolParams {
        alpha: 0.0,
        beta: 0.0,
        rho: 0.0,
        nu: 0.0,
    };
    for (t, p) in periods {
        let w = t / total;
        let scale = (t / total).sqrt();
        blended.alpha += w * p.alpha * scale;
        blended.beta += w * p.beta;
        blended.nu += w * p.nu * scale;
        blended.rho += w * p.rho;
    }
    blended.alpha *= gamma_bar.sqrt();
    blended.rho /= gamma_bar.sqrt();
    Ok(blended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(alpha: f64, beta: f64, rho: f64, nu: f64) -> SabrVolParams {
        SabrVolParams {
            alpha,
            beta,
            rho,
            nu,
        }
    }

    #[test]
    fn test_full_correlation_is_weighted_average() {
        let periods = [
            (0.25, params(0.02, 0.5, -0.1, 0.3)),
            (0.25, params(0.04, 0.7, -0.3, 0.5)),
        ];
        let blended = correlation_blend(&periods, 1.0).unwrap();
        let scale = 0.5f64.sqrt();
        assert_relative_eq!(blended.alpha, 0.5 * (0.02 + 0.04) * scale, epsilon = 1e-15);
        assert_relative_eq!(blended.beta, 0.6, epsilon = 1e-15);
        assert_relative_eq!(blended.rho, -0.2, epsilon = 1e-15);
        assert_relative_eq!(blended.nu, 0.5 * (0.3 + 0.5) * scale, epsilon = 1e-15);
    }

    #[test]
    fn test_decorrelation_lowers_alpha_and_raises_rho() {
        let periods = [
            (0.25, params(0.03, 0.5, -0.2, 0.4)),
            (0.25, params(0.03, 0.5, -0.2, 0.4)),
            (0.25, params(0.03, 0.5, -0.2, 0.4)),
        ];
        let full = correlation_blend(&periods, 1.0).unwrap();
        let partial = correlation_blend(&periods, 0.6).unwrap();
        // mu = 0.2; |tau_i - tau_j| in {0, 0.25, 0.5}
        let gamma_bar = (3.0 + 4.0 * 0.95 + 2.0 * 0.9) / 9.0;
        assert_relative_eq!(partial.alpha, full.alpha * f64::sqrt(gamma_bar), epsilon = 1e-15);
        assert_relative_eq!(partial.rho, full.rho / f64::sqrt(gamma_bar), epsilon = 1e-15);
        assert_eq!(partial.nu, full.nu);
    }

    #[test]
    fn test_single_period_and_empty() {
        let p = params(0.03, 0.5, -0.2, 0.4);
        let blended = correlation_blend(&[(1.0, p)], 0.3).unwrap();
        assert_relative_eq!(blended.alpha, p.alpha, epsilon = 1e-15);
        assert_relative_eq!(blended.rho, p.rho, epsilon = 1e-15);
        assert!(correlation_blend(&[], 0.5).is_err());
    }
}
