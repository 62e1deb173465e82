//! Hagan (2002) lognormal SABR on shifted rates.
//!
//! Inputs are always the shifted forward `F + s` and shifted strike
//! `K + s`; the shift is added once, by the caller.

use statrs::distribution::{ContinuousCDF, Normal};
use tracing::warn;

use tenor_math::solvers::{newton, SolverConfig};

use crate::error::{ModelError, ModelResult};
use crate::instruments::OptionType;

/// Largest correlation magnitude the expansion is evaluated at.
const RHO_LIMIT: f64 = 0.999;

fn standard_normal() -> ModelResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| ModelError::data(format!("standard normal: {e}")))
}

/// Effective SABR parameters fed to the lognormal formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SabrVolParams {
    /// Initial volatility level.
    pub alpha: f64,
    /// CEV exponent.
    pub beta: f64,
    /// Spot/vol correlation.
    pub rho: f64,
    /// Vol of vol.
    pub nu: f64,
}

impl SabrVolParams {
    /// Hagan lognormal implied volatility.
    pub fn implied_vol(&self, f: f64, k: f64, t: f64) -> f64 {
        lognormal_vol(self, f, k, t)
    }

    /// Black price with this parameter set's implied volatility.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` for a non-positive shifted forward or strike.
    pub fn price(&self, f: f64, k: f64, t: f64, option_type: OptionType) -> ModelResult<f64> {
        if f <= 0.0 || k <= 0.0 {
            return Err(ModelError::data(format!(
                "shifted forward {f} and strike {k} must be positive"
            )));
        }
        black_price(f, k, t, self.implied_vol(f, k, t), option_type)
    }
}

/// Shifted-lognormal ATM vol with the same ATM option value as a normal
/// vol `σ_N`: `σ_LN = (2/√t) Φ⁻¹((1 + σ_N √(t/2π) / F) / 2)`.
///
/// # Errors
///
/// `ModelError::Data` when the normal vol is too large for the forward.
pub fn atm_lognormal_vol(normal_vol: f64, f: f64, t: f64) -> ModelResult<f64> {
    if f <= 0.0 {
        return Err(ModelError::data(format!(
            "shifted forward {f} must be positive"
        )));
    }
    if t <= 0.0 {
        return Ok(normal_vol / f);
    }
    let p = 0.5 * (1.0 + normal_vol * (t / (2.0 * std::f64::consts::PI)).sqrt() / f);
    if !(0.5..1.0).contains(&p) {
        return Err(ModelError::data(format!(
            "normal vol {normal_vol} has no lognormal equivalent at forward {f}, expiry {t}"
        )));
    }
    Ok(2.0 / t.sqrt() * standard_normal()?.inverse_cdf(p))
}

/// Solves the Hagan ATM cubic for alpha:
/// `c₃α³ + c₂α² + c₁α = σ_ATM F^(1-β)`.
///
/// # Errors
///
/// `ModelError::Math` when Newton fails, `ModelError::Data` for a
/// non-positive root.
pub fn alpha_from_atm_vol(
    atm_vol: f64,
    f: f64,
    t: f64,
    beta: f64,
    rho: f64,
    nu: f64,
) -> ModelResult<f64> {
    let f_pow = f.powf(1.0 - beta);
    let c3 = (1.0 - beta).powi(2) * t / (24.0 * f_pow * f_pow);
    let c2 = rho * beta * nu * t / (4.0 * f_pow);
    let c1 = 1.0 + (2.0 - 3.0 * rho * rho) * nu * nu * t / 24.0;
    let target = atm_vol * f_pow;

    let result = newton(
        |a| ((c3 * a + c2) * a + c1) * a - target,
        |a| (3.0 * c3 * a + 2.0 * c2) * a + c1,
        target,
        &SolverConfig::new(1e-14, 50),
    )?;
    if result.root <= 0.0 {
        return Err(ModelError::data(format!(
            "ATM vol {atm_vol} gives non-positive alpha {}",
            result.root
        )));
    }
    Ok(result.root)
}

fn z_over_xz(z: f64, rho: f64) -> f64 {
    if z.abs() < 1e-8 {
        1.0 - 0.5 * rho * z + ((2.0 - 3.0 * rho * rho) / 12.0) * z * z
    } else {
        let num = (1.0 - 2.0 * rho * z + z * z).sqrt() + z - rho;
        let xz = (num / (1.0 - rho)).ln();
        if xz.abs() > 1e-14 {
            z / xz
        } else {
            1.0
        }
    }
}

/// Hagan (2002) lognormal implied volatility.
pub fn lognormal_vol(p: &SabrVolParams, f: f64, k: f64, t: f64) -> f64 {
    if f <= 0.0 || k <= 0.0 {
        return 0.0;
    }
    let alpha = p.alpha.max(1e-12);
    let beta = p.beta.clamp(0.0, 1.0);
    if p.rho.abs() > RHO_LIMIT {
        warn!(
            rho = p.rho,
            limit = RHO_LIMIT,
            "SABR rho outside the admissible range, clamped"
        );
    }
    let rho = p.rho.clamp(-RHO_LIMIT, RHO_LIMIT);
    let nu = p.nu.max(0.0);
    let omb = 1.0 - beta;

    let time_factor = |fk_pow: f64| {
        1.0 + ((omb * omb / 24.0) * alpha * alpha / fk_pow
            + (rho * beta * nu * alpha) / (4.0 * fk_pow.sqrt())
            + ((2.0 - 3.0 * rho * rho) / 24.0) * nu * nu)
            * t.max(0.0)
    };

    if (f - k).abs() <= 1e-14 {
        return alpha / f.powf(omb) * time_factor(f.powf(2.0 * omb));
    }

    let fk = f * k;
    let fk_half = fk.powf(0.5 * omb);
    let log_fk = (f / k).ln();
    let log2 = log_fk * log_fk;
    let z = (nu / alpha) * fk_half * log_fk;
    let denominator = fk_half * (1.0 + omb * omb / 24.0 * log2 + omb.powi(4) / 1920.0 * log2 * log2);

    let vol = alpha / denominator * z_over_xz(z, rho) * time_factor(fk.powf(omb));
    if vol.is_finite() {
        vol.max(0.0)
    } else {
        0.0
    }
}

/// Undiscounted Black (1976) price; intrinsic value at or after expiry.
///
/// # Errors
///
/// Only if the standard normal cannot be built.
pub fn black_price(f: f64, k: f64, t: f64, vol: f64, option_type: OptionType) -> ModelResult<f64> {
    let intrinsic = match option_type {
        OptionType::Cap => (f - k).max(0.0),
        OptionType::Floor => (k - f).max(0.0),
    };
    let sd = vol * t.max(0.0).sqrt();
    if t <= 0.0 || sd <= 0.0 {
        return Ok(intrinsic);
    }
    let n = standard_normal()?;
    let d1 = ((f / k).ln() + 0.5 * sd * sd) / sd;
    let d2 = d1 - sd;
    Ok(match option_type {
        OptionType::Cap => f * n.cdf(d1) - k * n.cdf(d2),
        OptionType::Floor => k * n.cdf(-d2) - f * n.cdf(-d1),
    })
}

/// Plain SABR: converts the quoted normal vol to alpha at horizon `t`.
///
/// # Errors
///
/// As [`atm_lognormal_vol`] and [`alpha_from_atm_vol`].
pub fn plain_params(
    normal_vol: f64,
    beta: f64,
    rho: f64,
    nu: f64,
    f: f64,
    t: f64,
) -> ModelResult<SabrVolParams> {
    let atm = atm_lognormal_vol(normal_vol, f, t)?;
    let alpha = alpha_from_atm_vol(atm, f, t, beta, rho, nu)?;
    Ok(SabrVolParams {
        alpha,
        beta,
        rho,
        nu,
    })
}
