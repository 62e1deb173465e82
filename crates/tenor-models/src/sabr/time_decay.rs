//! Time-decay ("top-down") effective SABR parameters.
//!
//! Parameters quoted for the option expiry `ts` are rescaled to the full
//! horizon `te` assuming volatility decays linearly after `ts` with speed
//! `p`.

use super::hagan::SabrVolParams;

/// Effective parameters over `[0, te]` for raw parameters calibrated at
/// `decay_start = ts`.
///
/// When `ts >= te` the raw parameters are returned unchanged.
pub fn time_decay_params(raw: SabrVolParams, decay_speed: f64, ts: f64, te: f64) -> SabrVolParams {
    if ts >= te {
        return raw;
    }
    let p = decay_speed;
    let SabrVolParams { alpha, rho, nu, .. } = raw;

    let tau = 2.0 * p * ts + te;
    let gamma_1 = tau
        * (2.0 * tau.powi(3) + te.powi(3) + (4.0 * p * p - 2.0 * p) * ts.powi(3)
            + 6.0 * p * ts * ts * te)
        / ((4.0 * p + 3.0) * (2.0 * p + 1.0));
    let gamma_2 = 3.0 * p * rho * rho * (te - ts).powi(2)
        * (3.0 * tau * tau - te * te + 5.0 * p * ts * ts + 4.0 * ts * te)
        / ((4.0 * p + 3.0) * (3.0 * p + 2.0).powi(2));
    let gamma = gamma_1 + gamma_2;

    let nu_hat2 = nu * nu * gamma * (2.0 * p + 1.0) / (tau.powi(3) * te);
    let h = nu * nu * (tau * tau + 2.0 * p * ts * ts + te * te) / (2.0 * te * tau * (p + 1.0))
        - nu_hat2;
    let alpha_hat2 = alpha * alpha / (2.0 * p + 1.0) * (tau / te) * (0.5 * h * te).exp();
    let rho_hat = rho * (3.0 * tau * tau + 2.0 * p * ts * ts + te * te)
        / (gamma.sqrt() * (6.0 * p + 4.0));

    SabrVolParams {
        alpha: alpha_hat2.sqrt(),
        beta: raw.beta,
        rho: rho_hat,
        nu: nu_hat2.sqrt(),
    }
}
