//! Option prices from a SABR model under one of the three methods.

use tracing::trace;

use super::correlation::correlation_blend;
use super::hagan::{plain_params, SabrVolParams};
use super::time_decay::time_decay_params;
use super::SabrModel;
use crate::config::SabrMethod;
use crate::error::{ModelError, ModelResult};
use crate::instruments::OptionType;

/// Product qualifier of the surfaces the time-decay method reads.
pub const CAPLET_PRODUCT: &str = "CAPLET";

/// Inputs of one undiscounted option price.
#[derive(Debug, Clone, Copy)]
pub struct OptionQuote<'a> {
    /// Index whose surfaces are read.
    pub index: &'a str,
    /// Time to expiry in years.
    pub expiry: f64,
    /// Underlying tenor in years.
    pub tenor: f64,
    /// Unshifted forward.
    pub forward: f64,
    /// Unshifted strike.
    pub strike: f64,
    /// Call (cap) or put (floor).
    pub option_type: OptionType,
    /// Lengths of the fixing sub-periods, for the correlation blend.
    pub fixing_periods: &'a [f64],
}

/// Undiscounted price of a shifted-lognormal SABR option.
///
/// - `Hagan`: parameters at `(expiry, tenor)`, priced to `expiry`
/// - `TopDown`: `CAPLET` surfaces (falling back to the plain ones), alpha
///   at `expiry + tenor`, decayed from `expiry`
/// - `BottomUp`: one parameter set per fixing period, alpha at `expiry`,
///   blended with the `("corr", index)` correlation at `(expiry, ΣTᵢ)`
///
/// Both transforms price to `expiry + tenor`. The shift is added once to
/// forward and strike.
///
/// # Errors
///
/// Surface lookup failures, a non-positive shifted forward or strike, or
/// an empty fixing schedule for `BottomUp`.
pub fn option_price(
    model: &SabrModel,
    method: SabrMethod,
    quote: &OptionQuote<'_>,
) -> ModelResult<f64> {
    let OptionQuote {
        index,
        expiry,
        tenor,
        forward,
        strike,
        option_type,
        fixing_periods,
    } = *quote;

    let (params, shift, horizon) = match method {
        SabrMethod::Hagan => {
            let p = model.sabr_parameters(index, expiry, tenor, None)?;
            let f = forward + p.shift;
            (
                plain_params(p.normal_vol, p.beta, p.rho, p.nu, f, expiry)?,
                p.shift,
                expiry,
            )
        }
        SabrMethod::TopDown => {
            let p = model.sabr_parameters(index, expiry, tenor, Some(CAPLET_PRODUCT))?;
            let f = forward + p.shift;
            let te = expiry + tenor;
            let raw = plain_params(p.normal_vol, p.beta, p.rho, p.nu, f, te)?;
            (time_decay_params(raw, p.decay_speed, expiry, te), p.shift, te)
        }
        SabrMethod::BottomUp => {
            if fixing_periods.is_empty() {
                return Err(ModelError::data(format!(
                    "bottom-up SABR on {index} needs at least one fixing period"
                )));
            }
            let shift = model.sabr_parameters(index, expiry, tenor, None)?.shift;
            let f = forward + shift;
            let periods = fixing_periods
                .iter()
                .map(|&ti| {
                    let p = model.sabr_parameters(index, expiry, ti, None)?;
                    Ok((ti, plain_params(p.normal_vol, p.beta, p.rho, p.nu, f, expiry)?))
                })
                .collect::<ModelResult<Vec<(f64, SabrVolParams)>>>()?;
            let total: f64 = fixing_periods.iter().sum();
            let gamma = model.correlation_surface(index)?.corr(expiry, total);
            (
                correlation_blend(&periods, gamma)?,
                shift,
                expiry + tenor,
            )
        }
    };

    trace!(
        index,
        ?method,
        alpha = params.alpha,
        beta = params.beta,
        rho = params.rho,
        nu = params.nu,
        horizon,
        "effective SABR parameters"
    );
    params.price(forward + shift, strike + shift, horizon, option_type)
}
