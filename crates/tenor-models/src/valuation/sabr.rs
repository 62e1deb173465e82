//! Option engines on a SABR model.
//!
//! Forwards, annuities and discount factors come from the SABR model's
//! yield-curve model. These engines report no curve risk.

use tracing::warn;

use tenor_core::schedule::business_days;
use tenor_core::Date;

use super::yield_curve::SwapEngine;
use super::{wrong_instrument, ValuationEngine, Value};
use crate::config::{SabrMethod, ValuationParameters};
use crate::error::ModelResult;
use crate::instruments::{CapFloor, CapFloorlet, Instrument, InstrumentKind, Swaption};
use crate::model::{Model, ModelRef};
use crate::sabr::{option_price, OptionQuote, SabrModel};

/// Method actually used by an engine that only supports plain Hagan.
fn plain_only(requested: SabrMethod, kind: InstrumentKind) -> SabrMethod {
    if requested != SabrMethod::Hagan {
        warn!(
            instrument = %kind,
            ?requested,
            "SABR method not supported for this instrument, using plain Hagan"
        );
    }
    SabrMethod::Hagan
}

/// `N · DF(end) · α · price · sign` for one caplet or floorlet.
#[derive(Debug, Clone)]
pub struct CapFloorletEngine<'a> {
    model: &'a SabrModel,
    caplet: &'a CapFloorlet,
    kind: InstrumentKind,
    method: SabrMethod,
    funding: String,
}

impl<'a> CapFloorletEngine<'a> {
    /// Creates the engine. Only overnight caplets honour a non-plain
    /// SABR method.
    ///
    /// Discounting uses the funding index when given, else the caplet's
    /// own index.
    pub fn new(
        model: &'a SabrModel,
        params: &ValuationParameters,
        kind: InstrumentKind,
        caplet: &'a CapFloorlet,
    ) -> Self {
        let method = if kind == InstrumentKind::OvernightCapFloorlet {
            params.sabr_method
        } else {
            plain_only(params.sabr_method, kind)
        };
        Self {
            model,
            caplet,
            kind,
            method,
            funding: params
                .funding_index
                .clone()
                .unwrap_or_else(|| caplet.index.clone()),
        }
    }

    /// Projected forward over the accrual period.
    ///
    /// Term caplets project to the accrual end too, so a period that
    /// differs from the index tenor uses its own dates.
    pub fn forward(&self) -> ModelResult<f64> {
        let c = self.caplet;
        self.model
            .curve_model()
            .forward(&c.index, c.accrual_start, Some(c.accrual_end))
    }

    /// Curve-time lengths between consecutive fixing dates of the period.
    fn fixing_periods(&self) -> ModelResult<Vec<f64>> {
        let curves = self.model.curve_model();
        let c = self.caplet;
        let calendar = curves.environment().index_calendar(&c.index)?;
        let mut dates: Vec<Date> = business_days(c.accrual_start, c.accrual_end, calendar.as_ref());
        dates.push(c.accrual_end);
        Ok(dates
            .windows(2)
            .map(|w| curves.year_fraction(w[0], w[1]))
            .collect())
    }

    /// Undiscounted, unit-notional option price per unit accrual.
    pub fn option_price(&self) -> ModelResult<f64> {
        let curves = self.model.curve_model();
        let c = self.caplet;
        let fixing_periods = if self.method == SabrMethod::BottomUp {
            self.fixing_periods()?
        } else {
            Vec::new()
        };
        option_price(
            self.model,
            self.method,
            &OptionQuote {
                index: &c.index,
                expiry: curves.time(c.accrual_start),
                tenor: curves.year_fraction(c.accrual_start, c.accrual_end),
                forward: self.forward()?,
                strike: c.strike,
                option_type: c.option_type,
                fixing_periods: &fixing_periods,
            },
        )
    }
}

impl ValuationEngine for CapFloorletEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        self.kind
    }

    fn value(&self) -> ModelResult<Value> {
        let c = self.caplet;
        let curves = self.model.curve_model();
        if c.payment_date < curves.value_date() {
            return Ok(Value::new(c.currency, 0.0));
        }
        let df = curves.discount_factor(&self.funding, c.accrual_end)?;
        let amount = c.notional * df * c.accrual * self.option_price()? * c.position.sign();
        Ok(Value::new(c.currency, amount))
    }
}

/// Sum of caplet engines.
#[derive(Debug, Clone)]
pub struct CapFloorEngine<'a> {
    strip: &'a CapFloor,
    kind: InstrumentKind,
    caplets: Vec<CapFloorletEngine<'a>>,
}

impl<'a> CapFloorEngine<'a> {
    /// Creates one caplet engine per period.
    pub fn new(
        model: &'a SabrModel,
        params: &ValuationParameters,
        kind: InstrumentKind,
        strip: &'a CapFloor,
    ) -> Self {
        let caplet_kind = if kind == InstrumentKind::OvernightCapFloor {
            InstrumentKind::OvernightCapFloorlet
        } else {
            InstrumentKind::IborCapFloorlet
        };
        let caplets = strip
            .caplets
            .iter()
            .map(|c| CapFloorletEngine::new(model, params, caplet_kind, c))
            .collect();
        Self {
            strip,
            kind,
            caplets,
        }
    }
}

impl ValuationEngine for CapFloorEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        self.kind
    }

    fn value(&self) -> ModelResult<Value> {
        let mut total = 0.0;
        for caplet in &self.caplets {
            total += caplet.value()?.amount;
        }
        Ok(Value::new(self.strip.currency, total))
    }
}

/// `N · annuity · price · sign`; payers are priced as calls on the par
/// rate.
pub struct SwaptionEngine<'a> {
    model: &'a SabrModel,
    swaption: &'a Swaption,
    kind: InstrumentKind,
    underlying: SwapEngine<'a>,
}

impl<'a> SwaptionEngine<'a> {
    /// Creates the engine and its underlying swap engine. The annuity is
    /// discounted on the funding index when given, else the swap's index.
    ///
    /// # Errors
    ///
    /// Any error building the underlying swap engine.
    pub fn new(
        model: &'a SabrModel,
        params: &ValuationParameters,
        kind: InstrumentKind,
        swaption: &'a Swaption,
    ) -> ModelResult<Self> {
        plain_only(params.sabr_method, kind);
        let swap = &swaption.underlying;
        let funding = params
            .funding_index
            .clone()
            .unwrap_or_else(|| swap.index.clone());
        let swap_kind = if kind == InstrumentKind::OvernightSwaption {
            InstrumentKind::OvernightSwap
        } else {
            InstrumentKind::IborSwap
        };
        let underlying = SwapEngine::new(
            model.curve_model(),
            &ValuationParameters::new(funding),
            swap_kind,
            swap,
        )?;
        Ok(Self {
            model,
            swaption,
            kind,
            underlying,
        })
    }

    /// Par rate of the underlying swap.
    pub fn par_rate(&self) -> ModelResult<f64> {
        self.underlying.par_rate_or_spread()
    }

    /// Unsigned annuity of the underlying swap.
    pub fn annuity(&self) -> ModelResult<f64> {
        self.underlying.annuity()
    }
}

impl ValuationEngine for SwaptionEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        self.kind
    }

    fn value(&self) -> ModelResult<Value> {
        let s = self.swaption;
        let curves = self.model.curve_model();
        if s.expiry < curves.value_date() {
            return Ok(Value::new(s.currency, 0.0));
        }
        let price = option_price(
            self.model,
            SabrMethod::Hagan,
            &OptionQuote {
                index: &s.underlying.index,
                expiry: curves.time(s.expiry),
                tenor: curves.year_fraction(s.underlying.start, s.underlying.maturity),
                forward: self.par_rate()?,
                strike: s.strike,
                option_type: s.swaption_type.option_type(),
                fixing_periods: &[],
            },
        )?;
        let amount = s.notional * self.annuity()? * price * s.position.sign();
        Ok(Value::new(s.currency, amount))
    }
}

pub(super) fn cap_floorlet<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::IborCapFloorlet(c) | Instrument::OvernightCapFloorlet(c) => Ok(Box::new(
            CapFloorletEngine::new(model.sabr()?, params, instrument.kind(), c),
        )),
        other => Err(wrong_instrument("caplet", other)),
    }
}

pub(super) fn cap_floor<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::IborCapFloor(c) | Instrument::OvernightCapFloor(c) => Ok(Box::new(
            CapFloorEngine::new(model.sabr()?, params, instrument.kind(), c),
        )),
        other => Err(wrong_instrument("cap/floor", other)),
    }
}

pub(super) fn swaption<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::IborSwaption(s) | Instrument::OvernightSwaption(s) => Ok(Box::new(
            SwaptionEngine::new(model.sabr()?, params, instrument.kind(), s)?,
        )),
        other => Err(wrong_instrument("swaption", other)),
    }
}
