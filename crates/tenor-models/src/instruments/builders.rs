//! Constructors that derive schedules from indices and conventions.

use serde::{Deserialize, Serialize};

use tenor_core::calendars::BusinessDayConvention;
use tenor_core::daycounts::DayCountConvention;
use tenor_core::schedule::ScheduleSpec;
use tenor_core::{Date, Tenor};

use super::{
    BulletCashflow, CapFloor, CapFloorlet, FixedCoupon, IborCashflow, IborFuture, Instrument,
    InterestRateSwap, OptionType, OvernightCashflow, OvernightCompounding, Position, RfrFuture,
    Swaption, SwaptionType,
};
use crate::environment::Environment;
use crate::error::{ModelError, ModelResult};

/// Terms of a vanilla fixed-for-floating swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapTerms {
    /// Floating index; overnight indices give an overnight swap.
    pub index: String,
    /// Effective date.
    pub start: Date,
    /// Termination date.
    pub maturity: Date,
    /// Fixed rate.
    pub fixed_rate: f64,
    /// Notional.
    pub notional: f64,
    /// Fixed-leg direction; short pays fixed.
    pub position: Position,
    /// Fixed-leg period, also the floating period of overnight swaps.
    pub fixed_frequency: Tenor,
    /// Fixed-leg day count.
    pub fixed_day_count: DayCountConvention,
    /// Schedule calendar name.
    pub calendar: String,
    /// Schedule roll convention.
    pub convention: BusinessDayConvention,
    /// Lag from period end to payment.
    pub payment_lag: Tenor,
    /// Overnight averaging method.
    pub compounding: OvernightCompounding,
}

impl SwapTerms {
    /// Annual receive-fixed terms on a weekend calendar.
    #[must_use]
    pub fn new(index: impl Into<String>, start: Date, maturity: Date, fixed_rate: f64) -> Self {
        Self {
            index: index.into(),
            start,
            maturity,
            fixed_rate,
            notional: 1.0,
            position: Position::Long,
            fixed_frequency: Tenor::years(1),
            fixed_day_count: DayCountConvention::Act360,
            calendar: "NONE".to_string(),
            convention: BusinessDayConvention::ModifiedFollowing,
            payment_lag: Tenor::business_days(0),
            compounding: OvernightCompounding::Compound,
        }
    }

    /// Sets the notional.
    #[must_use]
    pub fn with_notional(mut self, notional: f64) -> Self {
        self.notional = notional;
        self
    }

    /// Sets the fixed-leg direction.
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets the fixed-leg period and day count.
    #[must_use]
    pub fn with_fixed_leg(mut self, frequency: Tenor, day_count: DayCountConvention) -> Self {
        self.fixed_frequency = frequency;
        self.fixed_day_count = day_count;
        self
    }

    /// Sets the schedule calendar and roll.
    #[must_use]
    pub fn with_calendar(
        mut self,
        calendar: impl Into<String>,
        convention: BusinessDayConvention,
    ) -> Self {
        self.calendar = calendar.into();
        self.convention = convention;
        self
    }

    /// Sets the payment lag.
    #[must_use]
    pub fn with_payment_lag(mut self, lag: Tenor) -> Self {
        self.payment_lag = lag;
        self
    }

    /// Sets the overnight averaging method.
    #[must_use]
    pub fn with_compounding(mut self, compounding: OvernightCompounding) -> Self {
        self.compounding = compounding;
        self
    }
}

fn build_swap_legs(env: &Environment, terms: &SwapTerms) -> ModelResult<(InterestRateSwap, bool)> {
    let index = env.index(&terms.index)?;
    let calendar = env.calendar(&terms.calendar)?;
    let overnight = index.is_overnight();

    let fixed_periods = ScheduleSpec::new(
        terms.start,
        terms.maturity,
        terms.fixed_frequency,
        calendar.clone(),
        terms.convention,
        terms.fixed_day_count,
    )
    .with_payment_lag(terms.payment_lag)
    .generate()?;

    let float_frequency = if overnight {
        terms.fixed_frequency
    } else {
        index.tenor
    };
    let float_periods = ScheduleSpec::new(
        terms.start,
        terms.maturity,
        float_frequency,
        calendar,
        terms.convention,
        index.day_count,
    )
    .with_payment_lag(terms.payment_lag)
    .generate()?;

    let fixed_leg = fixed_periods
        .iter()
        .map(|p| FixedCoupon {
            accrual_start: p.start,
            accrual_end: p.end,
            accrual: p.accrual,
            cashflow: BulletCashflow {
                currency: index.currency,
                notional: terms.notional * terms.fixed_rate * p.accrual,
                payment_date: p.payment,
                position: terms.position,
            },
        })
        .collect();

    let float_position = terms.position.opposite();
    let floating_leg = float_periods
        .iter()
        .map(|p| {
            if overnight {
                Instrument::OvernightCashflow(OvernightCashflow {
                    currency: index.currency,
                    index: index.name.clone(),
                    accrual_start: p.start,
                    accrual_end: p.end,
                    payment_date: p.payment,
                    accrual: p.accrual,
                    notional: terms.notional,
                    position: float_position,
                    compounding: terms.compounding,
                })
            } else {
                Instrument::IborCashflow(IborCashflow {
                    currency: index.currency,
                    index: index.name.clone(),
                    accrual_start: p.start,
                    accrual_end: p.end,
                    payment_date: p.payment,
                    accrual: p.accrual,
                    notional: terms.notional,
                    position: float_position,
                })
            }
        })
        .collect();

    let swap = InterestRateSwap {
        currency: index.currency,
        index: index.name.clone(),
        start: terms.start,
        maturity: terms.maturity,
        fixed_rate: terms.fixed_rate,
        notional: terms.notional,
        position: terms.position,
        fixed_leg,
        floating_leg,
    };
    Ok((swap, overnight))
}

/// Builds an IBOR or overnight swap depending on the index.
///
/// # Errors
///
/// Unknown index or calendar, or an empty schedule.
pub fn build_swap(env: &Environment, terms: &SwapTerms) -> ModelResult<Instrument> {
    let (swap, overnight) = build_swap_legs(env, terms)?;
    Ok(if overnight {
        Instrument::OvernightSwap(swap)
    } else {
        Instrument::IborSwap(swap)
    })
}

/// Builds a term-rate future on `[start, start + index tenor]`.
///
/// # Errors
///
/// `ModelError::Configuration` for unknown or overnight indices.
pub fn build_ibor_future(
    env: &Environment,
    index: &str,
    start: Date,
    strike: f64,
    notional: f64,
    position: Position,
) -> ModelResult<Instrument> {
    let definition = env.index(index)?;
    if definition.is_overnight() {
        return Err(ModelError::configuration(format!(
            "IBOR future needs a term index, got '{index}'"
        )));
    }
    let calendar = env.calendar(&definition.calendar)?;
    let end = calendar.advance(
        start,
        definition.tenor,
        definition.convention,
        definition.end_of_month,
    )?;
    let underlying = IborCashflow {
        currency: definition.currency,
        index: definition.name.clone(),
        accrual_start: start,
        accrual_end: end,
        payment_date: end,
        accrual: definition.day_count.year_fraction(start, end),
        notional: 1.0,
        position: Position::Long,
    };
    Ok(Instrument::IborFuture(IborFuture {
        currency: definition.currency,
        index: definition.name.clone(),
        start,
        end,
        strike,
        notional,
        position,
        underlying,
    }))
}

/// Builds an overnight-rate future over `[start, end]`.
///
/// # Errors
///
/// `ModelError::Configuration` for unknown or term indices, or `end <= start`.
pub fn build_rfr_future(
    env: &Environment,
    index: &str,
    start: Date,
    end: Date,
    strike: f64,
    notional: f64,
    position: Position,
) -> ModelResult<Instrument> {
    let definition = env.index(index)?;
    if !definition.is_overnight() {
        return Err(ModelError::configuration(format!(
            "RFR future needs an overnight index, got '{index}'"
        )));
    }
    if end <= start {
        return Err(ModelError::data(format!(
            "RFR future period {start} x {end} is empty"
        )));
    }
    let underlying = OvernightCashflow {
        currency: definition.currency,
        index: definition.name.clone(),
        accrual_start: start,
        accrual_end: end,
        payment_date: end,
        accrual: definition.day_count.year_fraction(start, end),
        notional: 1.0,
        position: Position::Long,
        compounding: OvernightCompounding::Compound,
    };
    Ok(Instrument::RfrFuture(RfrFuture {
        currency: definition.currency,
        index: definition.name.clone(),
        start,
        end,
        strike,
        notional,
        position,
        underlying,
    }))
}

/// Terms of a cap or floor strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapFloorTerms {
    /// Underlying index.
    pub index: String,
    /// First accrual start.
    pub start: Date,
    /// Last accrual end.
    pub maturity: Date,
    /// Strike rate.
    pub strike: f64,
    /// Notional.
    pub notional: f64,
    /// Direction.
    pub position: Position,
    /// Cap or floor.
    pub option_type: OptionType,
    /// Optionlet period; term indices default to their own tenor.
    pub frequency: Option<Tenor>,
}

/// Builds a cap/floor strip; a single period gives a caplet instrument.
///
/// # Errors
///
/// Unknown index or calendar, an overnight index without a frequency, or an
/// empty schedule.
pub fn build_cap_floor(env: &Environment, terms: &CapFloorTerms) -> ModelResult<Instrument> {
    let index = env.index(&terms.index)?;
    let frequency = match (terms.frequency, index.is_overnight()) {
        (Some(f), _) => f,
        (None, false) => index.tenor,
        (None, true) => {
            return Err(ModelError::configuration(format!(
                "overnight cap on '{}' needs a frequency",
                index.name
            )))
        }
    };
    let calendar = env.calendar(&index.calendar)?;
    let periods = ScheduleSpec::new(
        terms.start,
        terms.maturity,
        frequency,
        calendar,
        index.convention,
        index.day_count,
    )
    .generate()?;

    let mut caplets: Vec<CapFloorlet> = periods
        .iter()
        .map(|p| CapFloorlet {
            currency: index.currency,
            index: index.name.clone(),
            accrual_start: p.start,
            accrual_end: p.end,
            payment_date: p.payment,
            accrual: p.accrual,
            strike: terms.strike,
            notional: terms.notional,
            position: terms.position,
            option_type: terms.option_type,
        })
        .collect();

    let overnight = index.is_overnight();
    if caplets.len() == 1 {
        let caplet = caplets.remove(0);
        return Ok(if overnight {
            Instrument::OvernightCapFloorlet(caplet)
        } else {
            Instrument::IborCapFloorlet(caplet)
        });
    }
    let strip = CapFloor {
        currency: index.currency,
        caplets,
    };
    Ok(if overnight {
        Instrument::OvernightCapFloor(strip)
    } else {
        Instrument::IborCapFloor(strip)
    })
}

/// Builds a swaption on the swap described by `terms`, struck at its fixed
/// rate.
///
/// # Errors
///
/// As [`build_swap`], plus `ModelError::Data` when expiry is after the swap
/// start.
pub fn build_swaption(
    env: &Environment,
    expiry: Date,
    terms: &SwapTerms,
    swaption_type: SwaptionType,
    position: Position,
) -> ModelResult<Instrument> {
    if expiry > terms.start {
        return Err(ModelError::data(format!(
            "swaption expiry {expiry} is after the swap start {}",
            terms.start
        )));
    }
    let underlying_terms = terms.clone().with_position(Position::Long);
    let (underlying, overnight) = build_swap_legs(env, &underlying_terms)?;
    let swaption = Swaption {
        currency: underlying.currency,
        expiry,
        strike: terms.fixed_rate,
        notional: terms.notional,
        position,
        swaption_type,
        underlying,
    };
    Ok(if overnight {
        Instrument::OvernightSwaption(swaption)
    } else {
        Instrument::IborSwaption(swaption)
    })
}
