//! Engines that only need discount and forward curves.

use tenor_core::schedule::business_days;
use tenor_core::Date;

use super::{create_engine, wrong_instrument, CashflowRow, ValuationEngine, Value};
use crate::config::ValuationParameters;
use crate::curves::{GradientBuffer, YieldCurveModel};
use crate::error::{ModelError, ModelResult};
use crate::instruments::{
    BulletCashflow, FixedCoupon, IborCashflow, IborFuture, Instrument, InstrumentKind,
    InterestRateSwap, OvernightCashflow, OvernightCompounding, RfrFuture,
};
use crate::model::{Model, ModelRef};

/// `N · sign · DF(pay)` on the funding curve; zero once paid.
#[derive(Debug, Clone)]
pub struct BulletCashflowEngine<'a> {
    model: &'a YieldCurveModel,
    cashflow: &'a BulletCashflow,
    funding: String,
}

impl<'a> BulletCashflowEngine<'a> {
    /// Creates the engine.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` without a funding index.
    pub fn new(
        model: &'a YieldCurveModel,
        params: &ValuationParameters,
        cashflow: &'a BulletCashflow,
    ) -> ModelResult<Self> {
        Ok(Self {
            model,
            cashflow,
            funding: params.require_funding_index()?.to_string(),
        })
    }

    fn expired(&self) -> bool {
        self.cashflow.payment_date < self.model.value_date()
    }

    fn signed_notional(&self) -> f64 {
        self.cashflow.notional * self.cashflow.position.sign()
    }
}

impl ValuationEngine for BulletCashflowEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        InstrumentKind::BulletCashflow
    }

    fn value(&self) -> ModelResult<Value> {
        let amount = if self.expired() {
            0.0
        } else {
            self.signed_notional()
                * self
                    .model
                    .discount_factor(&self.funding, self.cashflow.payment_date)?
        };
        Ok(Value::new(self.cashflow.currency, amount))
    }

    fn calculate_first_order_risk(
        &self,
        gradient: &mut GradientBuffer,
        scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        if !accumulate {
            gradient.clear();
        }
        if self.expired() {
            return Ok(());
        }
        self.model.discount_factor_gradient(
            &self.funding,
            self.cashflow.payment_date,
            gradient,
            scaler * self.signed_notional(),
            true,
        )
    }
}

/// Undiscounted IBOR coupon `F · α · N · sign`.
///
/// A coupon whose accrual has started uses the published fixing at the
/// accrual start and carries no curve risk.
#[derive(Debug, Clone)]
pub struct IborCashflowEngine<'a> {
    model: &'a YieldCurveModel,
    cashflow: &'a IborCashflow,
}

impl<'a> IborCashflowEngine<'a> {
    /// Creates the engine.
    pub fn new(model: &'a YieldCurveModel, cashflow: &'a IborCashflow) -> Self {
        Self { model, cashflow }
    }

    fn fixed(&self) -> bool {
        self.cashflow.accrual_start < self.model.value_date()
    }

    /// Fixing or projected forward for the coupon.
    pub fn rate(&self) -> ModelResult<f64> {
        let cf = self.cashflow;
        if self.fixed() {
            self.model
                .environment()
                .fixings
                .get(&cf.index, cf.accrual_start)
        } else {
            self.model.forward(&cf.index, cf.accrual_start, None)
        }
    }

    fn scale(&self) -> f64 {
        self.cashflow.accrual * self.cashflow.notional * self.cashflow.position.sign()
    }
}

impl ValuationEngine for IborCashflowEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        InstrumentKind::IborCashflow
    }

    fn value(&self) -> ModelResult<Value> {
        Ok(Value::new(self.cashflow.currency, self.rate()? * self.scale()))
    }

    fn calculate_first_order_risk(
        &self,
        gradient: &mut GradientBuffer,
        scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        if !accumulate {
            gradient.clear();
        }
        if self.fixed() {
            return Ok(());
        }
        self.model.forward_gradient(
            &self.cashflow.index,
            self.cashflow.accrual_start,
            None,
            gradient,
            scaler * self.scale(),
            true,
        )
    }
}

/// Realised and projected parts of an overnight coupon.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OvernightAccrual {
    /// Compound factor `Π(1 + rδ)` or average sum `Σ rδ` over fixed days.
    realised: f64,
    /// Start and index accrual of the unfixed stub, if any.
    stub: Option<(Date, f64)>,
}

/// Undiscounted overnight coupon, compounded or averaged.
///
/// Days in `[start, value_date)` use published fixings; the rest of the
/// period is projected with one forward from the curve.
#[derive(Debug, Clone)]
pub struct OvernightCashflowEngine<'a> {
    model: &'a YieldCurveModel,
    cashflow: &'a OvernightCashflow,
}

impl<'a> OvernightCashflowEngine<'a> {
    /// Creates the engine.
    pub fn new(model: &'a YieldCurveModel, cashflow: &'a OvernightCashflow) -> Self {
        Self { model, cashflow }
    }

    fn accrual(&self) -> ModelResult<OvernightAccrual> {
        let cf = self.cashflow;
        let env = self.model.environment();
        let index = env.index(&cf.index)?;
        let value_date = self.model.value_date();
        let cutoff = value_date.min(cf.accrual_end);

        let mut realised = match cf.compounding {
            OvernightCompounding::Compound => 1.0,
            OvernightCompounding::Average => 0.0,
        };
        if cf.accrual_start < cutoff {
            let calendar = env.index_calendar(&cf.index)?;
            for day in business_days(cf.accrual_start, cutoff, calendar.as_ref()) {
                let next = calendar.add_business_days(day, 1).min(cutoff);
                let delta = index.day_count.year_fraction(day, next);
                let fixing = env.fixings.get(&cf.index, day)?;
                match cf.compounding {
                    OvernightCompounding::Compound => realised *= 1.0 + fixing * delta,
                    OvernightCompounding::Average => realised += fixing * delta,
                }
            }
        }

        let stub_start = value_date.max(cf.accrual_start);
        let stub = (stub_start < cf.accrual_end).then(|| {
            (
                stub_start,
                index.day_count.year_fraction(stub_start, cf.accrual_end),
            )
        });
        Ok(OvernightAccrual { realised, stub })
    }

    fn signed_notional(&self) -> f64 {
        self.cashflow.notional * self.cashflow.position.sign()
    }
}

impl ValuationEngine for OvernightCashflowEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        InstrumentKind::OvernightCashflow
    }

    fn value(&self) -> ModelResult<Value> {
        let cf = self.cashflow;
        let accrual = self.accrual()?;
        let projected = match accrual.stub {
            Some((start, alpha)) => {
                self.model.forward(&cf.index, start, Some(cf.accrual_end))? * alpha
            }
            None => 0.0,
        };
        let interest = match cf.compounding {
            OvernightCompounding::Compound => accrual.realised * (1.0 + projected) - 1.0,
            OvernightCompounding::Average => accrual.realised + projected,
        };
        Ok(Value::new(cf.currency, self.signed_notional() * interest))
    }

    fn calculate_first_order_risk(
        &self,
        gradient: &mut GradientBuffer,
        scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        if !accumulate {
            gradient.clear();
        }
        let cf = self.cashflow;
        let accrual = self.accrual()?;
        let Some((start, alpha)) = accrual.stub else {
            return Ok(());
        };
        let weight = match cf.compounding {
            OvernightCompounding::Compound => accrual.realised * alpha,
            OvernightCompounding::Average => alpha,
        };
        self.model.forward_gradient(
            &cf.index,
            start,
            Some(cf.accrual_end),
            gradient,
            scaler * self.signed_notional() * weight,
            true,
        )
    }
}

/// Futures contract on one floating coupon:
/// `(100 · (1 - F) - K) · N · sign · DF(end)`.
///
/// `F` is the undiscounted value of a unit coupon divided by its accrual.
#[derive(Debug, Clone)]
pub struct FuturesEngine<'a, E> {
    model: &'a YieldCurveModel,
    instrument: &'a Instrument,
    terms: FuturesTerms,
    child: E,
    funding: String,
}

#[derive(Debug, Clone, Copy)]
struct FuturesTerms {
    end: Date,
    strike: f64,
    signed_notional: f64,
    accrual: f64,
}

/// IBOR futures engine.
pub type IborFutureEngine<'a> = FuturesEngine<'a, IborCashflowEngine<'a>>;

/// RFR futures engine.
pub type RfrFutureEngine<'a> = FuturesEngine<'a, OvernightCashflowEngine<'a>>;

impl<'a> IborFutureEngine<'a> {
    /// Creates the engine.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` without a funding index.
    pub fn for_ibor(
        model: &'a YieldCurveModel,
        params: &ValuationParameters,
        instrument: &'a Instrument,
        future: &'a IborFuture,
    ) -> ModelResult<Self> {
        Ok(Self {
            model,
            instrument,
            terms: FuturesTerms {
                end: future.end,
                strike: future.strike,
                signed_notional: future.notional * future.position.sign(),
                accrual: future.underlying.accrual,
            },
            child: IborCashflowEngine::new(model, &future.underlying),
            funding: params.require_funding_index()?.to_string(),
        })
    }
}

impl<'a> RfrFutureEngine<'a> {
    /// Creates the engine.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` without a funding index.
    pub fn for_rfr(
        model: &'a YieldCurveModel,
        params: &ValuationParameters,
        instrument: &'a Instrument,
        future: &'a RfrFuture,
    ) -> ModelResult<Self> {
        Ok(Self {
            model,
            instrument,
            terms: FuturesTerms {
                end: future.end,
                strike: future.strike,
                signed_notional: future.notional * future.position.sign(),
                accrual: future.underlying.accrual,
            },
            child: OvernightCashflowEngine::new(model, &future.underlying),
            funding: params.require_funding_index()?.to_string(),
        })
    }
}

impl<E: ValuationEngine> FuturesEngine<'_, E> {
    /// Model forward rate of the reference period.
    pub fn forward(&self) -> ModelResult<f64> {
        if self.terms.accrual <= 0.0 {
            return Err(ModelError::data(format!(
                "{} reference period has no accrual",
                self.instrument.kind()
            )));
        }
        Ok(self.child.value()?.amount / self.terms.accrual)
    }

    /// Model futures price `100 · (1 - F)`.
    pub fn model_price(&self) -> ModelResult<f64> {
        Ok(100.0 * (1.0 - self.forward()?))
    }
}

impl<E: ValuationEngine> ValuationEngine for FuturesEngine<'_, E> {
    fn instrument_kind(&self) -> InstrumentKind {
        self.instrument.kind()
    }

    fn value(&self) -> ModelResult<Value> {
        let df = self.model.discount_factor(&self.funding, self.terms.end)?;
        let amount = (self.model_price()? - self.terms.strike) * self.terms.signed_notional * df;
        Ok(Value::new(self.instrument.currency(), amount))
    }

    fn calculate_first_order_risk(
        &self,
        gradient: &mut GradientBuffer,
        scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        if !accumulate {
            gradient.clear();
        }
        let df = self.model.discount_factor(&self.funding, self.terms.end)?;
        let n = self.terms.signed_notional;
        self.child.calculate_first_order_risk(
            gradient,
            scaler * (-100.0 * n * df) / self.terms.accrual,
            true,
        )?;
        self.model.discount_factor_gradient(
            &self.funding,
            self.terms.end,
            gradient,
            scaler * (self.model_price()? - self.terms.strike) * n,
            true,
        )
    }
}

struct FloatingCoupon<'a> {
    cashflow: &'a Instrument,
    engine: Box<dyn ValuationEngine + 'a>,
}

impl FloatingCoupon<'_> {
    /// Payment date, accrual dates and accrual fraction.
    fn schedule(&self) -> ModelResult<(Date, Date, Date, f64, f64)> {
        match self.cashflow {
            Instrument::IborCashflow(c) => Ok((
                c.payment_date,
                c.accrual_start,
                c.accrual_end,
                c.accrual,
                c.notional * c.position.sign(),
            )),
            Instrument::OvernightCashflow(c) => Ok((
                c.payment_date,
                c.accrual_start,
                c.accrual_end,
                c.accrual,
                c.notional * c.position.sign(),
            )),
            other => Err(ModelError::unsupported(format!(
                "{} cannot be a floating coupon",
                other.kind()
            ))),
        }
    }

    fn payment_date(&self) -> ModelResult<Date> {
        Ok(self.schedule()?.0)
    }
}

/// Fixed-versus-floating swap on one curve model.
///
/// Coupons paid before the value date are dropped at construction.
pub struct SwapEngine<'a> {
    model: &'a YieldCurveModel,
    swap: &'a InterestRateSwap,
    kind: InstrumentKind,
    funding: String,
    fixed: Vec<(&'a FixedCoupon, BulletCashflowEngine<'a>)>,
    floating: Vec<FloatingCoupon<'a>>,
}

impl<'a> SwapEngine<'a> {
    /// Creates the engine and one child engine per live coupon.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` without a funding index, or a child
    /// construction error.
    pub fn new(
        model: &'a YieldCurveModel,
        params: &ValuationParameters,
        kind: InstrumentKind,
        swap: &'a InterestRateSwap,
    ) -> ModelResult<Self> {
        let funding = params.require_funding_index()?.to_string();
        let value_date = model.value_date();

        let fixed = swap
            .fixed_leg
            .iter()
            .filter(|c| c.cashflow.payment_date >= value_date)
            .map(|c| Ok((c, BulletCashflowEngine::new(model, params, &c.cashflow)?)))
            .collect::<ModelResult<Vec<_>>>()?;

        let mut floating = Vec::with_capacity(swap.floating_leg.len());
        for cashflow in &swap.floating_leg {
            let engine = create_engine(ModelRef::YieldCurve(model), params, cashflow)?;
            let coupon = FloatingCoupon { cashflow, engine };
            if coupon.payment_date()? >= value_date {
                floating.push(coupon);
            }
        }

        Ok(Self {
            model,
            swap,
            kind,
            funding,
            fixed,
            floating,
        })
    }

    /// PV of the fixed leg.
    pub fn pv_fixed(&self) -> ModelResult<f64> {
        self.fixed
            .iter()
            .map(|(_, engine)| Ok(engine.value()?.amount))
            .sum()
    }

    /// PV of the floating leg.
    pub fn pv_float(&self) -> ModelResult<f64> {
        let mut total = 0.0;
        for coupon in &self.floating {
            let df = self
                .model
                .discount_factor(&self.funding, coupon.payment_date()?)?;
            total += coupon.engine.value()?.amount * df;
        }
        Ok(total)
    }

    /// Unsigned fixed-leg annuity `Σ αᵢ · DF(payᵢ)`.
    pub fn annuity(&self) -> ModelResult<f64> {
        self.fixed
            .iter()
            .map(|(coupon, _)| {
                Ok(coupon.accrual
                    * self
                        .model
                        .discount_factor(&self.funding, coupon.cashflow.payment_date)?)
            })
            .sum()
    }
}

impl ValuationEngine for SwapEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        self.kind
    }

    fn value(&self) -> ModelResult<Value> {
        Ok(Value::new(
            self.swap.currency,
            self.pv_fixed()? + self.pv_float()?,
        ))
    }

    fn calculate_first_order_risk(
        &self,
        gradient: &mut GradientBuffer,
        scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        if !accumulate {
            gradient.clear();
        }
        for (_, engine) in &self.fixed {
            engine.calculate_first_order_risk(gradient, scaler, true)?;
        }
        for coupon in &self.floating {
            let pay = coupon.payment_date()?;
            let df = self.model.discount_factor(&self.funding, pay)?;
            let amount = coupon.engine.value()?.amount;
            coupon
                .engine
                .calculate_first_order_risk(gradient, scaler * df, true)?;
            self.model
                .discount_factor_gradient(&self.funding, pay, gradient, scaler * amount, true)?;
        }
        Ok(())
    }

    fn par_rate_or_spread(&self) -> ModelResult<f64> {
        let annuity = self.annuity()?;
        if annuity == 0.0 {
            return Err(ModelError::data(format!(
                "{} has no live fixed coupons",
                self.kind
            )));
        }
        let fixed_sign = self.swap.position.sign();
        Ok(-self.pv_float()? / (self.swap.notional * annuity * fixed_sign))
    }

    fn create_cashflows_report(&self) -> ModelResult<Vec<CashflowRow>> {
        let mut rows = Vec::with_capacity(self.fixed.len() + self.floating.len());
        let fixed_notional = self.swap.notional * self.swap.position.sign();
        for (coupon, engine) in &self.fixed {
            let df = self
                .model
                .discount_factor(&self.funding, coupon.cashflow.payment_date)?;
            let amount = coupon.cashflow.notional * coupon.cashflow.position.sign();
            rows.push(CashflowRow {
                leg: "FIXED".into(),
                accrual_start: coupon.accrual_start,
                accrual_end: coupon.accrual_end,
                payment_date: coupon.cashflow.payment_date,
                accrual: coupon.accrual,
                notional: fixed_notional,
                rate: self.swap.fixed_rate,
                amount,
                discount_factor: df,
                present_value: engine.value()?.amount,
            });
        }
        for coupon in &self.floating {
            let (pay, start, end, accrual, notional) = coupon.schedule()?;
            let df = self.model.discount_factor(&self.funding, pay)?;
            let amount = coupon.engine.value()?.amount;
            let rate = if accrual * notional == 0.0 {
                0.0
            } else {
                amount / (accrual * notional)
            };
            rows.push(CashflowRow {
                leg: "FLOAT".into(),
                accrual_start: start,
                accrual_end: end,
                payment_date: pay,
                accrual,
                notional,
                rate,
                amount,
                discount_factor: df,
                present_value: amount * df,
            });
        }
        Ok(rows)
    }
}

pub(super) fn bullet_cashflow<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::BulletCashflow(cf) => Ok(Box::new(BulletCashflowEngine::new(
            model.yield_curve(),
            params,
            cf,
        )?)),
        other => Err(wrong_instrument("bullet cashflow", other)),
    }
}

pub(super) fn ibor_cashflow<'a>(
    model: ModelRef<'a>,
    _params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::IborCashflow(cf) => {
            Ok(Box::new(IborCashflowEngine::new(model.yield_curve(), cf)))
        }
        other => Err(wrong_instrument("IBOR cashflow", other)),
    }
}

pub(super) fn overnight_cashflow<'a>(
    model: ModelRef<'a>,
    _params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::OvernightCashflow(cf) => Ok(Box::new(OvernightCashflowEngine::new(
            model.yield_curve(),
            cf,
        ))),
        other => Err(wrong_instrument("overnight cashflow", other)),
    }
}

pub(super) fn ibor_future<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::IborFuture(f) => Ok(Box::new(IborFutureEngine::for_ibor(
            model.yield_curve(),
            params,
            instrument,
            f,
        )?)),
        other => Err(wrong_instrument("IBOR future", other)),
    }
}

pub(super) fn rfr_future<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::RfrFuture(f) => Ok(Box::new(RfrFutureEngine::for_rfr(
            model.yield_curve(),
            params,
            instrument,
            f,
        )?)),
        other => Err(wrong_instrument("RFR future", other)),
    }
}

pub(super) fn swap<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::IborSwap(s) | Instrument::OvernightSwap(s) => Ok(Box::new(SwapEngine::new(
            model.yield_curve(),
            params,
            instrument.kind(),
            s,
        )?)),
        other => Err(wrong_instrument("swap", other)),
    }
}
