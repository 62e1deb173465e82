//! Valuation engines and their dispatch table.
//!
//! An engine prices one instrument against one model. Engines are created
//! through an [`EngineRegistry`] keyed by `(ModelKind, InstrumentKind)`;
//! composite instruments create one child engine per leg or element and
//! sum their values and risks.
//!
//! Risk is written into a caller-owned [`GradientBuffer`]. An engine asked
//! with `accumulate == false` zeroes the buffer once and then calls every
//! child with `accumulate == true`.

mod report;
mod sabr;
mod yield_curve;

pub use report::{create_value_report, ValueReport};
pub use sabr::{CapFloorEngine, CapFloorletEngine, SwaptionEngine};
pub use yield_curve::{
    BulletCashflowEngine, FuturesEngine, IborCashflowEngine, IborFutureEngine,
    OvernightCashflowEngine, RfrFutureEngine, SwapEngine,
};

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use tenor_core::{Currency, Date};

use crate::config::ValuationParameters;
use crate::curves::GradientBuffer;
use crate::error::{ModelError, ModelResult};
use crate::instruments::{Instrument, InstrumentKind, Portfolio};
use crate::model::{ModelKind, ModelRef};

/// A currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Value {
    /// Currency of the amount.
    pub currency: Currency,
    /// The amount.
    pub amount: f64,
}

impl Value {
    /// Creates a value.
    #[must_use]
    pub fn new(currency: Currency, amount: f64) -> Self {
        Self { currency, amount }
    }
}

/// One line of a swap cashflow report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowRow {
    /// `FIXED` or `FLOAT`.
    pub leg: String,
    /// Accrual start.
    pub accrual_start: Date,
    /// Accrual end.
    pub accrual_end: Date,
    /// Payment date.
    pub payment_date: Date,
    /// Accrual fraction.
    pub accrual: f64,
    /// Signed notional.
    pub notional: f64,
    /// Fixed rate, or the projected floating rate.
    pub rate: f64,
    /// Undiscounted amount.
    pub amount: f64,
    /// Funding discount factor at payment.
    pub discount_factor: f64,
    /// `amount · discount_factor`.
    pub present_value: f64,
}

/// Prices one instrument against one model.
pub trait ValuationEngine {
    /// Kind of the instrument being priced.
    fn instrument_kind(&self) -> InstrumentKind;

    /// Present value (undiscounted for single floating cashflows, which
    /// are discounted by their parent).
    fn value(&self) -> ModelResult<Value>;

    /// Writes `scaler · ∂value/∂θ` into `gradient`.
    ///
    /// The default leaves the buffer zeroed (or untouched when
    /// accumulating): the engine has no curve risk.
    fn calculate_first_order_risk(
        &self,
        gradient: &mut GradientBuffer,
        _scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        if !accumulate {
            gradient.clear();
        }
        Ok(())
    }

    /// Par rate (swaps) or par spread.
    fn par_rate_or_spread(&self) -> ModelResult<f64> {
        Err(ModelError::unsupported(format!(
            "{} has no par rate",
            self.instrument_kind()
        )))
    }

    /// Undiscounted cashflows with their discount factors.
    fn create_cashflows_report(&self) -> ModelResult<Vec<CashflowRow>> {
        Ok(Vec::new())
    }
}

/// Signature of an engine constructor.
pub type EngineConstructor = for<'a> fn(
    ModelRef<'a>,
    &ValuationParameters,
    &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>>;

/// Dispatch table from `(model kind, instrument kind)` to constructor.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    constructors: HashMap<(ModelKind, InstrumentKind), EngineConstructor>,
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .constructors
            .keys()
            .map(|(m, i)| format!("{m}/{i}"))
            .collect();
        keys.sort();
        f.debug_struct("EngineRegistry").field("engines", &keys).finish()
    }
}

impl EngineRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` if the pair is already registered.
    pub fn register(
        &mut self,
        model: ModelKind,
        instrument: InstrumentKind,
        constructor: EngineConstructor,
    ) -> ModelResult<()> {
        if self.constructors.contains_key(&(model, instrument)) {
            return Err(ModelError::configuration(format!(
                "engine for {model}/{instrument} already registered"
            )));
        }
        self.constructors.insert((model, instrument), constructor);
        Ok(())
    }

    /// True when the pair has an engine.
    pub fn contains(&self, model: ModelKind, instrument: InstrumentKind) -> bool {
        self.constructors.contains_key(&(model, instrument))
    }

    /// Number of registered pairs.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Creates the engine for an instrument.
    ///
    /// # Errors
    ///
    /// `ModelError::Dispatch` when the pair is not registered, or the
    /// constructor's own error.
    pub fn create<'a>(
        &self,
        model: ModelRef<'a>,
        params: &ValuationParameters,
        instrument: &'a Instrument,
    ) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
        let key = (model.kind(), instrument.kind());
        let constructor = self
            .constructors
            .get(&key)
            .ok_or_else(|| ModelError::dispatch(key.0, key.1))?;
        constructor(model, params, instrument)
    }

    /// Registry with every built-in engine.
    #[must_use]
    pub fn with_defaults() -> Self {
        use InstrumentKind as I;
        use ModelKind as M;

        let table: [(M, I, EngineConstructor); 16] = [
            (M::YieldCurve, I::BulletCashflow, yield_curve::bullet_cashflow),
            (M::YieldCurve, I::IborCashflow, yield_curve::ibor_cashflow),
            (M::YieldCurve, I::OvernightCashflow, yield_curve::overnight_cashflow),
            (M::YieldCurve, I::IborFuture, yield_curve::ibor_future),
            (M::YieldCurve, I::RfrFuture, yield_curve::rfr_future),
            (M::YieldCurve, I::IborSwap, yield_curve::swap),
            (M::YieldCurve, I::OvernightSwap, yield_curve::swap),
            (M::YieldCurve, I::Portfolio, portfolio),
            (M::Sabr, I::Portfolio, portfolio),
            (M::Sabr, I::IborCapFloorlet, sabr::cap_floorlet),
            (M::Sabr, I::OvernightCapFloorlet, sabr::cap_floorlet),
            (M::Sabr, I::IborCapFloor, sabr::cap_floor),
            (M::Sabr, I::OvernightCapFloor, sabr::cap_floor),
            (M::Sabr, I::IborSwaption, sabr::swaption),
            (M::Sabr, I::OvernightSwaption, sabr::swaption),
            (M::Sabr, I::BulletCashflow, yield_curve::bullet_cashflow),
        ];

        let mut registry = Self::new();
        for (model, instrument, constructor) in table {
            registry.constructors.insert((model, instrument), constructor);
        }
        registry
    }
}

/// Creates an engine through the model's environment.
///
/// # Errors
///
/// `ModelError::Dispatch` for an unregistered pair, or any construction
/// error.
pub fn create_engine<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    model.environment().engines.create(model, params, instrument)
}

pub(crate) fn wrong_instrument(engine: &str, instrument: &Instrument) -> ModelError {
    ModelError::configuration(format!(
        "{engine} engine registered for {}",
        instrument.kind()
    ))
}

/// Weighted sum of element engines.
pub struct PortfolioEngine<'a> {
    portfolio: &'a Portfolio,
    children: Vec<(Box<dyn ValuationEngine + 'a>, f64)>,
}

impl<'a> PortfolioEngine<'a> {
    /// Creates one child engine per element.
    ///
    /// # Errors
    ///
    /// Any child construction error.
    pub fn new(
        model: ModelRef<'a>,
        params: &ValuationParameters,
        portfolio: &'a Portfolio,
    ) -> ModelResult<Self> {
        let children = portfolio
            .elements
            .iter()
            .map(|(element, weight)| Ok((create_engine(model, params, element)?, *weight)))
            .collect::<ModelResult<_>>()?;
        Ok(Self {
            portfolio,
            children,
        })
    }
}

impl ValuationEngine for PortfolioEngine<'_> {
    fn instrument_kind(&self) -> InstrumentKind {
        InstrumentKind::Portfolio
    }

    fn value(&self) -> ModelResult<Value> {
        let mut total = 0.0;
        for (child, weight) in &self.children {
            total += weight * child.value()?.amount;
        }
        Ok(Value::new(self.portfolio.currency, total))
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
        for (child, weight) in &self.children {
            child.calculate_first_order_risk(gradient, scaler * weight, true)?;
        }
        Ok(())
    }
}

fn portfolio<'a>(
    model: ModelRef<'a>,
    params: &ValuationParameters,
    instrument: &'a Instrument,
) -> ModelResult<Box<dyn ValuationEngine + 'a>> {
    match instrument {
        Instrument::Portfolio(p) => Ok(Box::new(PortfolioEngine::new(model, params, p)?)),
        other => Err(wrong_instrument("portfolio", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_models() {
        let registry = EngineRegistry::with_defaults();
        assert!(registry.contains(ModelKind::YieldCurve, InstrumentKind::OvernightSwap));
        assert!(registry.contains(ModelKind::Sabr, InstrumentKind::Portfolio));
        assert!(!registry.contains(ModelKind::YieldCurve, InstrumentKind::IborSwaption));
        assert_eq!(registry.len(), 16);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = EngineRegistry::with_defaults();
        let err = registry
            .register(ModelKind::YieldCurve, InstrumentKind::Portfolio, portfolio)
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration { .. }));

        let mut empty = EngineRegistry::new();
        assert!(empty
            .register(ModelKind::YieldCurve, InstrumentKind::Portfolio, portfolio)
            .is_ok());
        assert!(format!("{empty:?}").contains("YIELD_CURVE/Portfolio"));
    }

    struct FlatEngine;

    impl ValuationEngine for FlatEngine {
        fn instrument_kind(&self) -> InstrumentKind {
            InstrumentKind::BulletCashflow
        }

        fn value(&self) -> ModelResult<Value> {
            Ok(Value::new(Currency::USD, 1.0))
        }
    }

    #[test]
    fn test_default_risk_clears_or_keeps_buffer() {
        let mut gradient = GradientBuffer::new(3);
        gradient.add_block(0, &[1.0, 2.0, 3.0], false).unwrap();

        FlatEngine
            .calculate_first_order_risk(&mut gradient, 5.0, true)
            .unwrap();
        assert_eq!(gradient.as_slice(), &[1.0, 2.0, 3.0]);

        FlatEngine
            .calculate_first_order_risk(&mut gradient, 5.0, false)
            .unwrap();
        assert_eq!(gradient.as_slice(), &[0.0, 0.0, 0.0]);
        assert!(matches!(
            FlatEngine.par_rate_or_spread(),
            Err(ModelError::Unsupported { .. })
        ));
    }
}
