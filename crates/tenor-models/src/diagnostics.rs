//! Calibration health checks.
//!
//! Reprices every calibration instrument of a yield-curve model against
//! the model itself. A calibrated curve reprices its basket to zero PV;
//! futures rows also report the price error and swap rows the par rate
//! against the quoted rate.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ValuationParameters;
use crate::curves::{PillarNode, YieldCurveModel};
use crate::error::{ModelError, ModelResult};
use crate::instruments::{Instrument, InstrumentKind};
use crate::model::{Model, ModelComponent};
use crate::valuation::{
    create_engine, FuturesEngine, IborFutureEngine, RfrFutureEngine, SwapEngine,
    ValuationEngine,
};

/// One repriced calibration instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRow {
    /// Component key.
    pub component: String,
    /// Pillar node id.
    pub node_id: String,
    /// Instrument kind.
    pub kind: InstrumentKind,
    /// Market quote.
    pub quote: f64,
    /// Model PV; zero when calibrated.
    pub pv: f64,
    /// Futures: model forward rate.
    pub forward: Option<f64>,
    /// Futures: model price `100 · (1 - F)`.
    pub model_price: Option<f64>,
    /// Futures: quoted price.
    pub market_price: Option<f64>,
    /// Futures: model minus market price.
    pub price_error: Option<f64>,
    /// Swaps: model par rate.
    pub par_rate: Option<f64>,
    /// Swaps: quoted rate.
    pub market_rate: Option<f64>,
    /// Swaps: par minus quoted rate.
    pub par_minus_market: Option<f64>,
}

impl CalibrationRow {
    fn new(component: &str, pillar: &PillarNode, pv: f64) -> Self {
        Self {
            component: component.to_string(),
            node_id: pillar.node_id.clone(),
            kind: pillar.instrument.kind(),
            quote: pillar.quote,
            pv,
            forward: None,
            model_price: None,
            market_price: None,
            price_error: None,
            par_rate: None,
            market_rate: None,
            par_minus_market: None,
        }
    }
}

/// Repricing report of a whole model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationHealth {
    /// Largest absolute PV over all rows.
    pub max_abs_pv: f64,
    /// One row per calibration instrument, in pillar order.
    pub rows: Vec<CalibrationRow>,
}

impl CalibrationHealth {
    /// Row with the largest absolute PV.
    pub fn worst(&self) -> Option<&CalibrationRow> {
        self.rows
            .iter()
            .max_by(|a, b| a.pv.abs().total_cmp(&b.pv.abs()))
    }

    /// Writes the rows as CSV with a header.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` when writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> ModelResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv.serialize(row)
                .map_err(|e| ModelError::data(format!("cannot write calibration row: {e}")))?;
        }
        csv.flush()
            .map_err(|e| ModelError::data(format!("cannot flush calibration report: {e}")))
    }

    /// Errors when any PV exceeds `tol` in absolute value.
    ///
    /// # Errors
    ///
    /// `ModelError::Convergence` naming the worst row.
    pub fn assert_calibrated(&self, tol: f64) -> ModelResult<()> {
        match self.worst() {
            Some(row) if row.pv.abs() > tol => {
                warn!(
                    component = %row.component,
                    node_id = %row.node_id,
                    pv = row.pv,
                    tol,
                    "calibration instrument does not reprice"
                );
                Err(ModelError::convergence(
                    row.component.clone(),
                    None,
                    Some(row.kind),
                    format!("{} reprices to {:e}, above {tol:e}", row.node_id, row.pv),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn reprice(
    model: &YieldCurveModel,
    params: &ValuationParameters,
    component: &str,
    pillar: &PillarNode,
) -> ModelResult<CalibrationRow> {
    let instrument = pillar.instrument.as_ref();
    match instrument {
        Instrument::IborFuture(f) => {
            let engine = IborFutureEngine::for_ibor(model, params, instrument, f)?;
            futures_row(component, pillar, &engine)
        }
        Instrument::RfrFuture(f) => {
            let engine = RfrFutureEngine::for_rfr(model, params, instrument, f)?;
            futures_row(component, pillar, &engine)
        }
        Instrument::IborSwap(s) | Instrument::OvernightSwap(s) => {
            let engine = SwapEngine::new(model, params, instrument.kind(), s)?;
            let par = engine.par_rate_or_spread()?;
            let mut row = CalibrationRow::new(component, pillar, engine.value()?.amount);
            row.par_rate = Some(par);
            row.market_rate = Some(pillar.quote);
            row.par_minus_market = Some(par - pillar.quote);
            Ok(row)
        }
        other => {
            let engine = create_engine(model.as_model_ref(), params, other)?;
            Ok(CalibrationRow::new(component, pillar, engine.value()?.amount))
        }
    }
}

fn futures_row<E: ValuationEngine>(
    component: &str,
    pillar: &PillarNode,
    engine: &FuturesEngine<'_, E>,
) -> ModelResult<CalibrationRow> {
    let model_price = engine.model_price()?;
    let mut row = CalibrationRow::new(component, pillar, engine.value()?.amount);
    row.forward = Some(engine.forward()?);
    row.model_price = Some(model_price);
    row.market_price = Some(pillar.quote);
    row.price_error = Some(model_price - pillar.quote);
    Ok(row)
}

/// Reprices every calibration instrument of `model`, each discounted on
/// its own component's curve.
///
/// # Errors
///
/// Any pricing error, including `ModelError::Unusable` for a component
/// that is not calibrated.
pub fn check_calibration(model: &YieldCurveModel) -> ModelResult<CalibrationHealth> {
    let mut rows = Vec::new();
    for component in model.components().iter() {
        let params = ValuationParameters::new(component.target());
        for pillar in component.pillars() {
            rows.push(reprice(model, &params, component.key(), pillar)?);
        }
    }
    let max_abs_pv = rows.iter().map(|r| r.pv.abs()).fold(0.0, f64::max);
    Ok(CalibrationHealth { max_abs_pv, rows })
}

/// [`check_calibration`] followed by [`CalibrationHealth::assert_calibrated`].
///
/// # Errors
///
/// As both.
pub fn assert_calibrated(model: &YieldCurveModel, tol: f64) -> ModelResult<CalibrationHealth> {
    let health = check_calibration(model)?;
    health.assert_calibrated(tol)?;
    Ok(health)
}
