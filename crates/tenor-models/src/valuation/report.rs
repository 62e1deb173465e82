//! Value with parameter-space and quote-space risk.

use serde::{Deserialize, Serialize};

use super::{create_engine, Value};
use crate::config::ValuationParameters;
use crate::curves::YieldCurveModel;
use crate::error::ModelResult;
use crate::instruments::Instrument;
use crate::model::Model;

/// Value and first-order risk of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueReport {
    /// Present value.
    pub value: Value,
    /// `∂V/∂θ` per curve parameter.
    pub parameter_risk: Vec<f64>,
    /// `∂V/∂q` per calibration instrument, from `Jᵀ x = ∂V/∂θ`.
    pub quote_risk: Vec<f64>,
    /// Pillar node ids, one per entry of both risk vectors.
    pub labels: Vec<String>,
}

impl ValueReport {
    /// `(label, quote risk)` pairs with a non-zero entry.
    pub fn nonzero_quote_risk(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .zip(&self.quote_risk)
            .filter(|(_, r)| **r != 0.0)
            .map(|(l, r)| (l.as_str(), *r))
    }
}

/// Prices `instrument` and maps its curve risk onto the calibration
/// instruments.
///
/// # Errors
///
/// Any pricing error, or `ModelError::Math` for a singular Jacobian.
pub fn create_value_report(
    model: &YieldCurveModel,
    params: &ValuationParameters,
    instrument: &Instrument,
) -> ModelResult<ValueReport> {
    let engine = create_engine(model.as_model_ref(), params, instrument)?;
    let value = engine.value()?;
    let mut gradient = model.new_gradient();
    engine.calculate_first_order_risk(&mut gradient, 1.0, false)?;
    let parameter_risk = gradient.to_vec();

    let jacobian = model.jacobian()?;
    let quote_risk = jacobian.quote_space_risk(&parameter_risk)?;

    Ok(ValueReport {
        value,
        parameter_risk,
        quote_risk,
        labels: jacobian.row_labels().to_vec(),
    })
}
