//! Calibration Jacobian and quote-space risk.

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use tenor_math::linear_algebra::solve_transposed;

use super::{PillarNode, YieldCurveModel};
use crate::config::ValuationParameters;
use crate::error::{ModelError, ModelResult};
use crate::model::{Model, ModelComponent};
use crate::valuation::create_engine;

/// Entries smaller than this are stored as exact zeros.
const FLUSH_TOL: f64 = 1e-12;

/// Sensitivities of every calibration instrument to every curve parameter.
///
/// Row `r` is the value gradient of the instrument anchoring pillar `r`;
/// rows follow components in instruction order, then pillars. The matrix is
/// square because every pillar owns exactly one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    matrix: DMatrix<f64>,
    row_labels: Vec<String>,
    column_labels: Vec<String>,
}

impl Jacobian {
    /// The matrix, instruments by parameters.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Pillar node ids, one per row.
    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    /// Parameter labels, one per column.
    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    /// Number of rows (and columns).
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Converts parameter-space risk into calibration-instrument space by
    /// solving `Jᵀ x = risk`.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` for a length mismatch; `ModelError::Math` when
    /// the Jacobian is singular.
    pub fn quote_space_risk(&self, parameter_risk: &[f64]) -> ModelResult<Vec<f64>> {
        if parameter_risk.len() != self.matrix.ncols() {
            return Err(ModelError::data(format!(
                "risk of length {} for a {}-parameter Jacobian",
                parameter_risk.len(),
                self.matrix.ncols()
            )));
        }
        let rhs = DVector::from_column_slice(parameter_risk);
        Ok(solve_transposed(&self.matrix, &rhs)?.iter().copied().collect())
    }
}

fn risk_row(
    model: &YieldCurveModel,
    target: &str,
    pillar: &PillarNode,
) -> ModelResult<Vec<f64>> {
    let params = ValuationParameters::new(target);
    let engine = create_engine(model.as_model_ref(), &params, &pillar.instrument)?;
    let mut gradient = model.new_gradient();
    engine.calculate_first_order_risk(&mut gradient, 1.0, false)?;
    Ok(gradient
        .as_slice()
        .iter()
        .map(|&v| if v.abs() < FLUSH_TOL { 0.0 } else { v })
        .collect())
}

impl YieldCurveModel {
    /// Builds the calibration Jacobian at the current state.
    ///
    /// # Errors
    ///
    /// Any pricing error, including `ModelError::Unusable` for a component
    /// that is not calibrated.
    pub fn jacobian(&self) -> ModelResult<Jacobian> {
        let rows: Vec<(&str, &PillarNode)> = self
            .components()
            .iter()
            .flat_map(|c| c.pillars().iter().map(move |p| (c.target(), p)))
            .collect();

        #[cfg(feature = "parallel")]
        let risk: Vec<Vec<f64>> = rows
            .par_iter()
            .map(|(target, pillar)| risk_row(self, target, pillar))
            .collect::<ModelResult<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let risk: Vec<Vec<f64>> = rows
            .iter()
            .map(|(target, pillar)| risk_row(self, target, pillar))
            .collect::<ModelResult<_>>()?;

        let n = self.layout().total_len();
        if risk.len() != n {
            return Err(ModelError::data(format!(
                "{} calibration instruments for {n} parameters",
                risk.len()
            )));
        }
        let matrix = DMatrix::from_fn(n, n, |r, c| risk[r][c]);

        Ok(Jacobian {
            matrix,
            row_labels: rows.iter().map(|(_, p)| p.node_id.clone()).collect(),
            column_labels: self.layout().labels().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sofr_model;

    #[test]
    fn test_jacobian_is_lower_triangular() {
        let model = sofr_model();
        let jacobian = model.jacobian().unwrap();
        assert_eq!(jacobian.dim(), 4);
        assert_eq!(jacobian.row_labels(), jacobian.column_labels());
        let m = jacobian.matrix();
        for r in 0..4 {
            assert!(m[(r, r)].abs() > 1e-3, "diagonal {r}: {}", m[(r, r)]);
            for c in (r + 1)..4 {
                assert_eq!(m[(r, c)], 0.0);
            }
        }
    }

    #[test]
    fn test_quote_space_risk_length_checked() {
        let jacobian = sofr_model().jacobian().unwrap();
        assert!(matches!(
            jacobian.quote_space_risk(&[1.0, 2.0]),
            Err(ModelError::Data { .. })
        ));
    }
}
