//! Piecewise-constant interpolation.

use super::{bucket_index, validate_knots, Interpolator};
use crate::error::MathResult;

/// Piecewise-constant interpolator with an exact integral.
///
/// Value `values[i]` applies on the half-open bucket `[axis[i-1], axis[i])`;
/// `values[0]` applies below `axis[0]` and the last value applies at and
/// beyond the last knot.
///
/// # Example
///
/// ```rust
/// use tenor_math::interpolation::{Interpolator, StepInterpolator};
///
/// let curve = StepInterpolator::new(vec![1.0, 2.0], vec![0.03, 0.05]).unwrap();
/// assert_eq!(curve.interpolate(1.5), 0.05);
/// // 1y at 3% plus 1y at 5%
/// assert!((curve.integral(0.0, 2.0) - 0.08).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StepInterpolator {
    axis: Vec<f64>,
    values: Vec<f64>,
}

impl StepInterpolator {
    /// Creates a step interpolator.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is empty, unsorted, or the lengths differ.
    pub fn new(axis: Vec<f64>, values: Vec<f64>) -> MathResult<Self> {
        validate_knots(&axis, &values)?;
        Ok(Self { axis, values })
    }

    /// Returns a copy with `values` replaced, keeping the axis.
    ///
    /// # Errors
    ///
    /// Returns an error if the new values have the wrong length.
    pub fn with_values(&self, values: Vec<f64>) -> MathResult<Self> {
        Self::new(self.axis.clone(), values)
    }

    #[inline]
    fn value_at(&self, index: usize) -> f64 {
        self.values[index.min(self.values.len() - 1)]
    }
}

impl Interpolator for StepInterpolator {
    fn interpolate(&self, x: f64) -> f64 {
        self.value_at(bucket_index(&self.axis, x))
    }

    fn integral(&self, a: f64, b: f64) -> f64 {
        if b < a {
            return -self.integral(b, a);
        }
        let start_idx = bucket_index(&self.axis, a);
        let end_idx = bucket_index(&self.axis, b);

        if start_idx == end_idx {
            return (b - a) * self.value_at(start_idx);
        }

        // start_idx < end_idx <= len, so axis[start_idx] and axis[end_idx - 1] exist
        let left = (self.axis[start_idx] - a) * self.value_at(start_idx);
        let center: f64 = (start_idx + 1..end_idx)
            .map(|i| (self.axis[i] - self.axis[i - 1]) * self.values[i])
            .sum();
        let right = (b - self.axis[end_idx - 1]) * self.value_at(end_idx);

        left + center + right
    }

    fn axis(&self) -> &[f64] {
        &self.axis
    }

    fn values(&self) -> &[f64] {
        &self.values
    }
}
