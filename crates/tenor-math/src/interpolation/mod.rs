//! One- and two-dimensional interpolation.
//!
//! - [`StepInterpolator`]: piecewise-constant with an exact definite integral,
//!   the shape used for instantaneous forward curves
//! - [`LinearInterpolator`]: piecewise-linear with flat extrapolation
//! - [`BilinearSurface`]: clamped bilinear interpolation on a grid
//!
//! Both 1-D interpolators share the bucket convention of the curve: below
//! the first knot and at or above the last knot the curve is flat.

mod bilinear;
mod linear;
mod step;

pub use bilinear::BilinearSurface;
pub use linear::LinearInterpolator;
pub use step::StepInterpolator;

use crate::error::{MathError, MathResult};

/// A one-dimensional interpolator that can also integrate itself.
pub trait Interpolator: Send + Sync {
    /// Returns the interpolated value at `x`.
    fn interpolate(&self, x: f64) -> f64;

    /// Returns the definite integral over `[a, b]`.
    ///
    /// Reversed bounds give the negated integral.
    fn integral(&self, a: f64, b: f64) -> f64;

    /// The knot axis.
    fn axis(&self) -> &[f64];

    /// The knot values.
    fn values(&self) -> &[f64];
}

/// Checks that `axis` is non-empty, strictly increasing and finite, and
/// that `values` has the same length.
pub(crate) fn validate_knots(axis: &[f64], values: &[f64]) -> MathResult<()> {
    if axis.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    if axis.len() != values.len() {
        return Err(MathError::invalid_input(format!(
            "axis and values must have same length: {} vs {}",
            axis.len(),
            values.len()
        )));
    }
    if axis.iter().chain(values).any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("knots must be finite"));
    }
    if axis.windows(2).any(|w| w[1] <= w[0]) {
        return Err(MathError::invalid_input(
            "axis values must be strictly increasing",
        ));
    }
    Ok(())
}

/// Index of the half-open bucket holding `x`: the first `i` with
/// `x < axis[i]`, or `axis.len()` when `x` is at or beyond the last knot.
#[inline]
pub(crate) fn bucket_index(axis: &[f64], x: f64) -> usize {
    axis.partition_point(|&knot| knot <= x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_unsorted() {
        assert!(validate_knots(&[1.0, 1.0], &[0.0, 0.0]).is_err());
        assert!(validate_knots(&[], &[]).is_err());
        assert!(validate_knots(&[1.0], &[0.0, 1.0]).is_err());
        assert!(validate_knots(&[1.0, f64::NAN], &[0.0, 1.0]).is_err());
        assert!(validate_knots(&[1.0, 2.0], &[0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_bucket_index_half_open() {
        let axis = [1.0, 2.0, 3.0];
        assert_eq!(bucket_index(&axis, 0.5), 0);
        assert_eq!(bucket_index(&axis, 1.0), 1);
        assert_eq!(bucket_index(&axis, 2.5), 2);
        assert_eq!(bucket_index(&axis, 3.0), 3);
        assert_eq!(bucket_index(&axis, 9.0), 3);
    }
}
