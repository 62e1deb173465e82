//! Linear interpolation.

use super::{bucket_index, validate_knots, Interpolator};
use crate::error::MathResult;

/// Linear interpolation between knots, flat outside them.
///
/// The integral is exact: the interpolant is linear between consecutive
/// breakpoints, so the trapezoid rule on those breakpoints is exact.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearInterpolator {
    /// Creates a new linear interpolator.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is empty, unsorted, or the lengths differ.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> MathResult<Self> {
        validate_knots(&xs, &ys)?;
        Ok(Self { xs, ys })
    }
}

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let i = bucket_index(&self.xs, x);
        let (x0, x1) = (self.xs[i - 1], self.xs[i]);
        let (y0, y1) = (self.ys[i - 1], self.ys[i]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    fn integral(&self, a: f64, b: f64) -> f64 {
        if b < a {
            return -self.integral(b, a);
        }
        let mut points = vec![a];
        points.extend(self.xs.iter().copied().filter(|&k| k > a && k < b));
        points.push(b);

        points
            .windows(2)
            .map(|w| 0.5 * (w[1] - w[0]) * (self.interpolate(w[0]) + self.interpolate(w[1])))
            .sum()
    }

    fn axis(&self) -> &[f64] {
        &self.xs
    }

    fn values(&self) -> &[f64] {
        &self.ys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_interpolation() {
        let interp = LinearInterpolator::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 4.0]).unwrap();
        assert_relative_eq!(interp.interpolate(0.5), 0.5);
        assert_relative_eq!(interp.interpolate(1.5), 2.5);
        assert_relative_eq!(interp.interpolate(-1.0), 0.0);
        assert_relative_eq!(interp.interpolate(3.0), 4.0);
    }

    #[test]
    fn test_integral_is_exact_trapezoid() {
        let interp = LinearInterpolator::new(vec![1.0, 2.0], vec![0.02, 0.04]).unwrap();
        // flat 0.02 on [0,1], ramp to 0.04 on [1,2], flat 0.04 on [2,3]
        assert_relative_eq!(interp.integral(0.0, 3.0), 0.02 + 0.03 + 0.04, epsilon = 1e-15);
        assert_relative_eq!(interp.integral(1.0, 1.5), 0.5 * 0.5 * (0.02 + 0.03), epsilon = 1e-15);
    }
}
