//! Bilinear interpolation on a rectangular grid.

use super::validate_knots;
use crate::error::{MathError, MathResult};

/// Bilinear interpolation on a `len(axis1) x len(axis2)` grid.
///
/// Query points are clamped into the grid's bounding box, so the surface
/// extrapolates flat in both directions.
///
/// # Example
///
/// ```rust
/// use tenor_math::interpolation::BilinearSurface;
///
/// let surface = BilinearSurface::new(
///     vec![1.0, 2.0],
///     vec![1.0, 5.0],
///     vec![vec![0.10, 0.20], vec![0.30, 0.40]],
/// ).unwrap();
/// assert!((surface.interpolate(1.5, 3.0) - 0.25).abs() < 1e-15);
/// assert_eq!(surface.interpolate(0.0, 0.0), 0.10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BilinearSurface {
    axis1: Vec<f64>,
    axis2: Vec<f64>,
    grid: Vec<Vec<f64>>,
}

/// Enclosing knot pair and the weight of the upper knot.
struct Bracket {
    lo: usize,
    hi: usize,
    weight: f64,
}

impl Bracket {
    fn is_degenerate(&self) -> bool {
        self.lo == self.hi || self.weight == 0.0
    }
}

impl BilinearSurface {
    /// Creates a surface.
    ///
    /// # Errors
    ///
    /// Returns an error if either axis is empty or unsorted, or the grid is
    /// not `len(axis1)` rows of `len(axis2)` values.
    pub fn new(axis1: Vec<f64>, axis2: Vec<f64>, grid: Vec<Vec<f64>>) -> MathResult<Self> {
        validate_knots(&axis1, &vec![0.0; axis1.len()])?;
        validate_knots(&axis2, &vec![0.0; axis2.len()])?;
        if grid.len() != axis1.len() {
            return Err(MathError::DimensionMismatch {
                rows1: axis1.len(),
                cols1: axis2.len(),
                rows2: grid.len(),
                cols2: grid.first().map_or(0, Vec::len),
            });
        }
        if let Some(row) = grid.iter().find(|row| row.len() != axis2.len()) {
            return Err(MathError::DimensionMismatch {
                rows1: axis1.len(),
                cols1: axis2.len(),
                rows2: grid.len(),
                cols2: row.len(),
            });
        }
        Ok(Self { axis1, axis2, grid })
    }

    /// First axis.
    pub fn axis1(&self) -> &[f64] {
        &self.axis1
    }

    /// Second axis.
    pub fn axis2(&self) -> &[f64] {
        &self.axis2
    }

    /// Grid rows, one per `axis1` knot.
    pub fn grid(&self) -> &[Vec<f64>] {
        &self.grid
    }

    /// Adds `delta` to the grid node `(i, j)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is outside the grid.
    pub fn bump_node(&mut self, i: usize, j: usize, delta: f64) -> MathResult<()> {
        let node = self
            .grid
            .get_mut(i)
            .and_then(|row| row.get_mut(j))
            .ok_or_else(|| MathError::invalid_input(format!("grid node ({i}, {j}) out of range")))?;
        *node += delta;
        Ok(())
    }

    /// Interpolates at `(x, y)`.
    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        let bx = bracket(&self.axis1, x);
        let by = bracket(&self.axis2, y);

        match (bx.is_degenerate(), by.is_degenerate()) {
            (true, true) => self.grid[bx.lo][by.lo],
            (true, false) => lerp(self.grid[bx.lo][by.lo], self.grid[bx.lo][by.hi], by.weight),
            (false, true) => lerp(self.grid[bx.lo][by.lo], self.grid[bx.hi][by.lo], bx.weight),
            (false, false) => {
                let q11 = self.grid[bx.lo][by.lo];
                let q12 = self.grid[bx.lo][by.hi];
                let q21 = self.grid[bx.hi][by.lo];
                let q22 = self.grid[bx.hi][by.hi];
                (1.0 - bx.weight) * (1.0 - by.weight) * q11
                    + (1.0 - bx.weight) * by.weight * q12
                    + bx.weight * (1.0 - by.weight) * q21
                    + bx.weight * by.weight * q22
            }
        }
    }
}

#[inline]
fn lerp(a: f64, b: f64, w: f64) -> f64 {
    a + (b - a) * w
}

fn bracket(axis: &[f64], value: f64) -> Bracket {
    let last = axis.len() - 1;
    let v = value.clamp(axis[0], axis[last]);
    let lo = axis.partition_point(|&k| k <= v).saturating_sub(1);
    if lo >= last {
        return Bracket {
            lo: last,
            hi: last,
            weight: 0.0,
        };
    }
    let hi = lo + 1;
    Bracket {
        lo,
        hi,
        weight: (v - axis[lo]) / (axis[hi] - axis[lo]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn surface() -> BilinearSurface {
        BilinearSurface::new(
            vec![0.5, 1.0, 5.0],
            vec![1.0, 2.0, 10.0],
            vec![
                vec![0.010, 0.012, 0.020],
                vec![0.011, 0.014, 0.022],
                vec![0.015, 0.016, 0.030],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_grid_nodes_exact() {
        let s = surface();
        for (i, &x) in s.axis1().iter().enumerate() {
            for (j, &y) in s.axis2().iter().enumerate() {
                assert_eq!(s.interpolate(x, y), s.grid()[i][j]);
            }
        }
    }

    #[test]
    fn test_edge_reduces_to_linear() {
        let s = surface();
        // on the x = 1.0 grid line, linear in y between 2 and 10
        assert_relative_eq!(s.interpolate(1.0, 6.0), 0.014 + 0.5 * (0.022 - 0.014), epsilon = 1e-15);
        // on the y = 2.0 grid line, linear in x between 1 and 5
        assert_relative_eq!(s.interpolate(3.0, 2.0), 0.014 + 0.5 * (0.016 - 0.014), epsilon = 1e-15);
    }

    #[test]
    fn test_interior_bilinear() {
        let s = surface();
        let expected = 0.25 * (0.010 + 0.012 + 0.011 + 0.014);
        assert_relative_eq!(s.interpolate(0.75, 1.5), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_clamped_extrapolation() {
        let s = surface();
        assert_eq!(s.interpolate(0.0, 0.0), 0.010);
        assert_eq!(s.interpolate(50.0, 50.0), 0.030);
        assert_relative_eq!(s.interpolate(50.0, 1.5), 0.5 * (0.015 + 0.016), epsilon = 1e-15);
    }

    #[test]
    fn test_rejects_ragged_grid() {
        let err = BilinearSurface::new(vec![1.0, 2.0], vec![1.0, 2.0], vec![vec![0.0, 0.0], vec![0.0]]);
        assert!(err.is_err());
        let err = BilinearSurface::new(vec![1.0, 2.0], vec![1.0], vec![vec![0.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn test_single_row_surface() {
        let s = BilinearSurface::new(vec![1.0], vec![1.0, 3.0], vec![vec![0.2, 0.4]]).unwrap();
        assert_relative_eq!(s.interpolate(7.0, 2.0), 0.3, epsilon = 1e-15);
    }

    #[test]
    fn test_bump_node() {
        let mut s = surface();
        s.bump_node(1, 1, 0.001).unwrap();
        assert_relative_eq!(s.interpolate(1.0, 2.0), 0.015, epsilon = 1e-15);
        assert!(s.bump_node(3, 0, 0.001).is_err());
    }
}
