//! Dense linear solves on top of nalgebra.
//!
//! Sensitivity transforms never invert a matrix explicitly; they solve.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Pivot magnitude below which a matrix is treated as singular.
const SINGULAR_EPS: f64 = 1e-300;

fn check_rhs(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<()> {
    if a.nrows() != b.len() {
        return Err(MathError::DimensionMismatch {
            rows1: a.nrows(),
            cols1: a.ncols(),
            rows2: b.len(),
            cols2: 1,
        });
    }
    Ok(())
}

/// Solves a square system `A x = b` by LU with partial pivoting.
///
/// # Errors
///
/// Returns `MathError::SingularMatrix` when the factorisation has a zero
/// pivot, and `MathError::DimensionMismatch` on shape errors.
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    if a.nrows() != a.ncols() {
        return Err(MathError::invalid_input("Matrix must be square"));
    }
    check_rhs(a, b)?;
    if a.nrows() == 0 {
        return Ok(DVector::zeros(0));
    }

    let lu = a.clone().lu();
    let u = lu.u();
    if u.diagonal().iter().any(|p| p.abs() <= SINGULAR_EPS) {
        return Err(MathError::SingularMatrix);
    }
    lu.solve(b).ok_or(MathError::SingularMatrix)
}

/// Solves `Aᵀ x = b`.
///
/// # Errors
///
/// Same as [`solve_linear_system`].
pub fn solve_transposed(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    solve_linear_system(&a.transpose(), b)
}

/// Minimum-norm least-squares solution of `A x ≈ b` via SVD.
///
/// Singular values below `rcond * σ_max` are treated as zero.
///
/// # Errors
///
/// Returns `MathError::DimensionMismatch` on shape errors and
/// `MathError::SingularMatrix` if the decomposition cannot be used.
pub fn least_squares(a: &DMatrix<f64>, b: &DVector<f64>, rcond: f64) -> MathResult<DVector<f64>> {
    check_rhs(a, b)?;
    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    if sigma_max == 0.0 {
        return Ok(DVector::zeros(a.ncols()));
    }
    svd.solve(b, rcond * sigma_max)
        .map_err(|_| MathError::SingularMatrix)
}
