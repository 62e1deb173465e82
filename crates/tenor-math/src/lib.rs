//! # Tenor Math
//!
//! Numerical building blocks for the Tenor rates library.
//!
//! - **Interpolation**: piecewise-constant curves with exact integrals,
//!   linear curves and clamped bilinear surfaces
//! - **Solvers**: secant and Newton root finders
//! - **Optimization**: damped Gauss-Newton with box constraints
//! - **Linear Algebra**: LU and SVD solves on nalgebra matrices

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::float_cmp)]
#![allow(clippy::needless_range_loop)]

pub mod error;
pub mod interpolation;
pub mod linear_algebra;
pub mod optimization;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::interpolation::{
        BilinearSurface, Interpolator, LinearInterpolator, StepInterpolator,
    };
    pub use crate::linear_algebra::{least_squares, solve_linear_system, solve_transposed};
    pub use crate::optimization::{damped_gauss_newton, GaussNewtonConfig, OptimizationResult};
    pub use crate::solvers::{newton, secant, SolverConfig, SolverResult};
}

pub use error::{MathError, MathResult};
