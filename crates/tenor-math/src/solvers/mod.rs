//! One-dimensional root finders.
//!
//! - [`secant`]: derivative-free, never raises; the caller checks the
//!   returned residual
//! - [`newton`]: derivative-based, fails fast on a non-finite residual or
//!   a flat derivative
//!
//! # Example
//!
//! ```rust
//! use tenor_math::solvers::{newton, secant, SolverConfig};
//!
//! let f = |x: f64| x * x - 2.0;
//! let config = SolverConfig::default();
//!
//! let by_secant = secant(f, 1.0, 2.0, &config);
//! assert!(by_secant.converged);
//!
//! let by_newton = newton(f, |x| 2.0 * x, 1.5, &config).unwrap();
//! assert!((by_newton.root - by_secant.root).abs() < 1e-10);
//! ```

mod newton;
mod secant;

pub use newton::newton;
pub use secant::secant;

/// Default tolerance for root-finding algorithms.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Default maximum iterations for root-finding algorithms.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Default minimum absolute derivative accepted by Newton steps.
pub const DEFAULT_MIN_SLOPE: f64 = 1e-12;

/// Configuration for root-finding algorithms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Tolerance for convergence.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// Smallest usable derivative magnitude.
    pub min_slope: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_slope: DEFAULT_MIN_SLOPE,
        }
    }
}

impl SolverConfig {
    /// Creates a new solver configuration.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Self::default()
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the minimum slope.
    #[must_use]
    pub fn with_min_slope(mut self, min_slope: f64) -> Self {
        self.min_slope = min_slope;
        self
    }
}

/// Result of a root-finding iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    /// The root found (or the last iterate).
    pub root: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Residual at `root`.
    pub residual: f64,
    /// Whether the stopping criterion was met.
    pub converged: bool,
}
