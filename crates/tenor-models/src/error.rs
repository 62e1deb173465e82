//! Error types for model construction, calibration and valuation.

use thiserror::Error;

use tenor_core::CoreError;
use tenor_math::MathError;

use crate::instruments::InstrumentKind;
use crate::model::ModelKind;

/// A specialized Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building, calibrating or pricing with a model.
///
/// Every variant is fatal to the call that raised it; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Missing or duplicate build-instruction fields, duplicate registry keys.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// What is wrong.
        reason: String,
    },

    /// Malformed or missing market data.
    #[error("Data error: {reason}")]
    Data {
        /// What is wrong.
        reason: String,
    },

    /// Non-increasing or duplicate pillar anchors.
    #[error("Ordering error in '{target}' at pillar {pillar}: {reason}")]
    Ordering {
        /// Component target.
        target: String,
        /// Position in the sorted anchor list.
        pillar: usize,
        /// Details.
        reason: String,
    },

    /// A residual could not be driven to zero.
    #[error("Convergence failed for '{target}'{}: {reason}", locate(.pillar, .instrument))]
    Convergence {
        /// Component target.
        target: String,
        /// Pillar being solved, when the failure is local to one pillar.
        pillar: Option<usize>,
        /// Kind of the instrument anchored at that pillar.
        instrument: Option<InstrumentKind>,
        /// Details.
        reason: String,
    },

    /// No valuation engine registered for a model/instrument pair.
    #[error("No valuation engine registered for ({model}, {instrument})")]
    Dispatch {
        /// Model kind of the lookup.
        model: ModelKind,
        /// Instrument kind of the lookup.
        instrument: InstrumentKind,
    },

    /// The operation is declared but not available for this input.
    #[error("Unsupported: {reason}")]
    Unsupported {
        /// What was requested.
        reason: String,
    },

    /// A component cannot be used for pricing in its current state.
    #[error("Component '{target}' is not usable for pricing: {reason}")]
    Unusable {
        /// Component target.
        target: String,
        /// Current state.
        reason: String,
    },

    /// Calendar service failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Numerical failure.
    #[error(transparent)]
    Math(#[from] MathError),
}

fn locate(pillar: &Option<usize>, instrument: &Option<InstrumentKind>) -> String {
    match (pillar, instrument) {
        (Some(p), Some(kind)) => format!(" at pillar {p} ({kind})"),
        (Some(p), None) => format!(" at pillar {p}"),
        (None, Some(kind)) => format!(" ({kind})"),
        (None, None) => String::new(),
    }
}

impl ModelError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a data error.
    #[must_use]
    pub fn data(reason: impl Into<String>) -> Self {
        Self::Data {
            reason: reason.into(),
        }
    }

    /// Creates an ordering error.
    #[must_use]
    pub fn ordering(target: impl Into<String>, pillar: usize, reason: impl Into<String>) -> Self {
        Self::Ordering {
            target: target.into(),
            pillar,
            reason: reason.into(),
        }
    }

    /// Creates a convergence error for one pillar.
    #[must_use]
    pub fn convergence(
        target: impl Into<String>,
        pillar: Option<usize>,
        instrument: Option<InstrumentKind>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Convergence {
            target: target.into(),
            pillar,
            instrument,
            reason: reason.into(),
        }
    }

    /// Creates a dispatch error.
    #[must_use]
    pub fn dispatch(model: ModelKind, instrument: InstrumentKind) -> Self {
        Self::Dispatch { model, instrument }
    }

    /// Creates an unsupported-operation error.
    #[must_use]
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Creates an unusable-component error.
    #[must_use]
    pub fn unusable(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unusable {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convergence_message_carries_context() {
        let err = ModelError::convergence(
            "SOFR-1B",
            Some(3),
            Some(InstrumentKind::OvernightSwap),
            "residual 1.2e-3 above tolerance",
        );
        let msg = err.to_string();
        assert!(msg.contains("SOFR-1B"));
        assert!(msg.contains("pillar 3"));
        assert!(msg.contains("OvernightSwap"));
    }

    #[test]
    fn test_dispatch_names_the_pair() {
        let err = ModelError::dispatch(ModelKind::Sabr, InstrumentKind::BulletCashflow);
        assert_eq!(
            err.to_string(),
            "No valuation engine registered for (IR_SABR, BulletCashflow)"
        );
    }

    #[test]
    fn test_from_math_error() {
        let err: ModelError = MathError::SingularMatrix.into();
        assert!(matches!(err, ModelError::Math(MathError::SingularMatrix)));
    }
}
