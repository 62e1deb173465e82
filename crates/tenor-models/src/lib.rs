//! # Tenor Models
//!
//! Curve calibration, analytic risk and option valuation for the Tenor
//! rates library.
//!
//! - **Market data**: 1-D and 2-D quote sets, data conventions, indices
//!   and historical fixings
//! - **Yield curves**: piecewise-constant instantaneous forward curves
//!   bootstrapped pillar by pillar (or globally) from swaps and futures
//! - **Risk**: analytic value gradients, the calibration Jacobian and
//!   quote-space risk
//! - **Valuation**: an engine registry keyed by model and instrument kind,
//!   with engines for cashflows, futures, swaps, caps and swaptions
//! - **SABR**: interpolated parameter surfaces, Hagan pricing and the
//!   time-decay and correlation-blend transforms
//!
//! ## Quick Start
//!
//! ```rust
//! use tenor_models::prelude::*;
//!
//! let registry = EngineRegistry::with_defaults();
//! assert!(registry.contains(ModelKind::YieldCurve, InstrumentKind::OvernightSwap));
//! assert!(!registry.contains(ModelKind::YieldCurve, InstrumentKind::IborSwaption));
//!
//! let json = r#"[{ "TARGET": "SOFR-1B", "INSTRUMENTS": ["USD-SOFR-OIS"] }]"#;
//! let instructions = BuildInstruction::list_from_json(json).unwrap();
//! assert_eq!(instructions[0].bootstrap, BootstrapMethod::Sequential);
//! ```

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

pub mod config;
pub mod curves;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod instruments;
pub mod market;
pub mod model;
pub mod sabr;
pub mod valuation;

#[cfg(test)]
mod test_support;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        BootstrapMethod, BuildInstruction, InterpolationMethod, SabrMethod, Validate,
        ValuationParameters,
    };
    pub use crate::curves::{GradientBuffer, Jacobian, YieldCurveModel};
    pub use crate::diagnostics::{assert_calibrated, check_calibration, CalibrationHealth};
    pub use crate::environment::Environment;
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::instruments::{
        build_cap_floor, build_swap, build_swaption, CapFloorTerms, Instrument, InstrumentKind,
        OptionType, Position, SwapTerms, SwaptionType,
    };
    pub use crate::market::{
        Data1D, Data2D, DataCollection, DataConventionRegistry, FixingStore, MarketData,
    };
    pub use crate::model::{ComponentStatus, Model, ModelComponent, ModelKind, ModelRef};
    pub use crate::sabr::{SabrModel, SabrParameters};
    pub use crate::valuation::{
        create_engine, create_value_report, EngineRegistry, ValuationEngine, Value, ValueReport,
    };
}

pub use error::{ModelError, ModelResult};
