//! Shared fixtures for unit tests.

use std::sync::Arc;

use tenor_core::Date;

use crate::config::BuildInstruction;
use crate::curves::YieldCurveModel;
use crate::environment::Environment;
use crate::market::{Data1D, Data2D, DataCollection, DataConventionRegistry, MarketData};
use crate::sabr::{SabrModel, SabrParameter};

pub(crate) const CONVENTIONS: &str = r#"{
    "USD-SOFR-OIS": {
        "KIND": "RFR SWAP", "INDEX": "SOFR-1B", "ACCRUAL BASIS": "ACT/360",
        "ACCRUAL PERIOD": "1Y", "PAYMENT OFFSET": "2B",
        "PAYMENT BIZ DAY CONV": "MF", "PAYMENT HOL CONV": "USNY"
    },
    "USD-SOFR-FUT": {
        "KIND": "RFR FUTURE", "INDEX": "SOFR-1B", "ACCRUAL BASIS": "ACT/360",
        "ACCRUAL PERIOD": "3M", "PAYMENT OFFSET": "0B",
        "PAYMENT BIZ DAY CONV": "MF", "PAYMENT HOL CONV": "USNY"
    },
    "USD-LIBOR-3M-FUT": {
        "KIND": "IBOR FUTURE", "INDEX": "USD-LIBOR-BBA-3M", "ACCRUAL BASIS": "ACT/360",
        "ACCRUAL PERIOD": "3M", "PAYMENT OFFSET": "0B",
        "PAYMENT BIZ DAY CONV": "MF", "PAYMENT HOL CONV": "USNY+GBLO"
    }
}"#;

pub(crate) fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd(y, m, day).unwrap()
}

pub(crate) fn value_date() -> Date {
    d(2025, 1, 2)
}

pub(crate) fn env() -> Environment {
    Environment::with_defaults()
        .with_conventions(DataConventionRegistry::from_json_str(CONVENTIONS).unwrap())
}

pub(crate) fn sofr_data() -> DataCollection {
    let swaps = Data1D::new(
        "PAR RATE",
        "USD-SOFR-OIS",
        vec!["1Y".into(), "2Y".into(), "3Y".into(), "5Y".into()],
        vec![0.0430, 0.0405, 0.0392, 0.0385],
    )
    .unwrap();
    DataCollection::new().with(MarketData::OneD(swaps)).unwrap()
}

pub(crate) fn sofr_instruction() -> BuildInstruction {
    BuildInstruction::new("SOFR-1B").with_instruments(["USD-SOFR-OIS"])
}

/// A calibrated SOFR curve in the given environment.
pub(crate) fn sofr_model_in(env: Environment) -> YieldCurveModel {
    YieldCurveModel::build(
        value_date(),
        &[sofr_instruction()],
        Arc::new(sofr_data()),
        Arc::new(env),
    )
    .unwrap()
}

/// A calibrated SOFR curve from four OIS quotes.
pub(crate) fn sofr_model() -> YieldCurveModel {
    sofr_model_in(env())
}

/// SOFR SABR grids over expiries {0.5, 1, 5} and tenors {0.25, 1, 10},
/// plus a flat 0.8 correlation surface.
pub(crate) fn sabr_data() -> DataCollection {
    let expiries = vec![0.5, 1.0, 5.0];
    let tenors = vec![0.25, 1.0, 10.0];
    let flat = |v: f64| vec![vec![v; 3]; 3];
    let grid = |name: &str, values: Vec<Vec<f64>>| {
        MarketData::TwoD(
            Data2D::new(name, "SOFR-1B", expiries.clone(), tenors.clone(), values).unwrap(),
        )
    };
    DataCollection::new()
        .with(grid(
            "normalvol",
            vec![
                vec![0.0090, 0.0095, 0.0100],
                vec![0.0100, 0.0105, 0.0110],
                vec![0.0110, 0.0115, 0.0120],
            ],
        ))
        .unwrap()
        .with(grid("beta", flat(0.5)))
        .unwrap()
        .with(grid("nu", flat(0.4)))
        .unwrap()
        .with(grid("rho", flat(-0.2)))
        .unwrap()
        .with(grid("corr", flat(0.8)))
        .unwrap()
}

pub(crate) fn sabr_instructions() -> Vec<BuildInstruction> {
    SabrParameter::ALL
        .iter()
        .map(|p| {
            BuildInstruction::new("SOFR-1B")
                .with_values(p.as_str())
                .with_shift(0.01)
                .with_vol_decay_speed(0.5)
        })
        .collect()
}

/// SABR surfaces over [`sofr_model`].
pub(crate) fn sabr_model() -> SabrModel {
    SabrModel::new(&sabr_instructions(), Arc::new(sabr_data()), sofr_model()).unwrap()
}
