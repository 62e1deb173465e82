//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tenor_core::Date;
use tenor_models::prelude::*;

pub const CONVENTIONS: &str = r#"{
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
    },
    "USD-LIBOR-3M-SWAP": {
        "KIND": "IBOR SWAP", "INDEX": "USD-LIBOR-BBA-3M", "ACCRUAL BASIS": "ACT/360",
        "ACCRUAL PERIOD": "6M", "PAYMENT OFFSET": "2B",
        "PAYMENT BIZ DAY CONV": "MF", "PAYMENT HOL CONV": "USNY+GBLO"
    }
}"#;

/// Futures strip followed by OIS par rates, as flat CSV quote rows.
pub const SOFR_QUOTES: &str = "\
data_type,data_convention,axis,value
PRICE,USD-SOFR-FUT,2025-03-19 x 2025-06-18,95.75
PRICE,USD-SOFR-FUT,2025-06-18 x 2025-09-17,95.90
PAR RATE,USD-SOFR-OIS,2Y,0.0405
PAR RATE,USD-SOFR-OIS,3Y,0.0392
PAR RATE,USD-SOFR-OIS,5Y,0.0385
PAR RATE,USD-SOFR-OIS,10Y,0.0390
";

/// One LIBOR future and three LIBOR swaps, without a header row.
pub const LIBOR_QUOTES: &str = "\
PRICE,USD-LIBOR-3M-FUT,2025-03-19 x 2025-06-19,95.70
PAR RATE,USD-LIBOR-3M-SWAP,2Y,0.0418
PAR RATE,USD-LIBOR-3M-SWAP,3Y,0.0405
PAR RATE,USD-LIBOR-3M-SWAP,5Y,0.0399
";

pub fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd(y, m, day).unwrap()
}

pub fn value_date() -> Date {
    d(2025, 1, 2)
}

pub fn env() -> Arc<Environment> {
    Arc::new(
        Environment::with_defaults()
            .with_conventions(DataConventionRegistry::from_json_str(CONVENTIONS).unwrap()),
    )
}

pub fn sofr_data() -> DataCollection {
    DataCollection::from_csv_reader(SOFR_QUOTES.as_bytes()).unwrap()
}

pub fn sofr_instruction() -> BuildInstruction {
    BuildInstruction::new("SOFR-1B").with_instruments(["USD-SOFR-FUT", "USD-SOFR-OIS"])
}

pub fn build(instruction: BuildInstruction, data: DataCollection) -> YieldCurveModel {
    YieldCurveModel::build(value_date(), &[instruction], Arc::new(data), env()).unwrap()
}

pub fn sofr_model() -> YieldCurveModel {
    build(sofr_instruction(), sofr_data())
}

pub fn state(model: &YieldCurveModel) -> Vec<f64> {
    model.component("SOFR-1B").unwrap().state()
}

pub fn libor_instruction() -> BuildInstruction {
    BuildInstruction::new("USD-LIBOR-BBA-3M")
        .with_instruments(["USD-LIBOR-3M-FUT", "USD-LIBOR-3M-SWAP"])
}

/// SOFR quotes followed by LIBOR quotes.
pub fn two_curve_data() -> DataCollection {
    let csv = format!("{SOFR_QUOTES}{LIBOR_QUOTES}");
    DataCollection::from_csv_reader(csv.as_bytes()).unwrap()
}

/// A SOFR curve and a LIBOR 3M curve, calibrated in that order.
pub fn two_curve_model() -> YieldCurveModel {
    YieldCurveModel::build(
        value_date(),
        &[sofr_instruction(), libor_instruction()],
        Arc::new(two_curve_data()),
        env(),
    )
    .unwrap()
}
