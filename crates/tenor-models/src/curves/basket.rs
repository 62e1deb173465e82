//! Calibration basket: one instrument per quoted axis point.

use std::sync::Arc;

use tenor_core::{Date, Tenor};

use crate::config::BuildInstruction;
use crate::environment::Environment;
use crate::error::{ModelError, ModelResult};
use crate::instruments::{build_ibor_future, build_rfr_future, build_swap, Instrument, Position, SwapTerms};
use crate::market::{ConventionKind, DataCollection, DataConvention};

/// A calibration instrument with the quote it reprices to.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibItem {
    /// Instrument struck at the quote.
    pub instrument: Arc<Instrument>,
    /// Market quote.
    pub quote: f64,
    /// Dataset type.
    pub data_type: String,
    /// Dataset convention.
    pub data_convention: String,
    /// Axis label of the point.
    pub axis: String,
}

/// Parses a futures axis label `"start x end"`.
///
/// # Errors
///
/// `ModelError::Data` when the label is not two dates joined by `x`.
pub fn parse_date_pair(label: &str) -> ModelResult<(Date, Date)> {
    let (start, end) = label
        .split_once(" x ")
        .or_else(|| label.split_once(" X "))
        .ok_or_else(|| ModelError::data(format!("futures axis '{label}' is not 'start x end'")))?;
    Ok((Date::parse(start)?, Date::parse(end)?))
}

/// Builds the basket for one yield-curve instruction.
///
/// Every 1-D dataset whose convention is listed in `INSTRUMENTS` contributes
/// one item per axis point, in dataset order.
///
/// # Errors
///
/// - `ModelError::Configuration` when `INSTRUMENTS` is empty or names an
///   unregistered convention
/// - `ModelError::Data` when no dataset matches or a label is malformed
pub fn build_calibration_basket(
    env: &Environment,
    data: &DataCollection,
    value_date: Date,
    instruction: &BuildInstruction,
) -> ModelResult<Vec<CalibItem>> {
    if instruction.instruments.is_empty() {
        return Err(ModelError::configuration(format!(
            "'{}' has no INSTRUMENTS to calibrate to",
            instruction.target
        )));
    }

    let datasets = data.one_d_by_conventions(&instruction.instruments);
    if datasets.is_empty() {
        return Err(ModelError::data(format!(
            "no market data for {:?} (available conventions: {:?})",
            instruction.instruments,
            data.available_conventions()
        )));
    }

    let mut basket = Vec::new();
    for dataset in datasets {
        let convention = env.conventions.get(&dataset.data_convention)?;
        for (label, quote) in dataset.points() {
            let instrument = instrument_for_point(env, convention, value_date, label, quote)?;
            basket.push(CalibItem {
                instrument: Arc::new(instrument),
                quote,
                data_type: dataset.data_type.clone(),
                data_convention: dataset.data_convention.clone(),
                axis: label.to_string(),
            });
        }
    }
    Ok(basket)
}

fn instrument_for_point(
    env: &Environment,
    convention: &DataConvention,
    value_date: Date,
    label: &str,
    quote: f64,
) -> ModelResult<Instrument> {
    let overnight = env.index(&convention.index)?.is_overnight();
    let expects_overnight = matches!(
        convention.kind,
        ConventionKind::RfrSwap | ConventionKind::RfrFuture
    );
    if overnight != expects_overnight {
        return Err(ModelError::configuration(format!(
            "convention '{}' of kind {:?} cannot use index '{}'",
            convention.name, convention.kind, convention.index
        )));
    }

    match convention.kind {
        ConventionKind::RfrFuture => {
            let (start, end) = parse_date_pair(label)?;
            build_rfr_future(env, &convention.index, start, end, quote, 1.0, Position::Long)
        }
        ConventionKind::IborFuture => {
            let (start, _) = parse_date_pair(label)?;
            build_ibor_future(env, &convention.index, start, quote, 1.0, Position::Long)
        }
        ConventionKind::RfrSwap | ConventionKind::IborSwap => {
            let tenor = Tenor::parse(label)?;
            let calendar = env.calendar(&convention.payment_hol_conv)?;
            let roll = convention.payment_biz_day_conv;
            let spot = calendar.advance(value_date, convention.payment_offset, roll, false)?;
            let maturity = calendar.advance(spot, tenor, roll, false)?;

            let mut terms = SwapTerms::new(&convention.index, spot, maturity, quote)
                .with_position(Position::Long)
                .with_fixed_leg(convention.accrual_period, convention.accrual_basis)
                .with_calendar(&convention.payment_hol_conv, roll)
                .with_compounding(convention.ois_compounding);
            if convention.kind == ConventionKind::RfrSwap {
                terms = terms.with_payment_lag(convention.payment_offset);
            }
            build_swap(env, &terms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::InstrumentKind;
    use crate::market::{Data1D, DataConventionRegistry, MarketData};

    const CONVENTIONS: &str = r#"{
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
        "BAD-OIS": {
            "KIND": "RFR SWAP", "INDEX": "USD-LIBOR-BBA-3M", "ACCRUAL BASIS": "ACT/360",
            "ACCRUAL PERIOD": "1Y", "PAYMENT OFFSET": "2B",
            "PAYMENT BIZ DAY CONV": "MF", "PAYMENT HOL CONV": "USNY"
        }
    }"#;

    fn env() -> Environment {
        Environment::with_defaults()
            .with_conventions(DataConventionRegistry::from_json_str(CONVENTIONS).unwrap())
    }

    fn value_date() -> Date {
        Date::from_ymd(2025, 1, 2).unwrap()
    }

    fn data() -> DataCollection {
        let swaps = Data1D::new(
            "PAR RATE",
            "USD-SOFR-OIS",
            vec!["1Y".into(), "2Y".into()],
            vec![0.040, 0.041],
        )
        .unwrap();
        let futures = Data1D::new(
            "PRICE",
            "USD-SOFR-FUT",
            vec!["2025-03-19 x 2025-06-18".into()],
            vec![95.9],
        )
        .unwrap();
        DataCollection::new()
            .with(MarketData::OneD(swaps))
            .unwrap()
            .with(MarketData::OneD(futures))
            .unwrap()
    }

    #[test]
    fn test_basket_items() {
        let bi = BuildInstruction::new("SOFR-1B").with_instruments(["USD-SOFR-FUT", "USD-SOFR-OIS"]);
        let basket = build_calibration_basket(&env(), &data(), value_date(), &bi).unwrap();
        assert_eq!(basket.len(), 3);
        // dataset insertion order, not INSTRUMENTS order
        assert_eq!(basket[0].instrument.kind(), InstrumentKind::OvernightSwap);
        assert_eq!(basket[2].instrument.kind(), InstrumentKind::RfrFuture);
        assert_eq!(basket[2].quote, 95.9);

        let Instrument::OvernightSwap(swap) = basket[0].instrument.as_ref() else {
            panic!("expected a swap")
        };
        // spot is two business days after 2025-01-02
        assert_eq!(swap.start, Date::from_ymd(2025, 1, 6).unwrap());
        assert_eq!(swap.fixed_rate, 0.040);
    }

    #[test]
    fn test_empty_instruments_is_configuration_error() {
        let bi = BuildInstruction::new("SOFR-1B");
        assert!(matches!(
            build_calibration_basket(&env(), &data(), value_date(), &bi),
            Err(ModelError::Configuration { .. })
        ));
    }

    #[test]
    fn test_missing_dataset_lists_available() {
        let bi = BuildInstruction::new("ESTR-1B").with_instruments(["EUR-ESTR-OIS"]);
        let err = build_calibration_basket(&env(), &data(), value_date(), &bi).unwrap_err();
        assert!(matches!(err, ModelError::Data { .. }));
        assert!(err.to_string().contains("USD-SOFR-OIS"));
    }

    #[test]
    fn test_index_kind_mismatch() {
        let bad = Data1D::new("PAR RATE", "BAD-OIS", vec!["1Y".into()], vec![0.04]).unwrap();
        let data = DataCollection::new().with(MarketData::OneD(bad)).unwrap();
        let bi = BuildInstruction::new("USD-LIBOR-BBA-3M").with_instruments(["BAD-OIS"]);
        assert!(build_calibration_basket(&env(), &data, value_date(), &bi).is_err());
    }

    #[test]
    fn test_parse_date_pair() {
        let (s, e) = parse_date_pair("2025-03-19 x 2025-06-18").unwrap();
        assert!(s < e);
        assert!(parse_date_pair("2025-03-19/2025-06-18").is_err());
    }
}
