//! Integration tests for SABR surfaces, the parameter transforms and the
//! option engines.

mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::{d, sofr_model};
use proptest::prelude::*;
use tenor_core::Tenor;
use tenor_models::prelude::*;
use tenor_models::sabr::{
    correlation_blend, option_price, time_decay_params, OptionQuote, SabrVolParams,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("tenor_models=debug")
        .try_init();
}

fn surface(name: &str, values: Vec<Vec<f64>>) -> MarketData {
    MarketData::TwoD(
        Data2D::new(name, "SOFR-1B", vec![0.25, 1.0, 3.0], vec![0.25, 2.0, 5.0], values)
            .unwrap(),
    )
}

fn flat(v: f64) -> Vec<Vec<f64>> {
    vec![vec![v; 3]; 3]
}

fn sabr_data() -> DataCollection {
    DataCollection::new()
        .with(surface(
            "normalvol",
            vec![
                vec![0.0095, 0.0100, 0.0105],
                vec![0.0100, 0.0108, 0.0112],
                vec![0.0098, 0.0104, 0.0110],
            ],
        ))
        .unwrap()
        .with(surface("beta", flat(0.5)))
        .unwrap()
        .with(surface("nu", flat(0.35)))
        .unwrap()
        .with(surface("rho", flat(-0.25)))
        .unwrap()
        .with(surface("corr", flat(0.9)))
        .unwrap()
}

fn sabr_model() -> SabrModel {
    let instructions = BuildInstruction::list_from_json(
        r#"[
            {"TARGET": "SOFR-1B", "VALUES": "NORMALVOL", "SHIFT": 0.02, "VOL_DECAY_SPEED": 0.3},
            {"TARGET": "SOFR-1B", "VALUES": "BETA"},
            {"TARGET": "SOFR-1B", "VALUES": "NU"},
            {"TARGET": "SOFR-1B", "VALUES": "RHO"}
        ]"#,
    )
    .unwrap();
    SabrModel::new(&instructions, Arc::new(sabr_data()), sofr_model()).unwrap()
}

fn cap(option_type: OptionType) -> CapFloorTerms {
    CapFloorTerms {
        index: "SOFR-1B".into(),
        start: d(2025, 7, 2),
        maturity: d(2027, 7, 2),
        strike: 0.038,
        notional: 10_000_000.0,
        position: Position::Long,
        option_type,
        frequency: Some(Tenor::months(3)),
    }
}

fn value(model: &SabrModel, params: &ValuationParameters, instrument: &Instrument) -> f64 {
    create_engine(model.as_model_ref(), params, instrument)
        .unwrap()
        .value()
        .unwrap()
        .amount
}

#[test]
fn test_surfaces_calibrate_over_curve() {
    init_tracing();
    let model = sabr_model();
    for component in model.components().iter() {
        assert_eq!(component.status(), &ComponentStatus::Calibrated);
    }
    let p = model.sabr_parameters("SOFR-1B", 1.0, 2.0, None).unwrap();
    assert_relative_eq!(p.normal_vol, 0.0108);
    assert_relative_eq!(p.shift, 0.02);
    assert_relative_eq!(p.decay_speed, 0.3);
    // beyond the grid the surfaces extrapolate flat
    let far = model.sabr_parameters("SOFR-1B", 10.0, 30.0, None).unwrap();
    assert_relative_eq!(far.normal_vol, 0.0110);
}

#[test]
fn test_cap_floor_parity_for_every_method() {
    init_tracing();
    let model = sabr_model();
    let env = model.environment();
    let cap_strip = build_cap_floor(env, &cap(OptionType::Cap)).unwrap();
    let floor_strip = build_cap_floor(env, &cap(OptionType::Floor)).unwrap();
    let Instrument::OvernightCapFloor(strip) = &cap_strip else {
        panic!("expected an overnight cap")
    };
    let curves = model.curve_model();
    let forward_leg: f64 = strip
        .caplets
        .iter()
        .map(|c| {
            let f = curves
                .forward("SOFR-1B", c.accrual_start, Some(c.accrual_end))
                .unwrap();
            let df = curves.discount_factor("SOFR-1B", c.accrual_end).unwrap();
            c.notional * df * c.accrual * (f - c.strike)
        })
        .sum();

    for method in [SabrMethod::Hagan, SabrMethod::TopDown, SabrMethod::BottomUp] {
        let params = ValuationParameters::new("SOFR-1B").with_sabr_method(method);
        let c = value(&model, &params, &cap_strip);
        let f = value(&model, &params, &floor_strip);
        assert!(c > 0.0 && f > 0.0, "{method:?}");
        assert_relative_eq!(c - f, forward_leg, epsilon = 1e-4);
    }
}

#[test]
fn test_short_position_flips_sign() {
    let model = sabr_model();
    let env = model.environment();
    let params = ValuationParameters::new("SOFR-1B");
    let long = build_cap_floor(env, &cap(OptionType::Cap)).unwrap();
    let short = build_cap_floor(
        env,
        &CapFloorTerms {
            position: Position::Short,
            ..cap(OptionType::Cap)
        },
    )
    .unwrap();
    assert_relative_eq!(
        value(&model, &params, &long),
        -value(&model, &params, &short),
        max_relative = 1e-12
    );
}

#[test]
fn test_payer_swaption_falls_with_strike() {
    let model = sabr_model();
    let env = model.environment();
    let params = ValuationParameters::new("SOFR-1B");
    let values: Vec<f64> = [0.035, 0.039, 0.043]
        .into_iter()
        .map(|strike| {
            let terms = SwapTerms::new("SOFR-1B", d(2026, 1, 6), d(2029, 1, 8), strike)
                .with_notional(1_000_000.0);
            let swaption =
                build_swaption(env, d(2026, 1, 2), &terms, SwaptionType::Payer, Position::Long)
                    .unwrap();
            value(&model, &params, &swaption)
        })
        .collect();
    assert!(values.iter().all(|v| *v > 0.0));
    assert!(values[0] > values[1] && values[1] > values[2]);
}

#[test]
fn test_curve_model_cannot_price_options() {
    let model = sabr_model();
    let cap_strip = build_cap_floor(model.environment(), &cap(OptionType::Cap)).unwrap();
    let err = create_engine(
        model.curve_model().as_model_ref(),
        &ValuationParameters::new("SOFR-1B"),
        &cap_strip,
    )
    .err()
    .unwrap();
    assert!(matches!(err, ModelError::Dispatch { .. }));
}

#[test]
fn test_decay_is_identity_when_start_reaches_end() {
    let raw = SabrVolParams {
        alpha: 0.05,
        beta: 0.5,
        rho: -0.3,
        nu: 0.4,
    };
    assert_eq!(time_decay_params(raw, 0.7, 2.0, 2.0), raw);
    assert_eq!(time_decay_params(raw, 0.7, 3.0, 2.0), raw);
}

#[test]
fn test_bottom_up_single_period_matches_plain_alpha() {
    let model = sabr_model();
    let quote = OptionQuote {
        index: "SOFR-1B",
        expiry: 1.0,
        tenor: 0.25,
        forward: 0.04,
        strike: 0.041,
        option_type: OptionType::Cap,
        fixing_periods: &[0.25],
    };
    let bottom = option_price(&model, SabrMethod::BottomUp, &quote).unwrap();
    // one period: the blend returns the plain parameters, priced to expiry + tenor
    let p = model.sabr_parameters("SOFR-1B", 1.0, 0.25, None).unwrap();
    let params =
        tenor_models::sabr::plain_params(p.normal_vol, p.beta, p.rho, p.nu, 0.06, 1.0).unwrap();
    let expected = params.price(0.06, 0.061, 1.25, OptionType::Cap).unwrap();
    assert_relative_eq!(bottom, expected, max_relative = 1e-12);
}

fn equal_periods(n: usize) -> Vec<(f64, SabrVolParams)> {
    let p = SabrVolParams {
        alpha: 0.04,
        beta: 0.5,
        rho: -0.2,
        nu: 0.3,
    };
    vec![(1.0 / n as f64, p); n]
}

proptest! {
    #[test]
    fn prop_blend_correlation_bounded(gamma in 0.0f64..1.0, n in 2usize..10) {
        let periods = equal_periods(n);
        let full = correlation_blend(&periods, 1.0).unwrap();
        let partial = correlation_blend(&periods, gamma).unwrap();
        let ratio = partial.alpha / full.alpha;
        prop_assert!(ratio <= 1.0 + 1e-12);
        prop_assert!(ratio >= gamma.sqrt() - 1e-12);
        prop_assert!((partial.beta - 0.5).abs() < 1e-12);
    }

    #[test]
    fn prop_decay_keeps_parameters_finite(
        speed in 0.0f64..2.0,
        ts in 0.0f64..5.0,
        span in 0.05f64..5.0,
    ) {
        let raw = SabrVolParams { alpha: 0.05, beta: 0.5, rho: -0.3, nu: 0.4 };
        let decayed = time_decay_params(raw, speed, ts, ts + span);
        prop_assert!(decayed.alpha > 0.0 && decayed.alpha.is_finite());
        prop_assert!(decayed.nu >= 0.0 && decayed.nu.is_finite());
        prop_assert!(decayed.rho.is_finite());
        prop_assert_eq!(decayed.beta, raw.beta);
    }
}
