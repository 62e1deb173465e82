//! Integration tests for yield-curve calibration and curve risk.
//!
//! Curves are built from CSV quotes through the public API, then checked
//! by repricing their baskets, by comparing the two bootstrap methods and
//! by mapping instruments back onto quote space. A SOFR plus LIBOR 3M
//! model covers the multi-curve layout.

mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::{
    build, d, env, sofr_data, sofr_instruction, sofr_model, state, two_curve_model, value_date,
    SOFR_QUOTES,
};
use tenor_core::daycounts::DayCountConvention;
use tenor_core::Tenor;
use tenor_models::prelude::*;

#[test]
fn test_futures_and_swaps_reprice() {
    let model = sofr_model();
    let health = assert_calibrated(&model, 1e-8).unwrap();
    assert_eq!(health.rows.len(), 6);

    let futures: Vec<_> = health
        .rows
        .iter()
        .filter(|r| r.kind == InstrumentKind::RfrFuture)
        .collect();
    assert_eq!(futures.len(), 2);
    for row in futures {
        assert!(row.price_error.unwrap().abs() < 1e-6);
        let fwd = row.forward.unwrap();
        assert_relative_eq!(row.model_price.unwrap(), 100.0 * (1.0 - fwd), epsilon = 1e-9);
    }
    // pillars are ordered by anchor date, futures first
    assert_eq!(health.rows[0].kind, InstrumentKind::RfrFuture);
    assert_eq!(health.rows[5].node_id, "PAR RATE USD-SOFR-OIS 10Y");
}

#[test]
fn test_instructions_from_toml() {
    let text = r#"
        [[instruction]]
        TARGET = "SOFR-1B"
        INSTRUMENTS = ["USD-SOFR-FUT", "USD-SOFR-OIS"]
        "BOOTSTRAP METHOD" = "GLOBAL"
        RESIDUAL_TOL = 1e-8
    "#;
    let instructions = BuildInstruction::list_from_toml(text).unwrap();
    assert_eq!(instructions[0].bootstrap, BootstrapMethod::Global);
    let model = YieldCurveModel::build(
        value_date(),
        &instructions,
        Arc::new(sofr_data()),
        env(),
    )
    .unwrap();
    assert_eq!(
        model.component("SOFR-1B").unwrap().status(),
        &ComponentStatus::Calibrated
    );
}

#[test]
fn test_global_bootstrap_matches_sequential() {
    let sequential = sofr_model();
    let global = build(
        sofr_instruction().with_bootstrap(BootstrapMethod::Global),
        sofr_data(),
    );
    assert_calibrated(&global, 1e-8).unwrap();
    for (s, g) in state(&sequential).iter().zip(state(&global)) {
        assert_relative_eq!(*s, g, epsilon = 1e-7);
    }
}

#[test]
fn test_rebuild_from_model_par_rates() {
    let ois = BuildInstruction::new("SOFR-1B").with_instruments(["USD-SOFR-OIS"]);
    let base_data = DataCollection::from_csv_reader(
        "data_type,data_convention,axis,value\n\
         PAR RATE,USD-SOFR-OIS,1Y,0.0430\n\
         PAR RATE,USD-SOFR-OIS,2Y,0.0405\n\
         PAR RATE,USD-SOFR-OIS,3Y,0.0392\n\
         PAR RATE,USD-SOFR-OIS,5Y,0.0385\n"
            .as_bytes(),
    )
    .unwrap();
    let mut shifted = build(ois.clone(), base_data);
    shifted.perturb("SOFR-1B", 1, 0.002).unwrap();
    shifted.perturb("SOFR-1B", 3, -0.001).unwrap();
    let target = state(&shifted);

    // the shifted curve's own par rates become the new quotes
    let health = check_calibration(&shifted).unwrap();
    let quotes = Data1D::new(
        "PAR RATE",
        "USD-SOFR-OIS",
        vec!["1Y".into(), "2Y".into(), "3Y".into(), "5Y".into()],
        health.rows.iter().map(|r| r.par_rate.unwrap()).collect(),
    )
    .unwrap();
    let rebuilt = build(ois, DataCollection::new().with(MarketData::OneD(quotes)).unwrap());

    for (r, t) in state(&rebuilt).iter().zip(&target) {
        assert_relative_eq!(*r, *t, epsilon = 1e-7);
    }
}

#[test]
fn test_failed_calibration_marks_component() {
    let instruction = sofr_instruction()
        .with_max_local_iters(1)
        .with_residual_tol(1e-30);
    let mut model =
        YieldCurveModel::new(value_date(), &[instruction], Arc::new(sofr_data()), env()).unwrap();
    assert_eq!(
        model.component("SOFR-1B").unwrap().status(),
        &ComponentStatus::PillarsBuilt
    );
    assert!(matches!(
        model.discount_factor("SOFR-1B", d(2026, 1, 2)),
        Err(ModelError::Unusable { .. })
    ));

    let err = model.calibrate().unwrap_err();
    assert!(matches!(err, ModelError::Convergence { .. }));
    assert!(matches!(
        model.component("SOFR-1B").unwrap().status(),
        ComponentStatus::Failed { pillar: Some(0), .. }
    ));
    assert!(matches!(
        model.discount_factor("SOFR-1B", d(2026, 1, 2)),
        Err(ModelError::Unusable { .. })
    ));
    assert!(check_calibration(&model).is_err());
}

#[test]
fn test_duplicate_anchor_rejected() {
    let data = DataCollection::from_csv_reader(
        "data_type,data_convention,axis,value\n\
         PAR RATE,USD-SOFR-OIS,1Y,0.043\n\
         PAR RATE,USD-SOFR-OIS,12M,0.043\n"
            .as_bytes(),
    )
    .unwrap();
    let ois = BuildInstruction::new("SOFR-1B").with_instruments(["USD-SOFR-OIS"]);
    let err = YieldCurveModel::new(value_date(), &[ois], Arc::new(data), env()).unwrap_err();
    assert!(matches!(err, ModelError::Ordering { .. }));
}

#[test]
fn test_discount_factor_gradient_matches_bumps() {
    let model = sofr_model();
    let h = 1e-6;
    for date in [d(2025, 5, 2), d(2026, 8, 3), d(2031, 1, 2), d(2040, 1, 2)] {
        let mut gradient = model.new_gradient();
        model
            .discount_factor_gradient("SOFR-1B", date, &mut gradient, 1.0, false)
            .unwrap();
        for i in 0..gradient.len() {
            let mut up = model.clone();
            up.perturb("SOFR-1B", i, h).unwrap();
            let mut down = model.clone();
            down.perturb("SOFR-1B", i, -h).unwrap();
            let fd = (up.discount_factor("SOFR-1B", date).unwrap()
                - down.discount_factor("SOFR-1B", date).unwrap())
                / (2.0 * h);
            assert_relative_eq!(gradient.as_slice()[i], fd, epsilon = 1e-8);
        }
    }
}

#[test]
fn test_calibration_instruments_have_unit_quote_risk() {
    let model = sofr_model();
    let curve = model.curve("SOFR-1B").unwrap();
    let params = ValuationParameters::new("SOFR-1B");
    for (k, pillar) in curve.pillars().iter().enumerate() {
        let report = create_value_report(&model, &params, &pillar.instrument).unwrap();
        let nonzero: Vec<_> = report
            .nonzero_quote_risk()
            .filter(|(_, r)| r.abs() > 1e-8)
            .collect();
        assert_eq!(nonzero.len(), 1, "{}", pillar.node_id);
        assert_eq!(nonzero[0].0, pillar.node_id);
        assert_relative_eq!(report.quote_risk[k], 1.0, epsilon = 1e-8);
    }
}

#[test]
fn test_jacobian_labels_follow_pillars() {
    let model = sofr_model();
    let jacobian = model.jacobian().unwrap();
    assert_eq!(jacobian.dim(), 6);
    assert_eq!(jacobian.row_labels(), jacobian.column_labels());
    assert_eq!(jacobian.row_labels(), model.layout().labels());
}

#[test]
fn test_quote_risk_explains_pillar_bumps() {
    let model = sofr_model();
    let swap = build_swap(
        &env(),
        &SwapTerms::new("SOFR-1B", d(2025, 1, 6), d(2029, 1, 8), 0.039)
            .with_notional(1_000_000.0),
    )
    .unwrap();
    let params = ValuationParameters::new("SOFR-1B");
    let report = create_value_report(&model, &params, &swap).unwrap();
    // an off-pillar maturity is hedged by more than one quote
    assert!(report.nonzero_quote_risk().filter(|(_, r)| r.abs() > 1e-6).count() > 1);

    let value = |m: &YieldCurveModel| {
        create_engine(m.as_model_ref(), &params, &swap)
            .unwrap()
            .value()
            .unwrap()
            .amount
    };
    let pvs = |m: &YieldCurveModel| -> Vec<f64> {
        check_calibration(m)
            .unwrap()
            .rows
            .iter()
            .map(|r| r.pv)
            .collect()
    };

    // dV/dθ_j = Σ_i x_i dPV_i/dθ_j for every pillar j
    let h = 1e-5;
    for j in 0..report.quote_risk.len() {
        let mut up = model.clone();
        up.perturb("SOFR-1B", j, h).unwrap();
        let mut down = model.clone();
        down.perturb("SOFR-1B", j, -h).unwrap();

        let dv = (value(&up) - value(&down)) / (2.0 * h);
        let explained: f64 = report
            .quote_risk
            .iter()
            .zip(pvs(&up).iter().zip(pvs(&down)))
            .map(|(x, (u, d))| x * (u - d) / (2.0 * h))
            .sum();
        assert_relative_eq!(explained, dv, epsilon = 1e-2, max_relative = 1e-6);
    }
}

#[test]
fn test_recalibrate_with_new_quotes_rebuilds_pillars() {
    let mut model = sofr_model();
    let before = state(&model);
    assert_eq!(model.layout().total_len(), 6);

    let quotes = SOFR_QUOTES.replace("2Y,0.0405", "2Y,0.0415").replace(
        "PAR RATE,USD-SOFR-OIS,10Y",
        "PAR RATE,USD-SOFR-OIS,7Y,0.0387\nPAR RATE,USD-SOFR-OIS,10Y",
    );
    let data = DataCollection::from_csv_reader(quotes.as_bytes()).unwrap();
    model.recalibrate_with("sofr-1b", Arc::new(data)).unwrap();

    let after = state(&model);
    assert_eq!(after.len(), 7);
    assert_eq!(model.layout().total_len(), 7);
    assert_eq!(model.jacobian().unwrap().dim(), 7);
    let health = assert_calibrated(&model, 1e-8).unwrap();
    assert!(health
        .rows
        .iter()
        .any(|r| r.node_id == "PAR RATE USD-SOFR-OIS 7Y"));

    // futures pillars only see futures quotes
    assert_relative_eq!(after[0], before[0], epsilon = 1e-12);
    assert_relative_eq!(after[1], before[1], epsilon = 1e-12);
    assert!(after[2] - before[2] > 1e-4);
}

#[test]
fn test_recalibrate_without_quotes_fails_component() {
    let mut model = sofr_model();
    let err = model
        .recalibrate_with("SOFR-1B", Arc::new(DataCollection::new()))
        .unwrap_err();
    assert!(matches!(err, ModelError::Data { .. }));
    assert!(matches!(
        model.component("SOFR-1B").unwrap().status(),
        ComponentStatus::Failed { pillar: None, .. }
    ));
    assert!(matches!(
        model.discount_factor("SOFR-1B", d(2026, 1, 2)),
        Err(ModelError::Unusable { .. })
    ));
    assert!(model.recalibrate("ESTR-1B").is_err());
}

#[test]
fn test_two_curve_model_calibrates() {
    let model = two_curve_model();
    for component in model.components().iter() {
        assert_eq!(component.status(), &ComponentStatus::Calibrated);
    }
    let health = assert_calibrated(&model, 1e-8).unwrap();
    assert_eq!(health.rows.len(), 10);
    assert!(health.max_abs_pv < 1e-8);
    let libor: Vec<_> = health
        .rows
        .iter()
        .filter(|r| r.component == "USD-LIBOR-BBA-3M")
        .collect();
    assert_eq!(libor.len(), 4);
    assert_eq!(libor[0].kind, InstrumentKind::IborFuture);
    assert!(libor[0].price_error.unwrap().abs() < 1e-6);
    for row in &libor[1..] {
        assert_eq!(row.kind, InstrumentKind::IborSwap);
        assert!(row.par_minus_market.unwrap().abs() < 1e-8);
    }

    let blocks = model.layout().blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        (blocks[0].target_key.as_str(), blocks[0].offset, blocks[0].length),
        ("SOFR-1B", 0, 6)
    );
    assert_eq!(
        (blocks[1].target_key.as_str(), blocks[1].offset, blocks[1].length),
        ("USD-LIBOR-BBA-3M", 6, 4)
    );
}

#[test]
fn test_two_curve_jacobian_is_block_lower_triangular() {
    let model = two_curve_model();
    let jacobian = model.jacobian().unwrap();
    assert_eq!(jacobian.dim(), 10);
    assert_eq!(jacobian.row_labels(), model.layout().labels());

    let m = jacobian.matrix();
    for r in 0..10 {
        assert!(m[(r, r)].abs() > 1e-6, "{}", jacobian.row_labels()[r]);
        // SOFR instruments never see LIBOR parameters, and each block is
        // lower triangular under the sequential bootstrap
        for c in (r + 1)..10 {
            assert_eq!(m[(r, c)], 0.0, "({r}, {c})");
        }
    }
}

#[test]
fn test_libor_swap_risk_stays_in_its_block() {
    let model = two_curve_model();
    let swap = build_swap(
        &env(),
        &SwapTerms::new("USD-LIBOR-BBA-3M", d(2025, 1, 6), d(2029, 1, 8), 0.04)
            .with_notional(1_000_000.0)
            .with_fixed_leg(Tenor::months(6), DayCountConvention::Act360),
    )
    .unwrap();
    assert_eq!(swap.kind(), InstrumentKind::IborSwap);

    let params = ValuationParameters::new("USD-LIBOR-BBA-3M");
    let report = create_value_report(&model, &params, &swap).unwrap();
    assert_eq!(report.labels.len(), 10);
    assert!(report.parameter_risk[..6].iter().all(|r| *r == 0.0));
    assert!(report.parameter_risk[6..].iter().any(|r| r.abs() > 1.0));
    assert!(report.quote_risk[..6].iter().all(|r| r.abs() < 1e-10));
    assert!(report.quote_risk[6..].iter().filter(|r| r.abs() > 1e-6).count() > 1);
}
