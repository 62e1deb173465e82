//! Sequential and global calibration of one yield-curve component.
//!
//! Every trial state is installed into a fresh copy of the model
//! ([`YieldCurveModel::with_component_state`]); the residual of a pillar is
//! the value of its calibration instrument priced through the engine
//! registry, discounting on the component's own index.

use tenor_math::optimization::{damped_gauss_newton, GaussNewtonConfig};
use tenor_math::solvers::{secant, SolverConfig};
use tracing::{debug, info};

use super::{PillarNode, YieldCurveComponent, YieldCurveModel, DEFAULT_IFR_GUESS};
use crate::config::{BootstrapMethod, InterpolationMethod, ValuationParameters};
use crate::error::{ModelError, ModelResult};
use crate::model::{ComponentStatus, Model, ModelComponent};
use crate::valuation::create_engine;

/// Sensitivities below this count as zero in the single-bucket check.
const BUCKET_LEAK_TOL: f64 = 1e-14;

/// Result of calibrating one component.
///
/// The component is always returned: calibrated on success, flagged
/// `Failed` with whatever pillars were solved otherwise.
pub(super) struct CalibrationOutcome {
    pub component: YieldCurveComponent,
    pub error: Option<ModelError>,
}

pub(super) fn calibrate(
    model: &YieldCurveModel,
    position: usize,
    component: &YieldCurveComponent,
) -> CalibrationOutcome {
    let mut state = vec![DEFAULT_IFR_GUESS; component.len()];

    let result = match component.instruction().bootstrap {
        BootstrapMethod::Sequential => run_sequential(model, position, component, &mut state),
        BootstrapMethod::Global => run_global(model, position, component, &mut state),
    };

    match result {
        Ok(()) => match component.with_state(&state, ComponentStatus::Calibrated) {
            Ok(calibrated) => {
                info!(
                    target_key = %component.key(),
                    pillars = component.len(),
                    method = ?component.instruction().bootstrap,
                    "curve calibrated"
                );
                CalibrationOutcome {
                    component: calibrated,
                    error: None,
                }
            }
            Err(error) => failed(component, &state, error),
        },
        Err(error) => failed(component, &state, error),
    }
}

fn failed(component: &YieldCurveComponent, state: &[f64], error: ModelError) -> CalibrationOutcome {
    let pillar = match &error {
        ModelError::Ordering { pillar, .. } => Some(*pillar),
        ModelError::Convergence { pillar, .. } => *pillar,
        _ => None,
    };
    let status = ComponentStatus::Failed {
        pillar,
        reason: error.to_string(),
    };
    let component = component
        .with_state(state, status.clone())
        .unwrap_or_else(|_| component.with_status(status));
    CalibrationOutcome {
        component,
        error: Some(error),
    }
}

/// Value of a pillar's instrument against a trial model.
fn pillar_residual(
    trial: &YieldCurveModel,
    params: &ValuationParameters,
    pillar: &PillarNode,
) -> ModelResult<f64> {
    let engine = create_engine(trial.as_model_ref(), params, &pillar.instrument)?;
    Ok(engine.value()?.amount)
}

fn run_sequential(
    model: &YieldCurveModel,
    position: usize,
    component: &YieldCurveComponent,
    state: &mut [f64],
) -> ModelResult<()> {
    let instruction = component.instruction();
    let target = component.key();
    let params = ValuationParameters::new(component.target());

    if instruction.check_single_bucket
        && instruction.interpolation == InterpolationMethod::PiecewiseConstant
    {
        check_single_bucket(model, position, component, state, &params)?;
    }

    let config = SolverConfig::new(instruction.local_tol, instruction.max_local_iters);
    for (k, pillar) in component.pillars().iter().enumerate() {
        let residual = |x: f64| -> ModelResult<f64> {
            let mut trial_state = state.to_vec();
            trial_state[k] = x;
            let trial = model.with_component_state(
                position,
                &trial_state,
                ComponentStatus::Solving { pillar: k },
            )?;
            pillar_residual(&trial, &params, pillar)
        };

        let x0 = state[k];
        let x1 = if x0 == 0.0 { 1e-4 } else { x0 * 1.0001 };
        let solution = secant(|x| residual(x).unwrap_or(f64::NAN), x0, x1, &config);
        let final_residual = residual(solution.root)?;

        if !final_residual.is_finite() || final_residual.abs() > instruction.residual_tol {
            return Err(ModelError::convergence(
                target,
                Some(k),
                Some(pillar.instrument.kind()),
                format!(
                    "{} left residual {final_residual:e} after {} secant steps",
                    pillar.node_id, solution.iterations
                ),
            ));
        }

        state[k] = solution.root;
        debug!(
            pillar = k,
            node_id = %pillar.node_id,
            state_value = solution.root,
            residual = final_residual,
            iterations = solution.iterations,
            "pillar solved"
        );
    }
    Ok(())
}

/// Verifies that pillar `k`'s instrument only depends on state `0..=k`.
fn check_single_bucket(
    model: &YieldCurveModel,
    position: usize,
    component: &YieldCurveComponent,
    state: &[f64],
    params: &ValuationParameters,
) -> ModelResult<()> {
    let trial =
        model.with_component_state(position, state, ComponentStatus::Solving { pillar: 0 })?;
    let block = trial.layout().block(component.key()).cloned().ok_or_else(|| {
        ModelError::data(format!("no gradient block for '{}'", component.key()))
    })?;
    let mut gradient = trial.new_gradient();

    for (k, pillar) in component.pillars().iter().enumerate() {
        let engine = create_engine(trial.as_model_ref(), params, &pillar.instrument)?;
        engine.calculate_first_order_risk(&mut gradient, 1.0, false)?;
        let row = &gradient.as_slice()[block.offset..block.offset + block.length];
        if let Some((j, g)) = row
            .iter()
            .enumerate()
            .skip(k + 1)
            .find(|(_, g)| g.abs() > BUCKET_LEAK_TOL)
        {
            return Err(ModelError::ordering(
                component.key(),
                k,
                format!(
                    "{} is sensitive to later pillar {j} ({g:e}); anchors must add one bucket each",
                    pillar.node_id
                ),
            ));
        }
    }
    Ok(())
}

fn run_global(
    model: &YieldCurveModel,
    position: usize,
    component: &YieldCurveComponent,
    state: &mut Vec<f64>,
) -> ModelResult<()> {
    let instruction = component.instruction();
    let params = ValuationParameters::new(component.target());
    let pillars = component.pillars();
    let n = pillars.len();

    let residuals = |x: &[f64]| -> ModelResult<Vec<f64>> {
        let trial =
            model.with_component_state(position, x, ComponentStatus::Solving { pillar: 0 })?;
        pillars
            .iter()
            .map(|pillar| pillar_residual(&trial, &params, pillar))
            .collect()
    };

    let config = GaussNewtonConfig::with_uniform_bounds(
        n,
        instruction.ifr_lower_bound,
        instruction.ifr_upper_bound,
    )
    .with_tolerance(instruction.global_tol)
    .with_max_iterations(instruction.max_global_iters);

    let start = state.clone();
    let result = damped_gauss_newton(
        |x| residuals(x).unwrap_or_else(|_| vec![f64::NAN; n]),
        &start,
        &config,
    )?;
    *state = result.parameters;

    let final_residuals = residuals(state)?;
    let worst = final_residuals
        .iter()
        .enumerate()
        .max_by(|a, b| {
            let a = if a.1.is_finite() { a.1.abs() } else { f64::INFINITY };
            let b = if b.1.is_finite() { b.1.abs() } else { f64::INFINITY };
            a.total_cmp(&b)
        })
        .map(|(i, r)| (i, *r));

    if let Some((k, worst)) = worst {
        if !worst.is_finite() || worst.abs() > instruction.residual_tol {
            return Err(ModelError::convergence(
                component.key(),
                Some(k),
                Some(pillars[k].instrument.kind()),
                format!(
                    "global solve left residual {worst:e} at {} after {} iterations",
                    pillars[k].node_id, result.iterations
                ),
            ));
        }
    }

    for (k, (pillar, value)) in pillars.iter().zip(state.iter()).enumerate() {
        debug!(
            pillar = k,
            node_id = %pillar.node_id,
            state_value = *value,
            residual = final_residuals[k],
            iterations = result.iterations,
            "pillar solved"
        );
    }
    Ok(())
}
