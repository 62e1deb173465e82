//! Bootstrapped yield curves.
//!
//! Each component of a [`YieldCurveModel`] is an instantaneous forward
//! curve for one index, piecewise constant between pillars:
//!
//! ```text
//! DF(t) = exp(-∫₀ᵗ f(u) du)
//! F(S, E) = (DF(S) / DF(E) - 1) / α(S, E)
//! ```
//!
//! Components are calibrated in instruction order, so a curve may discount
//! on a curve listed before it.

mod basket;
mod bootstrap;
mod gradient;
mod jacobian;
mod pillars;

pub use basket::{build_calibration_basket, parse_date_pair, CalibItem};
pub use gradient::{GradientBlock, GradientBuffer, GradientLayout};
pub use jacobian::Jacobian;
pub use pillars::{build_pillars, PillarNode};

use std::sync::Arc;

use tenor_core::daycounts::DayCountConvention;
use tenor_core::Date;
use tenor_math::interpolation::{Interpolator, LinearInterpolator, StepInterpolator};
use tracing::debug;

use crate::config::{BuildInstruction, InterpolationMethod, Validate};
use crate::environment::Environment;
use crate::error::{ModelError, ModelResult};
use crate::market::DataCollection;
use crate::model::{
    component_key, ComponentSet, ComponentStatus, Model, ModelComponent, ModelKind, ModelRef,
};

/// Flat instantaneous forward every pillar starts from.
pub const DEFAULT_IFR_GUESS: f64 = 0.04;

#[derive(Debug, Clone, PartialEq)]
enum ForwardCurve {
    PiecewiseConstant(StepInterpolator),
    Linear(LinearInterpolator),
}

impl ForwardCurve {
    fn new(method: InterpolationMethod, axis: Vec<f64>, values: Vec<f64>) -> ModelResult<Self> {
        Ok(match method {
            InterpolationMethod::PiecewiseConstant => {
                ForwardCurve::PiecewiseConstant(StepInterpolator::new(axis, values)?)
            }
            InterpolationMethod::Linear => {
                ForwardCurve::Linear(LinearInterpolator::new(axis, values)?)
            }
        })
    }

    fn as_interpolator(&self) -> &dyn Interpolator {
        match self {
            ForwardCurve::PiecewiseConstant(c) => c,
            ForwardCurve::Linear(c) => c,
        }
    }
}

/// One bootstrapped forward curve.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldCurveComponent {
    key: String,
    instruction: BuildInstruction,
    pillars: Vec<PillarNode>,
    curve: ForwardCurve,
    status: ComponentStatus,
}

impl YieldCurveComponent {
    fn new(key: String, instruction: BuildInstruction, pillars: Vec<PillarNode>) -> ModelResult<Self> {
        let axis = pillars.iter().map(|p| p.pillar_time).collect();
        let values = pillars.iter().map(|p| p.state_value).collect();
        let curve = ForwardCurve::new(instruction.interpolation, axis, values)?;
        Ok(Self {
            key,
            instruction,
            pillars,
            curve,
            status: ComponentStatus::PillarsBuilt,
        })
    }

    /// The calibration pillars, in anchor order.
    pub fn pillars(&self) -> &[PillarNode] {
        &self.pillars
    }

    /// Number of pillars.
    pub fn len(&self) -> usize {
        self.pillars.len()
    }

    /// True when the curve has no pillars.
    pub fn is_empty(&self) -> bool {
        self.pillars.is_empty()
    }

    /// Pillar times.
    pub fn pillar_times(&self) -> &[f64] {
        self.curve.as_interpolator().axis()
    }

    /// Interpolation method.
    pub fn interpolation(&self) -> InterpolationMethod {
        self.instruction.interpolation
    }

    /// Instantaneous forward at time `t`.
    pub fn instantaneous_forward(&self, t: f64) -> f64 {
        self.curve.as_interpolator().interpolate(t)
    }

    /// `∫₀ᵗ f(u) du`.
    pub fn integrated_forward(&self, t: f64) -> f64 {
        self.curve.as_interpolator().integral(0.0, t)
    }

    /// Copy with a new state vector and status; pillar values follow the
    /// state.
    pub(crate) fn with_state(&self, state: &[f64], status: ComponentStatus) -> ModelResult<Self> {
        if state.len() != self.pillars.len() {
            return Err(ModelError::data(format!(
                "state of length {} for {} pillars of '{}'",
                state.len(),
                self.pillars.len(),
                self.key
            )));
        }
        let mut pillars = self.pillars.clone();
        for (pillar, value) in pillars.iter_mut().zip(state) {
            pillar.state_value = *value;
        }
        let curve = ForwardCurve::new(
            self.instruction.interpolation,
            self.pillar_times().to_vec(),
            state.to_vec(),
        )?;
        Ok(Self {
            key: self.key.clone(),
            instruction: self.instruction.clone(),
            pillars,
            curve,
            status,
        })
    }

    pub(crate) fn with_status(&self, status: ComponentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

impl ModelComponent for YieldCurveComponent {
    fn key(&self) -> &str {
        &self.key
    }

    fn instruction(&self) -> &BuildInstruction {
        &self.instruction
    }

    fn status(&self) -> &ComponentStatus {
        &self.status
    }

    fn state(&self) -> Vec<f64> {
        self.curve.as_interpolator().values().to_vec()
    }
}

/// A set of bootstrapped curves, one per index.
///
/// Cloning is cheap: components and reference data are shared.
#[derive(Debug, Clone)]
pub struct YieldCurveModel {
    value_date: Date,
    time_measure: DayCountConvention,
    env: Arc<Environment>,
    data: Arc<DataCollection>,
    components: ComponentSet<YieldCurveComponent>,
    layout: Arc<GradientLayout>,
}

impl YieldCurveModel {
    /// Builds pillars for every instruction without calibrating.
    ///
    /// Curve time is measured ACT/365F from the value date.
    ///
    /// # Errors
    ///
    /// Configuration, data or ordering errors from any instruction.
    pub fn new(
        value_date: Date,
        instructions: &[BuildInstruction],
        data: Arc<DataCollection>,
        env: Arc<Environment>,
    ) -> ModelResult<Self> {
        Self::with_time_measure(
            value_date,
            DayCountConvention::Act365Fixed,
            instructions,
            data,
            env,
        )
    }

    /// As [`new`](Self::new) with an explicit curve-time day count.
    ///
    /// # Errors
    ///
    /// Configuration, data or ordering errors from any instruction.
    pub fn with_time_measure(
        value_date: Date,
        time_measure: DayCountConvention,
        instructions: &[BuildInstruction],
        data: Arc<DataCollection>,
        env: Arc<Environment>,
    ) -> ModelResult<Self> {
        let mut model = Self {
            value_date,
            time_measure,
            env,
            data,
            components: ComponentSet::new(),
            layout: Arc::new(GradientLayout::new()),
        };
        for instruction in instructions {
            let component = model.new_component(instruction)?;
            model.components.push(component)?;
        }
        model.layout = Arc::new(model.build_layout()?);
        Ok(model)
    }

    /// Builds and calibrates.
    ///
    /// # Errors
    ///
    /// Any construction error, or the first calibration failure.
    pub fn build(
        value_date: Date,
        instructions: &[BuildInstruction],
        data: Arc<DataCollection>,
        env: Arc<Environment>,
    ) -> ModelResult<Self> {
        let mut model = Self::new(value_date, instructions, data, env)?;
        model.calibrate()?;
        Ok(model)
    }

    /// Rebuilds the basket and pillars of one component from the model's
    /// current data, then calibrates it. Other components keep their state.
    ///
    /// The pillar count may change, so gradient buffers made before the
    /// call no longer match [`layout`](Self::layout).
    ///
    /// # Errors
    ///
    /// `ModelError::Data` for an unknown key, any basket or pillar error,
    /// or the calibration failure. The component is left `Failed`.
    pub fn recalibrate(&mut self, key: &str) -> ModelResult<()> {
        let position = self
            .components
            .position(key)
            .ok_or_else(|| ModelError::data(format!("no component '{key}' in model")))?;
        let current = self
            .components
            .at(position)
            .ok_or_else(|| ModelError::data(format!("no component at position {position}")))?;
        let rebuilt = match self.new_component(current.instruction()) {
            Ok(component) => component,
            Err(error) => {
                let failed = current.with_status(ComponentStatus::Failed {
                    pillar: None,
                    reason: error.to_string(),
                });
                self.components.replace(position, failed);
                return Err(error);
            }
        };
        debug!(
            component = rebuilt.key(),
            pillars = rebuilt.pillars.len(),
            "pillars rebuilt"
        );
        self.components.replace(position, rebuilt);
        self.layout = Arc::new(self.build_layout()?);
        self.calibrate_component(key)
    }

    /// Replaces the market data and recalibrates `key` against it.
    ///
    /// # Errors
    ///
    /// As [`recalibrate`](Self::recalibrate).
    pub fn recalibrate_with(&mut self, key: &str, data: Arc<DataCollection>) -> ModelResult<()> {
        self.data = data;
        self.recalibrate(key)
    }

    fn build_layout(&self) -> ModelResult<GradientLayout> {
        let mut layout = GradientLayout::new();
        for component in self.components.iter() {
            let labels = component.pillars.iter().map(|p| p.node_id.clone()).collect();
            layout.push(component.key(), labels)?;
        }
        Ok(layout)
    }

    /// The market data the model calibrates to.
    pub fn data(&self) -> &DataCollection {
        &self.data
    }

    /// Parameter layout shared by every gradient of this model.
    pub fn layout(&self) -> &GradientLayout {
        &self.layout
    }

    /// A zeroed gradient buffer sized for this model.
    pub fn new_gradient(&self) -> GradientBuffer {
        GradientBuffer::for_layout(&self.layout)
    }

    /// Day count measuring curve time.
    pub fn time_measure(&self) -> DayCountConvention {
        self.time_measure
    }

    /// Curve time of a date.
    pub fn time(&self, date: Date) -> f64 {
        self.time_measure.year_fraction(self.value_date, date)
    }

    /// Curve time between two dates.
    pub fn year_fraction(&self, start: Date, end: Date) -> f64 {
        self.time_measure.year_fraction(start, end)
    }

    /// The usable curve of an index.
    ///
    /// `index` may be a component key or a bare index name; the latter
    /// resolves to the first component targeting that index.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` if no component targets the index,
    /// `ModelError::Unusable` if it is not calibrated.
    pub fn curve(&self, index: &str) -> ModelResult<&YieldCurveComponent> {
        let component = self
            .components
            .get(index)
            .or_else(|| {
                self.components
                    .iter()
                    .find(|c| c.target().trim().eq_ignore_ascii_case(index.trim()))
            })
            .ok_or_else(|| ModelError::data(format!("no curve for index '{index}'")))?;
        component.ensure_usable()?;
        Ok(component)
    }

    /// Discount factor of `index` at `date`.
    pub fn discount_factor(&self, index: &str, date: Date) -> ModelResult<f64> {
        let curve = self.curve(index)?;
        Ok((-curve.integrated_forward(self.time(date))).exp())
    }

    /// End date and accrual of the forward period starting at `start`.
    ///
    /// Term indices run to `start + tenor` rolled on the index calendar;
    /// an explicit `end` overrides that.
    pub fn forward_period(
        &self,
        index: &str,
        start: Date,
        end: Option<Date>,
    ) -> ModelResult<(Date, f64)> {
        let definition = self.env.index(index)?;
        let end = match end {
            Some(end) => end,
            None => {
                let calendar = self.env.calendar(&definition.calendar)?;
                calendar.advance(
                    start,
                    definition.tenor,
                    definition.convention,
                    definition.end_of_month,
                )?
            }
        };
        Ok((end, definition.day_count.year_fraction(start, end)))
    }

    /// Simple forward rate of `index` over `[start, end]`.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` for an empty period.
    pub fn forward(&self, index: &str, start: Date, end: Option<Date>) -> ModelResult<f64> {
        let (end, accrual) = self.forward_period(index, start, end)?;
        if accrual <= 0.0 {
            return Err(ModelError::data(format!(
                "empty forward period {start} to {end} on '{index}'"
            )));
        }
        let df_start = self.discount_factor(index, start)?;
        let df_end = self.discount_factor(index, end)?;
        Ok((df_start / df_end - 1.0) / accrual)
    }

    fn gradient_curve(&self, index: &str) -> ModelResult<(&YieldCurveComponent, &GradientBlock)> {
        let curve = self.curve(index)?;
        if curve.interpolation() != InterpolationMethod::PiecewiseConstant {
            return Err(ModelError::unsupported(format!(
                "gradients of '{index}' need piecewise-constant interpolation"
            )));
        }
        let block = self.layout.block(curve.key()).ok_or_else(|| {
            ModelError::data(format!("no gradient block for '{}'", curve.key()))
        })?;
        Ok((curve, block))
    }

    /// `d DF(τ) / d f_i` for every pillar of the curve.
    ///
    /// Pillar `i` spans `[t_{i-1}, t_i)` with `t_{-1} = 0`; the last pillar
    /// extends to infinity, matching flat extrapolation.
    fn df_gradient_vector(curve: &YieldCurveComponent, tau: f64) -> (f64, Vec<f64>) {
        let df = (-curve.integrated_forward(tau)).exp();
        let times = curve.pillar_times();
        let n = times.len();
        let grad = (0..n)
            .map(|i| {
                let start = if i == 0 { 0.0 } else { times[i - 1] };
                let end = if i + 1 == n { f64::INFINITY } else { times[i] };
                -df * (tau.min(end) - start).max(0.0)
            })
            .collect();
        (df, grad)
    }

    /// Adds `scaler · ∂DF(date)/∂θ` into the curve's block of `gradient`.
    ///
    /// With `accumulate == false` only that block is overwritten.
    ///
    /// # Errors
    ///
    /// `ModelError::Unsupported` for linear curves.
    pub fn discount_factor_gradient(
        &self,
        index: &str,
        date: Date,
        gradient: &mut GradientBuffer,
        scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        let (curve, block) = self.gradient_curve(index)?;
        let (_, grad) = Self::df_gradient_vector(curve, self.time(date));
        let scaled: Vec<f64> = grad.iter().map(|g| scaler * g).collect();
        gradient.add_block(block.offset, &scaled, accumulate)
    }

    /// Adds `scaler · ∂F/∂θ` for the forward over `[start, end]`.
    ///
    /// A non-positive accrual contributes nothing.
    ///
    /// # Errors
    ///
    /// `ModelError::Unsupported` for linear curves.
    pub fn forward_gradient(
        &self,
        index: &str,
        start: Date,
        end: Option<Date>,
        gradient: &mut GradientBuffer,
        scaler: f64,
        accumulate: bool,
    ) -> ModelResult<()> {
        let (curve, block) = self.gradient_curve(index)?;
        let (end, accrual) = self.forward_period(index, start, end)?;
        if accrual <= 0.0 {
            return gradient.add_block(block.offset, &vec![0.0; block.length], accumulate);
        }
        let (df_s, g_s) = Self::df_gradient_vector(curve, self.time(start));
        let (df_e, g_e) = Self::df_gradient_vector(curve, self.time(end));
        let scaled: Vec<f64> = g_s
            .iter()
            .zip(&g_e)
            .map(|(gs, ge)| scaler * (gs / df_e - df_s * ge / (df_e * df_e)) / accrual)
            .collect();
        gradient.add_block(block.offset, &scaled, accumulate)
    }

    /// A copy with one component's state replaced.
    pub(crate) fn with_component_state(
        &self,
        position: usize,
        state: &[f64],
        status: ComponentStatus,
    ) -> ModelResult<Self> {
        let component = self
            .components
            .at(position)
            .ok_or_else(|| ModelError::data(format!("no component at position {position}")))?;
        let updated = component.with_state(state, status)?;
        let mut model = self.clone();
        model.components.replace(position, updated);
        Ok(model)
    }
}

impl Model for YieldCurveModel {
    type Component = YieldCurveComponent;

    fn kind(&self) -> ModelKind {
        ModelKind::YieldCurve
    }

    fn value_date(&self) -> Date {
        self.value_date
    }

    fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    fn components(&self) -> &ComponentSet<YieldCurveComponent> {
        &self.components
    }

    fn new_component(&self, instruction: &BuildInstruction) -> ModelResult<YieldCurveComponent> {
        instruction.validate_or_error()?;
        let key = component_key(instruction);
        let basket =
            build_calibration_basket(&self.env, &self.data, self.value_date, instruction)?;
        let pillars = build_pillars(
            &key,
            basket,
            self.value_date,
            self.time_measure,
            DEFAULT_IFR_GUESS,
        )?;
        YieldCurveComponent::new(key, instruction.clone(), pillars)
    }

    fn calibrate_component(&mut self, key: &str) -> ModelResult<()> {
        let position = self
            .components
            .position(key)
            .ok_or_else(|| ModelError::data(format!("no component '{key}' in model")))?;
        let component = self
            .components
            .at(position)
            .ok_or_else(|| ModelError::data(format!("no component at position {position}")))?;
        let outcome = bootstrap::calibrate(self, position, component);
        self.components.replace(position, outcome.component);
        match outcome.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn perturb(&mut self, key: &str, index: usize, delta: f64) -> ModelResult<()> {
        let position = self
            .components
            .position(key)
            .ok_or_else(|| ModelError::data(format!("no component '{key}' in model")))?;
        let component = self
            .components
            .at(position)
            .ok_or_else(|| ModelError::data(format!("no component at position {position}")))?;
        let mut state = component.state();
        let slot = state.get_mut(index).ok_or_else(|| {
            ModelError::data(format!("'{key}' has no pillar {index}"))
        })?;
        *slot += delta;
        let updated = component.with_state(&state, component.status().clone())?;
        self.components.replace(position, updated);
        Ok(())
    }

    fn as_model_ref(&self) -> ModelRef<'_> {
        ModelRef::YieldCurve(self)
    }
}
