//! Generic model and component abstractions.
//!
//! A model is built from an ordered list of [`BuildInstruction`]s and owns
//! exactly one component per instruction, addressed by a canonical,
//! case-insensitive key (see [`component_key`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tenor_core::Date;

use crate::config::BuildInstruction;
use crate::curves::YieldCurveModel;
use crate::environment::Environment;
use crate::error::{ModelError, ModelResult};
use crate::sabr::SabrModel;

/// Model family; the first half of an engine dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Bootstrapped discount and forward curves.
    #[serde(rename = "YIELD_CURVE")]
    YieldCurve,
    /// SABR volatility surfaces over a yield-curve model.
    #[serde(rename = "IR_SABR")]
    Sabr,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::YieldCurve => f.write_str("YIELD_CURVE"),
            ModelKind::Sabr => f.write_str("IR_SABR"),
        }
    }
}

/// Lifecycle of a component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStatus {
    /// Created, nothing derived yet.
    Uncalibrated,
    /// Calibration basket and pillars exist; state is the initial guess.
    PillarsBuilt,
    /// Pillars before `pillar` are solved.
    Solving {
        /// Pillar currently being solved.
        pillar: usize,
    },
    /// Every pillar is solved.
    Calibrated,
    /// Calibration aborted; pricing must not use the component.
    Failed {
        /// Pillar at which calibration stopped, if local to one pillar.
        pillar: Option<usize>,
        /// The error message.
        reason: String,
    },
}

impl ComponentStatus {
    /// True when pricing may read the component.
    ///
    /// `Solving` counts as usable: it is the status of the trial curves the
    /// bootstrap prices against.
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            ComponentStatus::Calibrated | ComponentStatus::Solving { .. }
        )
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Uncalibrated => f.write_str("uncalibrated"),
            ComponentStatus::PillarsBuilt => f.write_str("pillars built, not calibrated"),
            ComponentStatus::Solving { pillar } => write!(f, "solving pillar {pillar}"),
            ComponentStatus::Calibrated => f.write_str("calibrated"),
            ComponentStatus::Failed {
                pillar: Some(p),
                reason,
            } => write!(f, "failed at pillar {p}: {reason}"),
            ComponentStatus::Failed {
                pillar: None,
                reason,
            } => write!(f, "failed: {reason}"),
        }
    }
}

/// Canonical key of an instruction: `TARGET[-VALUES][-PRODUCT]`, upper-cased.
pub fn component_key(instruction: &BuildInstruction) -> String {
    let mut key = instruction.target.trim().to_string();
    for part in [&instruction.values, &instruction.product]
        .into_iter()
        .flatten()
    {
        key.push('-');
        key.push_str(part.trim());
    }
    key.to_uppercase()
}

/// A named parameter set inside a model.
pub trait ModelComponent: Send + Sync {
    /// Canonical key.
    fn key(&self) -> &str;

    /// The instruction the component was built from.
    fn instruction(&self) -> &BuildInstruction;

    /// Target name, e.g. the index.
    fn target(&self) -> &str {
        &self.instruction().target
    }

    /// Current lifecycle status.
    fn status(&self) -> &ComponentStatus;

    /// Flattened state vector.
    fn state(&self) -> Vec<f64>;

    /// Errors unless the component may be priced against.
    fn ensure_usable(&self) -> ModelResult<()> {
        if self.status().is_usable() {
            Ok(())
        } else {
            Err(ModelError::unusable(self.key(), self.status().to_string()))
        }
    }
}

/// Components of one model, in instruction order.
#[derive(Debug)]
pub struct ComponentSet<C> {
    entries: Vec<Arc<C>>,
    index: Arc<HashMap<String, usize>>,
}

impl<C> Clone for ComponentSet<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            index: Arc::clone(&self.index),
        }
    }
}

impl<C> Default for ComponentSet<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: Arc::new(HashMap::new()),
        }
    }
}

impl<C: ModelComponent> ComponentSet<C> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` if its key is already present.
    pub fn push(&mut self, component: C) -> ModelResult<()> {
        let key = component.key().to_uppercase();
        if self.index.contains_key(&key) {
            return Err(ModelError::configuration(format!(
                "duplicate component '{key}'"
            )));
        }
        Arc::make_mut(&mut self.index).insert(key, self.entries.len());
        self.entries.push(Arc::new(component));
        Ok(())
    }

    /// Position of a key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(&key.trim().to_uppercase()).copied()
    }

    /// Component by key.
    pub fn get(&self, key: &str) -> Option<&C> {
        self.position(key).map(|i| self.entries[i].as_ref())
    }

    /// Component by position.
    pub fn at(&self, position: usize) -> Option<&C> {
        self.entries.get(position).map(AsRef::as_ref)
    }

    /// Replaces the component at `position`, keeping its key.
    pub(crate) fn replace(&mut self, position: usize, component: C) {
        self.entries[position] = Arc::new(component);
    }

    /// Iterates in instruction order.
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.entries.iter().map(AsRef::as_ref)
    }

    /// Keys in instruction order.
    pub fn keys(&self) -> Vec<String> {
        self.iter().map(|c| c.key().to_string()).collect()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A calibrated model: components plus the queries engines need.
pub trait Model: Send + Sync {
    /// Component type.
    type Component: ModelComponent;

    /// Family of the model.
    fn kind(&self) -> ModelKind;

    /// Valuation date.
    fn value_date(&self) -> Date;

    /// Shared reference data.
    fn environment(&self) -> &Arc<Environment>;

    /// Components in instruction order.
    fn components(&self) -> &ComponentSet<Self::Component>;

    /// Builds the component an instruction describes.
    fn new_component(&self, instruction: &BuildInstruction) -> ModelResult<Self::Component>;

    /// (Re)calibrates one component in place.
    fn calibrate_component(&mut self, key: &str) -> ModelResult<()>;

    /// Adds `delta` to entry `index` of a component's state.
    fn perturb(&mut self, key: &str, index: usize, delta: f64) -> ModelResult<()>;

    /// Borrowed handle for engine dispatch.
    fn as_model_ref(&self) -> ModelRef<'_>;

    /// Component by case-insensitive key.
    fn component(&self, key: &str) -> ModelResult<&Self::Component> {
        self.components()
            .get(key)
            .ok_or_else(|| ModelError::data(format!("no component '{key}' in model")))
    }

    /// Calibrates every component in instruction order, stopping at the
    /// first failure.
    fn calibrate(&mut self) -> ModelResult<()> {
        for key in self.components().keys() {
            self.calibrate_component(&key)?;
        }
        Ok(())
    }
}

/// Borrowed model of either kind, as passed to engine constructors.
#[derive(Debug, Clone, Copy)]
pub enum ModelRef<'a> {
    /// A yield-curve model.
    YieldCurve(&'a YieldCurveModel),
    /// A SABR model.
    Sabr(&'a SabrModel),
}

impl<'a> ModelRef<'a> {
    /// Dispatch kind.
    pub fn kind(&self) -> ModelKind {
        match *self {
            ModelRef::YieldCurve(_) => ModelKind::YieldCurve,
            ModelRef::Sabr(_) => ModelKind::Sabr,
        }
    }

    /// Shared reference data.
    pub fn environment(&self) -> &'a Environment {
        match *self {
            ModelRef::YieldCurve(m) => m.environment().as_ref(),
            ModelRef::Sabr(m) => m.environment().as_ref(),
        }
    }

    /// The curves: the model itself, or the SABR model's curve model.
    pub fn yield_curve(&self) -> &'a YieldCurveModel {
        match *self {
            ModelRef::YieldCurve(m) => m,
            ModelRef::Sabr(m) => m.curve_model(),
        }
    }

    /// The SABR model.
    ///
    /// # Errors
    ///
    /// `ModelError::Unsupported` for a yield-curve model.
    pub fn sabr(&self) -> ModelResult<&'a SabrModel> {
        match *self {
            ModelRef::Sabr(m) => Ok(m),
            ModelRef::YieldCurve(_) => Err(ModelError::unsupported(
                "volatility requested from a yield-curve model",
            )),
        }
    }
}
