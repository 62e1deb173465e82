//! Build instructions and valuation parameters.
//!
//! A model is described by an ordered list of [`BuildInstruction`]s, one per
//! component. Instructions use the upper-case keys common in rates desks
//! (`TARGET`, `INSTRUMENTS`, `LOCAL_TOL`, ...) so that lists can be written
//! by hand in JSON or TOML:
//!
//! ```rust
//! use tenor_models::config::{BuildInstruction, Validate};
//!
//! let json = r#"[{ "TARGET": "SOFR-1B", "INSTRUMENTS": ["USD-SOFR-OIS"] }]"#;
//! let instructions = BuildInstruction::list_from_json(json).unwrap();
//! assert_eq!(instructions[0].local_tol, 1e-12);
//! assert!(instructions[0].is_valid());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Interpolation of the instantaneous forward curve between pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterpolationMethod {
    /// Piecewise-constant forwards; the only method with analytic gradients.
    #[default]
    #[serde(alias = "PIECEWISE CONSTANT")]
    PiecewiseConstant,
    /// Linear forwards with flat extrapolation.
    Linear,
}

/// How a yield-curve component solves for its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootstrapMethod {
    /// One secant solve per pillar, in anchor order.
    #[default]
    Sequential,
    /// All pillars at once with a damped Gauss-Newton fit.
    Global,
}

/// Volatility transform requested for SABR option pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SabrMethod {
    /// Plain Hagan lognormal SABR.
    #[default]
    #[serde(rename = "HAGAN", alias = "PLAIN")]
    Hagan,
    /// Time-decay transform over the accrual period.
    #[serde(rename = "TOP-DOWN", alias = "TOP_DOWN")]
    TopDown,
    /// Correlation blend of per-fixing-period parameters.
    #[serde(rename = "BOTTOM-UP", alias = "BOTTOM_UP")]
    BottomUp,
}

fn default_local_tol() -> f64 {
    1e-12
}

fn default_max_local_iters() -> u32 {
    100
}

fn default_global_tol() -> f64 {
    1e-10
}

fn default_max_global_iters() -> u32 {
    50
}

fn default_ifr_lower() -> f64 {
    -0.5
}

fn default_ifr_upper() -> f64 {
    1.0
}

fn default_residual_tol() -> f64 {
    1e-8
}

fn default_true() -> bool {
    true
}

/// One model component's build instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInstruction {
    /// Index or curve name the component is built for, e.g. `SOFR-1B`.
    #[serde(rename = "TARGET")]
    pub target: String,

    /// Data qualifier; for SABR components the parameter name.
    #[serde(rename = "VALUES", default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,

    /// Product qualifier, e.g. `CAPLET`.
    #[serde(rename = "PRODUCT", default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// Data conventions whose quotes enter the calibration basket.
    #[serde(rename = "INSTRUMENTS", default)]
    pub instruments: Vec<String>,

    /// Forward interpolation between pillars.
    #[serde(rename = "INTERPOLATION METHOD", default)]
    pub interpolation: InterpolationMethod,

    /// Secant step tolerance per pillar.
    #[serde(rename = "LOCAL_TOL", default = "default_local_tol")]
    pub local_tol: f64,

    /// Secant iteration budget per pillar.
    #[serde(rename = "MAX_LOCAL_ITERS", default = "default_max_local_iters")]
    pub max_local_iters: u32,

    /// Sequential or global bootstrap.
    #[serde(rename = "BOOTSTRAP METHOD", default)]
    pub bootstrap: BootstrapMethod,

    /// Residual-norm tolerance of the global fit.
    #[serde(rename = "GLOBAL_TOL", default = "default_global_tol")]
    pub global_tol: f64,

    /// Outer iteration budget of the global fit.
    #[serde(rename = "MAX_GLOBAL_ITERS", default = "default_max_global_iters")]
    pub max_global_iters: u32,

    /// Lower box bound on forwards in the global fit.
    #[serde(rename = "IFR_LOWER_BOUND", default = "default_ifr_lower")]
    pub ifr_lower_bound: f64,

    /// Upper box bound on forwards in the global fit.
    #[serde(rename = "IFR_UPPER_BOUND", default = "default_ifr_upper")]
    pub ifr_upper_bound: f64,

    /// Largest acceptable absolute residual after a solve.
    #[serde(rename = "RESIDUAL_TOL", default = "default_residual_tol")]
    pub residual_tol: f64,

    /// Verify each calibration instrument touches only its own new bucket.
    #[serde(rename = "CHECK_SINGLE_BUCKET", default = "default_true")]
    pub check_single_bucket: bool,

    /// SABR shift applied to forward and strike.
    #[serde(rename = "SHIFT", default)]
    pub shift: f64,

    /// SABR volatility decay speed.
    #[serde(rename = "VOL_DECAY_SPEED", default)]
    pub vol_decay_speed: f64,
}

impl BuildInstruction {
    /// Creates an instruction with default numerics.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            values: None,
            product: None,
            instruments: Vec::new(),
            interpolation: InterpolationMethod::default(),
            local_tol: default_local_tol(),
            max_local_iters: default_max_local_iters(),
            bootstrap: BootstrapMethod::default(),
            global_tol: default_global_tol(),
            max_global_iters: default_max_global_iters(),
            ifr_lower_bound: default_ifr_lower(),
            ifr_upper_bound: default_ifr_upper(),
            residual_tol: default_residual_tol(),
            check_single_bucket: true,
            shift: 0.0,
            vol_decay_speed: 0.0,
        }
    }

    /// Sets the data qualifier.
    #[must_use]
    pub fn with_values(mut self, values: impl Into<String>) -> Self {
        self.values = Some(values.into());
        self
    }

    /// Sets the product qualifier.
    #[must_use]
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Sets the calibration conventions.
    #[must_use]
    pub fn with_instruments<I, S>(mut self, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruments = instruments.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the interpolation method.
    #[must_use]
    pub fn with_interpolation(mut self, method: InterpolationMethod) -> Self {
        self.interpolation = method;
        self
    }

    /// Sets the bootstrap method.
    #[must_use]
    pub fn with_bootstrap(mut self, method: BootstrapMethod) -> Self {
        self.bootstrap = method;
        self
    }

    /// Sets the secant tolerance.
    #[must_use]
    pub fn with_local_tol(mut self, tol: f64) -> Self {
        self.local_tol = tol;
        self
    }

    /// Sets the secant iteration budget.
    #[must_use]
    pub fn with_max_local_iters(mut self, iters: u32) -> Self {
        self.max_local_iters = iters;
        self
    }

    /// Sets the acceptable residual.
    #[must_use]
    pub fn with_residual_tol(mut self, tol: f64) -> Self {
        self.residual_tol = tol;
        self
    }

    /// Sets the forward box used by the global fit.
    #[must_use]
    pub fn with_ifr_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.ifr_lower_bound = lower;
        self.ifr_upper_bound = upper;
        self
    }

    /// Enables or disables the single-new-bucket check.
    #[must_use]
    pub fn with_single_bucket_check(mut self, enabled: bool) -> Self {
        self.check_single_bucket = enabled;
        self
    }

    /// Sets the SABR shift.
    #[must_use]
    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    /// Sets the SABR volatility decay speed.
    #[must_use]
    pub fn with_vol_decay_speed(mut self, speed: f64) -> Self {
        self.vol_decay_speed = speed;
        self
    }

    /// Parses and validates a JSON array of instructions.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` for malformed JSON, a missing `TARGET`, or
    /// any failed validation rule.
    pub fn list_from_json(json: &str) -> ModelResult<Vec<Self>> {
        let list: Vec<Self> = serde_json::from_str(json)
            .map_err(|e| ModelError::configuration(format!("invalid instruction JSON: {e}")))?;
        validate_all(&list)?;
        Ok(list)
    }

    /// Parses and validates instructions from TOML `[[instruction]]` tables.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` for malformed TOML or failed validation.
    pub fn list_from_toml(text: &str) -> ModelResult<Vec<Self>> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            instruction: Vec<BuildInstruction>,
        }

        let doc: Document = toml::from_str(text)
            .map_err(|e| ModelError::configuration(format!("invalid instruction TOML: {e}")))?;
        validate_all(&doc.instruction)?;
        Ok(doc.instruction)
    }
}

fn validate_all(list: &[BuildInstruction]) -> ModelResult<()> {
    for (i, instruction) in list.iter().enumerate() {
        instruction
            .validate_or_error()
            .map_err(|e| ModelError::configuration(format!("instruction[{i}]: {e}")))?;
    }
    Ok(())
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
    /// Validation rule that was violated.
    pub rule: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Creates a validation error with a rule name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref rule) = self.rule {
            write!(f, "{}: {} (rule: {})", self.field, self.message, rule)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Returns every violated rule, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and folds all failures into one configuration error.
    fn validate_or_error(&self) -> ModelResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(ModelError::configuration(joined))
    }
}

impl Validate for BuildInstruction {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.target.trim().is_empty() {
            errors.push(ValidationError::new("TARGET", "Target cannot be empty"));
        }

        for (field, tol) in [
            ("LOCAL_TOL", self.local_tol),
            ("GLOBAL_TOL", self.global_tol),
            ("RESIDUAL_TOL", self.residual_tol),
        ] {
            if !(tol.is_finite() && tol > 0.0) {
                errors.push(ValidationError::with_rule(
                    field,
                    format!("Tolerance must be positive, got {tol}"),
                    "positive_tolerance",
                ));
            }
        }

        if self.max_local_iters == 0 {
            errors.push(ValidationError::with_rule(
                "MAX_LOCAL_ITERS",
                "Iteration budget must be at least 1",
                "valid_iterations",
            ));
        }
        if self.max_global_iters == 0 {
            errors.push(ValidationError::with_rule(
                "MAX_GLOBAL_ITERS",
                "Iteration budget must be at least 1",
                "valid_iterations",
            ));
        }

        if !(self.ifr_lower_bound < self.ifr_upper_bound) {
            errors.push(ValidationError::with_rule(
                "IFR_LOWER_BOUND",
                format!(
                    "Lower bound {} must be below upper bound {}",
                    self.ifr_lower_bound, self.ifr_upper_bound
                ),
                "ordered_bounds",
            ));
        }

        if !self.shift.is_finite() {
            errors.push(ValidationError::with_rule(
                "SHIFT",
                "Shift must be finite",
                "finite_value",
            ));
        }
        if !(self.vol_decay_speed.is_finite() && self.vol_decay_speed >= 0.0) {
            errors.push(ValidationError::with_rule(
                "VOL_DECAY_SPEED",
                "Decay speed must be finite and non-negative",
                "finite_value",
            ));
        }

        errors
    }
}

/// Parameters shared by every engine in one valuation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValuationParameters {
    /// Curve used to discount cashflows.
    #[serde(rename = "FUNDING INDEX", default, skip_serializing_if = "Option::is_none")]
    pub funding_index: Option<String>,

    /// Volatility transform for SABR option engines.
    #[serde(rename = "SABR_METHOD", default)]
    pub sabr_method: SabrMethod,
}

impl ValuationParameters {
    /// Parameters discounting on `funding_index`.
    #[must_use]
    pub fn new(funding_index: impl Into<String>) -> Self {
        Self {
            funding_index: Some(funding_index.into()),
            sabr_method: SabrMethod::Hagan,
        }
    }

    /// Sets the SABR method.
    #[must_use]
    pub fn with_sabr_method(mut self, method: SabrMethod) -> Self {
        self.sabr_method = method;
        self
    }

    /// The funding index, required by discounting engines.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` when no funding index was given.
    pub fn require_funding_index(&self) -> ModelResult<&str> {
        self.funding_index
            .as_deref()
            .ok_or_else(|| ModelError::configuration("valuation parameters need a FUNDING INDEX"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let list = BuildInstruction::list_from_json(r#"[{"TARGET": "SOFR-1B"}]"#).unwrap();
        let bi = &list[0];
        assert_eq!(bi.local_tol, 1e-12);
        assert_eq!(bi.max_local_iters, 100);
        assert_eq!(bi.bootstrap, BootstrapMethod::Sequential);
        assert_eq!(bi.interpolation, InterpolationMethod::PiecewiseConstant);
        assert_eq!(bi.ifr_lower_bound, -0.5);
        assert_eq!(bi.ifr_upper_bound, 1.0);
        assert!(bi.check_single_bucket);
        assert_eq!(bi, &BuildInstruction::new("SOFR-1B"));
    }

    #[test]
    fn test_spaced_keys_from_json() {
        let json = r#"[{
            "TARGET": "USD-LIBOR-BBA-3M",
            "INSTRUMENTS": ["USD-LIBOR-FUT", "USD-LIBOR-SWAP"],
            "INTERPOLATION METHOD": "LINEAR",
            "BOOTSTRAP METHOD": "GLOBAL",
            "LOCAL_TOL": 1e-10
        }]"#;
        let bi = &BuildInstruction::list_from_json(json).unwrap()[0];
        assert_eq!(bi.instruments.len(), 2);
        assert_eq!(bi.interpolation, InterpolationMethod::Linear);
        assert_eq!(bi.bootstrap, BootstrapMethod::Global);
        assert_eq!(bi.local_tol, 1e-10);
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let err = BuildInstruction::list_from_json(r#"[{"VALUES": "NU"}]"#).unwrap_err();
        assert!(matches!(err, ModelError::Configuration { .. }));
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
            [[instruction]]
            TARGET = "SOFR-1B"
            VALUES = "NORMALVOL"
            PRODUCT = "CAPLET"
            SHIFT = 0.02
            VOL_DECAY_SPEED = 0.5
        "#;
        let list = BuildInstruction::list_from_toml(text).unwrap();
        assert_eq!(list[0].product.as_deref(), Some("CAPLET"));
        assert_eq!(list[0].shift, 0.02);
    }

    #[test]
    fn test_validation_rules() {
        let bad = BuildInstruction::new(" ")
            .with_local_tol(0.0)
            .with_max_local_iters(0)
            .with_ifr_bounds(0.1, -0.1)
            .with_shift(f64::NAN);
        let fields: Vec<_> = bad.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["TARGET", "LOCAL_TOL", "MAX_LOCAL_ITERS", "IFR_LOWER_BOUND", "SHIFT"]
        );
        assert!(bad.validate_or_error().is_err());
    }

    #[test]
    fn test_valuation_parameters_keys() {
        let vp: ValuationParameters =
            serde_json::from_str(r#"{"FUNDING INDEX": "SOFR-1B", "SABR_METHOD": "TOP-DOWN"}"#)
                .unwrap();
        assert_eq!(vp.require_funding_index().unwrap(), "SOFR-1B");
        assert_eq!(vp.sabr_method, SabrMethod::TopDown);
        assert!(ValuationParameters::default().require_funding_index().is_err());
    }
}
