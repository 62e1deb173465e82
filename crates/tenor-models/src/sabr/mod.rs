//! SABR volatility model.
//!
//! A [`SabrModel`] holds one [`BilinearSurface`] per SABR parameter and
//! index, keyed `{INDEX}-{PARAM}[-{PRODUCT}]`, over (expiry, tenor) in
//! years. Grids come from the 2-D datasets `(param, index)`, with the
//! parameter name lower-cased (`normalvol`, `beta`, `nu`, `rho`). The model
//! owns the yield-curve model its option engines project and discount on.

mod calculator;
mod correlation;
mod hagan;
mod time_decay;

pub use calculator::{option_price, OptionQuote};
pub use correlation::{correlation_blend, CorrelationSurface};
pub use hagan::{
    alpha_from_atm_vol, atm_lognormal_vol, black_price, lognormal_vol, plain_params,
    SabrVolParams,
};
pub use time_decay::time_decay_params;

pub use crate::config::SabrMethod;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use tenor_core::Date;
use tenor_math::interpolation::BilinearSurface;

use crate::config::{BuildInstruction, Validate};
use crate::curves::YieldCurveModel;
use crate::environment::Environment;
use crate::error::{ModelError, ModelResult};
use crate::market::DataCollection;
use crate::model::{
    component_key, ComponentSet, ComponentStatus, Model, ModelComponent, ModelKind, ModelRef,
};

/// One of the four interpolated SABR inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SabrParameter {
    /// ATM normal volatility.
    NormalVol,
    /// CEV exponent.
    Beta,
    /// Vol of vol.
    Nu,
    /// Correlation.
    Rho,
}

impl SabrParameter {
    /// Every parameter, in lookup order.
    pub const ALL: [SabrParameter; 4] = [
        SabrParameter::NormalVol,
        SabrParameter::Beta,
        SabrParameter::Nu,
        SabrParameter::Rho,
    ];

    /// Upper-case name used in component keys.
    pub fn as_str(self) -> &'static str {
        match self {
            SabrParameter::NormalVol => "NORMALVOL",
            SabrParameter::Beta => "BETA",
            SabrParameter::Nu => "NU",
            SabrParameter::Rho => "RHO",
        }
    }

    /// Data type of the 2-D dataset holding the grid.
    pub fn data_type(self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for SabrParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SabrParameter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NORMALVOL" => Ok(SabrParameter::NormalVol),
            "BETA" => Ok(SabrParameter::Beta),
            "NU" | "VOLVOL" => Ok(SabrParameter::Nu),
            "RHO" => Ok(SabrParameter::Rho),
            other => Err(ModelError::configuration(format!(
                "unknown SABR parameter '{other}'"
            ))),
        }
    }
}

/// Interpolated SABR inputs at one (expiry, tenor) point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SabrParameters {
    /// ATM normal volatility.
    pub normal_vol: f64,
    /// CEV exponent.
    pub beta: f64,
    /// Vol of vol.
    pub nu: f64,
    /// Correlation.
    pub rho: f64,
    /// Shift added to forward and strike.
    pub shift: f64,
    /// Time-decay speed.
    pub decay_speed: f64,
}

/// One parameter surface.
#[derive(Debug, Clone)]
pub struct SabrComponent {
    key: String,
    instruction: BuildInstruction,
    parameter: SabrParameter,
    surface: BilinearSurface,
    status: ComponentStatus,
}

impl SabrComponent {
    /// Parameter this surface holds.
    pub fn parameter(&self) -> SabrParameter {
        self.parameter
    }

    /// The surface.
    pub fn surface(&self) -> &BilinearSurface {
        &self.surface
    }

    /// Shift from the instruction.
    pub fn shift(&self) -> f64 {
        self.instruction.shift
    }

    /// Decay speed from the instruction.
    pub fn vol_decay_speed(&self) -> f64 {
        self.instruction.vol_decay_speed
    }

    /// Interpolated value at `(expiry, tenor)`.
    pub fn interpolate(&self, expiry: f64, tenor: f64) -> f64 {
        self.surface.interpolate(expiry, tenor)
    }
}

impl ModelComponent for SabrComponent {
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
        self.surface.grid().iter().flatten().copied().collect()
    }
}

fn load_surface(
    data: &DataCollection,
    parameter: SabrParameter,
    target: &str,
) -> ModelResult<BilinearSurface> {
    let grid = data.get_2d(&parameter.data_type(), target)?;
    Ok(BilinearSurface::new(
        grid.axis1.clone(),
        grid.axis2.clone(),
        grid.values.clone(),
    )?)
}

/// SABR surfaces over a yield-curve model.
#[derive(Debug, Clone)]
pub struct SabrModel {
    value_date: Date,
    env: Arc<Environment>,
    data: Arc<DataCollection>,
    curves: YieldCurveModel,
    components: ComponentSet<SabrComponent>,
}

impl SabrModel {
    /// Builds and loads every surface. Value date and environment are the
    /// curve model's.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` for a missing or unknown `VALUES` or a
    /// duplicate key, `ModelError::Data` for a missing or ragged grid.
    pub fn new(
        instructions: &[BuildInstruction],
        data: Arc<DataCollection>,
        curves: YieldCurveModel,
    ) -> ModelResult<Self> {
        let mut model = Self {
            value_date: curves.value_date(),
            env: Arc::clone(curves.environment()),
            data,
            curves,
            components: ComponentSet::new(),
        };
        for instruction in instructions {
            let component = model.new_component(instruction)?;
            model.components.push(component)?;
        }
        model.calibrate()?;
        Ok(model)
    }

    /// The curves options are projected and discounted on.
    pub fn curve_model(&self) -> &YieldCurveModel {
        &self.curves
    }

    /// The market data the surfaces were read from.
    pub fn data(&self) -> &DataCollection {
        &self.data
    }

    /// Component for `{index}-{param}[-{product}]`.
    fn surface_component(
        &self,
        index: &str,
        parameter: SabrParameter,
        product: Option<&str>,
    ) -> Option<&SabrComponent> {
        let key = match product {
            Some(p) => format!("{index}-{parameter}-{p}"),
            None => format!("{index}-{parameter}"),
        };
        self.components.get(&key)
    }

    /// Interpolated parameters for an option on `index`.
    ///
    /// With a product qualifier the `{index}-{PARAM}-{PRODUCT}` surfaces are
    /// used when the qualified normal-vol surface exists; otherwise the
    /// unqualified ones. Shift and decay speed come from the normal-vol
    /// component.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` for a missing surface, `ModelError::Unusable` for
    /// one that failed to load.
    pub fn sabr_parameters(
        &self,
        index: &str,
        expiry: f64,
        tenor: f64,
        product: Option<&str>,
    ) -> ModelResult<SabrParameters> {
        let product = product.filter(|p| {
            self.surface_component(index, SabrParameter::NormalVol, Some(*p))
                .is_some()
        });

        let mut values = [0.0; 4];
        let mut normal_vol_component = None;
        for (slot, parameter) in values.iter_mut().zip(SabrParameter::ALL) {
            let component = self
                .surface_component(index, parameter, product)
                .ok_or_else(|| {
                    ModelError::data(format!(
                        "no SABR surface {index}-{parameter}{}",
                        product.map(|p| format!("-{p}")).unwrap_or_default()
                    ))
                })?;
            component.ensure_usable()?;
            *slot = component.interpolate(expiry, tenor);
            if parameter == SabrParameter::NormalVol {
                normal_vol_component = Some(component);
            }
        }
        let [normal_vol, beta, nu, rho] = values;
        let (shift, decay_speed) =
            normal_vol_component.map_or((0.0, 0.0), |c| (c.shift(), c.vol_decay_speed()));

        Ok(SabrParameters {
            normal_vol,
            beta,
            nu,
            rho,
            shift,
            decay_speed,
        })
    }

    /// Correlation surface from the 2-D dataset `("corr", index)`.
    ///
    /// # Errors
    ///
    /// `ModelError::Data` when the dataset is missing or malformed.
    pub fn correlation_surface(&self, index: &str) -> ModelResult<CorrelationSurface> {
        let grid = self.data.get_2d("corr", index)?;
        CorrelationSurface::new(grid.axis1.clone(), grid.axis2.clone(), grid.values.clone())
    }
}

impl Model for SabrModel {
    type Component = SabrComponent;

    fn kind(&self) -> ModelKind {
        ModelKind::Sabr
    }

    fn value_date(&self) -> Date {
        self.value_date
    }

    fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    fn components(&self) -> &ComponentSet<SabrComponent> {
        &self.components
    }

    fn new_component(&self, instruction: &BuildInstruction) -> ModelResult<SabrComponent> {
        instruction.validate_or_error()?;
        let parameter: SabrParameter = instruction
            .values
            .as_deref()
            .ok_or_else(|| {
                ModelError::configuration(format!(
                    "SABR instruction for '{}' has no VALUES",
                    instruction.target
                ))
            })?
            .parse()?;
        let surface = load_surface(&self.data, parameter, &instruction.target)?;
        Ok(SabrComponent {
            key: component_key(instruction),
            instruction: instruction.clone(),
            parameter,
            surface,
            status: ComponentStatus::Uncalibrated,
        })
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

        let mut updated = component.clone();
        match load_surface(&self.data, component.parameter, component.target()) {
            Ok(surface) => {
                updated.surface = surface;
                updated.status = ComponentStatus::Calibrated;
                debug!(key = %updated.key, "SABR surface loaded");
                self.components.replace(position, updated);
                Ok(())
            }
            Err(error) => {
                updated.status = ComponentStatus::Failed {
                    pillar: None,
                    reason: error.to_string(),
                };
                self.components.replace(position, updated);
                Err(error)
            }
        }
    }

    /// Bumps grid node `index`, counted row-major over (expiry, tenor).
    fn perturb(&mut self, key: &str, index: usize, delta: f64) -> ModelResult<()> {
        let position = self
            .components
            .position(key)
            .ok_or_else(|| ModelError::data(format!("no component '{key}' in model")))?;
        let component = self
            .components
            .at(position)
            .ok_or_else(|| ModelError::data(format!("no component at position {position}")))?;
        let columns = component.surface.axis2().len();
        let mut updated = component.clone();
        updated
            .surface
            .bump_node(index / columns, index % columns, delta)?;
        self.components.replace(position, updated);
        Ok(())
    }

    fn as_model_ref(&self) -> ModelRef<'_> {
        ModelRef::Sabr(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sabr_data, sabr_instructions, sabr_model, sofr_model};
    use approx::assert_relative_eq;

    #[test]
    fn test_parameter_parsing() {
        assert_eq!("NormalVol".parse::<SabrParameter>().unwrap(), SabrParameter::NormalVol);
        assert_eq!(" rho ".parse::<SabrParameter>().unwrap(), SabrParameter::Rho);
        assert!("GAMMA".parse::<SabrParameter>().is_err());
        assert_eq!(SabrParameter::Nu.data_type(), "nu");
    }

    #[test]
    fn test_sabr_parameters_interpolate() {
        let model = sabr_model();
        assert_eq!(model.components().len(), 4);
        assert_eq!(model.kind(), ModelKind::Sabr);
        let p = model.sabr_parameters("SOFR-1B", 0.75, 0.25, None).unwrap();
        assert_relative_eq!(p.normal_vol, 0.0095, epsilon = 1e-15);
        assert_eq!(p.beta, 0.5);
        assert_eq!(p.shift, 0.01);
        assert_eq!(p.decay_speed, 0.5);

        // unknown product falls back to the unqualified surfaces
        let q = model
            .sabr_parameters("SOFR-1B", 0.75, 0.25, Some("CAPLET"))
            .unwrap();
        assert_eq!(p, q);
        assert!(matches!(
            model.sabr_parameters("ESTR-1B", 1.0, 1.0, None),
            Err(ModelError::Data { .. })
        ));
    }

    #[test]
    fn test_product_surfaces_take_precedence() {
        let mut instructions = sabr_instructions();
        instructions.extend(
            SabrParameter::ALL.iter().map(|p| {
                BuildInstruction::new("SOFR-1B")
                    .with_values(p.as_str())
                    .with_product("CAPLET")
            }),
        );
        let model =
            SabrModel::new(&instructions, Arc::new(sabr_data()), sofr_model()).unwrap();
        assert!(model.component("sofr-1b-normalvol-caplet").is_ok());
        let p = model
            .sabr_parameters("SOFR-1B", 1.0, 1.0, Some("CAPLET"))
            .unwrap();
        // the CAPLET instructions carry no shift
        assert_eq!(p.shift, 0.0);
    }

    #[test]
    fn test_perturb_bumps_one_node() {
        let mut model = sabr_model();
        let before = model.component("SOFR-1B-NORMALVOL").unwrap().state();
        model.perturb("SOFR-1B-NORMALVOL", 4, 1e-4).unwrap();
        let after = model.component("SOFR-1B-NORMALVOL").unwrap().state();
        for (i, (a, b)) in after.iter().zip(&before).enumerate() {
            let expected = if i == 4 { b + 1e-4 } else { *b };
            assert_relative_eq!(*a, expected, epsilon = 1e-15);
        }
        assert!(model.perturb("SOFR-1B-NORMALVOL", 9, 1e-4).is_err());
    }

    #[test]
    fn test_missing_values_and_grid() {
        let curves = sofr_model();
        let err = SabrModel::new(
            &[BuildInstruction::new("SOFR-1B")],
            Arc::new(sabr_data()),
            curves.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Configuration { .. }));

        let err = SabrModel::new(
            &[BuildInstruction::new("ESTR-1B").with_values("BETA")],
            Arc::new(sabr_data()),
            curves,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Data { .. }));
    }

    #[test]
    fn test_correlation_surface() {
        let model = sabr_model();
        let corr = model.correlation_surface("SOFR-1B").unwrap();
        assert_relative_eq!(corr.corr(2.0, 3.0), 0.8, epsilon = 1e-15);
        assert!(model.correlation_surface("ESTR-1B").is_err());
    }
}
