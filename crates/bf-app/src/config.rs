//! YAML run configuration.
//!
//! Every block has defaults, so a minimal file only names what differs.
//! Temperatures are entered in °C; lengths in metres.

use std::path::Path;

use bf_borehole::{ExchangerType, FlowConfiguration};
use bf_kernel::BackendPreference;
use bf_mesh::{GroundLayer, MaterialProperties};
use bf_physics::{
    AmrParams, DutyCycle, FractureParams, GroundwaterParams, HvacParams, MultiphaseParams,
    ReactiveParams, SoluteConcentration,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub name: String,
    pub borehole: BoreholeConfig,
    pub grid: GridConfig,
    pub ground: GroundConfig,
    pub boundaries: BoundariesConfig,
    pub simulation: SimulationConfig,
    pub fluid: FluidConfig,
    pub features: FeaturesConfig,
    pub groundwater: GroundwaterParams,
    pub multiphase: MultiphaseParams,
    pub fractures: FractureParams,
    pub amr: AmrParams,
    pub reactive: ReactiveParams,
    pub hvac: HvacParams,
    pub schedule: ScheduleConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: "borehole".to_string(),
            borehole: BoreholeConfig::default(),
            grid: GridConfig::default(),
            ground: GroundConfig::default(),
            boundaries: BoundariesConfig::default(),
            simulation: SimulationConfig::default(),
            fluid: FluidConfig::default(),
            features: FeaturesConfig::default(),
            groundwater: GroundwaterParams::default(),
            multiphase: MultiphaseParams::default(),
            fractures: FractureParams::default(),
            amr: AmrParams::default(),
            reactive: ReactiveParams::default(),
            hvac: HvacParams::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoreholeConfig {
    pub depth_m: f64,
    pub well_diameter_m: f64,
    pub inner_pipe_diameter_m: f64,
    pub outer_pipe_diameter_m: f64,
    pub pipe_spacing_m: f64,
    pub pipe_wall_thickness_m: f64,
    pub exchanger: ExchangerType,
    pub flow: FlowConfiguration,
    pub grout_conductivity: f64,
    pub pipe_conductivity: f64,
    pub film_coefficient: f64,
}

impl Default for BoreholeConfig {
    fn default() -> Self {
        Self {
            depth_m: 100.0,
            well_diameter_m: 0.15,
            inner_pipe_diameter_m: 0.04,
            outer_pipe_diameter_m: 0.11,
            pipe_spacing_m: 0.07,
            pipe_wall_thickness_m: 0.004,
            exchanger: ExchangerType::Coaxial,
            flow: FlowConfiguration::CounterFlow,
            grout_conductivity: 2.0,
            pipe_conductivity: 0.4,
            film_coefficient: 1500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub nr: usize,
    pub ntheta: usize,
    pub nz: usize,
    pub domain_radius_m: f64,
    pub domain_depth_m: f64,
    pub radial_growth: f64,
    pub axial_clustering: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nr: 20,
            ntheta: 8,
            nz: 20,
            domain_radius_m: 10.0,
            domain_depth_m: 120.0,
            radial_growth: 1.3,
            axial_clustering: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    pub initial_temperature_c: f64,
    /// Temperature increase with depth, K/km
    pub geothermal_gradient_k_per_km: f64,
    /// Properties of any depth not covered by a layer
    pub default: MaterialProperties,
    pub layers: Vec<GroundLayer>,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            initial_temperature_c: 10.0,
            geothermal_gradient_k_per_km: 0.0,
            default: MaterialProperties::default(),
            layers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoundaryConfig {
    Dirichlet { value_c: f64 },
    Adiabatic,
    FluxSpecified { flux_w_m2: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundariesConfig {
    pub outer: BoundaryConfig,
    pub surface: BoundaryConfig,
    pub bottom: BoundaryConfig,
}

impl Default for BoundariesConfig {
    fn default() -> Self {
        Self {
            outer: BoundaryConfig::Adiabatic,
            surface: BoundaryConfig::Adiabatic,
            bottom: BoundaryConfig::Adiabatic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub duration_h: f64,
    pub time_step_s: f64,
    pub save_interval_steps: u64,
    pub tolerance_k: f64,
    pub max_iterations: u32,
    pub amr_interval_steps: u64,
    pub backend: BackendPreference,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_h: 24.0,
            time_step_s: 3600.0,
            save_interval_steps: 24,
            tolerance_k: 1e-3,
            max_iterations: 500,
            amr_interval_steps: 6,
            backend: BackendPreference::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    pub inlet_temperature_c: f64,
    pub mass_flow_kg_s: f64,
    pub specific_heat_j_kg_k: f64,
    pub composition: Vec<SoluteConcentration>,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            inlet_temperature_c: 5.0,
            mass_flow_kg_s: 0.3,
            specific_heat_j_kg_k: 4186.0,
            composition: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub multiphase: bool,
    pub amr: bool,
    pub fractured_media: bool,
    pub time_varying_bc: bool,
    pub enhanced_hvac: bool,
    pub groundwater_flow: bool,
    pub reactive_transport: bool,
}

/// Time-varying loads, used when `features.time_varying_bc` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub seasonal: Option<SeasonalConfig>,
    pub inlet: Vec<InletPoint>,
    pub duty_cycle: Option<DutyCycle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    pub mean_c: f64,
    pub amplitude_k: f64,
    pub peak_day: f64,
    pub period_days: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            mean_c: 10.0,
            amplitude_k: 10.0,
            peak_day: 200.0,
            period_days: 365.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InletPoint {
    pub time_h: f64,
    pub inlet_c: f64,
}

/// Parse a configuration document.
pub fn parse_config(yaml: &str) -> AppResult<RunConfig> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load a configuration file.
pub fn load_config(path: &Path) -> AppResult<RunConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let c = parse_config("{}").unwrap();
        assert_eq!(c, RunConfig::default());
    }

    #[test]
    fn partial_blocks_keep_other_defaults() {
        let c = parse_config(
            r#"
name: demo
borehole: { depth_m: 80, exchanger: UTube, flow: ParallelFlow }
boundaries:
  outer: { type: Dirichlet, value_c: 12.5 }
simulation: { backend: Cpu }
fluid:
  composition:
    - { species: Ca, mol_per_l: 0.002 }
features: { reactive_transport: true }
"#,
        )
        .unwrap();
        assert_eq!(c.name, "demo");
        assert_eq!(c.borehole.depth_m, 80.0);
        assert_eq!(c.borehole.exchanger, ExchangerType::UTube);
        assert_eq!(c.borehole.well_diameter_m, 0.15);
        assert_eq!(c.boundaries.outer, BoundaryConfig::Dirichlet { value_c: 12.5 });
        assert_eq!(c.boundaries.surface, BoundaryConfig::Adiabatic);
        assert_eq!(c.simulation.backend, BackendPreference::Cpu);
        assert_eq!(c.simulation.time_step_s, 3600.0);
        assert_eq!(c.fluid.composition.len(), 1);
        assert!(c.features.reactive_transport);
        assert!(!c.features.amr);
    }

    #[test]
    fn layers_flatten_material_fields() {
        let c = parse_config(
            r#"
ground:
  layers:
    - { top_m: 0, bottom_m: 20, conductivity: 1.8, density: 1900 }
"#,
        )
        .unwrap();
        let layer = &c.ground.layers[0];
        assert_eq!(layer.properties.conductivity, 1.8);
        assert_eq!(layer.properties.specific_heat, MaterialProperties::default().specific_heat);
    }

    #[test]
    fn unknown_boundary_type_is_a_parse_error() {
        let err = parse_config("boundaries: { outer: { type: Robin } }").unwrap_err();
        assert!(matches!(err, AppError::ConfigParse(_)));
    }
}
