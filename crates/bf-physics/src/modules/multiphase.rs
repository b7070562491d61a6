//! Pore pressure and gas saturation.
//!
//! Pressure diffuses with `D_h = k/(μ·φ·c_t)` and responds to the step's
//! temperature change through the thermal pressurization coefficient. Gas
//! saturation relaxes toward an equilibrium vapour fraction that rises as
//! the local temperature exceeds the Clausius–Clapeyron boiling point.

use bf_core::constants::{P_ATM_PA, R_GAS};
use bf_kernel::StencilGeometry;
use bf_mesh::CylindricalGrid;
use serde::{Deserialize, Serialize};

use super::{check_finite, to_field};
use crate::error::{PhysicsError, PhysicsResult};
use crate::implicit::ImplicitDiffusion;
use crate::module::{Diagnostics, ModuleKind, PhysicsModule, StepContext};
use crate::state::{FieldKind, SimulationState, StateUpdate};

const NAME: &str = "multiphase";
/// Latent heat of vaporisation of water, J/mol
const LATENT_HEAT_J_MOL: f64 = 40_660.0;
const BOILING_POINT_K: f64 = 373.15;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiphaseParams {
    pub viscosity_pa_s: f64,
    pub total_compressibility_per_pa: f64,
    /// Pressure rise per kelvin of heating, Pa/K
    pub thermal_pressurization_pa_per_k: f64,
    /// Superheat over which saturation goes from 0 to 1, K
    pub vaporization_range_k: f64,
    /// 1/s
    pub saturation_relaxation_per_s: f64,
    /// Pressures above this are treated as divergence, Pa
    pub max_pressure_pa: f64,
    pub max_sweeps: usize,
}

impl Default for MultiphaseParams {
    fn default() -> Self {
        Self {
            viscosity_pa_s: 1e-3,
            total_compressibility_per_pa: 1e-9,
            thermal_pressurization_pa_per_k: 1e4,
            vaporization_range_k: 10.0,
            saturation_relaxation_per_s: 1e-4,
            max_pressure_pa: 1e9,
            max_sweeps: 200,
        }
    }
}

/// Boiling point at `pressure` from the Clausius–Clapeyron relation.
pub fn saturation_temperature(pressure: f64) -> f64 {
    let p = pressure.max(1.0);
    1.0 / (1.0 / BOILING_POINT_K - R_GAS / LATENT_HEAT_J_MOL * (p / P_ATM_PA).ln())
}

#[derive(Clone)]
pub struct MultiphaseFlow {
    params: MultiphaseParams,
    geometry: StencilGeometry,
    last_residual: f64,
    max_pressure: f64,
    max_saturation: f64,
}

impl MultiphaseFlow {
    pub fn new(grid: &CylindricalGrid, params: MultiphaseParams) -> PhysicsResult<Self> {
        if !(params.viscosity_pa_s > 0.0 && params.total_compressibility_per_pa > 0.0) {
            return Err(PhysicsError::InvalidArg {
                what: "viscosity and compressibility must be positive",
            });
        }
        if !(params.vaporization_range_k > 0.0) || params.max_sweeps == 0 {
            return Err(PhysicsError::InvalidArg {
                what: "vaporization range and sweep count must be positive",
            });
        }
        Ok(Self {
            params,
            geometry: StencilGeometry::new(grid),
            last_residual: 0.0,
            max_pressure: 0.0,
            max_saturation: 0.0,
        })
    }
}

impl PhysicsModule for MultiphaseFlow {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Multiphase
    }

    fn reads(&self) -> &'static [FieldKind] {
        &[
            FieldKind::Temperature,
            FieldKind::Pressure,
            FieldKind::Saturation,
            FieldKind::Porosity,
            FieldKind::Permeability,
        ]
    }

    fn writes(&self) -> &'static [FieldKind] {
        &[FieldKind::Pressure, FieldKind::Saturation]
    }

    fn update_state(
        &mut self,
        state: &SimulationState,
        ctx: &StepContext<'_>,
    ) -> PhysicsResult<StateUpdate> {
        let p = &self.params;
        let dims = state.dims();
        let temperature = state.temperature.as_slice();
        let before = ctx.previous.temperature.as_slice();
        let porosity = state.porosity.as_slice();
        let permeability = state.permeability.as_slice();

        let mut start = state.pressure.as_slice().to_vec();
        let mut hydraulic = vec![0.0; dims.len()];
        for n in 0..dims.interior_count() {
            let (i, j, k) = dims.interior_coords(n);
            let idx = dims.index(i, j, k);
            start[idx] += p.thermal_pressurization_pa_per_k * (temperature[idx] - before[idx]);
            hydraulic[idx] = permeability[idx]
                / (p.viscosity_pa_s * porosity[idx].max(1e-6) * p.total_compressibility_per_pa);
        }

        let solver = ImplicitDiffusion {
            geometry: &self.geometry,
            max_sweeps: p.max_sweeps,
            tolerance: 1e-3,
        };
        let (pressure, residual) = solver.solve(&start, &hydraulic, ctx.dt, None);
        check_finite(NAME, "pressure", &pressure)?;
        let peak = pressure.iter().fold(f64::MIN, |a, &b| a.max(b));
        if peak > p.max_pressure_pa {
            return Err(PhysicsError::Diverged {
                module: NAME,
                what: format!("pressure {peak:.3e} Pa above limit"),
            });
        }

        let blend = 1.0 - (-p.saturation_relaxation_per_s * ctx.dt).exp();
        let saturation: Vec<f64> = state
            .saturation
            .as_slice()
            .iter()
            .zip(temperature)
            .zip(&pressure)
            .map(|((&s, &t), &pr)| {
                let superheat = t - saturation_temperature(pr);
                let equilibrium = (superheat / p.vaporization_range_k).clamp(0.0, 1.0);
                (s + (equilibrium - s) * blend).clamp(0.0, 1.0)
            })
            .collect();

        self.last_residual = residual;
        self.max_pressure = peak;
        self.max_saturation = saturation.iter().fold(0.0, |a: f64, &b| a.max(b));
        if residual > solver.tolerance {
            tracing::debug!(residual, "pressure sweeps hit the cap");
        }

        Ok(StateUpdate::new()
            .with(FieldKind::Pressure, to_field(&state.pressure, pressure))
            .with(FieldKind::Saturation, to_field(&state.saturation, saturation)))
    }

    fn diagnostics(&self) -> Diagnostics {
        vec![
            ("max_pressure_pa", self.max_pressure),
            ("max_gas_saturation", self.max_saturation),
            ("pressure_residual_pa", self.last_residual),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryInputs;
    use bf_mesh::{Field3, GridSpec, MaterialField, MaterialProperties};

    fn setup() -> (CylindricalGrid, SimulationState) {
        let grid = CylindricalGrid::generate(&GridSpec {
            nr: 6,
            ntheta: 4,
            nz: 6,
            r_inner_m: 0.1,
            r_outer_m: 3.0,
            depth_m: 50.0,
            radial_growth: 1.3,
            axial_clustering: 0.0,
        })
        .unwrap();
        let d = grid.dims();
        let materials = MaterialField::uniform(d, MaterialProperties::default());
        let state = SimulationState::initial(&grid, Field3::filled(d, 283.15), &materials).unwrap();
        (grid, state)
    }

    fn ctx<'a>(grid: &'a CylindricalGrid, previous: &'a SimulationState) -> StepContext<'a> {
        StepContext {
            step: 1,
            time: 3600.0,
            dt: 3600.0,
            grid,
            boundary: BoundaryInputs {
                inlet_temperature: 278.0,
                mass_flow: 0.3,
                specific_heat: 4186.0,
                ambient_temperature: None,
            },
            heat_rate: 0.0,
            outlet_temperature: 280.0,
            previous,
        }
    }

    #[test]
    fn boiling_point_rises_with_pressure() {
        assert!((saturation_temperature(P_ATM_PA) - BOILING_POINT_K).abs() < 1e-9);
        assert!(saturation_temperature(1e6) > 440.0);
    }

    #[test]
    fn heating_pressurizes_and_cold_rock_stays_liquid() {
        let (grid, state) = setup();
        let d = grid.dims();
        let mut warmer = (*state.temperature).clone();
        warmer.set(2, 1, 2, 293.15);
        let heated = state.with_temperature(warmer).unwrap();

        let mut module = MultiphaseFlow::new(&grid, MultiphaseParams::default()).unwrap();
        let update = module.update_state(&heated, &ctx(&grid, &state)).unwrap();
        let p = update.get(FieldKind::Pressure).unwrap();
        assert!(p.get(2, 1, 2) > state.pressure.get(2, 1, 2));
        assert!(update.get(FieldKind::Saturation).unwrap().is_all_zero());
        assert_eq!(p.get(0, 0, 0), state.pressure.get(0, 0, 0));
        assert_eq!(p.dims(), d);
    }

    #[test]
    fn runaway_pressure_is_reported() {
        let (grid, state) = setup();
        let mut warmer = (*state.temperature).clone();
        warmer.set(2, 1, 2, 400.0);
        let heated = state.with_temperature(warmer).unwrap();
        let params = MultiphaseParams {
            thermal_pressurization_pa_per_k: 1e14,
            max_pressure_pa: 1e7,
            ..MultiphaseParams::default()
        };
        let mut module = MultiphaseFlow::new(&grid, params).unwrap();
        assert!(matches!(
            module.update_state(&heated, &ctx(&grid, &state)),
            Err(PhysicsError::Diverged { .. })
        ));
    }

    #[test]
    fn non_finite_temperature_is_reported() {
        let (grid, state) = setup();
        let mut broken = (*state.temperature).clone();
        broken.set(2, 1, 2, f64::NAN);
        let broken = state.with_temperature(broken).unwrap();
        let mut module = MultiphaseFlow::new(&grid, MultiphaseParams::default()).unwrap();
        assert!(matches!(
            module.update_state(&broken, &ctx(&grid, &state)),
            Err(PhysicsError::Diverged { .. })
        ));
    }
}
