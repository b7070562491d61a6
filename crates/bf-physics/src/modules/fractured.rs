//! Dual-continuum fractured media.
//!
//! The fracture network carries its own temperature, diffusing with an
//! enhanced conductivity and exchanging heat with the rock matrix at rate
//! `σ`. The matrix (the shared temperature field) receives the counter
//! transfer weighted by the fracture porosity.

use bf_kernel::{StencilGeometry, T_MAX_K, T_MIN_K};
use bf_mesh::{CylindricalGrid, Field3, MaterialField};
use serde::{Deserialize, Serialize};

use super::{check_finite, to_field};
use crate::error::{PhysicsError, PhysicsResult};
use crate::implicit::{ImplicitDiffusion, Relaxation};
use crate::module::{Diagnostics, ModuleKind, PhysicsModule, StepContext};
use crate::state::{FieldKind, SimulationState, StateUpdate};

const NAME: &str = "fractured_media";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractureParams {
    /// Fracture volume fraction
    pub fracture_porosity: f64,
    /// Fracture diffusivity over matrix diffusivity
    pub conductivity_multiplier: f64,
    /// Matrix–fracture exchange rate σ, 1/s
    pub exchange_rate_per_s: f64,
    pub max_sweeps: usize,
}

impl Default for FractureParams {
    fn default() -> Self {
        Self {
            fracture_porosity: 0.01,
            conductivity_multiplier: 10.0,
            exchange_rate_per_s: 1e-5,
            max_sweeps: 100,
        }
    }
}

#[derive(Clone)]
pub struct FracturedMedia {
    params: FractureParams,
    geometry: StencilGeometry,
    fracture_diffusivity: Vec<f64>,
    /// Private continuum; seeded from the matrix on first use
    fracture: Option<Field3>,
    exchanged: f64,
}

impl FracturedMedia {
    pub fn new(
        grid: &CylindricalGrid,
        materials: &MaterialField,
        params: FractureParams,
    ) -> PhysicsResult<Self> {
        if !(0.0..1.0).contains(&params.fracture_porosity) {
            return Err(PhysicsError::InvalidArg {
                what: "fracture porosity must be in [0, 1)",
            });
        }
        if !(params.conductivity_multiplier > 0.0 && params.exchange_rate_per_s >= 0.0) {
            return Err(PhysicsError::InvalidArg {
                what: "fracture conductivity multiplier must be positive",
            });
        }
        let fracture_diffusivity = materials
            .diffusivity()
            .into_iter()
            .map(|a| a * params.conductivity_multiplier)
            .collect();
        Ok(Self {
            params,
            geometry: StencilGeometry::new(grid),
            fracture_diffusivity,
            fracture: None,
            exchanged: 0.0,
        })
    }

    pub fn fracture_temperature(&self) -> Option<&Field3> {
        self.fracture.as_ref()
    }
}

impl PhysicsModule for FracturedMedia {
    fn kind(&self) -> ModuleKind {
        ModuleKind::FracturedMedia
    }

    fn reads(&self) -> &'static [FieldKind] {
        &[FieldKind::Temperature]
    }

    fn writes(&self) -> &'static [FieldKind] {
        &[FieldKind::Temperature]
    }

    fn update_state(
        &mut self,
        state: &SimulationState,
        ctx: &StepContext<'_>,
    ) -> PhysicsResult<StateUpdate> {
        let p = self.params;
        let matrix = state.temperature.as_slice();
        let start = match &self.fracture {
            Some(f) => f.as_slice().to_vec(),
            None => matrix.to_vec(),
        };

        let solver = ImplicitDiffusion {
            geometry: &self.geometry,
            max_sweeps: p.max_sweeps,
            tolerance: 1e-6,
        };
        let (mut fracture, _) = solver.solve(
            &start,
            &self.fracture_diffusivity,
            ctx.dt,
            Some(Relaxation {
                target: matrix,
                rate: p.exchange_rate_per_s,
            }),
        );
        check_finite(NAME, "fracture temperature", &fracture)?;

        let dims = state.dims();
        let share = p.fracture_porosity * (p.exchange_rate_per_s * ctx.dt).min(1.0);
        let mut updated = matrix.to_vec();
        let mut exchanged = 0.0;
        for n in 0..dims.interior_count() {
            let (i, j, k) = dims.interior_coords(n);
            let idx = dims.index(i, j, k);
            let delta = share * (fracture[idx] - matrix[idx]);
            updated[idx] = (matrix[idx] + delta).clamp(T_MIN_K, T_MAX_K);
            exchanged += delta.abs();
        }
        // boundary fracture nodes follow the imposed matrix values
        for (idx, f) in fracture.iter_mut().enumerate() {
            let (i, _, k) = dims.coords(idx);
            if !dims.is_interior(i, k) {
                *f = matrix[idx];
            }
        }

        self.fracture = Some(to_field(&state.temperature, fracture));
        self.exchanged = exchanged;
        Ok(StateUpdate::new().with(FieldKind::Temperature, to_field(&state.temperature, updated)))
    }

    fn diagnostics(&self) -> Diagnostics {
        let mean = self.fracture.as_ref().map_or(0.0, |f| f.mean());
        vec![
            ("mean_fracture_temperature_k", mean),
            ("matrix_exchange_k", self.exchanged),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryInputs;
    use bf_mesh::{GridSpec, MaterialProperties};

    fn grid() -> CylindricalGrid {
        CylindricalGrid::generate(&GridSpec {
            nr: 6,
            ntheta: 4,
            nz: 6,
            r_inner_m: 0.1,
            r_outer_m: 3.0,
            depth_m: 20.0,
            radial_growth: 1.3,
            axial_clustering: 0.0,
        })
        .unwrap()
    }

    fn ctx<'a>(grid: &'a CylindricalGrid, previous: &'a SimulationState) -> StepContext<'a> {
        StepContext {
            step: 1,
            time: 3600.0,
            dt: 3600.0,
            grid,
            boundary: BoundaryInputs {
                inlet_temperature: 278.0,
                mass_flow: 0.0,
                specific_heat: 4186.0,
                ambient_temperature: None,
            },
            heat_rate: 0.0,
            outlet_temperature: 283.15,
            previous,
        }
    }

    #[test]
    fn equilibrium_is_preserved() {
        let g = grid();
        let d = g.dims();
        let materials = MaterialField::uniform(d, MaterialProperties::default());
        let state = SimulationState::initial(&g, Field3::filled(d, 283.15), &materials).unwrap();
        let mut module = FracturedMedia::new(&g, &materials, FractureParams::default()).unwrap();
        for _ in 0..3 {
            let update = module.update_state(&state, &ctx(&g, &state)).unwrap();
            let t = update.get(FieldKind::Temperature).unwrap();
            assert!(t.as_slice().iter().all(|&v| (v - 283.15).abs() < 1e-9));
        }
    }

    #[test]
    fn fracture_lags_a_matrix_change() {
        let g = grid();
        let d = g.dims();
        let materials = MaterialField::uniform(d, MaterialProperties::default());
        let state = SimulationState::initial(&g, Field3::filled(d, 283.15), &materials).unwrap();
        let mut module = FracturedMedia::new(&g, &materials, FractureParams::default()).unwrap();
        module.update_state(&state, &ctx(&g, &state)).unwrap();

        let mut cooled = (*state.temperature).clone();
        cooled.set(2, 1, 2, 280.0);
        let cooled = state.with_temperature(cooled).unwrap();
        let update = module.update_state(&cooled, &ctx(&g, &state)).unwrap();
        // the warmer fracture pushes the cooled node back up a little
        let t = update.get(FieldKind::Temperature).unwrap().get(2, 1, 2);
        assert!(t > 280.0 && t < 283.15);
        let f = module.fracture_temperature().unwrap().get(2, 1, 2);
        assert!(f > t);
    }
}
