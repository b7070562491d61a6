//! Quasi-steady fluid circulation coupled to the ground model.
//!
//! The legs are discretised at the grid levels above the borehole bottom
//! (plus the bottom itself). Between consecutive samples each leg exchanges
//! heat with the ground (driving temperature: the ring of nodes next to the
//! wall) and with the other leg. The inlet fixes the top of the down leg and
//! the legs meet at the bottom; the resulting linear system is solved in one
//! LU factorisation.

use bf_mesh::{CylindricalGrid, Field3, WallCondition};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::circulation::FluidCirculationState;
use crate::error::{BoreholeError, BoreholeResult};
use crate::geometry::BoreholeGeometry;
use crate::query::outer_fluid_temperature;

/// Below this the exchanger is treated as idle.
const EPSILON_MDOT: f64 = 1e-9;

/// Operating point for one step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CirculationInputs {
    /// K
    pub inlet_temperature: f64,
    /// kg/s
    pub mass_flow: f64,
    /// J/kg·K
    pub specific_heat: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FluidSolution {
    pub circulation: FluidCirculationState,
    /// K
    pub outlet_temperature: f64,
    /// W, positive when heat is extracted from the ground
    pub heat_rate: f64,
}

#[derive(Debug, Clone)]
pub struct BoreholeExchanger {
    geometry: BoreholeGeometry,
    samples: Vec<f64>,
    /// Grid levels bracketing each sample and the weight of the deeper one.
    levels: Vec<(usize, usize, f64)>,
    grid_depths: Vec<f64>,
}

impl BoreholeExchanger {
    pub fn new(geometry: BoreholeGeometry, grid: &CylindricalGrid) -> BoreholeResult<Self> {
        geometry.validate()?;
        let depth = geometry.depth.value;
        let z = grid.z();
        let bottom = z[z.len() - 1];
        if depth > bottom {
            return Err(BoreholeError::InvalidGeometry {
                what: format!("borehole depth {depth} m exceeds domain depth {bottom} m"),
            });
        }
        if depth <= z[0] {
            return Err(BoreholeError::InvalidGeometry {
                what: "borehole must extend below the top grid level".into(),
            });
        }
        let mut samples: Vec<f64> = z.iter().copied().filter(|&d| d < depth).collect();
        samples.push(depth);
        let levels = samples.iter().map(|&d| grid.bracket_z(d)).collect();
        Ok(Self {
            geometry,
            samples,
            levels,
            grid_depths: z.to_vec(),
        })
    }

    pub fn geometry(&self) -> &BoreholeGeometry {
        &self.geometry
    }

    pub fn sample_depths(&self) -> &[f64] {
        &self.samples
    }

    /// Ring-mean ground temperature next to the wall at each sample depth.
    pub fn ground_profile(&self, ground: &Field3) -> Vec<f64> {
        let i = 1.min(ground.dims().nr - 1);
        self.levels
            .iter()
            .map(|&(k0, k1, w)| bf_core::lerp(ground.ring_mean(i, k0), ground.ring_mean(i, k1), w))
            .collect()
    }

    /// Both legs at the surrounding ground temperature, no heat flow.
    pub fn idle(&self, ground: &Field3) -> BoreholeResult<FluidSolution> {
        let profile = self.ground_profile(ground);
        let circulation =
            FluidCirculationState::new(self.samples.clone(), profile.clone(), profile)?;
        Ok(FluidSolution {
            outlet_temperature: circulation.outlet(),
            circulation,
            heat_rate: 0.0,
        })
    }

    pub fn solve(&self, ground: &Field3, inputs: &CirculationInputs) -> BoreholeResult<FluidSolution> {
        if !inputs.inlet_temperature.is_finite() || !inputs.specific_heat.is_finite() {
            return Err(BoreholeError::InvalidArg {
                what: "inlet temperature and specific heat must be finite",
            });
        }
        if !(inputs.mass_flow.is_finite() && inputs.mass_flow >= 0.0) {
            return Err(BoreholeError::InvalidArg {
                what: "mass flow must be finite and non-negative",
            });
        }
        if inputs.mass_flow < EPSILON_MDOT {
            return self.idle(ground);
        }
        if inputs.specific_heat <= 0.0 {
            return Err(BoreholeError::InvalidArg {
                what: "specific heat must be positive",
            });
        }

        let tg = self.ground_profile(ground);
        let n = self.samples.len();
        let mc = inputs.mass_flow * inputs.specific_heat;
        let (g_down, g_up) = self.geometry.leg_conductances();
        let g12 = 1.0 / self.geometry.resistances().leg_to_leg;

        // unknowns: down[0..n] then up[0..n]
        let size = 2 * n;
        let mut a = DMatrix::<f64>::zeros(size, size);
        let mut b = DVector::<f64>::zeros(size);
        let d = |s: usize| s;
        let u = |s: usize| n + s;

        a[(0, d(0))] = 1.0;
        b[0] = inputs.inlet_temperature;

        for s in 0..n - 1 {
            let dz = self.samples[s + 1] - self.samples[s];
            let tg_mid = 0.5 * (tg[s] + tg[s + 1]);
            let half = 0.5 * dz;

            // down leg, flowing from s to s + 1
            let row = 1 + s;
            a[(row, d(s + 1))] = mc + half * (g_down + g12);
            a[(row, d(s))] = -mc + half * (g_down + g12);
            a[(row, u(s))] = -half * g12;
            a[(row, u(s + 1))] = -half * g12;
            b[row] = dz * g_down * tg_mid;

            // up leg, flowing from s + 1 to s
            let row = n + s;
            a[(row, u(s))] = mc + half * (g_up + g12);
            a[(row, u(s + 1))] = -mc + half * (g_up + g12);
            a[(row, d(s))] = -half * g12;
            a[(row, d(s + 1))] = -half * g12;
            b[row] = dz * g_up * tg_mid;
        }

        // turnaround at the bottom
        let last = size - 1;
        a[(last, u(n - 1))] = 1.0;
        a[(last, d(n - 1))] = -1.0;

        let x = a.lu().solve(&b).ok_or_else(|| BoreholeError::Solve {
            what: "singular fluid balance matrix".into(),
        })?;
        if let Some(bad) = x.iter().position(|v| !v.is_finite()) {
            return Err(BoreholeError::Solve {
                what: format!("non-finite leg temperature at unknown {bad}"),
            });
        }

        let down = x.rows(0, n).iter().copied().collect();
        let up = x.rows(n, n).iter().copied().collect();
        let circulation = FluidCirculationState::new(self.samples.clone(), down, up)?;
        let outlet = circulation.outlet();
        let heat_rate = mc * (outlet - inputs.inlet_temperature);
        tracing::debug!(outlet, heat_rate, "fluid balance solved");

        Ok(FluidSolution {
            circulation,
            outlet_temperature: outlet,
            heat_rate,
        })
    }

    /// Inner-face boundary per grid level: the wall-contacting fluid along
    /// the borehole, insulated below it.
    pub fn wall_conditions(&self, circulation: &FluidCirculationState) -> Vec<WallCondition> {
        let depth = self.geometry.depth.value;
        self.grid_depths
            .iter()
            .map(|&z| {
                if z <= depth {
                    WallCondition::Fixed(outer_fluid_temperature(&self.geometry, circulation, z))
                } else {
                    WallCondition::Insulated
                }
            })
            .collect()
    }
}
