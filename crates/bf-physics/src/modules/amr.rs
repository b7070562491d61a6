//! Gradient-driven refinement levels.
//!
//! The indicator is |∇T| on the converged temperature. A node refines one
//! level when the indicator exceeds `threshold·2^level` and coarsens one
//! level only when it falls below `coarsen_fraction` of the threshold that
//! refined it, so levels do not flicker around a threshold.

use bf_mesh::{CylindricalGrid, Field3};
use serde::{Deserialize, Serialize};

use super::to_field;
use crate::error::{PhysicsError, PhysicsResult};
use crate::module::{Diagnostics, ModuleKind, PhysicsModule, StepContext};
use crate::state::{FieldKind, SimulationState, StateUpdate};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmrParams {
    /// K/m
    pub refine_threshold: f64,
    pub coarsen_fraction: f64,
    pub max_level: u8,
}

impl Default for AmrParams {
    fn default() -> Self {
        Self {
            refine_threshold: 1.0,
            coarsen_fraction: 0.5,
            max_level: 3,
        }
    }
}

#[derive(Clone)]
pub struct AdaptiveRefinement {
    params: AmrParams,
    max_gradient: f64,
    refined_nodes: usize,
}

impl AdaptiveRefinement {
    pub fn new(params: AmrParams) -> PhysicsResult<Self> {
        if !(params.refine_threshold > 0.0) || !(0.0..1.0).contains(&params.coarsen_fraction) {
            return Err(PhysicsError::InvalidArg {
                what: "refine threshold must be positive and coarsen fraction in [0, 1)",
            });
        }
        Ok(Self {
            params,
            max_gradient: 0.0,
            refined_nodes: 0,
        })
    }

    fn next_level(&self, level: u8, indicator: f64) -> u8 {
        let p = self.params;
        let refine_at = |l: u8| p.refine_threshold * f64::from(1u32 << l);
        if level < p.max_level && indicator > refine_at(level) {
            level + 1
        } else if level > 0 && indicator < p.coarsen_fraction * refine_at(level - 1) {
            level - 1
        } else {
            level
        }
    }
}

/// |∇T| by central differences, one-sided at the faces.
pub fn gradient_magnitude(grid: &CylindricalGrid, field: &Field3, i: usize, j: usize, k: usize) -> f64 {
    let d = grid.dims();
    let r = grid.r();
    let z = grid.z();
    let (im, ip) = (i.saturating_sub(1), (i + 1).min(d.nr - 1));
    let (km, kp) = (k.saturating_sub(1), (k + 1).min(d.nz - 1));
    let dr = (field.get(ip, j, k) - field.get(im, j, k)) / (r[ip] - r[im]);
    let dz = (field.get(i, j, kp) - field.get(i, j, km)) / (z[kp] - z[km]);
    let dt = if d.ntheta > 1 {
        (field.get(i, d.theta_next(j), k) - field.get(i, d.theta_prev(j), k))
            / (2.0 * r[i] * grid.dtheta())
    } else {
        0.0
    };
    (dr * dr + dt * dt + dz * dz).sqrt()
}

impl PhysicsModule for AdaptiveRefinement {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Amr
    }

    fn reads(&self) -> &'static [FieldKind] {
        &[FieldKind::Temperature, FieldKind::RefinementLevel]
    }

    fn writes(&self) -> &'static [FieldKind] {
        &[FieldKind::RefinementLevel]
    }

    fn update_state(
        &mut self,
        state: &SimulationState,
        ctx: &StepContext<'_>,
    ) -> PhysicsResult<StateUpdate> {
        let dims = state.dims();
        let levels = state.refinement_level.as_slice();
        let mut out = vec![0.0; dims.len()];
        let mut max_gradient = 0.0_f64;
        let mut refined = 0;
        for (idx, level) in out.iter_mut().enumerate() {
            let (i, j, k) = dims.coords(idx);
            let g = gradient_magnitude(ctx.grid, &state.temperature, i, j, k);
            max_gradient = max_gradient.max(g);
            let current = levels[idx].clamp(0.0, f64::from(self.params.max_level)) as u8;
            let next = self.next_level(current, g);
            if next > 0 {
                refined += 1;
            }
            *level = f64::from(next);
        }
        self.max_gradient = max_gradient;
        self.refined_nodes = refined;
        Ok(StateUpdate::new().with(
            FieldKind::RefinementLevel,
            to_field(&state.refinement_level, out),
        ))
    }

    fn diagnostics(&self) -> Diagnostics {
        vec![
            ("max_gradient_k_per_m", self.max_gradient),
            ("refined_nodes", self.refined_nodes as f64),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_between_refine_and_coarsen() {
        let amr = AdaptiveRefinement::new(AmrParams::default()).unwrap();
        assert_eq!(amr.next_level(0, 0.9), 0);
        assert_eq!(amr.next_level(0, 1.1), 1);
        // between 0.5 and 1.0: a refined node stays refined
        assert_eq!(amr.next_level(1, 0.7), 1);
        assert_eq!(amr.next_level(1, 0.4), 0);
        assert_eq!(amr.next_level(3, 100.0), 3);
    }

    #[test]
    fn gradient_of_linear_radial_field() {
        let grid = CylindricalGrid::generate(&bf_mesh::GridSpec {
            nr: 5,
            ntheta: 4,
            nz: 5,
            ..bf_mesh::GridSpec::default()
        })
        .unwrap();
        let d = grid.dims();
        let mut f = Field3::zeros(d);
        for idx in 0..d.len() {
            let (i, _, _) = d.coords(idx);
            f.as_mut_slice()[idx] = 2.0 * grid.r()[i];
        }
        let g = gradient_magnitude(&grid, &f, 2, 1, 2);
        assert!((g - 2.0).abs() < 1e-9);
    }
}
