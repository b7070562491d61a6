//! Groundwater advection and dispersion coefficients for the kernel.
//!
//! A regional Darcy flux `q` in direction `φ` (from the θ = 0 axis) is
//! projected onto the local radial and tangential directions. The thermal
//! front moves at `q·ρw·cw/(ρ·cp)`; each node scales this by its current
//! permeability relative to the reference value.

use bf_core::constants::{WATER_CP, WATER_DENSITY};
use bf_kernel::VelocityField;
use bf_mesh::{CylindricalGrid, Field3, MaterialField};
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundwaterParams {
    /// Horizontal Darcy flux, m/s
    pub darcy_flux_m_s: f64,
    /// Flow direction, rad
    pub direction_rad: f64,
    /// Vertical Darcy flux, m/s, positive downward
    pub vertical_flux_m_s: f64,
    /// Permeability at which the regional flux applies unscaled, m²
    pub reference_permeability_m2: f64,
}

impl Default for GroundwaterParams {
    fn default() -> Self {
        Self {
            darcy_flux_m_s: 1e-7,
            direction_rad: 0.0,
            vertical_flux_m_s: 0.0,
            reference_permeability_m2: 1e-13,
        }
    }
}

/// Advection and dispersion inputs for one transport solve.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportCoefficients {
    pub velocity: VelocityField,
    /// m²/s
    pub dispersion: Vec<f64>,
}

impl GroundwaterParams {
    pub fn validate(&self) -> PhysicsResult<()> {
        let values = [
            self.darcy_flux_m_s,
            self.direction_rad,
            self.vertical_flux_m_s,
            self.reference_permeability_m2,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidArg {
                what: "groundwater parameters must be finite",
            });
        }
        if self.reference_permeability_m2 <= 0.0 {
            return Err(PhysicsError::InvalidArg {
                what: "reference permeability must be positive",
            });
        }
        Ok(())
    }

    pub fn coefficients(
        &self,
        grid: &CylindricalGrid,
        materials: &MaterialField,
        permeability: &Field3,
    ) -> PhysicsResult<TransportCoefficients> {
        let dims = grid.dims();
        if permeability.dims() != dims || materials.dims() != dims {
            return Err(PhysicsError::ShapeMismatch {
                what: "groundwater inputs",
                expected: dims.len(),
                got: permeability.dims().len(),
            });
        }
        let theta = grid.theta();
        let mut velocity = VelocityField::zeros(dims.len());
        let mut dispersion = vec![0.0; dims.len()];
        for idx in 0..dims.len() {
            let (_, j, _) = dims.coords(idx);
            let props = materials.at(idx);
            let retardation =
                WATER_DENSITY * WATER_CP / props.volumetric_heat_capacity();
            let scale = permeability.as_slice()[idx] / self.reference_permeability_m2 * retardation;
            let angle = theta[j] - self.direction_rad;
            velocity.vr[idx] = self.darcy_flux_m_s * angle.cos() * scale;
            velocity.vtheta[idx] = -self.darcy_flux_m_s * angle.sin() * scale;
            velocity.vz[idx] = self.vertical_flux_m_s * scale;
            dispersion[idx] = props.dispersivity * velocity.speed(idx);
        }
        Ok(TransportCoefficients {
            velocity,
            dispersion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_mesh::{GridSpec, MaterialProperties};

    fn grid() -> CylindricalGrid {
        CylindricalGrid::generate(&GridSpec {
            nr: 4,
            ntheta: 4,
            nz: 4,
            ..GridSpec::default()
        })
        .unwrap()
    }

    #[test]
    fn flux_projects_onto_local_axes() {
        let g = grid();
        let d = g.dims();
        let props = MaterialProperties::default();
        let materials = MaterialField::uniform(d, props);
        let perm = Field3::filled(d, 1e-13);
        let gw = GroundwaterParams::default();
        let c = gw.coefficients(&g, &materials, &perm).unwrap();
        let ratio = WATER_DENSITY * WATER_CP / props.volumetric_heat_capacity();

        // θ = 0 faces the flow: purely radial outflow
        let idx = d.index(1, 0, 1);
        assert!((c.velocity.vr[idx] - 1e-7 * ratio).abs() < 1e-18);
        assert!(c.velocity.vtheta[idx].abs() < 1e-18);
        // θ = π/2: purely tangential
        let idx = d.index(1, 1, 1);
        assert!(c.velocity.vr[idx].abs() < 1e-18);
        assert!((c.velocity.vtheta[idx] + 1e-7 * ratio).abs() < 1e-18);
        assert!((c.dispersion[idx] - props.dispersivity * 1e-7 * ratio).abs() < 1e-18);
    }

    #[test]
    fn clogged_nodes_slow_down() {
        let g = grid();
        let d = g.dims();
        let materials = MaterialField::uniform(d, MaterialProperties::default());
        let mut perm = Field3::filled(d, 1e-13);
        perm.set(1, 0, 1, 1e-14);
        let c = GroundwaterParams::default()
            .coefficients(&g, &materials, &perm)
            .unwrap();
        let open = c.velocity.speed(d.index(1, 0, 2));
        let clogged = c.velocity.speed(d.index(1, 0, 1));
        assert!((clogged - 0.1 * open).abs() < 1e-18);
    }
}
