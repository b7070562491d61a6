//! Ground material properties, clamped per node.
//!
//! Out-of-range inputs are clamped silently rather than rejected so a sloppy
//! property table can never destabilise the explicit scheme.

use serde::{Deserialize, Serialize};

use crate::dims::GridDims;
use crate::grid::CylindricalGrid;

/// Thermal conductivity bounds, W/(m·K).
pub const CONDUCTIVITY_RANGE: (f64, f64) = (0.1, 10.0);
/// Density bounds, kg/m³.
pub const DENSITY_RANGE: (f64, f64) = (500.0, 5000.0);
/// Specific heat bounds, J/(kg·K).
pub const SPECIFIC_HEAT_RANGE: (f64, f64) = (100.0, 5000.0);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialProperties {
    /// W/(m·K)
    pub conductivity: f64,
    /// kg/m³
    pub density: f64,
    /// J/(kg·K)
    pub specific_heat: f64,
    /// m²
    pub permeability: f64,
    /// Longitudinal dispersivity, m
    pub dispersivity: f64,
    /// Volume fraction
    pub porosity: f64,
}

impl Default for MaterialProperties {
    /// Saturated sandstone-like ground.
    fn default() -> Self {
        Self {
            conductivity: 2.5,
            density: 2_500.0,
            specific_heat: 900.0,
            permeability: 1e-13,
            dispersivity: 0.5,
            porosity: 0.1,
        }
    }
}

impl MaterialProperties {
    pub fn clamped(self) -> Self {
        Self {
            conductivity: clamp_or_low(self.conductivity, CONDUCTIVITY_RANGE),
            density: clamp_or_low(self.density, DENSITY_RANGE),
            specific_heat: clamp_or_low(self.specific_heat, SPECIFIC_HEAT_RANGE),
            permeability: non_negative(self.permeability),
            dispersivity: non_negative(self.dispersivity),
            porosity: if self.porosity.is_finite() {
                self.porosity.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// α = λ / (ρ·cp), m²/s.
    pub fn diffusivity(&self) -> f64 {
        self.conductivity / (self.density * self.specific_heat)
    }

    /// ρ·cp, J/(m³·K).
    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.density * self.specific_heat
    }
}

// NaN clamps to the lower bound instead of propagating.
fn clamp_or_low(v: f64, (lo, hi): (f64, f64)) -> f64 {
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

/// A horizontal ground layer between two depths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundLayer {
    pub top_m: f64,
    pub bottom_m: f64,
    #[serde(flatten)]
    pub properties: MaterialProperties,
}

/// Per-node material arrays. Every entry is already clamped.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialField {
    dims: GridDims,
    nodes: Vec<MaterialProperties>,
}

impl MaterialField {
    pub fn uniform(dims: GridDims, props: MaterialProperties) -> Self {
        Self {
            dims,
            nodes: vec![props.clamped(); dims.len()],
        }
    }

    /// Assign each node the first layer containing its depth, or `fallback`.
    pub fn from_layers(
        grid: &CylindricalGrid,
        layers: &[GroundLayer],
        fallback: MaterialProperties,
    ) -> Self {
        let dims = grid.dims();
        let per_level: Vec<MaterialProperties> = grid
            .z()
            .iter()
            .map(|&depth| {
                layers
                    .iter()
                    .find(|l| depth >= l.top_m && depth <= l.bottom_m)
                    .map(|l| l.properties)
                    .unwrap_or(fallback)
                    .clamped()
            })
            .collect();
        let nodes = (0..dims.len())
            .map(|idx| per_level[dims.coords(idx).2])
            .collect();
        Self { dims, nodes }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn at(&self, idx: usize) -> &MaterialProperties {
        &self.nodes[idx]
    }

    /// Override one node; the value is clamped on the way in.
    pub fn set(&mut self, idx: usize, props: MaterialProperties) {
        self.nodes[idx] = props.clamped();
    }

    pub fn diffusivity(&self) -> Vec<f64> {
        self.nodes.iter().map(MaterialProperties::diffusivity).collect()
    }

    pub fn permeability(&self) -> Vec<f64> {
        self.nodes.iter().map(|p| p.permeability).collect()
    }

    pub fn porosity(&self) -> Vec<f64> {
        self.nodes.iter().map(|p| p.porosity).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialProperties> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSpec;

    #[test]
    fn out_of_range_properties_are_clamped() {
        let p = MaterialProperties {
            conductivity: 50.0,
            density: 10.0,
            specific_heat: f64::NAN,
            permeability: -1.0,
            dispersivity: 0.1,
            porosity: 1.5,
        }
        .clamped();
        assert_eq!(p.conductivity, 10.0);
        assert_eq!(p.density, 500.0);
        assert_eq!(p.specific_heat, 100.0);
        assert_eq!(p.permeability, 0.0);
        assert_eq!(p.porosity, 1.0);
    }

    #[test]
    fn in_range_properties_pass_through() {
        let p = MaterialProperties::default();
        assert_eq!(p.clamped(), p);
        assert!((p.diffusivity() - 2.5 / (2500.0 * 900.0)).abs() < 1e-18);
    }

    #[test]
    fn layers_assign_by_depth() {
        let grid = CylindricalGrid::generate(&GridSpec {
            nr: 4,
            ntheta: 2,
            nz: 5,
            r_inner_m: 0.1,
            r_outer_m: 2.0,
            depth_m: 40.0,
            radial_growth: 1.0,
            axial_clustering: 0.0,
        })
        .unwrap();
        let soft = MaterialProperties {
            conductivity: 1.0,
            ..MaterialProperties::default()
        };
        let layers = vec![GroundLayer {
            top_m: 0.0,
            bottom_m: 15.0,
            properties: soft,
        }];
        let field = MaterialField::from_layers(&grid, &layers, MaterialProperties::default());
        let dims = grid.dims();
        // z = 0, 10, 20, 30, 40
        assert_eq!(field.at(dims.index(2, 1, 1)).conductivity, 1.0);
        assert_eq!(field.at(dims.index(2, 1, 2)).conductivity, 2.5);
    }
}
