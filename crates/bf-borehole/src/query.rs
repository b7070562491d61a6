//! Temperature at an arbitrary point of the borehole and its surroundings.

use bf_mesh::{CylindricalGrid, Field3};

use crate::circulation::FluidCirculationState;
use crate::geometry::{BoreholeGeometry, ExchangerType, FlowConfiguration};

/// Outside the outer pipe, fluid and ground temperatures are blended up to
/// this multiple of the fluid radius.
pub const BLEND_RADIUS_FACTOR: f64 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Region {
    InnerPipe,
    Annulus,
    /// U-tube fluid region; both legs contribute.
    Legs,
    /// `ground_weight` is 0 at the pipe wall and 1 at the blend radius.
    Blend { ground_weight: f64 },
    Ground,
}

pub fn classify(geometry: &BoreholeGeometry, r: f64) -> Region {
    let r_fluid = geometry.fluid_radius();
    if geometry.exchanger == ExchangerType::Coaxial && r < geometry.inner_pipe_radius() {
        return Region::InnerPipe;
    }
    if r < r_fluid {
        return match geometry.exchanger {
            ExchangerType::Coaxial => Region::Annulus,
            ExchangerType::UTube => Region::Legs,
        };
    }
    let r_blend = BLEND_RADIUS_FACTOR * r_fluid;
    if r < r_blend {
        Region::Blend {
            ground_weight: (r - r_fluid) / (r_blend - r_fluid),
        }
    } else {
        Region::Ground
    }
}

/// Temperature of the fluid path bounded by the inner pipe.
pub fn inner_fluid_temperature(
    geometry: &BoreholeGeometry,
    circulation: &FluidCirculationState,
    depth: f64,
) -> f64 {
    match (geometry.exchanger, geometry.flow) {
        (ExchangerType::UTube, _) => mean_leg(circulation, depth),
        (ExchangerType::Coaxial, FlowConfiguration::CounterFlowReversed) => {
            circulation.down_at(depth)
        }
        (ExchangerType::Coaxial, _) => circulation.up_at(depth),
    }
}

/// Temperature of the fluid in contact with the borehole wall.
pub fn outer_fluid_temperature(
    geometry: &BoreholeGeometry,
    circulation: &FluidCirculationState,
    depth: f64,
) -> f64 {
    match (geometry.exchanger, geometry.flow) {
        (ExchangerType::UTube, _) => mean_leg(circulation, depth),
        (ExchangerType::Coaxial, FlowConfiguration::CounterFlowReversed) => {
            circulation.up_at(depth)
        }
        (ExchangerType::Coaxial, FlowConfiguration::CounterFlow) => circulation.down_at(depth),
        (ExchangerType::Coaxial, FlowConfiguration::ParallelFlow) => mean_leg(circulation, depth),
    }
}

fn mean_leg(circulation: &FluidCirculationState, depth: f64) -> f64 {
    0.5 * (circulation.down_at(depth) + circulation.up_at(depth))
}

/// Ground temperature by bilinear interpolation over the bracketing radial
/// and angular shells at the nearest vertical level.
pub fn ground_temperature(
    grid: &CylindricalGrid,
    ground: &Field3,
    r: f64,
    theta: f64,
    depth: f64,
) -> f64 {
    let (i0, i1, wr) = grid.bracket_r(r);
    let (j0, j1, wt) = grid.bracket_theta(theta);
    let k = grid.nearest_z(depth);
    let a = ground.get(i0, j0, k) * (1.0 - wt) + ground.get(i0, j1, k) * wt;
    let b = ground.get(i1, j0, k) * (1.0 - wt) + ground.get(i1, j1, k) * wt;
    a * (1.0 - wr) + b * wr
}

/// Temperature at (r, θ, depth).
pub fn point_temperature(
    geometry: &BoreholeGeometry,
    circulation: &FluidCirculationState,
    grid: &CylindricalGrid,
    ground: &Field3,
    r: f64,
    theta: f64,
    depth: f64,
) -> f64 {
    match classify(geometry, r) {
        Region::InnerPipe => inner_fluid_temperature(geometry, circulation, depth),
        Region::Annulus | Region::Legs => outer_fluid_temperature(geometry, circulation, depth),
        Region::Blend { ground_weight } => {
            let fluid = outer_fluid_temperature(geometry, circulation, depth);
            let soil = ground_temperature(grid, ground, r, theta, depth);
            fluid * (1.0 - ground_weight) + soil * ground_weight
        }
        Region::Ground => ground_temperature(grid, ground, r, theta, depth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_mesh::GridSpec;
    use std::f64::consts::TAU;

    fn circulation() -> FluidCirculationState {
        FluidCirculationState::new(vec![0.0, 100.0], vec![278.0, 282.0], vec![284.0, 282.0])
            .unwrap()
    }

    fn grid() -> CylindricalGrid {
        CylindricalGrid::generate(&GridSpec {
            nr: 6,
            ntheta: 4,
            nz: 5,
            r_inner_m: 0.075,
            r_outer_m: 5.0,
            depth_m: 100.0,
            radial_growth: 1.5,
            axial_clustering: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn counter_flow_orientation() {
        let g = BoreholeGeometry::default();
        let c = circulation();
        assert_eq!(classify(&g, 0.01), Region::InnerPipe);
        assert_eq!(classify(&g, 0.03), Region::Annulus);
        assert_eq!(inner_fluid_temperature(&g, &c, 0.0), 284.0);
        assert_eq!(outer_fluid_temperature(&g, &c, 0.0), 278.0);

        let reversed = BoreholeGeometry {
            flow: FlowConfiguration::CounterFlowReversed,
            ..BoreholeGeometry::default()
        };
        assert_eq!(inner_fluid_temperature(&reversed, &c, 0.0), 278.0);
        assert_eq!(outer_fluid_temperature(&reversed, &c, 0.0), 284.0);
    }

    #[test]
    fn blend_is_continuous_at_both_ends() {
        let g = BoreholeGeometry::default();
        let r_op = g.outer_pipe_radius();
        match classify(&g, r_op) {
            Region::Blend { ground_weight } => assert!(ground_weight.abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(classify(&g, 1.2 * r_op + 1e-9), Region::Ground);
    }

    #[test]
    fn ground_lookup_wraps_angle() {
        let grid = grid();
        let d = grid.dims();
        let mut f = Field3::filled(d, 283.0);
        for k in 0..d.nz {
            for i in 0..d.nr {
                f.set(i, 0, k, 290.0);
            }
        }
        let g = BoreholeGeometry::default();
        let c = circulation();
        let r = 1.0;
        let at_zero = point_temperature(&g, &c, &grid, &f, r, 0.0, 50.0);
        let at_tau = point_temperature(&g, &c, &grid, &f, r, TAU, 50.0);
        let negative = point_temperature(&g, &c, &grid, &f, r, -TAU, 50.0);
        assert_eq!(at_zero, 290.0);
        assert_eq!(at_tau, at_zero);
        assert_eq!(negative, at_zero);
    }

    #[test]
    fn utube_uses_mean_of_legs() {
        let g = BoreholeGeometry {
            exchanger: ExchangerType::UTube,
            inner_pipe_diameter: bf_core::units::m(0.026),
            outer_pipe_diameter: bf_core::units::m(0.032),
            ..BoreholeGeometry::default()
        };
        let c = circulation();
        assert_eq!(classify(&g, 0.01), Region::Legs);
        let grid = grid();
        let f = Field3::filled(grid.dims(), 283.0);
        assert_eq!(point_temperature(&g, &c, &grid, &f, 0.01, 0.3, 0.0), 281.0);
    }
}
