//! Turning a validated configuration into a runnable simulation.

use bf_borehole::{BoreholeExchanger, BoreholeGeometry};
use bf_core::{celsius_to_kelvin, hours_to_seconds, m};
use bf_mesh::{
    BoundaryPolicy, CylindricalGrid, DomainBoundaries, Field3, GridSpec, MaterialField,
};
use bf_physics::{
    AdaptiveRefinement, BoundaryInputs, ConstantBoundary, EnhancedHvac, FracturedMedia,
    MultiphaseFlow, PhysicsModule, ReactiveTransport, SeasonalAmbient, ThermoElastic,
    TimeVaryingBoundary, TimeVaryingParams,
};
use bf_sim::{SimOptions, SimSetup, Simulation};

use crate::config::{BoundaryConfig, RunConfig};
use crate::error::AppResult;
use crate::validate::validate_config;

fn policy(bc: BoundaryConfig) -> BoundaryPolicy {
    match bc {
        BoundaryConfig::Dirichlet { value_c } => BoundaryPolicy::Dirichlet {
            value_k: celsius_to_kelvin(value_c),
        },
        BoundaryConfig::Adiabatic => BoundaryPolicy::Adiabatic,
        BoundaryConfig::FluxSpecified { flux_w_m2 } => BoundaryPolicy::FluxSpecified { flux_w_m2 },
    }
}

pub fn geometry(config: &RunConfig) -> BoreholeGeometry {
    let b = &config.borehole;
    BoreholeGeometry {
        depth: m(b.depth_m),
        well_diameter: m(b.well_diameter_m),
        inner_pipe_diameter: m(b.inner_pipe_diameter_m),
        outer_pipe_diameter: m(b.outer_pipe_diameter_m),
        pipe_spacing: m(b.pipe_spacing_m),
        pipe_wall_thickness: m(b.pipe_wall_thickness_m),
        exchanger: b.exchanger,
        flow: b.flow,
        grout_conductivity: b.grout_conductivity,
        pipe_conductivity: b.pipe_conductivity,
        film_coefficient: b.film_coefficient,
    }
}

/// Grid with its innermost shell on the borehole wall.
pub fn grid(config: &RunConfig) -> AppResult<CylindricalGrid> {
    let g = &config.grid;
    Ok(CylindricalGrid::generate(&GridSpec {
        nr: g.nr,
        ntheta: g.ntheta,
        nz: g.nz,
        r_inner_m: config.borehole.well_diameter_m / 2.0,
        r_outer_m: g.domain_radius_m,
        depth_m: g.domain_depth_m,
        radial_growth: g.radial_growth,
        axial_clustering: g.axial_clustering,
    })?)
}

fn initial_temperature(config: &RunConfig, grid: &CylindricalGrid) -> Field3 {
    let dims = grid.dims();
    let surface = celsius_to_kelvin(config.ground.initial_temperature_c);
    let gradient = config.ground.geothermal_gradient_k_per_km / 1000.0;
    let mut field = Field3::filled(dims, surface);
    if gradient != 0.0 {
        for (idx, t) in field.as_mut_slice().iter_mut().enumerate() {
            *t = surface + gradient * grid.z()[dims.coords(idx).2];
        }
    }
    field
}

fn modules(
    config: &RunConfig,
    grid: &CylindricalGrid,
    materials: &MaterialField,
) -> AppResult<Vec<Box<dyn PhysicsModule>>> {
    let f = &config.features;
    let mut out: Vec<Box<dyn PhysicsModule>> = Vec::new();
    if f.time_varying_bc {
        let s = &config.schedule;
        let params = TimeVaryingParams {
            seasonal: s.seasonal.map(|a| SeasonalAmbient {
                mean_k: celsius_to_kelvin(a.mean_c),
                amplitude_k: a.amplitude_k,
                peak_day: a.peak_day,
                period_days: a.period_days,
            }),
            inlet_schedule: s
                .inlet
                .iter()
                .map(|p| (hours_to_seconds(p.time_h), celsius_to_kelvin(p.inlet_c)))
                .collect(),
            duty_cycle: s.duty_cycle,
        };
        out.push(Box::new(TimeVaryingBoundary::new(params)?));
    }
    if f.multiphase {
        out.push(Box::new(MultiphaseFlow::new(grid, config.multiphase)?));
    }
    if f.fractured_media {
        out.push(Box::new(FracturedMedia::new(grid, materials, config.fractures)?));
    }
    if f.amr {
        out.push(Box::new(AdaptiveRefinement::new(config.amr)?));
    }
    if f.reactive_transport {
        out.push(Box::new(ReactiveTransport::new(
            materials,
            &config.fluid.composition,
            config.reactive.clone(),
        )?));
    }
    if f.enhanced_hvac {
        out.push(Box::new(EnhancedHvac::new(config.hvac)?));
    }
    Ok(out)
}

/// Validate `config` and assemble everything the orchestrator needs.
pub fn build_setup(config: &RunConfig) -> AppResult<SimSetup> {
    validate_config(config)?;
    let grid = grid(config)?;
    let materials = MaterialField::from_layers(&grid, &config.ground.layers, config.ground.default);
    let exchanger = BoreholeExchanger::new(geometry(config), &grid)?;
    let boundaries = DomainBoundaries {
        outer: policy(config.boundaries.outer),
        surface: policy(config.boundaries.surface),
        bottom: policy(config.boundaries.bottom),
    };
    let provider = ConstantBoundary(BoundaryInputs {
        inlet_temperature: celsius_to_kelvin(config.fluid.inlet_temperature_c),
        mass_flow: config.fluid.mass_flow_kg_s,
        specific_heat: config.fluid.specific_heat_j_kg_k,
        ambient_temperature: None,
    });
    let s = &config.simulation;
    let options = SimOptions {
        dt_s: s.time_step_s,
        duration_s: hours_to_seconds(s.duration_h),
        tolerance_k: s.tolerance_k,
        max_iterations: s.max_iterations,
        save_interval_steps: s.save_interval_steps,
        amr_interval_steps: s.amr_interval_steps,
        backend: s.backend,
    };
    let modules = modules(config, &grid, &materials)?;
    tracing::debug!(modules = modules.len(), "configuration assembled");

    Ok(SimSetup {
        name: config.name.clone(),
        initial_temperature: initial_temperature(config, &grid),
        materials,
        boundaries,
        exchanger,
        boundary_provider: Box::new(provider),
        groundwater: config.features.groundwater_flow.then_some(config.groundwater),
        modules,
        stress: ThermoElastic::default(),
        options,
        grid,
    })
}

pub fn build_simulation(config: &RunConfig) -> AppResult<Simulation> {
    Ok(Simulation::new(build_setup(config)?)?)
}
