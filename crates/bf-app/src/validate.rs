//! Configuration checks that need no mesh.
//!
//! Material values are not checked here: out-of-range properties are
//! clamped when the mesh is built.

use crate::config::{BoundaryConfig, RunConfig};
use crate::error::{AppError, AppResult};

fn invalid(field: &str, value: impl std::fmt::Display, reason: &str) -> AppError {
    AppError::Validation(format!("{field} = {value} ({reason})"))
}

fn positive(field: &str, value: f64) -> AppResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

pub fn validate_config(config: &RunConfig) -> AppResult<()> {
    let g = &config.grid;
    for (field, n) in [("grid.nr", g.nr), ("grid.nz", g.nz)] {
        if n < 3 {
            return Err(invalid(field, n, "need at least 3 nodes for an interior"));
        }
    }
    if g.ntheta == 0 {
        return Err(invalid("grid.ntheta", g.ntheta, "must be positive"));
    }
    positive("grid.domain_radius_m", g.domain_radius_m)?;
    positive("grid.domain_depth_m", g.domain_depth_m)?;

    let b = &config.borehole;
    positive("borehole.depth_m", b.depth_m)?;
    positive("borehole.well_diameter_m", b.well_diameter_m)?;
    if b.well_diameter_m / 2.0 >= g.domain_radius_m {
        return Err(invalid(
            "borehole.well_diameter_m",
            b.well_diameter_m,
            "borehole must fit inside the domain radius",
        ));
    }
    if b.depth_m > g.domain_depth_m {
        return Err(invalid(
            "borehole.depth_m",
            b.depth_m,
            "borehole must not reach below the domain",
        ));
    }

    let s = &config.simulation;
    positive("simulation.time_step_s", s.time_step_s)?;
    if !(s.duration_h.is_finite() && s.duration_h >= 0.0) {
        return Err(invalid("simulation.duration_h", s.duration_h, "must be non-negative"));
    }
    positive("simulation.tolerance_k", s.tolerance_k)?;
    if s.max_iterations == 0 {
        return Err(invalid("simulation.max_iterations", 0, "must be positive"));
    }
    if s.save_interval_steps == 0 || s.amr_interval_steps == 0 {
        return Err(AppError::Validation(
            "simulation.save_interval_steps and amr_interval_steps must be positive".to_string(),
        ));
    }

    let f = &config.fluid;
    if !f.inlet_temperature_c.is_finite() {
        return Err(invalid("fluid.inlet_temperature_c", f.inlet_temperature_c, "must be finite"));
    }
    if !(f.mass_flow_kg_s.is_finite() && f.mass_flow_kg_s >= 0.0) {
        return Err(invalid("fluid.mass_flow_kg_s", f.mass_flow_kg_s, "must be non-negative"));
    }
    positive("fluid.specific_heat_j_kg_k", f.specific_heat_j_kg_k)?;
    for solute in &f.composition {
        if !(solute.mol_per_l.is_finite() && solute.mol_per_l >= 0.0) {
            return Err(invalid(
                &format!("fluid.composition[{}]", solute.species),
                solute.mol_per_l,
                "concentration must be non-negative",
            ));
        }
    }

    if !config.ground.initial_temperature_c.is_finite() {
        return Err(invalid(
            "ground.initial_temperature_c",
            config.ground.initial_temperature_c,
            "must be finite",
        ));
    }
    for (i, layer) in config.ground.layers.iter().enumerate() {
        if !(layer.bottom_m > layer.top_m) {
            return Err(invalid(
                &format!("ground.layers[{i}]"),
                format!("{}..{}", layer.top_m, layer.bottom_m),
                "bottom must lie below top",
            ));
        }
    }

    for (face, bc) in [
        ("outer", config.boundaries.outer),
        ("surface", config.boundaries.surface),
        ("bottom", config.boundaries.bottom),
    ] {
        match bc {
            BoundaryConfig::FluxSpecified { .. } => {
                return Err(AppError::Validation(format!(
                    "boundaries.{face}: flux-specified boundaries are not supported; use Dirichlet or Adiabatic"
                )));
            }
            BoundaryConfig::Dirichlet { value_c } if !value_c.is_finite() => {
                return Err(invalid(&format!("boundaries.{face}.value_c"), value_c, "must be finite"));
            }
            _ => {}
        }
    }

    if config.features.time_varying_bc {
        let inlet = &config.schedule.inlet;
        if inlet.windows(2).any(|w| !(w[1].time_h > w[0].time_h)) {
            return Err(AppError::Validation(
                "schedule.inlet times must be strictly increasing".to_string(),
            ));
        }
    }
    Ok(())
}
