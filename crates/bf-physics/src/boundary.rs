//! Per-step boundary values supplied to the orchestrator.

use serde::{Deserialize, Serialize};

/// Boundary values in force for one macro step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryInputs {
    /// K
    pub inlet_temperature: f64,
    /// kg/s
    pub mass_flow: f64,
    /// J/kg·K
    pub specific_heat: f64,
    /// Outdoor temperature, K. Overrides a Dirichlet surface when set.
    pub ambient_temperature: Option<f64>,
}

/// Source of the base boundary values at a given time. Called once per macro
/// step, before transport.
pub trait BoundaryConditionProvider: Send {
    fn inputs(&self, time_s: f64) -> BoundaryInputs;
}

/// The same values at every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantBoundary(pub BoundaryInputs);

impl BoundaryConditionProvider for ConstantBoundary {
    fn inputs(&self, _time_s: f64) -> BoundaryInputs {
        self.0
    }
}
