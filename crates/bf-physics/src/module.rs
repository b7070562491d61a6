//! The physics stage interface.

use bf_mesh::CylindricalGrid;
use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryInputs;
use crate::error::PhysicsResult;
use crate::state::{FieldKind, SimulationState, StateUpdate};

/// Named scalar outputs of a stage for the current step.
pub type Diagnostics = Vec<(&'static str, f64)>;

/// Stage variants, in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleKind {
    TimeVaryingBc,
    Multiphase,
    FracturedMedia,
    Amr,
    ReactiveTransport,
    Hvac,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::TimeVaryingBc => "time_varying_bc",
            ModuleKind::Multiphase => "multiphase",
            ModuleKind::FracturedMedia => "fractured_media",
            ModuleKind::Amr => "amr",
            ModuleKind::ReactiveTransport => "reactive_transport",
            ModuleKind::Hvac => "hvac",
        }
    }
}

/// What a stage knows about the step it runs in.
pub struct StepContext<'a> {
    /// 1-based index of the macro step
    pub step: u64,
    /// Simulated time at the end of the step, s
    pub time: f64,
    pub dt: f64,
    pub grid: &'a CylindricalGrid,
    pub boundary: BoundaryInputs,
    /// W, positive when heat is extracted from the ground
    pub heat_rate: f64,
    /// K
    pub outlet_temperature: f64,
    /// Committed state at the start of the step
    pub previous: &'a SimulationState,
}

/// Boxed copy of a stage. The pipeline takes one before each update and puts
/// it back if the update is refused.
pub trait SnapshotModule {
    fn snapshot(&self) -> Box<dyn PhysicsModule>;
}

impl<T: PhysicsModule + Clone + 'static> SnapshotModule for T {
    fn snapshot(&self) -> Box<dyn PhysicsModule> {
        Box::new(self.clone())
    }
}

pub trait PhysicsModule: Send + SnapshotModule {
    fn kind(&self) -> ModuleKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn reads(&self) -> &'static [FieldKind];

    /// Fields this stage may replace. Anything else in its update is refused.
    fn writes(&self) -> &'static [FieldKind];

    /// Adjust the step's boundary values before transport. Most stages
    /// leave them alone.
    fn adjust_boundary(&mut self, _time: f64, _inputs: &mut BoundaryInputs) {}

    /// Compute this stage's update from the latest committed snapshot.
    ///
    /// If the update fails or is refused at commit, the stage is restored
    /// from the snapshot taken before this call.
    fn update_state(
        &mut self,
        state: &SimulationState,
        ctx: &StepContext<'_>,
    ) -> PhysicsResult<StateUpdate>;

    fn diagnostics(&self) -> Diagnostics {
        Vec::new()
    }
}
