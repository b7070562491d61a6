//! Shared simulation state and the optional physics stages that run after
//! the transport solve of each step.
//!
//! Every stage declares the shared fields it reads and writes. A stage sees
//! the snapshot committed by its predecessor and hands back a
//! [`StateUpdate`]; the caller commits it wholesale with
//! [`SimulationState::commit`], which rejects writes outside the declared set.

pub mod boundary;
pub mod error;
pub mod groundwater;
mod implicit;
pub mod module;
pub mod modules;
pub mod state;
pub mod stress;

pub use boundary::{BoundaryConditionProvider, BoundaryInputs, ConstantBoundary};
pub use error::{PhysicsError, PhysicsResult};
pub use groundwater::{GroundwaterParams, TransportCoefficients};
pub use module::{Diagnostics, ModuleKind, PhysicsModule, SnapshotModule, StepContext};
pub use modules::{
    AdaptiveRefinement, AmrParams, DutyCycle, EnhancedHvac, FractureParams, FracturedMedia,
    HvacOperatingPoint, HvacParams, Mineral, MultiphaseFlow, MultiphaseParams, ReactiveParams,
    ReactiveTransport, SeasonalAmbient, SoluteConcentration, TimeVaryingBoundary,
    TimeVaryingParams,
};
pub use state::{FieldKind, SimulationState, StateUpdate};
pub use stress::ThermoElastic;
