//! Time-stepping orchestrator for the borehole ground model.
//!
//! Provides:
//! - `SimOptions` and the run-state machine
//! - sub-stepped transport to convergence with flagged cap acceptance
//! - the fixed-order physics `ModulePipeline`
//! - `Simulation::run` with cancellation and progress reporting

pub mod error;
pub mod options;
pub mod pipeline;
pub mod simulation;
pub mod transport;

pub use bf_results::RunState;
pub use error::{SimError, SimResult};
pub use options::SimOptions;
pub use pipeline::{ModulePipeline, StageReport};
pub use simulation::{CancelToken, SimSetup, Simulation, StepProgress};
pub use transport::{TransportOutcome, TransportSolver};
