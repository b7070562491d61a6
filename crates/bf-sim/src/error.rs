//! Error types for simulation runs.

use bf_results::RunResults;
use thiserror::Error;

/// Errors that stop a run or prevent it from starting.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Mesh error: {0}")]
    Mesh(#[from] bf_mesh::MeshError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] bf_kernel::KernelError),

    #[error("Borehole error: {0}")]
    Borehole(#[from] bf_borehole::BoreholeError),

    #[error("Physics error: {0}")]
    Physics(#[from] bf_physics::PhysicsError),

    #[error("Results error: {0}")]
    Results(#[from] bf_results::ResultsError),

    /// The temperature field went non-finite. `partial` holds everything
    /// recorded up to the last good step.
    #[error("Non-finite temperature {value} at node {node} in step {step}")]
    NonFinite {
        step: u64,
        node: usize,
        value: f64,
        partial: Box<RunResults>,
    },

    /// A step failed for any other reason. `partial` as for `NonFinite`.
    #[error("Run stopped at step {step}: {source}")]
    Aborted {
        step: u64,
        source: Box<SimError>,
        partial: Box<RunResults>,
    },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Results recorded before a fatal failure, if any.
    pub fn partial_results(&self) -> Option<&RunResults> {
        match self {
            SimError::NonFinite { partial, .. } | SimError::Aborted { partial, .. } => {
                Some(partial)
            }
            _ => None,
        }
    }
}
