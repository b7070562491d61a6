//! Shared application service layer for boreflow.
//!
//! Loads and validates YAML run configurations, builds a [`Simulation`]
//! from them and runs it with progress reporting. Used by the CLI.
//!
//! [`Simulation`]: bf_sim::Simulation

pub mod build;
pub mod config;
pub mod error;
pub mod progress;
pub mod run_service;
pub mod validate;

pub use build::{build_setup, build_simulation};
pub use config::{RunConfig, load_config, parse_config};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use run_service::{RunRequest, RunResponse, device_report, run, run_with_progress};
pub use validate::validate_config;
