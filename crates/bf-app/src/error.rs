//! Error types for the bf-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the backend crates' errors behind one
/// interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read configuration file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Borehole error: {0}")]
    Borehole(String),

    #[error("Physics module error: {0}")]
    Physics(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::ConfigParse(err.to_string())
    }
}

impl From<bf_mesh::MeshError> for AppError {
    fn from(err: bf_mesh::MeshError) -> Self {
        AppError::Mesh(err.to_string())
    }
}

impl From<bf_borehole::BoreholeError> for AppError {
    fn from(err: bf_borehole::BoreholeError) -> Self {
        AppError::Borehole(err.to_string())
    }
}

impl From<bf_physics::PhysicsError> for AppError {
    fn from(err: bf_physics::PhysicsError) -> Self {
        AppError::Physics(err.to_string())
    }
}

impl From<bf_sim::SimError> for AppError {
    fn from(err: bf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<bf_results::ResultsError> for AppError {
    fn from(err: bf_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
