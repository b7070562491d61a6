//! Error types for transport backends.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("Compute device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Transfer failed: {message}")]
    Transfer { message: String },
}

pub type KernelResult<T> = Result<T, KernelError>;
