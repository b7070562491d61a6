//! Error types for mesh construction.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Invalid grid dimensions: {what}")]
    InvalidDimensions { what: String },

    #[error("Coordinates not strictly increasing: {axis} at index {index}")]
    NotIncreasing { axis: &'static str, index: usize },

    #[error("Length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Unsupported: {what}")]
    Unsupported { what: String },

    #[error(transparent)]
    Core(#[from] bf_core::BfError),
}

pub type MeshResult<T> = Result<T, MeshError>;
