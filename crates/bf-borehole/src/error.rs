//! Error types for the borehole sub-model.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoreholeError {
    #[error("Invalid borehole geometry: {what}")]
    InvalidGeometry { what: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Fluid balance solve failed: {what}")]
    Solve { what: String },
}

pub type BoreholeResult<T> = Result<T, BoreholeError>;

