//! Error types for physics stages.

use thiserror::Error;

use crate::state::FieldKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("{module} diverged: {what}")]
    Diverged { module: &'static str, what: String },

    #[error("{module} wrote undeclared field {field:?}")]
    UndeclaredWrite {
        module: &'static str,
        field: FieldKind,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Shape mismatch for {what}: expected {expected} nodes, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
