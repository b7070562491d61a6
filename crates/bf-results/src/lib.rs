//! bf-results: run records, field snapshots and the finalized result set.

pub mod accumulator;
pub mod summary;
pub mod table;
pub mod types;

pub use accumulator::ResultsAccumulator;
pub use summary::RunSummary;
pub use table::SeriesTable;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResultsError {
    #[error("Record out of order: step {step} at t={time_s} s after step {last_step} at t={last_time_s} s")]
    OutOfOrder {
        step: u64,
        time_s: f64,
        last_step: u64,
        last_time_s: f64,
    },

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ResultsError {
    fn from(e: serde_json::Error) -> Self {
        ResultsError::Json(e.to_string())
    }
}
