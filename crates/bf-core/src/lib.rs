//! bf-core: stable foundation for boreflow.
//!
//! Contains:
//! - units (uom SI types + constructors, Celsius conversion)
//! - numeric (Real + float helpers)
//! - timing (kernel sweep/transfer counters)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::BfError;
pub use numeric::*;
pub use units::*;
