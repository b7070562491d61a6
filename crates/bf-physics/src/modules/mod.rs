//! The stage variants.

mod amr;
mod fractured;
mod hvac;
mod multiphase;
mod reactive;
mod time_varying;

pub use amr::{AdaptiveRefinement, AmrParams};
pub use fractured::{FractureParams, FracturedMedia};
pub use hvac::{EnhancedHvac, HvacOperatingPoint, HvacParams};
pub use multiphase::{MultiphaseFlow, MultiphaseParams};
pub use reactive::{Mineral, ReactiveParams, ReactiveTransport, SoluteConcentration};
pub use time_varying::{DutyCycle, SeasonalAmbient, TimeVaryingBoundary, TimeVaryingParams};

use bf_mesh::Field3;

use crate::error::{PhysicsError, PhysicsResult};

/// First non-finite value in `field`, as a divergence error.
pub(crate) fn check_finite(module: &'static str, what: &str, field: &[f64]) -> PhysicsResult<()> {
    match bf_core::first_non_finite(field) {
        Some((idx, value)) => Err(PhysicsError::Diverged {
            module,
            what: format!("{what} is {value} at node {idx}"),
        }),
        None => Ok(()),
    }
}

pub(crate) fn to_field(like: &Field3, data: Vec<f64>) -> Field3 {
    let mut out = like.clone();
    out.as_mut_slice().copy_from_slice(&data);
    out
}
