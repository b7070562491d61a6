//! Down-flow and up-flow fluid temperatures along the borehole.

use bf_core::numeric::lerp;
use serde::Serialize;

use crate::error::{BoreholeError, BoreholeResult};

/// Fluid temperature per leg, sampled at strictly increasing depths.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FluidCirculationState {
    depths: Vec<f64>,
    down: Vec<f64>,
    up: Vec<f64>,
}

impl FluidCirculationState {
    pub fn new(depths: Vec<f64>, down: Vec<f64>, up: Vec<f64>) -> BoreholeResult<Self> {
        if depths.is_empty() {
            return Err(BoreholeError::InvalidArg {
                what: "circulation needs at least one depth sample",
            });
        }
        if down.len() != depths.len() || up.len() != depths.len() {
            return Err(BoreholeError::InvalidArg {
                what: "leg temperatures must match the depth samples",
            });
        }
        if depths.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(BoreholeError::InvalidArg {
                what: "circulation depths must be strictly increasing",
            });
        }
        Ok(Self { depths, down, up })
    }

    /// Both legs at one temperature.
    pub fn uniform(depths: Vec<f64>, temperature: f64) -> BoreholeResult<Self> {
        let n = depths.len();
        Self::new(depths, vec![temperature; n], vec![temperature; n])
    }

    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    pub fn down(&self) -> &[f64] {
        &self.down
    }

    pub fn up(&self) -> &[f64] {
        &self.up
    }

    pub fn inlet(&self) -> f64 {
        self.down[0]
    }

    pub fn outlet(&self) -> f64 {
        self.up[0]
    }

    pub fn down_at(&self, depth: f64) -> f64 {
        interpolate(&self.depths, &self.down, depth)
    }

    pub fn up_at(&self, depth: f64) -> f64 {
        interpolate(&self.depths, &self.up, depth)
    }
}

/// Linear between bracketing samples; clamps to the end samples outside.
fn interpolate(depths: &[f64], values: &[f64], depth: f64) -> f64 {
    let last = depths.len() - 1;
    if depth.is_nan() || depth <= depths[0] {
        return values[0];
    }
    if depth >= depths[last] {
        return values[last];
    }
    let hi = depths.partition_point(|&d| d <= depth);
    let lo = hi - 1;
    let w = (depth - depths[lo]) / (depths[hi] - depths[lo]);
    lerp(values[lo], values[hi], w)
}
