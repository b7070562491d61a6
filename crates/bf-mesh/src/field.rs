//! Dense nodal arrays.

use serde::Serialize;

use crate::dims::GridDims;
use crate::error::{MeshError, MeshResult};

/// Dense 3D array indexed (r, θ, z), stored with [`GridDims::index`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Field3 {
    dims: GridDims,
    data: Vec<f64>,
}

impl Field3 {
    pub fn filled(dims: GridDims, value: f64) -> Self {
        Self {
            dims,
            data: vec![value; dims.len()],
        }
    }

    pub fn zeros(dims: GridDims) -> Self {
        Self::filled(dims, 0.0)
    }

    pub fn from_vec(dims: GridDims, data: Vec<f64>) -> MeshResult<Self> {
        if data.len() != dims.len() {
            return Err(MeshError::LengthMismatch {
                what: "field data",
                expected: dims.len(),
                got: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.dims.index(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let idx = self.dims.index(i, j, k);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Largest absolute nodal difference between two fields of equal shape.
    pub fn max_abs_diff(&self, other: &Field3) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn mean(&self) -> f64 {
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Mean over angle of shell `i` at level `k`.
    pub fn ring_mean(&self, i: usize, k: usize) -> f64 {
        let n = self.dims.ntheta;
        // offsets from the first node keep a uniform ring exact
        let first = self.get(i, 0, k);
        first + (1..n).map(|j| self.get(i, j, k) - first).sum::<f64>() / n as f64
    }

    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }
}
