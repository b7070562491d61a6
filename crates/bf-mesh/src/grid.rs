//! Cylindrical (r, θ, z) node coordinates.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::dims::GridDims;
use crate::error::{MeshError, MeshResult};

/// Parameters for generating a stretched cylindrical grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub nr: usize,
    pub ntheta: usize,
    pub nz: usize,
    /// Innermost shell radius (the borehole wall), m
    pub r_inner_m: f64,
    /// Domain radius, m
    pub r_outer_m: f64,
    /// Domain depth, m
    pub depth_m: f64,
    /// Geometric growth ratio between consecutive radial spacings (1 = uniform)
    pub radial_growth: f64,
    /// Blend between uniform (0) and cosine-clustered (→1) vertical spacing
    pub axial_clustering: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            nr: 20,
            ntheta: 8,
            nz: 20,
            r_inner_m: 0.075,
            r_outer_m: 10.0,
            depth_m: 120.0,
            radial_growth: 1.3,
            axial_clustering: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CylindricalGrid {
    dims: GridDims,
    r: Vec<f64>,
    theta: Vec<f64>,
    z: Vec<f64>,
    dtheta: f64,
}

impl CylindricalGrid {
    pub fn generate(spec: &GridSpec) -> MeshResult<Self> {
        let dims = GridDims::new(spec.nr, spec.ntheta, spec.nz)?;
        if !(spec.r_inner_m > 0.0 && spec.r_outer_m > spec.r_inner_m) {
            return Err(MeshError::InvalidDimensions {
                what: "require 0 < r_inner < r_outer".to_string(),
            });
        }
        if spec.depth_m <= 0.0 {
            return Err(MeshError::InvalidDimensions {
                what: "depth must be positive".to_string(),
            });
        }
        if !(0.0..1.0).contains(&spec.axial_clustering) || spec.radial_growth < 1.0 {
            return Err(MeshError::InvalidDimensions {
                what: "radial_growth must be >= 1 and axial_clustering in [0, 1)".to_string(),
            });
        }

        let r = radial_coordinates(spec.nr, spec.r_inner_m, spec.r_outer_m, spec.radial_growth);
        let z = axial_coordinates(spec.nz, spec.depth_m, spec.axial_clustering);
        Self::from_coordinates(r, dims.ntheta, z)
    }

    /// Build a grid from explicit radial and vertical coordinates.
    pub fn from_coordinates(r: Vec<f64>, ntheta: usize, z: Vec<f64>) -> MeshResult<Self> {
        let dims = GridDims::new(r.len(), ntheta, z.len())?;
        if r[0] <= 0.0 {
            return Err(MeshError::InvalidDimensions {
                what: "innermost radius must be positive".to_string(),
            });
        }
        check_increasing(&r, "r")?;
        check_increasing(&z, "z")?;

        let dtheta = TAU / ntheta as f64;
        let theta = (0..ntheta).map(|j| j as f64 * dtheta).collect();
        Ok(Self {
            dims,
            r,
            theta,
            z,
            dtheta,
        })
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn dtheta(&self) -> f64 {
        self.dtheta
    }

    pub fn r_inner(&self) -> f64 {
        self.r[0]
    }

    pub fn r_outer(&self) -> f64 {
        self.r[self.r.len() - 1]
    }

    /// Angle normalised into [0, 2π).
    pub fn normalize_angle(angle: f64) -> f64 {
        let a = angle.rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs
        if a >= TAU { 0.0 } else { a }
    }

    /// Nearest angular node; angles close to 2π wrap onto node 0.
    pub fn theta_index(&self, angle: f64) -> usize {
        let a = Self::normalize_angle(angle);
        ((a / self.dtheta).round() as usize) % self.dims.ntheta
    }

    /// Two angular nodes bracketing `angle` and the weight of the second.
    pub fn bracket_theta(&self, angle: f64) -> (usize, usize, f64) {
        let a = Self::normalize_angle(angle);
        if a.is_nan() {
            return (0, self.dims.theta_next(0), 0.0);
        }
        let pos = a / self.dtheta;
        let j0 = (pos.floor() as usize) % self.dims.ntheta;
        let w = (pos - pos.floor()).clamp(0.0, 1.0);
        (j0, self.dims.theta_next(j0), w)
    }

    /// Two radial shells bracketing `r` and the weight of the second; clamps
    /// outside the grid.
    pub fn bracket_r(&self, r: f64) -> (usize, usize, f64) {
        bracket(&self.r, r)
    }

    /// Two vertical levels bracketing `depth` and the weight of the second.
    pub fn bracket_z(&self, depth: f64) -> (usize, usize, f64) {
        bracket(&self.z, depth)
    }

    /// Nearest vertical level to `depth`.
    pub fn nearest_z(&self, depth: f64) -> usize {
        let (k0, k1, w) = self.bracket_z(depth);
        if w < 0.5 { k0 } else { k1 }
    }

    /// Control-volume radial width of shell `i` (half-distance to each neighbour).
    pub fn radial_width(&self, i: usize) -> f64 {
        let n = self.r.len();
        let lo = if i == 0 { self.r[0] } else { 0.5 * (self.r[i - 1] + self.r[i]) };
        let hi = if i + 1 == n { self.r[n - 1] } else { 0.5 * (self.r[i] + self.r[i + 1]) };
        hi - lo
    }

    /// Control-volume height of level `k`.
    pub fn axial_width(&self, k: usize) -> f64 {
        let n = self.z.len();
        let lo = if k == 0 { self.z[0] } else { 0.5 * (self.z[k - 1] + self.z[k]) };
        let hi = if k + 1 == n { self.z[n - 1] } else { 0.5 * (self.z[k] + self.z[k + 1]) };
        hi - lo
    }
}

fn check_increasing(values: &[f64], axis: &'static str) -> MeshResult<()> {
    for (index, pair) in values.windows(2).enumerate() {
        if !(pair[1] > pair[0]) {
            return Err(MeshError::NotIncreasing {
                axis,
                index: index + 1,
            });
        }
    }
    Ok(())
}

fn bracket(values: &[f64], x: f64) -> (usize, usize, f64) {
    let n = values.len();
    // NaN fails every comparison below and would reach `hi - 1` with hi == 0.
    if x.is_nan() || x <= values[0] {
        return (0, 0, 0.0);
    }
    if x >= values[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    let hi = values.partition_point(|&v| v <= x).min(n - 1);
    let lo = hi - 1;
    let w = (x - values[lo]) / (values[hi] - values[lo]);
    (lo, hi, w)
}

fn radial_coordinates(n: usize, r0: f64, r1: f64, growth: f64) -> Vec<f64> {
    let span = r1 - r0;
    let steps = (n - 1) as f64;
    if (growth - 1.0).abs() < 1e-12 {
        return (0..n).map(|i| r0 + span * i as f64 / steps).collect();
    }
    let denom = growth.powf(steps) - 1.0;
    let mut r: Vec<f64> = (0..n)
        .map(|i| r0 + span * (growth.powi(i as i32) - 1.0) / denom)
        .collect();
    r[n - 1] = r1;
    r
}

fn axial_coordinates(n: usize, depth: f64, beta: f64) -> Vec<f64> {
    let steps = (n - 1) as f64;
    let mut z: Vec<f64> = (0..n)
        .map(|k| {
            let s = k as f64 / steps;
            let clustered = 0.5 * (1.0 - (std::f64::consts::PI * s).cos());
            depth * ((1.0 - beta) * s + beta * clustered)
        })
        .collect();
    z[n - 1] = depth;
    z
}
