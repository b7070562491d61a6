//! Precomputed finite-difference coefficients for the cylindrical Laplacian.
//!
//! For an interior shell `i` with spacings `hm = r[i] − r[i−1]` and
//! `hp = r[i+1] − r[i]` the radial operator ∂²T/∂r² + r⁻¹·∂T/∂r is folded
//! into three weights on (T[i−1], T[i], T[i+1]); the angular operator is
//! r⁻²·∂²T/∂θ² on the periodic ring and the vertical operator ∂²T/∂z² uses the
//! non-uniform three-point form. Both backends consume these same numbers.

use bf_mesh::{CylindricalGrid, GridDims};

use crate::update::KernelInputs;

#[derive(Clone, Debug, PartialEq)]
pub struct StencilGeometry {
    dims: GridDims,
    /// Weights on (i−1, i, i+1) per shell
    pub radial: Vec<[f64; 3]>,
    /// r⁻²·dθ⁻² per shell
    pub angular: Vec<f64>,
    /// Upwind spacing toward i−1 / i+1 per shell
    pub r_minus: Vec<f64>,
    pub r_plus: Vec<f64>,
    /// Arc length r·dθ per shell
    pub arc: Vec<f64>,
    /// Weights on (k−1, k, k+1) per level
    pub axial: Vec<[f64; 3]>,
    pub z_minus: Vec<f64>,
    pub z_plus: Vec<f64>,
}

impl StencilGeometry {
    pub fn new(grid: &CylindricalGrid) -> Self {
        let dims = grid.dims();
        let r = grid.r();
        let z = grid.z();
        let dtheta = grid.dtheta();

        let mut radial = vec![[0.0; 3]; dims.nr];
        let mut r_minus = vec![0.0; dims.nr];
        let mut r_plus = vec![0.0; dims.nr];
        for i in 1..dims.nr - 1 {
            let hm = r[i] - r[i - 1];
            let hp = r[i + 1] - r[i];
            let [am, ac, ap] = second_derivative(hm, hp);
            let [bm, bc, bp] = first_derivative(hm, hp);
            let inv_r = 1.0 / r[i];
            radial[i] = [am + bm * inv_r, ac + bc * inv_r, ap + bp * inv_r];
            r_minus[i] = hm;
            r_plus[i] = hp;
        }

        let angular = r.iter().map(|ri| 1.0 / (ri * ri * dtheta * dtheta)).collect();
        let arc = r.iter().map(|ri| ri * dtheta).collect();

        let mut axial = vec![[0.0; 3]; dims.nz];
        let mut z_minus = vec![0.0; dims.nz];
        let mut z_plus = vec![0.0; dims.nz];
        for k in 1..dims.nz - 1 {
            let hm = z[k] - z[k - 1];
            let hp = z[k + 1] - z[k];
            axial[k] = second_derivative(hm, hp);
            z_minus[k] = hm;
            z_plus[k] = hp;
        }

        Self {
            dims,
            radial,
            angular,
            r_minus,
            r_plus,
            arc,
            axial,
            z_minus,
            z_plus,
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Laplacian of `field` at interior node (i, j, k).
    #[inline]
    pub fn laplacian(&self, field: &[f64], i: usize, j: usize, k: usize) -> f64 {
        let d = self.dims;
        let t = field[d.index(i, j, k)];
        let rc = self.radial[i];
        let zc = self.axial[k];
        // Neighbour differences: a uniform field gives exactly zero.
        rc[0] * (field[d.index(i - 1, j, k)] - t)
            + rc[2] * (field[d.index(i + 1, j, k)] - t)
            + self.angular[i]
                * ((field[d.index(i, d.theta_next(j), k)] - t)
                    + (field[d.index(i, d.theta_prev(j), k)] - t))
            + zc[0] * (field[d.index(i, j, k - 1)] - t)
            + zc[2] * (field[d.index(i, j, k + 1)] - t)
    }

    /// Magnitude of the diagonal weight at (i, k); bounds the explicit step.
    #[inline]
    pub fn diagonal_magnitude(&self, i: usize, k: usize) -> f64 {
        (self.radial[i][1] - 2.0 * self.angular[i] + self.axial[k][1]).abs()
    }

    /// Largest explicit step that keeps every interior update a convex
    /// combination of its neighbours, with a 0.9 safety factor.
    pub fn stable_time_step(&self, inputs: &KernelInputs<'_>) -> f64 {
        let d = self.dims;
        let mut dt = f64::INFINITY;
        for n in 0..d.interior_count() {
            let (i, j, k) = d.interior_coords(n);
            let idx = d.index(i, j, k);
            let mut diff = inputs.diffusivity[idx];
            if let Some(disp) = inputs.dispersion {
                diff += disp[idx];
            }
            let mut rate = diff * self.diagonal_magnitude(i, k);
            if let Some(v) = inputs.velocity {
                rate += v.vr[idx].abs() / self.r_minus[i].min(self.r_plus[i])
                    + v.vtheta[idx].abs() / self.arc[i]
                    + v.vz[idx].abs() / self.z_minus[k].min(self.z_plus[k]);
            }
            if rate > 0.0 {
                dt = dt.min(1.0 / rate);
            }
        }
        0.9 * dt
    }
}

fn second_derivative(hm: f64, hp: f64) -> [f64; 3] {
    let s = hm + hp;
    [2.0 / (hm * s), -2.0 / (hm * hp), 2.0 / (hp * s)]
}

fn first_derivative(hm: f64, hp: f64) -> [f64; 3] {
    let s = hm + hp;
    [-hp / (hm * s), (hp - hm) / (hm * hp), hm / (hp * s)]
}
