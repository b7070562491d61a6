//! The per-node update rule shared by every backend.

use crate::stencil::StencilGeometry;

/// Anti-blowup bound on a single node's change per sweep, K.
pub const MAX_STEP_CHANGE_K: f64 = 5.0;
/// Physical temperature bounds, K.
pub const T_MIN_K: f64 = 273.0;
pub const T_MAX_K: f64 = 473.0;

/// Thermal transport velocity per node, m/s (radial, tangential, vertical).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VelocityField {
    pub vr: Vec<f64>,
    pub vtheta: Vec<f64>,
    pub vz: Vec<f64>,
}

impl VelocityField {
    pub fn zeros(len: usize) -> Self {
        Self {
            vr: vec![0.0; len],
            vtheta: vec![0.0; len],
            vz: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.vr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vr.is_empty()
    }

    #[inline]
    pub fn speed(&self, idx: usize) -> f64 {
        (self.vr[idx].powi(2) + self.vtheta[idx].powi(2) + self.vz[idx].powi(2)).sqrt()
    }
}

/// Per-node coefficients for one sweep.
///
/// `revision` must change whenever any of the referenced arrays change; the
/// GPU backend re-uploads coefficients only when it does.
#[derive(Clone, Copy, Debug)]
pub struct KernelInputs<'a> {
    /// α = λ/(ρ·cp), m²/s
    pub diffusivity: &'a [f64],
    /// Advection enabled when present
    pub velocity: Option<&'a VelocityField>,
    /// Dispersion coefficient, m²/s; enabled when present
    pub dispersion: Option<&'a [f64]>,
    pub revision: u64,
}

#[inline]
fn upwind(v: f64, t: f64, t_minus: f64, t_plus: f64, h_minus: f64, h_plus: f64) -> f64 {
    if v > 0.0 {
        -v * (t - t_minus) / h_minus
    } else {
        -v * (t_plus - t) / h_plus
    }
}

/// New temperature and |ΔT| for interior node (i, j, k).
///
/// Clamp order: the step is limited to ±[`MAX_STEP_CHANGE_K`] first, then the
/// result is bounded to [[`T_MIN_K`], [`T_MAX_K`]].
#[inline]
pub fn update_node(
    geom: &StencilGeometry,
    field: &[f64],
    inputs: &KernelInputs<'_>,
    dt: f64,
    i: usize,
    j: usize,
    k: usize,
) -> (f64, f64) {
    let d = geom.dims();
    let idx = d.index(i, j, k);
    let t = field[idx];
    let lap = geom.laplacian(field, i, j, k);

    let mut rate = inputs.diffusivity[idx] * lap;
    if let Some(disp) = inputs.dispersion {
        rate += disp[idx] * lap;
    }
    if let Some(v) = inputs.velocity {
        let t_rm = field[d.index(i - 1, j, k)];
        let t_rp = field[d.index(i + 1, j, k)];
        let t_jm = field[d.index(i, d.theta_prev(j), k)];
        let t_jp = field[d.index(i, d.theta_next(j), k)];
        let t_zm = field[d.index(i, j, k - 1)];
        let t_zp = field[d.index(i, j, k + 1)];
        rate += upwind(v.vr[idx], t, t_rm, t_rp, geom.r_minus[i], geom.r_plus[i]);
        rate += upwind(v.vtheta[idx], t, t_jm, t_jp, geom.arc[i], geom.arc[i]);
        rate += upwind(v.vz[idx], t, t_zm, t_zp, geom.z_minus[k], geom.z_plus[k]);
    }

    let delta = (dt * rate).clamp(-MAX_STEP_CHANGE_K, MAX_STEP_CHANGE_K);
    let t_new = (t + delta).clamp(T_MIN_K, T_MAX_K);
    (t_new, (t_new - t).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_mesh::{CylindricalGrid, GridSpec};

    fn setup() -> (CylindricalGrid, StencilGeometry) {
        let grid = CylindricalGrid::generate(&GridSpec {
            nr: 6,
            ntheta: 4,
            nz: 6,
            r_inner_m: 0.1,
            r_outer_m: 2.0,
            depth_m: 5.0,
            radial_growth: 1.2,
            axial_clustering: 0.0,
        })
        .unwrap();
        let geom = StencilGeometry::new(&grid);
        (grid, geom)
    }

    #[test]
    fn hot_spot_diffuses_down() {
        let (grid, geom) = setup();
        let d = grid.dims();
        let alpha = vec![1e-6; d.len()];
        let mut f = vec![290.0; d.len()];
        f[d.index(2, 1, 2)] = 291.0;
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: None,
            dispersion: None,
            revision: 0,
        };
        let dt = geom.stable_time_step(&inputs);
        let (t_new, change) = update_node(&geom, &f, &inputs, dt, 2, 1, 2);
        assert!(t_new < 291.0 && t_new > 290.0);
        assert!((change - (291.0 - t_new)).abs() < 1e-12);
    }

    #[test]
    fn step_change_is_clamped() {
        let (grid, geom) = setup();
        let d = grid.dims();
        let alpha = vec![1e-3; d.len()];
        let mut f = vec![290.0; d.len()];
        f[d.index(2, 1, 2)] = 400.0;
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: None,
            dispersion: None,
            revision: 0,
        };
        let (t_new, change) = update_node(&geom, &f, &inputs, 1e6, 2, 1, 2);
        assert_eq!(t_new, 395.0);
        assert_eq!(change, MAX_STEP_CHANGE_K);
    }

    #[test]
    fn result_is_bounded_after_step_clamp() {
        let (grid, geom) = setup();
        let d = grid.dims();
        let alpha = vec![1e-3; d.len()];
        let mut f = vec![273.0; d.len()];
        f[d.index(2, 1, 2)] = 275.0;
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: None,
            dispersion: None,
            revision: 0,
        };
        let (t_new, _) = update_node(&geom, &f, &inputs, 1e6, 2, 1, 2);
        assert_eq!(t_new, T_MIN_K);
    }

    #[test]
    fn upwind_takes_upstream_neighbour() {
        let (grid, geom) = setup();
        let d = grid.dims();
        let alpha = vec![0.0; d.len()];
        let mut f = vec![290.0; d.len()];
        // warm water upstream (smaller r), cold downstream
        f[d.index(1, 0, 2)] = 300.0;
        f[d.index(3, 0, 2)] = 280.0;
        let mut v = VelocityField::zeros(d.len());
        v.vr[d.index(2, 0, 2)] = 1e-5;
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: Some(&v),
            dispersion: None,
            revision: 0,
        };
        let (t_new, _) = update_node(&geom, &f, &inputs, 10.0, 2, 0, 2);
        assert!(t_new > 290.0, "positive vr must pull from i-1, got {t_new}");

        v.vr[d.index(2, 0, 2)] = -1e-5;
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: Some(&v),
            dispersion: None,
            revision: 1,
        };
        let (t_new, _) = update_node(&geom, &f, &inputs, 10.0, 2, 0, 2);
        assert!(t_new < 290.0, "negative vr must pull from i+1, got {t_new}");
    }
}
