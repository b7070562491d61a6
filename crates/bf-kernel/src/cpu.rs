//! Data-parallel CPU backend.
//!
//! Each node reads only the previous iterate, so nodes are independent and
//! rayon can split the output freely. Per-task slot accumulators are merged
//! after the sweep.

use bf_core::timing::{Timer, kernel_timing};
use bf_mesh::{CylindricalGrid, Field3};
use rayon::prelude::*;

use crate::backend::{BackendKind, TransportBackend};
use crate::error::{KernelError, KernelResult};
use crate::reduction::ChangeAccumulator;
use crate::stencil::StencilGeometry;
use crate::update::{KernelInputs, update_node};

pub struct CpuBackend {
    geometry: StencilGeometry,
}

impl CpuBackend {
    pub fn new(grid: &CylindricalGrid) -> Self {
        Self {
            geometry: StencilGeometry::new(grid),
        }
    }

    pub fn geometry(&self) -> &StencilGeometry {
        &self.geometry
    }
}

pub(crate) fn check_shapes(
    geometry: &StencilGeometry,
    current: &Field3,
    next: &Field3,
    inputs: &KernelInputs<'_>,
) -> KernelResult<()> {
    let n = geometry.dims().len();
    let mut lens = vec![
        ("current field", current.as_slice().len()),
        ("next field", next.as_slice().len()),
        ("diffusivity", inputs.diffusivity.len()),
    ];
    if let Some(v) = inputs.velocity {
        lens.push(("velocity", v.len()));
    }
    if let Some(d) = inputs.dispersion {
        lens.push(("dispersion", d.len()));
    }
    for (what, got) in lens {
        if got != n {
            return Err(KernelError::ShapeMismatch {
                what,
                expected: n,
                got,
            });
        }
    }
    Ok(())
}

impl TransportBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn describe(&self) -> String {
        format!("cpu ({} threads)", rayon::current_num_threads())
    }

    fn sweep(
        &mut self,
        current: &Field3,
        next: &mut Field3,
        inputs: &KernelInputs<'_>,
        dt: f64,
    ) -> KernelResult<f64> {
        check_shapes(&self.geometry, current, next, inputs)?;
        let timer = Timer::start();
        let geom = &self.geometry;
        let dims = geom.dims();
        let src = current.as_slice();

        let acc = next
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .fold(ChangeAccumulator::new, |mut acc, (idx, out)| {
                let (i, j, k) = dims.coords(idx);
                if dims.is_interior(i, k) {
                    let (t_new, change) = update_node(geom, src, inputs, dt, i, j, k);
                    *out = t_new;
                    acc.record(idx, change);
                } else {
                    *out = src[idx];
                }
                acc
            })
            .reduce(ChangeAccumulator::new, |mut a, b| {
                a.merge(&b);
                a
            });

        timer.stop_into(&kernel_timing::CPU_SWEEPS);
        Ok(acc.max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_mesh::GridSpec;

    fn grid() -> CylindricalGrid {
        CylindricalGrid::generate(&GridSpec {
            nr: 6,
            ntheta: 4,
            nz: 6,
            r_inner_m: 0.1,
            r_outer_m: 3.0,
            depth_m: 6.0,
            radial_growth: 1.3,
            axial_clustering: 0.3,
        })
        .unwrap()
    }

    #[test]
    fn uniform_field_is_a_fixed_point() {
        let g = grid();
        let mut backend = CpuBackend::new(&g);
        let cur = Field3::filled(g.dims(), 283.15);
        let mut next = Field3::zeros(g.dims());
        let alpha = vec![1e-6; g.dims().len()];
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: None,
            dispersion: None,
            revision: 0,
        };
        let change = backend.sweep(&cur, &mut next, &inputs, 100.0).unwrap();
        assert_eq!(change, 0.0);
        assert_eq!(next, cur);
    }

    #[test]
    fn reported_change_matches_field_difference() {
        let g = grid();
        let d = g.dims();
        let mut backend = CpuBackend::new(&g);
        let mut cur = Field3::filled(d, 283.15);
        cur.set(2, 3, 3, 288.0);
        let mut next = Field3::zeros(d);
        let alpha = vec![1e-6; d.len()];
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: None,
            dispersion: None,
            revision: 0,
        };
        let dt = backend.geometry().stable_time_step(&inputs);
        let change = backend.sweep(&cur, &mut next, &inputs, dt).unwrap();
        assert!(change > 0.0);
        assert!((change - cur.max_abs_diff(&next)).abs() < 1e-12);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let g = grid();
        let mut backend = CpuBackend::new(&g);
        let cur = Field3::filled(g.dims(), 283.15);
        let mut next = Field3::zeros(g.dims());
        let alpha = vec![1e-6; 3];
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: None,
            dispersion: None,
            revision: 0,
        };
        assert!(matches!(
            backend.sweep(&cur, &mut next, &inputs, 1.0),
            Err(KernelError::ShapeMismatch { .. })
        ));
    }
}
