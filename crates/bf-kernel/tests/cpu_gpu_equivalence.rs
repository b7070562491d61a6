//! The GPU sweep must reproduce the CPU sweep. Skipped (with a note) when no
//! compute adapter is present.
#![cfg(feature = "gpu")]

use bf_kernel::gpu::{GpuBackend, GpuContext};
use bf_kernel::{CpuBackend, KernelInputs, TransportBackend, VelocityField};
use bf_mesh::{CylindricalGrid, Field3, GridSpec};

/// Small deterministic generator so the test needs no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

fn grid() -> CylindricalGrid {
    CylindricalGrid::generate(&GridSpec {
        nr: 5,
        ntheta: 4,
        nz: 5,
        r_inner_m: 0.1,
        r_outer_m: 2.0,
        depth_m: 4.0,
        radial_growth: 1.4,
        axial_clustering: 0.2,
    })
    .unwrap()
}

fn gpu_or_skip(grid: &CylindricalGrid) -> Option<GpuBackend> {
    let ctx = match GpuContext::discover() {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("skipping: {err}");
            return None;
        }
    };
    match GpuBackend::new(ctx, grid) {
        Ok(backend) => Some(backend),
        Err(err) => {
            eprintln!("skipping: {err}");
            None
        }
    }
}

fn assert_close(cpu: &Field3, gpu: &Field3) {
    for (idx, (a, b)) in cpu.as_slice().iter().zip(gpu.as_slice()).enumerate() {
        let tol = 1e-4 * a.abs().max(1.0);
        assert!((a - b).abs() <= tol, "node {idx}: cpu {a} gpu {b}");
    }
}

#[test]
fn random_fields_agree_with_and_without_advection() {
    let g = grid();
    let d = g.dims();
    let Some(mut gpu) = gpu_or_skip(&g) else {
        return;
    };
    let mut cpu = CpuBackend::new(&g);
    let mut rng = Lcg(0x5eed);

    for round in 0..4_u64 {
        let data: Vec<f64> = (0..d.len()).map(|_| rng.range(280.0, 300.0)).collect();
        let current = Field3::from_vec(d, data).unwrap();
        let alpha: Vec<f64> = (0..d.len()).map(|_| rng.range(5e-7, 2e-6)).collect();
        let mut velocity = VelocityField::zeros(d.len());
        for idx in 0..d.len() {
            velocity.vr[idx] = rng.range(-1e-6, 1e-6);
            velocity.vtheta[idx] = rng.range(-1e-6, 1e-6);
            velocity.vz[idx] = rng.range(-1e-6, 1e-6);
        }
        let dispersion: Vec<f64> = (0..d.len()).map(|_| rng.range(0.0, 1e-7)).collect();

        let with_transport = round % 2 == 1;
        let inputs = KernelInputs {
            diffusivity: &alpha,
            velocity: with_transport.then_some(&velocity),
            dispersion: with_transport.then_some(dispersion.as_slice()),
            revision: round + 1,
        };
        let dt = cpu.geometry().stable_time_step(&inputs);

        let mut next_cpu = Field3::zeros(d);
        let mut next_gpu = Field3::zeros(d);
        let change_cpu = cpu.sweep(&current, &mut next_cpu, &inputs, dt).unwrap();
        let change_gpu = gpu.sweep(&current, &mut next_gpu, &inputs, dt).unwrap();

        assert_close(&next_cpu, &next_gpu);
        assert!(
            (change_cpu - change_gpu).abs() <= 1e-3,
            "round {round}: cpu change {change_cpu} gpu change {change_gpu}"
        );
    }
}

#[test]
fn large_steps_are_clamped_identically() {
    let g = grid();
    let d = g.dims();
    let Some(mut gpu) = gpu_or_skip(&g) else {
        return;
    };
    let mut cpu = CpuBackend::new(&g);

    let mut current = Field3::filled(d, 283.15);
    current.set(2, 1, 2, 400.0);
    let alpha = vec![1e-4; d.len()];
    let inputs = KernelInputs {
        diffusivity: &alpha,
        velocity: None,
        dispersion: None,
        revision: 7,
    };
    let mut next_cpu = Field3::zeros(d);
    let mut next_gpu = Field3::zeros(d);
    let change_cpu = cpu.sweep(&current, &mut next_cpu, &inputs, 1.0e4).unwrap();
    let change_gpu = gpu.sweep(&current, &mut next_gpu, &inputs, 1.0e4).unwrap();

    assert_eq!(change_cpu, 5.0);
    assert!((change_gpu - 5.0).abs() < 1e-4);
    assert_close(&next_cpu, &next_gpu);
}

#[test]
fn repeated_sweeps_reuse_device_buffers() {
    let g = grid();
    let d = g.dims();
    let Some(mut gpu) = gpu_or_skip(&g) else {
        return;
    };
    let mut cpu = CpuBackend::new(&g);
    let mut current = Field3::filled(d, 283.15);
    current.set(1, 0, 1, 290.0);
    let alpha = vec![1e-6; d.len()];
    let inputs = KernelInputs {
        diffusivity: &alpha,
        velocity: None,
        dispersion: None,
        revision: 1,
    };
    let dt = cpu.geometry().stable_time_step(&inputs);

    let mut a = current.clone();
    let mut b = current;
    for _ in 0..10 {
        let mut na = Field3::zeros(d);
        let mut nb = Field3::zeros(d);
        cpu.sweep(&a, &mut na, &inputs, dt).unwrap();
        gpu.sweep(&b, &mut nb, &inputs, dt).unwrap();
        a = na;
        b = nb;
    }
    assert_close(&a, &b);
}
