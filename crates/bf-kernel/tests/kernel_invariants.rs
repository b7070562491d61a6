use bf_kernel::{
    CpuBackend, KernelInputs, MAX_STEP_CHANGE_K, T_MAX_K, T_MIN_K, TransportBackend, VelocityField,
};
use bf_mesh::{CylindricalGrid, Field3, GridSpec};
use proptest::prelude::*;

fn grid() -> CylindricalGrid {
    CylindricalGrid::generate(&GridSpec {
        nr: 5,
        ntheta: 3,
        nz: 5,
        r_inner_m: 0.08,
        r_outer_m: 1.5,
        depth_m: 3.0,
        radial_growth: 1.5,
        axial_clustering: 0.0,
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sweep_respects_clamps(
        temps in prop::collection::vec(273.0_f64..473.0, 75),
        alpha in 1e-8_f64..1e-3,
        vr in -1e-3_f64..1e-3,
        vz in -1e-3_f64..1e-3,
        dt in 1.0_f64..1e5,
    ) {
        let g = grid();
        let d = g.dims();
        prop_assume!(temps.len() == d.len());
        let current = Field3::from_vec(d, temps).unwrap();
        let diffusivity = vec![alpha; d.len()];
        let mut velocity = VelocityField::zeros(d.len());
        velocity.vr.iter_mut().for_each(|v| *v = vr);
        velocity.vz.iter_mut().for_each(|v| *v = vz);
        let inputs = KernelInputs {
            diffusivity: &diffusivity,
            velocity: Some(&velocity),
            dispersion: None,
            revision: 0,
        };

        let mut backend = CpuBackend::new(&g);
        let mut next = Field3::zeros(d);
        let change = backend.sweep(&current, &mut next, &inputs, dt).unwrap();

        prop_assert!(change <= MAX_STEP_CHANGE_K + 1e-12);
        for (idx, (&before, &after)) in current.as_slice().iter().zip(next.as_slice()).enumerate() {
            let (i, _, k) = d.coords(idx);
            prop_assert!((T_MIN_K..=T_MAX_K).contains(&after));
            prop_assert!((after - before).abs() <= MAX_STEP_CHANGE_K + 1e-12);
            if !d.is_interior(i, k) {
                prop_assert_eq!(after, before);
            }
        }
    }
}

#[test]
fn cold_node_is_lifted_to_lower_bound() {
    let g = grid();
    let d = g.dims();
    let mut current = Field3::filled(d, 283.0);
    current.set(2, 0, 2, 260.0);
    let alpha = vec![1e-12; d.len()];
    let inputs = KernelInputs {
        diffusivity: &alpha,
        velocity: None,
        dispersion: None,
        revision: 0,
    };
    let mut backend = CpuBackend::new(&g);
    let mut next = Field3::zeros(d);
    let change = backend.sweep(&current, &mut next, &inputs, 1.0).unwrap();
    assert_eq!(next.get(2, 0, 2), T_MIN_K);
    assert!((change - 13.0).abs() < 1e-9);
}
