//! End-to-end runs through YAML configurations.

use bf_app::{RunRequest, parse_config, run};
use bf_results::RunState;

const SMALL_GRID: &str = r#"
grid: { nr: 10, ntheta: 4, nz: 10, domain_radius_m: 5.0, domain_depth_m: 120.0 }
simulation: { backend: Cpu, time_step_s: 3600, save_interval_steps: 4 }
"#;

fn request(extra: &str) -> RunRequest {
    let yaml = format!("{SMALL_GRID}\n{extra}");
    RunRequest {
        config: parse_config(&yaml).unwrap(),
        ..RunRequest::default()
    }
}

#[test]
fn do_nothing_keeps_the_ground_at_its_initial_temperature() {
    let mut req = request(
        r#"
name: do-nothing
ground: { initial_temperature_c: 10.0 }
boundaries:
  outer: { type: Dirichlet, value_c: 10.0 }
fluid: { mass_flow_kg_s: 0.0 }
"#,
    );
    let t0 = bf_core::celsius_to_kelvin(10.0);
    req.config.simulation.duration_h = 12.0;
    let resp = run(&req).unwrap();
    assert!(resp.succeeded());
    assert_eq!(resp.results.records.len(), 12);
    for r in &resp.results.records {
        assert_eq!(r.heat_rate_w, 0.0);
        assert_eq!(r.min_temperature_k, t0);
        assert_eq!(r.max_temperature_k, t0);
    }
    for s in &resp.results.snapshots {
        assert!(s.temperature.as_slice().iter().all(|&t| t == t0));
    }
}

#[test]
fn basic_extraction_decays_toward_an_asymptote() {
    let mut req = request(
        r#"
name: extraction
ground: { initial_temperature_c: 14.85 }
boundaries:
  outer: { type: Dirichlet, value_c: 14.85 }
fluid: { inlet_temperature_c: 4.85, mass_flow_kg_s: 0.3 }
"#,
    );
    req.config.simulation.duration_h = 48.0;
    let resp = run(&req).unwrap();
    assert!(resp.succeeded());

    let q: Vec<f64> = resp.results.records.iter().map(|r| r.heat_rate_w).collect();
    assert_eq!(q.len(), 48);
    assert!(q.iter().all(|&v| v > 0.0));
    for w in q.windows(2) {
        assert!(w[1] <= w[0] + 1e-9 * w[0].abs(), "heat rate rose: {} -> {}", w[0], w[1]);
    }
    assert!(q[q.len() - 1] < q[0]);
    // later changes are smaller than early ones
    assert!(q[46] - q[47] < q[0] - q[1]);

    let last = resp.results.records.last().unwrap();
    assert!(last.outlet_temperature_k > last.inlet_temperature_k);
    assert!(last.min_temperature_k >= 273.0);
    assert!(resp.results.summary.total_energy_j > 0.0);
}

#[test]
fn reactive_transport_without_solutes_never_precipitates() {
    let mut req = request(
        r#"
name: reactive-noop
features: { reactive_transport: true, groundwater_flow: true }
fluid: { composition: [] }
"#,
    );
    req.config.simulation.duration_h = 8.0;
    let resp = run(&req).unwrap();
    assert!(resp.succeeded());
    for s in &resp.results.snapshots {
        assert!(s.precipitation.is_all_zero());
        assert!(s.mineral_fraction.is_all_zero());
    }
    for r in &resp.results.records {
        assert_eq!(r.diagnostic("reactive_transport", "net_precipitated_fraction"), Some(0.0));
        assert_eq!(r.diagnostic("reactive_transport", "active_minerals"), Some(0.0));
    }
}

#[test]
fn all_features_run_together() {
    let mut req = request(
        r#"
name: everything
features:
  multiphase: true
  amr: true
  fractured_media: true
  time_varying_bc: true
  enhanced_hvac: true
  groundwater_flow: true
  reactive_transport: true
fluid:
  composition:
    - { species: Ca, mol_per_l: 0.002 }
    - { species: CO3, mol_per_l: 0.0005 }
schedule:
  seasonal: { mean_c: 8.0, amplitude_k: 6.0 }
  inlet:
    - { time_h: 0, inlet_c: 4.0 }
    - { time_h: 12, inlet_c: 2.0 }
  duty_cycle: { on_hours: 4, off_hours: 2 }
"#,
    );
    req.config.simulation.duration_h = 12.0;
    req.config.simulation.amr_interval_steps = 3;
    let resp = run(&req).unwrap();
    assert!(resp.results.completed);
    assert_eq!(resp.results.final_state, RunState::Completed);
    let records = &resp.results.records;
    assert_eq!(records.len(), 12);
    // pump off in hours 4..6
    assert_eq!(records[4].heat_rate_w, 0.0);
    assert!(records[0].heat_rate_w > 0.0);
    assert!(records.iter().all(|r| r.diagnostic("hvac", "cop").is_some()));
    assert!(resp.results.summary.mean_cop.is_some());
    let table = resp.results.series_table();
    assert!(table.headers.iter().any(|h| h == "amr.refined_nodes"));
}

#[test]
fn cancelled_run_reports_partial_results() {
    let mut req = request("name: cancelled");
    req.config.simulation.duration_h = 6.0;
    req.cancel.cancel();
    let resp = run(&req).unwrap();
    assert!(!resp.succeeded());
    assert!(resp.failure.is_none());
    assert!(resp.results.records.is_empty());
    assert_eq!(resp.results.snapshots.len(), 1);
}
