use bf_app::{RunProgressEvent, RunRequest, RunStage, parse_config, run_with_progress};

#[test]
fn stages_and_steps_are_reported_in_order() {
    let config = parse_config(
        r#"
grid: { nr: 6, ntheta: 2, nz: 6 }
simulation: { backend: Cpu, duration_h: 3 }
"#,
    )
    .unwrap();
    let req = RunRequest {
        config,
        ..RunRequest::default()
    };
    let mut events: Vec<RunProgressEvent> = Vec::new();
    let resp = run_with_progress(&req, Some(&mut |e| events.push(e))).unwrap();
    assert!(resp.succeeded());

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&RunStage::Building));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    let steps: Vec<u64> = events
        .iter()
        .filter_map(|e| e.step.as_ref().map(|s| s.step))
        .collect();
    assert_eq!(steps, vec![1, 2, 3]);
    assert!(events.windows(2).all(|w| w[1].elapsed_wall_s >= w[0].elapsed_wall_s));
}

#[test]
fn invalid_configuration_fails_before_running() {
    let config = parse_config("boundaries: { outer: { type: FluxSpecified, flux_w_m2: 5 } }").unwrap();
    let req = RunRequest {
        config,
        ..RunRequest::default()
    };
    let mut stages = Vec::new();
    assert!(run_with_progress(&req, Some(&mut |e: RunProgressEvent| stages.push(e.stage))).is_err());
    assert_eq!(stages, vec![RunStage::Building]);
}
