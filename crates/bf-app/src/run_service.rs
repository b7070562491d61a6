//! Run execution service.

use std::path::Path;
use std::time::Instant;

use bf_kernel::{BackendPreference, DeviceReport};
use bf_results::RunResults;
use bf_sim::{CancelToken, SimError};

use crate::build::build_simulation;
use crate::config::{RunConfig, load_config};
use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};

/// Request to execute a run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub config: RunConfig,
    /// Replaces the configured backend preference when set
    pub backend: Option<BackendPreference>,
    pub cancel: CancelToken,
}

impl RunRequest {
    pub fn from_path(path: &Path) -> AppResult<Self> {
        Ok(Self {
            config: load_config(path)?,
            ..Self::default()
        })
    }
}

/// Outcome of a run. A run that failed after it started still
/// returns the results recorded before the failure.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub results: RunResults,
    pub failure: Option<String>,
    pub wall_time_s: f64,
}

impl RunResponse {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.results.completed
    }
}

fn emit(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Execute a run.
pub fn run(request: &RunRequest) -> AppResult<RunResponse> {
    run_with_progress(request, None)
}

/// Execute a run and stream progress events.
pub fn run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut config = request.config.clone();
    if let Some(backend) = request.backend {
        config.simulation.backend = backend;
    }

    emit(&mut progress_cb, RunStage::Building, started, Some(config.name.clone()));
    let sim = build_simulation(&config)?;
    emit(
        &mut progress_cb,
        RunStage::Running,
        started,
        Some(sim.backend_name()),
    );

    let outcome = {
        let mut on_step = |step: &bf_sim::StepProgress| {
            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(RunProgressEvent {
                    stage: RunStage::Running,
                    elapsed_wall_s: started.elapsed().as_secs_f64(),
                    message: None,
                    step: Some(step.clone()),
                });
            }
        };
        sim.run_with(&request.cancel, &mut on_step)
    };

    let (results, failure) = match outcome {
        Ok(results) => (results, None),
        Err(SimError::NonFinite {
            step,
            node,
            value,
            partial,
        }) => {
            let message = format!("non-finite temperature {value} at node {node} in step {step}");
            (*partial, Some(message))
        }
        Err(SimError::Aborted {
            step,
            source,
            partial,
        }) => (*partial, Some(format!("step {step} failed: {source}"))),
        Err(err) => return Err(err.into()),
    };

    let stage = match (&failure, results.completed) {
        (Some(_), _) => RunStage::Failed,
        (None, true) => RunStage::Completed,
        (None, false) => RunStage::Cancelled,
    };
    emit(&mut progress_cb, stage, started, failure.clone());
    tracing::info!(
        run_id = %results.manifest.run_id,
        steps = results.records.len(),
        ?stage,
        "run finished"
    );

    Ok(RunResponse {
        results,
        failure,
        wall_time_s: started.elapsed().as_secs_f64(),
    })
}

/// What GPU discovery finds on this machine.
pub fn device_report() -> DeviceReport {
    bf_kernel::probe_device()
}
