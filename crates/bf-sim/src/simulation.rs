//! The macro-step loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bf_borehole::{BoreholeExchanger, CirculationInputs};
use bf_core::first_non_finite;
use bf_kernel::{TransportBackend, select_backend};
use bf_mesh::{CylindricalGrid, DomainBoundaries, Field3, MaterialField};
use bf_physics::{
    BoundaryConditionProvider, FieldKind, GroundwaterParams, PhysicsModule, SimulationState,
    StateUpdate, StepContext, ThermoElastic,
};
use bf_results::{
    FieldSnapshot, ResultsAccumulator, RunManifest, RunResults, RunState, StepOutcome, StepRecord,
};
use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::options::SimOptions;
use crate::pipeline::{ModulePipeline, skipped_updates};
use crate::transport::TransportSolver;

/// Everything needed to build a [`Simulation`].
pub struct SimSetup {
    pub name: String,
    pub grid: CylindricalGrid,
    pub materials: MaterialField,
    pub boundaries: DomainBoundaries,
    pub exchanger: BoreholeExchanger,
    /// K
    pub initial_temperature: Field3,
    pub boundary_provider: Box<dyn BoundaryConditionProvider>,
    /// Advection and dispersion enabled when present
    pub groundwater: Option<GroundwaterParams>,
    pub modules: Vec<Box<dyn PhysicsModule>>,
    pub stress: ThermoElastic,
    pub options: SimOptions,
}

/// Shared cancellation flag, checked once per macro step.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Reported after every completed macro step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepProgress {
    pub step: u64,
    pub total_steps: u64,
    pub time_s: f64,
    pub duration_s: f64,
    pub iterations: u32,
    pub max_change_k: f64,
    pub outcome: StepOutcome,
    pub heat_rate_w: f64,
    pub state: RunState,
}

impl StepProgress {
    pub fn fraction_complete(&self) -> f64 {
        if self.duration_s > 0.0 {
            (self.time_s / self.duration_s).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

enum StepEnd {
    Recorded(StepRecord),
    NonFinite { node: usize, value: f64 },
}

pub struct Simulation {
    name: String,
    grid: CylindricalGrid,
    materials: MaterialField,
    boundaries: DomainBoundaries,
    exchanger: BoreholeExchanger,
    provider: Box<dyn BoundaryConditionProvider>,
    groundwater: Option<GroundwaterParams>,
    pipeline: ModulePipeline,
    stress: ThermoElastic,
    options: SimOptions,
    transport: TransportSolver,
    state: SimulationState,
    run_state: RunState,
    /// Permeability the current advection coefficients were built from
    permeability_seen: Option<Arc<Field3>>,
}

impl Simulation {
    /// Validate the setup, pick the transport backend and build the
    /// initial state.
    pub fn new(setup: SimSetup) -> SimResult<Self> {
        Self::check(&setup)?;
        let backend = select_backend(setup.options.backend, &setup.grid);
        Self::assemble(setup, backend)
    }

    /// Like [`Simulation::new`] with a caller-supplied transport backend.
    pub fn with_backend(setup: SimSetup, backend: Box<dyn TransportBackend>) -> SimResult<Self> {
        Self::check(&setup)?;
        Self::assemble(setup, backend)
    }

    fn check(setup: &SimSetup) -> SimResult<()> {
        setup.options.validate()?;
        setup.boundaries.validate()?;
        let dims = setup.grid.dims();
        if setup.initial_temperature.dims() != dims {
            return Err(SimError::InvalidArg {
                what: "initial temperature does not match the grid",
            });
        }
        if first_non_finite(setup.initial_temperature.as_slice()).is_some() {
            return Err(SimError::InvalidArg {
                what: "initial temperature must be finite",
            });
        }
        if let Some(gw) = &setup.groundwater {
            gw.validate()?;
        }
        Ok(())
    }

    fn assemble(setup: SimSetup, backend: Box<dyn TransportBackend>) -> SimResult<Self> {
        let dims = setup.grid.dims();
        let transport = TransportSolver::new(backend, &setup.grid, &setup.materials)?;
        tracing::info!(
            backend = %transport.backend_name(),
            nr = dims.nr,
            ntheta = dims.ntheta,
            nz = dims.nz,
            stable_dt_s = transport.stable_dt(),
            "simulation ready"
        );

        let state = SimulationState::initial(&setup.grid, setup.initial_temperature, &setup.materials)?;
        let pipeline = ModulePipeline::new(setup.modules, setup.options.amr_interval_steps)?;

        Ok(Self {
            name: setup.name,
            grid: setup.grid,
            materials: setup.materials,
            boundaries: setup.boundaries,
            exchanger: setup.exchanger,
            provider: setup.boundary_provider,
            groundwater: setup.groundwater,
            pipeline,
            stress: setup.stress,
            options: setup.options,
            transport,
            state,
            run_state: RunState::Idle,
            permeability_seen: None,
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn backend_name(&self) -> String {
        self.transport.backend_name()
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    /// Run to completion.
    pub fn run(self) -> SimResult<RunResults> {
        self.run_with(&CancelToken::new(), &mut |_| {})
    }

    /// Run, calling `progress` after each step and stopping early when
    /// `cancel` is set. A cancelled run returns the partial results with
    /// `completed == false`.
    pub fn run_with(
        mut self,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(&StepProgress),
    ) -> SimResult<RunResults> {
        let manifest = RunManifest::new(
            self.name.clone(),
            self.backend_name(),
            self.grid.dims(),
            self.options.dt_s,
            self.options.duration_s,
        );
        let total = self.options.total_steps();
        tracing::info!(run_id = %manifest.run_id, steps = total, "run started");

        let mut results = ResultsAccumulator::new();
        results.push_snapshot(self.snapshot())?;

        for step in 1..=total {
            if cancel.is_cancelled() {
                tracing::info!(step, "run cancelled");
                return Ok(results.finalize(manifest, self.run_state, false));
            }
            let end = match self.advance_step(step) {
                Ok(end) => end,
                Err(err) => {
                    self.transition(RunState::Failed);
                    tracing::error!(step, error = %err, "step failed, run stopped");
                    let partial = results.finalize(manifest, RunState::Failed, false);
                    return Err(SimError::Aborted {
                        step,
                        source: Box::new(err),
                        partial: Box::new(partial),
                    });
                }
            };
            match end {
                StepEnd::Recorded(record) => {
                    progress(&StepProgress {
                        step,
                        total_steps: total,
                        time_s: record.time_s,
                        duration_s: self.options.duration_s,
                        iterations: record.iterations,
                        max_change_k: record.max_change_k,
                        outcome: record.outcome,
                        heat_rate_w: record.heat_rate_w,
                        state: self.run_state,
                    });
                    results.push_record(record)?;
                    if step % self.options.save_interval_steps == 0 || step == total {
                        results.push_snapshot(self.snapshot())?;
                    }
                }
                StepEnd::NonFinite { node, value } => {
                    self.transition(RunState::Failed);
                    tracing::error!(step, node, value, "non-finite temperature, run failed");
                    let partial = results.finalize(manifest, RunState::Failed, false);
                    return Err(SimError::NonFinite {
                        step,
                        node,
                        value,
                        partial: Box::new(partial),
                    });
                }
            }
        }

        self.transition(RunState::Completed);
        tracing::info!(steps = total, "run completed");
        Ok(results.finalize(manifest, RunState::Completed, true))
    }

    fn transition(&mut self, next: RunState) {
        if next != self.run_state {
            tracing::trace!(from = ?self.run_state, to = ?next, "run state");
            self.run_state = next;
        }
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            step: self.state.step,
            time_s: self.state.elapsed,
            temperature: self.state.temperature.as_ref().clone(),
            pressure: self.state.pressure.as_ref().clone(),
            saturation: self.state.saturation.as_ref().clone(),
            stress: self.state.stress.as_ref().clone(),
            mineral_fraction: self.state.mineral_fraction.as_ref().clone(),
            precipitation: self.state.precipitation.as_ref().clone(),
        }
    }

    /// Rebuild the advection coefficients when permeability changed.
    fn refresh_advection(&mut self) -> SimResult<()> {
        let Some(params) = &self.groundwater else {
            return Ok(());
        };
        let permeability = &self.state.permeability;
        if self
            .permeability_seen
            .as_ref()
            .is_some_and(|seen| Arc::ptr_eq(seen, permeability))
        {
            return Ok(());
        }
        let coeffs = params.coefficients(&self.grid, &self.materials, permeability)?;
        self.transport
            .set_advection(Some((coeffs.velocity, coeffs.dispersion)));
        self.permeability_seen = Some(Arc::clone(permeability));
        tracing::debug!(stable_dt_s = self.transport.stable_dt(), "advection coefficients rebuilt");
        Ok(())
    }

    fn advance_step(&mut self, step: u64) -> SimResult<StepEnd> {
        self.transition(RunState::Stepping);
        let t0 = self.state.elapsed;
        let t1 = (step as f64 * self.options.dt_s).min(self.options.duration_s);
        let dt = t1 - t0;

        let mut boundary = self.provider.inputs(t0);
        self.pipeline.adjust_boundary(t0, &mut boundary);
        self.refresh_advection()?;

        let fluid = self.exchanger.solve(
            &self.state.temperature,
            &CirculationInputs {
                inlet_temperature: boundary.inlet_temperature,
                mass_flow: boundary.mass_flow,
                specific_heat: boundary.specific_heat,
            },
        )?;
        let wall = self.exchanger.wall_conditions(&fluid.circulation);

        self.transition(RunState::Iterating);
        let out = self.transport.advance(
            &self.state.temperature,
            &self.boundaries,
            &wall,
            boundary.ambient_temperature,
            dt,
            self.options.tolerance_k,
            self.options.max_iterations,
        )?;
        if let Some((node, value)) = first_non_finite(out.temperature.as_slice()) {
            return Ok(StepEnd::NonFinite { node, value });
        }
        self.transition(if out.converged {
            RunState::Converged
        } else {
            RunState::Diverged
        });

        let previous = self.state.clone();
        let mut transported = previous.with_temperature(out.temperature)?;
        transported.elapsed = t1;
        transported.step = step;
        transported.iterations += u64::from(out.iterations);

        let ctx = StepContext {
            step,
            time: t1,
            dt,
            grid: &self.grid,
            boundary,
            heat_rate: fluid.heat_rate,
            outlet_temperature: fluid.outlet_temperature,
            previous: &previous,
        };
        let (after, reports) = self.pipeline.run(transported, &ctx);
        let stress = self.stress.stress_field(&after.temperature);
        let after = after.commit(
            "thermo_elastic",
            &[FieldKind::Stress],
            StateUpdate::new().with(FieldKind::Stress, stress),
        )?;
        if let Some((node, value)) = first_non_finite(after.temperature.as_slice()) {
            return Ok(StepEnd::NonFinite { node, value });
        }
        self.state = after;

        let t = &self.state.temperature;
        Ok(StepEnd::Recorded(StepRecord {
            step,
            time_s: t1,
            iterations: out.iterations,
            max_change_k: out.max_change,
            outcome: if out.converged {
                StepOutcome::Converged
            } else {
                StepOutcome::CapReached
            },
            heat_rate_w: fluid.heat_rate,
            inlet_temperature_k: boundary.inlet_temperature,
            outlet_temperature_k: fluid.outlet_temperature,
            mean_temperature_k: t.mean(),
            min_temperature_k: t.min(),
            max_temperature_k: t.max(),
            diagnostics: self.pipeline.diagnostics(),
            skipped: skipped_updates(&reports),
        }))
    }
}
