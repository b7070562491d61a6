//! Fixed-order physics stages run after the transport solve.

use bf_physics::{
    BoundaryInputs, ModuleKind, PhysicsModule, SimulationState, StepContext,
};
use bf_results::{ModuleValue, SkippedUpdate};

use crate::error::{SimError, SimResult};

/// What happened to one stage in one step.
#[derive(Clone, Debug, PartialEq)]
pub enum StageReport {
    Applied { module: &'static str },
    /// Not scheduled this step (AMR between intervals)
    NotDue { module: &'static str },
    /// The stage failed; the state kept its last good fields.
    Skipped { module: &'static str, reason: String },
}

pub struct ModulePipeline {
    modules: Vec<Box<dyn PhysicsModule>>,
    amr_interval: u64,
}

impl ModulePipeline {
    /// Stages are reordered into pipeline order. Each kind may appear once.
    pub fn new(mut modules: Vec<Box<dyn PhysicsModule>>, amr_interval: u64) -> SimResult<Self> {
        if amr_interval == 0 {
            return Err(SimError::InvalidArg {
                what: "AMR interval must be positive",
            });
        }
        modules.sort_by_key(|m| m.kind());
        if modules.windows(2).any(|w| w[0].kind() == w[1].kind()) {
            return Err(SimError::InvalidArg {
                what: "each physics module may be enabled once",
            });
        }
        Ok(Self {
            modules,
            amr_interval,
        })
    }

    pub fn kinds(&self) -> Vec<ModuleKind> {
        self.modules.iter().map(|m| m.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Let every stage adjust the boundary values before transport.
    pub fn adjust_boundary(&mut self, time: f64, inputs: &mut BoundaryInputs) {
        for m in &mut self.modules {
            m.adjust_boundary(time, inputs);
        }
    }

    fn is_due(&self, kind: ModuleKind, step: u64) -> bool {
        kind != ModuleKind::Amr || step % self.amr_interval == 0
    }

    /// Run every stage in order, committing each update before the next
    /// stage reads. A failing stage is skipped for this step and keeps the
    /// private state it had before the step.
    pub fn run(
        &mut self,
        state: SimulationState,
        ctx: &StepContext<'_>,
    ) -> (SimulationState, Vec<StageReport>) {
        let mut state = state;
        let mut reports = Vec::with_capacity(self.modules.len());
        for i in 0..self.modules.len() {
            let kind = self.modules[i].kind();
            if !self.is_due(kind, ctx.step) {
                reports.push(StageReport::NotDue {
                    module: kind.as_str(),
                });
                continue;
            }
            let module = &mut self.modules[i];
            let name = module.name();
            let saved = module.snapshot();
            let outcome = module
                .update_state(&state, ctx)
                .and_then(|update| state.commit(name, module.writes(), update));
            match outcome {
                Ok(next) => {
                    state = next;
                    reports.push(StageReport::Applied { module: name });
                }
                Err(err) => {
                    self.modules[i] = saved;
                    tracing::warn!(module = name, step = ctx.step, error = %err, "module update skipped");
                    reports.push(StageReport::Skipped {
                        module: name,
                        reason: err.to_string(),
                    });
                }
            }
        }
        (state, reports)
    }

    /// Current diagnostics of every stage.
    pub fn diagnostics(&self) -> Vec<ModuleValue> {
        self.modules
            .iter()
            .flat_map(|m| {
                let module = m.name();
                m.diagnostics().into_iter().map(move |(name, value)| ModuleValue {
                    module: module.to_string(),
                    name: name.to_string(),
                    value,
                })
            })
            .collect()
    }
}

/// Skipped stages as result entries.
pub fn skipped_updates(reports: &[StageReport]) -> Vec<SkippedUpdate> {
    reports
        .iter()
        .filter_map(|r| match r {
            StageReport::Skipped { module, reason } => Some(SkippedUpdate {
                module: module.to_string(),
                reason: reason.clone(),
            }),
            _ => None,
        })
        .collect()
}
