//! Result data types.

use bf_mesh::{Field3, GridDims};
use serde::{Deserialize, Serialize};

use crate::summary::RunSummary;
use crate::table::SeriesTable;

pub type RunId = String;

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Stepping,
    Iterating,
    Converged,
    /// Iteration cap reached; the step was accepted with a flag
    Diverged,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub name: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub backend: String,
    pub grid: GridDims,
    pub dt_s: f64,
    pub duration_s: f64,
    pub solver_version: String,
}

impl RunManifest {
    /// Fresh run id and the current UTC time.
    pub fn new(name: impl Into<String>, backend: impl Into<String>, grid: GridDims, dt_s: f64, duration_s: f64) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            backend: backend.into(),
            grid,
            dt_s,
            duration_s,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Converged,
    /// Accepted at the iteration cap
    CapReached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleValue {
    pub module: String,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedUpdate {
    pub module: String,
    pub reason: String,
}

/// Scalars tracked for one macro step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub time_s: f64,
    pub iterations: u32,
    pub max_change_k: f64,
    pub outcome: StepOutcome,
    /// Positive when heat is extracted from the ground
    pub heat_rate_w: f64,
    pub inlet_temperature_k: f64,
    pub outlet_temperature_k: f64,
    pub mean_temperature_k: f64,
    pub min_temperature_k: f64,
    pub max_temperature_k: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ModuleValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedUpdate>,
}

impl StepRecord {
    pub fn diagnostic(&self, module: &str, name: &str) -> Option<f64> {
        self.diagnostics
            .iter()
            .find(|d| d.module == module && d.name == name)
            .map(|d| d.value)
    }
}

/// Full fields at one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
    pub step: u64,
    pub time_s: f64,
    pub temperature: Field3,
    pub pressure: Field3,
    pub saturation: Field3,
    pub stress: Field3,
    pub mineral_fraction: Field3,
    pub precipitation: Field3,
}

/// Everything a run produced. Built once by
/// [`ResultsAccumulator::finalize`](crate::ResultsAccumulator::finalize).
#[derive(Debug, Clone, Serialize)]
pub struct RunResults {
    pub manifest: RunManifest,
    pub records: Vec<StepRecord>,
    pub snapshots: Vec<FieldSnapshot>,
    pub summary: RunSummary,
    pub final_state: RunState,
    /// False when cancelled or failed
    pub completed: bool,
}

impl RunResults {
    pub fn series_table(&self) -> SeriesTable {
        SeriesTable::from_records(&self.records)
    }

    pub fn last_snapshot(&self) -> Option<&FieldSnapshot> {
        self.snapshots.last()
    }

    pub fn to_json(&self) -> crate::ResultsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
