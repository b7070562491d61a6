//! Append-only collection of step records and snapshots.

use crate::summary::RunSummary;
use crate::types::{FieldSnapshot, RunManifest, RunResults, RunState, StepRecord};
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Default)]
pub struct ResultsAccumulator {
    records: Vec<StepRecord>,
    snapshots: Vec<FieldSnapshot>,
}

impl ResultsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; steps and times must strictly increase.
    pub fn push_record(&mut self, record: StepRecord) -> ResultsResult<()> {
        if let Some(last) = self.records.last() {
            if record.step <= last.step || !(record.time_s > last.time_s) {
                return Err(ResultsError::OutOfOrder {
                    step: record.step,
                    time_s: record.time_s,
                    last_step: last.step,
                    last_time_s: last.time_s,
                });
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// Append a snapshot; snapshot steps must strictly increase.
    pub fn push_snapshot(&mut self, snapshot: FieldSnapshot) -> ResultsResult<()> {
        if let Some(last) = self.snapshots.last() {
            if snapshot.step <= last.step {
                return Err(ResultsError::OutOfOrder {
                    step: snapshot.step,
                    time_s: snapshot.time_s,
                    last_step: last.step,
                    last_time_s: last.time_s,
                });
            }
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn snapshots(&self) -> &[FieldSnapshot] {
        &self.snapshots
    }

    pub fn last_record(&self) -> Option<&StepRecord> {
        self.records.last()
    }

    pub fn last_snapshot_step(&self) -> Option<u64> {
        self.snapshots.last().map(|s| s.step)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compute the summary and seal the results.
    pub fn finalize(self, manifest: RunManifest, final_state: RunState, completed: bool) -> RunResults {
        let summary = RunSummary::from_records(&self.records, final_state);
        RunResults {
            manifest,
            records: self.records,
            snapshots: self.snapshots,
            summary,
            final_state,
            completed,
        }
    }
}
