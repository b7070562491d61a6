//! Run summary statistics and their text rendering.

use std::fmt::Write;

use serde::Serialize;

use crate::types::{RunState, StepOutcome, StepRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub final_state: RunState,
    pub steps: usize,
    pub simulated_time_s: f64,
    pub total_iterations: u64,
    /// Steps accepted at the iteration cap
    pub capped_steps: usize,
    pub skipped_updates: usize,
    pub mean_heat_rate_w: f64,
    pub peak_heat_rate_w: f64,
    pub final_heat_rate_w: f64,
    /// Extracted energy, J (rectangle rule over the steps)
    pub total_energy_j: f64,
    pub final_outlet_temperature_k: Option<f64>,
    pub min_temperature_k: Option<f64>,
    pub max_temperature_k: Option<f64>,
    pub mean_cop: Option<f64>,
}

impl RunSummary {
    pub fn from_records(records: &[StepRecord], final_state: RunState) -> Self {
        let steps = records.len();
        let mut energy = 0.0;
        let mut prev_time = 0.0;
        for r in records {
            energy += r.heat_rate_w * (r.time_s - prev_time);
            prev_time = r.time_s;
        }
        let heat_rates = records.iter().map(|r| r.heat_rate_w);
        let mean_heat_rate = if steps > 0 {
            heat_rates.clone().sum::<f64>() / steps as f64
        } else {
            0.0
        };
        let cops: Vec<f64> = records
            .iter()
            .filter_map(|r| r.diagnostic("hvac", "cop"))
            .collect();

        Self {
            final_state,
            steps,
            simulated_time_s: records.last().map_or(0.0, |r| r.time_s),
            total_iterations: records.iter().map(|r| u64::from(r.iterations)).sum(),
            capped_steps: records
                .iter()
                .filter(|r| r.outcome == StepOutcome::CapReached)
                .count(),
            skipped_updates: records.iter().map(|r| r.skipped.len()).sum(),
            mean_heat_rate_w: mean_heat_rate,
            peak_heat_rate_w: heat_rates.fold(0.0, f64::max),
            final_heat_rate_w: records.last().map_or(0.0, |r| r.heat_rate_w),
            total_energy_j: energy,
            final_outlet_temperature_k: records.last().map(|r| r.outlet_temperature_k),
            min_temperature_k: records.iter().map(|r| r.min_temperature_k).reduce(f64::min),
            max_temperature_k: records.iter().map(|r| r.max_temperature_k).reduce(f64::max),
            mean_cop: (!cops.is_empty()).then(|| cops.iter().sum::<f64>() / cops.len() as f64),
        }
    }

    /// Human-readable multi-line summary.
    pub fn to_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "Run state:          {:?}", self.final_state);
        let _ = writeln!(
            s,
            "Steps:              {} ({:.1} h simulated)",
            self.steps,
            self.simulated_time_s / 3600.0
        );
        let _ = writeln!(
            s,
            "Kernel iterations:  {} ({} steps at iteration cap)",
            self.total_iterations, self.capped_steps
        );
        if self.skipped_updates > 0 {
            let _ = writeln!(s, "Skipped updates:    {}", self.skipped_updates);
        }
        let _ = writeln!(
            s,
            "Heat extraction:    mean {:.1} W, peak {:.1} W, final {:.1} W",
            self.mean_heat_rate_w, self.peak_heat_rate_w, self.final_heat_rate_w
        );
        let _ = writeln!(
            s,
            "Extracted energy:   {:.3} kWh",
            self.total_energy_j / 3.6e6
        );
        if let Some(t) = self.final_outlet_temperature_k {
            let _ = writeln!(s, "Outlet temperature: {:.2} °C", t - 273.15);
        }
        if let (Some(lo), Some(hi)) = (self.min_temperature_k, self.max_temperature_k) {
            let _ = writeln!(
                s,
                "Ground range:       {:.2} .. {:.2} °C",
                lo - 273.15,
                hi - 273.15
            );
        }
        if let Some(cop) = self.mean_cop {
            let _ = writeln!(s, "Mean COP:           {cop:.2}");
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: u64, heat: f64) -> StepRecord {
        StepRecord {
            step,
            time_s: step as f64 * 3600.0,
            iterations: 4,
            max_change_k: 0.01,
            outcome: if step == 2 {
                StepOutcome::CapReached
            } else {
                StepOutcome::Converged
            },
            heat_rate_w: heat,
            inlet_temperature_k: 278.0,
            outlet_temperature_k: 281.0,
            mean_temperature_k: 287.0,
            min_temperature_k: 278.0,
            max_temperature_k: 288.0,
            diagnostics: Vec::new(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn statistics_over_records() {
        let records = vec![record(1, 3000.0), record(2, 2000.0), record(3, 1000.0)];
        let s = RunSummary::from_records(&records, RunState::Completed);
        assert_eq!(s.steps, 3);
        assert_eq!(s.total_iterations, 12);
        assert_eq!(s.capped_steps, 1);
        assert_eq!(s.peak_heat_rate_w, 3000.0);
        assert_eq!(s.final_heat_rate_w, 1000.0);
        assert!((s.mean_heat_rate_w - 2000.0).abs() < 1e-12);
        assert!((s.total_energy_j - 6000.0 * 3600.0).abs() < 1e-6);
        assert_eq!(s.mean_cop, None);
    }

    #[test]
    fn text_mentions_key_figures() {
        let s = RunSummary::from_records(&[record(1, 1500.0)], RunState::Completed);
        let text = s.to_text();
        assert!(text.contains("Completed"));
        assert!(text.contains("1500.0 W"));
        assert!(text.contains("7.85 °C"));
    }

    #[test]
    fn empty_run_summarises_to_zeros() {
        let s = RunSummary::from_records(&[], RunState::Failed);
        assert_eq!(s.steps, 0);
        assert_eq!(s.min_temperature_k, None);
        assert!(s.to_text().contains("Failed"));
    }
}
