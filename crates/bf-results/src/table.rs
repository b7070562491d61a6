//! Column-oriented view of the step records for tabular export.

use serde::Serialize;

use crate::types::StepRecord;

const BASE_COLUMNS: [&str; 10] = [
    "step",
    "time_s",
    "iterations",
    "max_change_k",
    "converged",
    "heat_rate_w",
    "inlet_temperature_k",
    "outlet_temperature_k",
    "mean_temperature_k",
    "max_temperature_k",
];

/// One row per step. Module diagnostics become `module.name` columns in
/// first-seen order; steps without a value get NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl SeriesTable {
    pub fn from_records(records: &[StepRecord]) -> Self {
        let mut extra: Vec<(String, String)> = Vec::new();
        for r in records {
            for d in &r.diagnostics {
                if !extra.iter().any(|(m, n)| *m == d.module && *n == d.name) {
                    extra.push((d.module.clone(), d.name.clone()));
                }
            }
        }

        let mut headers: Vec<String> = BASE_COLUMNS.iter().map(|s| s.to_string()).collect();
        headers.extend(extra.iter().map(|(m, n)| format!("{m}.{n}")));

        let rows = records
            .iter()
            .map(|r| {
                let mut row = vec![
                    r.step as f64,
                    r.time_s,
                    f64::from(r.iterations),
                    r.max_change_k,
                    if r.outcome == crate::StepOutcome::Converged { 1.0 } else { 0.0 },
                    r.heat_rate_w,
                    r.inlet_temperature_k,
                    r.outlet_temperature_k,
                    r.mean_temperature_k,
                    r.max_temperature_k,
                ];
                row.extend(
                    extra
                        .iter()
                        .map(|(m, n)| r.diagnostic(m, n).unwrap_or(f64::NAN)),
                );
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn column(&self, header: &str) -> Option<Vec<f64>> {
        let c = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.iter().map(|row| row[c]).collect())
    }

    /// Comma-separated text with a header line. NaN cells are left empty.
    pub fn to_csv(&self) -> String {
        let mut csv = self.headers.join(",");
        csv.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|v| if v.is_nan() { String::new() } else { v.to_string() })
                .collect();
            csv.push_str(&cells.join(","));
            csv.push('\n');
        }
        csv
    }
}
