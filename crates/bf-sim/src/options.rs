//! Run options.

use bf_kernel::BackendPreference;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimOptions {
    /// Macro step, s
    pub dt_s: f64,
    /// Simulated duration, s
    pub duration_s: f64,
    /// Quasi-steady threshold on the per-macro-step change rate, K
    pub tolerance_k: f64,
    /// Kernel iterations allowed per macro step before flagged acceptance
    pub max_iterations: u32,
    /// Snapshot every N steps (the last step is always kept)
    pub save_interval_steps: u64,
    /// Run adaptive refinement every K steps
    pub amr_interval_steps: u64,
    pub backend: BackendPreference,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt_s: 3600.0,
            duration_s: 24.0 * 3600.0,
            tolerance_k: 1e-3,
            max_iterations: 500,
            save_interval_steps: 24,
            amr_interval_steps: 6,
            backend: BackendPreference::Auto,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.duration_s.is_finite() && self.duration_s >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "duration must be non-negative",
            });
        }
        if !(self.tolerance_k.is_finite() && self.tolerance_k > 0.0) {
            return Err(SimError::InvalidArg {
                what: "tolerance must be positive",
            });
        }
        if self.max_iterations == 0 {
            return Err(SimError::InvalidArg {
                what: "max_iterations must be positive",
            });
        }
        if self.save_interval_steps == 0 || self.amr_interval_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "save and AMR intervals must be positive",
            });
        }
        Ok(())
    }

    /// Number of macro steps; the last one may be shorter than `dt_s`.
    pub fn total_steps(&self) -> u64 {
        let n = self.duration_s / self.dt_s;
        // tolerate round-off in duration / dt
        (n - 1e-9).ceil().max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let o = SimOptions::default();
        o.validate().unwrap();
        assert_eq!(o.total_steps(), 24);
    }

    #[test]
    fn partial_last_step_counts() {
        let o = SimOptions {
            dt_s: 3600.0,
            duration_s: 9000.0,
            ..SimOptions::default()
        };
        assert_eq!(o.total_steps(), 3);
    }

    #[test]
    fn rejects_bad_values() {
        for o in [
            SimOptions {
                dt_s: 0.0,
                ..SimOptions::default()
            },
            SimOptions {
                duration_s: -1.0,
                ..SimOptions::default()
            },
            SimOptions {
                max_iterations: 0,
                ..SimOptions::default()
            },
            SimOptions {
                amr_interval_steps: 0,
                ..SimOptions::default()
            },
        ] {
            assert!(matches!(o.validate(), Err(SimError::InvalidArg { .. })));
        }
    }
}
