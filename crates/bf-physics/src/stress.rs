//! Linear thermo-elastic stress estimate.

use bf_mesh::Field3;
use serde::{Deserialize, Serialize};

/// `σ = −E·β·(T − T0)/(1 − ν)` for laterally constrained rock. Heating
/// gives compression (negative).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermoElastic {
    pub youngs_modulus_pa: f64,
    /// Linear thermal expansion, 1/K
    pub expansion_per_k: f64,
    pub poisson_ratio: f64,
    /// Stress-free temperature, K
    pub reference_temperature_k: f64,
}

impl Default for ThermoElastic {
    fn default() -> Self {
        Self {
            youngs_modulus_pa: 30e9,
            expansion_per_k: 1e-5,
            poisson_ratio: 0.25,
            reference_temperature_k: 283.15,
        }
    }
}

impl ThermoElastic {
    pub fn stress(&self, temperature: f64) -> f64 {
        -self.youngs_modulus_pa * self.expansion_per_k * (temperature - self.reference_temperature_k)
            / (1.0 - self.poisson_ratio)
    }

    pub fn stress_field(&self, temperature: &Field3) -> Field3 {
        let mut out = temperature.clone();
        for v in out.as_mut_slice() {
            *v = self.stress(*v);
        }
        out
    }
}
