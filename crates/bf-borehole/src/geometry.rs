//! Borehole geometry and the thermal resistances derived from it.

use std::f64::consts::PI;

use bf_core::units::{Length, m};
use serde::{Deserialize, Serialize};

use crate::error::{BoreholeError, BoreholeResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangerType {
    /// Concentric inner pipe inside an outer pipe.
    #[default]
    Coaxial,
    /// Two pipes joined at the bottom, not resolved radially.
    UTube,
}

/// Which path carries the descending fluid, and how the legs see the ground.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowConfiguration {
    /// Coaxial: down through the annulus, up through the inner pipe.
    #[default]
    CounterFlow,
    /// Coaxial: down through the inner pipe, up through the annulus.
    CounterFlowReversed,
    /// Both legs exchange with the ground.
    ParallelFlow,
}

/// Per unit length resistances, m·K/W.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThermalResistances {
    /// Ground-contacting fluid to borehole wall.
    pub borehole: f64,
    /// Down leg to up leg.
    pub leg_to_leg: f64,
}

#[derive(Debug, Clone)]
pub struct BoreholeGeometry {
    pub depth: Length,
    pub well_diameter: Length,
    /// Coaxial: inner pipe. U-tube: inside diameter of each leg.
    pub inner_pipe_diameter: Length,
    /// Coaxial: outer pipe. U-tube: outside diameter of each leg.
    pub outer_pipe_diameter: Length,
    /// U-tube shank spacing, centre to centre.
    pub pipe_spacing: Length,
    pub pipe_wall_thickness: Length,
    pub exchanger: ExchangerType,
    pub flow: FlowConfiguration,
    /// W/m·K
    pub grout_conductivity: f64,
    /// W/m·K
    pub pipe_conductivity: f64,
    /// Fluid-side film coefficient, W/m²·K
    pub film_coefficient: f64,
}

impl Default for BoreholeGeometry {
    fn default() -> Self {
        Self {
            depth: m(100.0),
            well_diameter: m(0.15),
            inner_pipe_diameter: m(0.04),
            outer_pipe_diameter: m(0.11),
            pipe_spacing: m(0.07),
            pipe_wall_thickness: m(0.004),
            exchanger: ExchangerType::Coaxial,
            flow: FlowConfiguration::CounterFlow,
            grout_conductivity: 2.0,
            pipe_conductivity: 0.4,
            film_coefficient: 1500.0,
        }
    }
}

impl BoreholeGeometry {
    pub fn well_radius(&self) -> f64 {
        0.5 * self.well_diameter.value
    }

    pub fn inner_pipe_radius(&self) -> f64 {
        0.5 * self.inner_pipe_diameter.value
    }

    pub fn outer_pipe_radius(&self) -> f64 {
        0.5 * self.outer_pipe_diameter.value
    }

    /// Radius of the region occupied by circulating fluid. For a U-tube this
    /// is the envelope of both legs.
    pub fn fluid_radius(&self) -> f64 {
        match self.exchanger {
            ExchangerType::Coaxial => self.outer_pipe_radius(),
            ExchangerType::UTube => 0.5 * self.pipe_spacing.value + self.outer_pipe_radius(),
        }
    }

    pub fn validate(&self) -> BoreholeResult<()> {
        let lengths = [
            ("depth", self.depth.value),
            ("well diameter", self.well_diameter.value),
            ("inner pipe diameter", self.inner_pipe_diameter.value),
            ("outer pipe diameter", self.outer_pipe_diameter.value),
            ("pipe wall thickness", self.pipe_wall_thickness.value),
            ("grout conductivity", self.grout_conductivity),
            ("pipe conductivity", self.pipe_conductivity),
            ("film coefficient", self.film_coefficient),
        ];
        for (what, v) in lengths {
            if !(v.is_finite() && v > 0.0) {
                return Err(BoreholeError::InvalidGeometry {
                    what: format!("{what} must be positive and finite, got {v}"),
                });
            }
        }
        if self.inner_pipe_diameter.value >= self.outer_pipe_diameter.value {
            return Err(BoreholeError::InvalidGeometry {
                what: "inner pipe diameter must be smaller than outer pipe diameter".into(),
            });
        }
        match self.exchanger {
            ExchangerType::Coaxial => {
                if self.outer_pipe_diameter.value > self.well_diameter.value {
                    return Err(BoreholeError::InvalidGeometry {
                        what: "outer pipe does not fit in the well".into(),
                    });
                }
                if self.inner_pipe_diameter.value + 2.0 * self.pipe_wall_thickness.value
                    >= self.outer_pipe_diameter.value
                {
                    return Err(BoreholeError::InvalidGeometry {
                        what: "no annulus between inner and outer pipe".into(),
                    });
                }
            }
            ExchangerType::UTube => {
                let s = self.pipe_spacing.value;
                if !(s.is_finite() && s >= self.outer_pipe_diameter.value) {
                    return Err(BoreholeError::InvalidGeometry {
                        what: "U-tube legs overlap; spacing must be at least one pipe diameter"
                            .into(),
                    });
                }
                if s + self.outer_pipe_diameter.value > self.well_diameter.value {
                    return Err(BoreholeError::InvalidGeometry {
                        what: "U-tube legs do not fit in the well".into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Film plus wall conduction of one pipe, per unit length.
    fn pipe_resistance(&self, r_in: f64, r_out: f64) -> f64 {
        1.0 / (2.0 * PI * r_in * self.film_coefficient)
            + (r_out / r_in).ln() / (2.0 * PI * self.pipe_conductivity)
    }

    /// Borehole and leg-to-leg resistances.
    ///
    /// Coaxial: the annulus sees the wall through the outer pipe and the
    /// grout ring; the legs exchange through the inner pipe wall.
    /// U-tube: zero-order line-source estimates.
    pub fn resistances(&self) -> ThermalResistances {
        let r_b = self.well_radius();
        let lam_g = self.grout_conductivity;
        match self.exchanger {
            ExchangerType::Coaxial => {
                let r_ip = self.inner_pipe_radius();
                let r_op = self.outer_pipe_radius();
                let wall = self.pipe_wall_thickness.value;
                let outer_pipe = self.pipe_resistance(r_op - wall, r_op);
                let grout = (r_b / r_op).max(1.0).ln() / (2.0 * PI * lam_g);
                let inner_pipe = self.pipe_resistance(r_ip, r_ip + wall)
                    + 1.0 / (2.0 * PI * (r_ip + wall) * self.film_coefficient);
                ThermalResistances {
                    borehole: outer_pipe + grout,
                    leg_to_leg: inner_pipe,
                }
            }
            ExchangerType::UTube => {
                let r_po = self.outer_pipe_radius();
                let r_pi = self.inner_pipe_radius();
                let s = self.pipe_spacing.value;
                let pipe = self.pipe_resistance(r_pi, r_po);
                let borehole = ((r_b / r_po).ln() + (r_b / s).max(1.0).ln()) / (4.0 * PI * lam_g)
                    + 0.5 * pipe;
                let leg_to_leg = (s / r_po).max(1.0).ln() / (PI * lam_g) + 2.0 * pipe;
                ThermalResistances {
                    borehole,
                    leg_to_leg,
                }
            }
        }
    }

    /// Per-length conductance of the down and up legs to the borehole wall.
    pub fn leg_conductances(&self) -> (f64, f64) {
        let g_b = 1.0 / self.resistances().borehole;
        match (self.exchanger, self.flow) {
            (ExchangerType::Coaxial, FlowConfiguration::CounterFlow) => (g_b, 0.0),
            (ExchangerType::Coaxial, FlowConfiguration::CounterFlowReversed) => (0.0, g_b),
            // two legs in parallel make up the borehole resistance
            _ => (0.5 * g_b, 0.5 * g_b),
        }
    }
}
