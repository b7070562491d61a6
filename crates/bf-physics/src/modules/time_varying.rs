//! Time-varying boundary loads: seasonal ambient temperature, an inlet
//! temperature schedule and an on/off duty cycle on the circulation pump.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryInputs;
use crate::error::{PhysicsError, PhysicsResult};
use crate::module::{Diagnostics, ModuleKind, PhysicsModule, StepContext};
use crate::state::{FieldKind, SimulationState, StateUpdate};

/// `mean + amplitude·cos(2π·(t − t_peak)/period)`, temperatures in K.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalAmbient {
    pub mean_k: f64,
    pub amplitude_k: f64,
    /// Day of the warmest ambient temperature
    pub peak_day: f64,
    pub period_days: f64,
}

impl Default for SeasonalAmbient {
    fn default() -> Self {
        Self {
            mean_k: 283.15,
            amplitude_k: 10.0,
            peak_day: 200.0,
            period_days: 365.0,
        }
    }
}

impl SeasonalAmbient {
    pub fn at(&self, time_s: f64) -> f64 {
        let day = time_s / 86_400.0;
        self.mean_k + self.amplitude_k * (TAU * (day - self.peak_day) / self.period_days).cos()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DutyCycle {
    pub on_hours: f64,
    pub off_hours: f64,
}

impl DutyCycle {
    pub fn is_on(&self, time_s: f64) -> bool {
        let period = (self.on_hours + self.off_hours) * 3600.0;
        if period <= 0.0 {
            return true;
        }
        time_s.rem_euclid(period) < self.on_hours * 3600.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeVaryingParams {
    pub seasonal: Option<SeasonalAmbient>,
    /// (time s, inlet K), linear in between, held outside
    pub inlet_schedule: Vec<(f64, f64)>,
    pub duty_cycle: Option<DutyCycle>,
}

#[derive(Clone)]
pub struct TimeVaryingBoundary {
    params: TimeVaryingParams,
    applied: BoundaryInputs,
    pump_on: bool,
    energy_j: f64,
}

impl TimeVaryingBoundary {
    pub fn new(params: TimeVaryingParams) -> PhysicsResult<Self> {
        if params.inlet_schedule.windows(2).any(|w| !(w[1].0 > w[0].0)) {
            return Err(PhysicsError::InvalidArg {
                what: "inlet schedule times must be strictly increasing",
            });
        }
        if let Some(d) = params.duty_cycle {
            if !(d.on_hours >= 0.0 && d.off_hours >= 0.0) {
                return Err(PhysicsError::InvalidArg {
                    what: "duty cycle hours must be non-negative",
                });
            }
        }
        if let Some(s) = params.seasonal {
            if !(s.period_days > 0.0) {
                return Err(PhysicsError::InvalidArg {
                    what: "seasonal period must be positive",
                });
            }
        }
        Ok(Self {
            params,
            applied: BoundaryInputs {
                inlet_temperature: 0.0,
                mass_flow: 0.0,
                specific_heat: 0.0,
                ambient_temperature: None,
            },
            pump_on: true,
            energy_j: 0.0,
        })
    }

    /// Extracted energy over the run so far, J.
    pub fn cumulative_energy(&self) -> f64 {
        self.energy_j
    }

    fn scheduled_inlet(&self, time_s: f64) -> Option<f64> {
        let s = &self.params.inlet_schedule;
        let (first, last) = (s.first()?, s.last()?);
        if time_s <= first.0 {
            return Some(first.1);
        }
        if time_s >= last.0 {
            return Some(last.1);
        }
        let hi = s.partition_point(|p| p.0 <= time_s);
        let (a, b) = (s[hi - 1], s[hi]);
        Some(bf_core::lerp(a.1, b.1, (time_s - a.0) / (b.0 - a.0)))
    }
}

impl PhysicsModule for TimeVaryingBoundary {
    fn kind(&self) -> ModuleKind {
        ModuleKind::TimeVaryingBc
    }

    fn reads(&self) -> &'static [FieldKind] {
        &[]
    }

    fn writes(&self) -> &'static [FieldKind] {
        &[]
    }

    fn adjust_boundary(&mut self, time: f64, inputs: &mut BoundaryInputs) {
        if let Some(seasonal) = &self.params.seasonal {
            inputs.ambient_temperature = Some(seasonal.at(time));
        }
        if let Some(inlet) = self.scheduled_inlet(time) {
            inputs.inlet_temperature = inlet;
        }
        self.pump_on = self.params.duty_cycle.is_none_or(|d| d.is_on(time));
        if !self.pump_on {
            inputs.mass_flow = 0.0;
        }
        self.applied = *inputs;
    }

    fn update_state(
        &mut self,
        _state: &SimulationState,
        ctx: &StepContext<'_>,
    ) -> PhysicsResult<StateUpdate> {
        self.energy_j += ctx.heat_rate * ctx.dt;
        Ok(StateUpdate::new())
    }

    fn diagnostics(&self) -> Diagnostics {
        vec![
            ("inlet_temperature_k", self.applied.inlet_temperature),
            (
                "ambient_temperature_k",
                self.applied.ambient_temperature.unwrap_or(f64::NAN),
            ),
            ("pump_on", if self.pump_on { 1.0 } else { 0.0 }),
            ("cumulative_energy_j", self.energy_j),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BoundaryInputs {
        BoundaryInputs {
            inlet_temperature: 278.0,
            mass_flow: 0.3,
            specific_heat: 4186.0,
            ambient_temperature: None,
        }
    }

    #[test]
    fn seasonal_peak_and_trough() {
        let s = SeasonalAmbient::default();
        assert!((s.at(200.0 * 86_400.0) - 293.15).abs() < 1e-9);
        assert!((s.at((200.0 + 182.5) * 86_400.0) - 273.15).abs() < 1e-9);
    }

    #[test]
    fn schedule_interpolates_and_holds() {
        let mut m = TimeVaryingBoundary::new(TimeVaryingParams {
            inlet_schedule: vec![(0.0, 278.0), (3600.0, 280.0)],
            ..TimeVaryingParams::default()
        })
        .unwrap();
        let mut b = base();
        m.adjust_boundary(1800.0, &mut b);
        assert!((b.inlet_temperature - 279.0).abs() < 1e-12);
        let mut b = base();
        m.adjust_boundary(1e6, &mut b);
        assert_eq!(b.inlet_temperature, 280.0);
        assert_eq!(b.ambient_temperature, None);
    }

    #[test]
    fn duty_cycle_stops_the_pump() {
        let mut m = TimeVaryingBoundary::new(TimeVaryingParams {
            duty_cycle: Some(DutyCycle {
                on_hours: 16.0,
                off_hours: 8.0,
            }),
            ..TimeVaryingParams::default()
        })
        .unwrap();
        let mut b = base();
        m.adjust_boundary(10.0 * 3600.0, &mut b);
        assert_eq!(b.mass_flow, 0.3);
        let mut b = base();
        m.adjust_boundary(20.0 * 3600.0, &mut b);
        assert_eq!(b.mass_flow, 0.0);
        assert_eq!(m.diagnostics()[2], ("pump_on", 0.0));
    }

    #[test]
    fn rejects_unsorted_schedule() {
        assert!(TimeVaryingBoundary::new(TimeVaryingParams {
            inlet_schedule: vec![(10.0, 278.0), (5.0, 280.0)],
            ..TimeVaryingParams::default()
        })
        .is_err());
    }
}
