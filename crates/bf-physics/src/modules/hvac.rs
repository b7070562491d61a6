//! Heat-pump performance from the step's extraction rate. Diagnostic only.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::module::{Diagnostics, ModuleKind, PhysicsModule, StepContext};
use crate::state::{FieldKind, SimulationState, StateUpdate};

/// Smallest lift used in the COP formula, K.
const MIN_LIFT_K: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HvacParams {
    /// Fraction of the Carnot COP achieved
    pub carnot_efficiency: f64,
    /// Heating curve: supply temperature at the design outdoor temperature, K
    pub supply_design_k: f64,
    pub outdoor_design_k: f64,
    /// Heating curve: supply temperature at the heating limit, K
    pub supply_min_k: f64,
    pub outdoor_limit_k: f64,
    /// Used when no ambient temperature is supplied, K
    pub default_outdoor_k: f64,
    /// W
    pub design_capacity_w: f64,
}

impl Default for HvacParams {
    fn default() -> Self {
        Self {
            carnot_efficiency: 0.5,
            supply_design_k: 308.15,
            outdoor_design_k: 263.15,
            supply_min_k: 298.15,
            outdoor_limit_k: 288.15,
            default_outdoor_k: 283.15,
            design_capacity_w: 10_000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HvacOperatingPoint {
    pub outdoor_k: f64,
    pub supply_k: f64,
    pub cop: f64,
    pub heating_output_w: f64,
    pub compressor_power_w: f64,
    pub part_load_ratio: f64,
}

#[derive(Clone)]
pub struct EnhancedHvac {
    params: HvacParams,
    last: HvacOperatingPoint,
}

impl EnhancedHvac {
    pub fn new(params: HvacParams) -> PhysicsResult<Self> {
        if !(params.carnot_efficiency > 0.0 && params.carnot_efficiency <= 1.0) {
            return Err(PhysicsError::InvalidArg {
                what: "carnot efficiency must be in (0, 1]",
            });
        }
        if !(params.outdoor_limit_k > params.outdoor_design_k && params.design_capacity_w > 0.0) {
            return Err(PhysicsError::InvalidArg {
                what: "heating curve limit must exceed design outdoor temperature",
            });
        }
        Ok(Self {
            params,
            last: HvacOperatingPoint::default(),
        })
    }

    /// Weather-compensated supply temperature.
    pub fn supply_temperature(&self, outdoor: f64) -> f64 {
        let p = &self.params;
        let w = ((outdoor - p.outdoor_design_k) / (p.outdoor_limit_k - p.outdoor_design_k))
            .clamp(0.0, 1.0);
        p.supply_design_k + (p.supply_min_k - p.supply_design_k) * w
    }

    pub fn operating_point(&self, outdoor: f64, source: f64, extraction_w: f64) -> HvacOperatingPoint {
        let p = &self.params;
        let supply = self.supply_temperature(outdoor);
        let lift = (supply - source).max(MIN_LIFT_K);
        let cop = (p.carnot_efficiency * supply / lift).max(1.0 + 1e-6);
        let extraction = extraction_w.max(0.0);
        // ground heat plus compressor work
        let heating = extraction * cop / (cop - 1.0);
        HvacOperatingPoint {
            outdoor_k: outdoor,
            supply_k: supply,
            cop,
            heating_output_w: heating,
            compressor_power_w: heating / cop,
            part_load_ratio: (heating / p.design_capacity_w).clamp(0.0, 1.0),
        }
    }

    pub fn last_operating_point(&self) -> HvacOperatingPoint {
        self.last
    }
}

impl PhysicsModule for EnhancedHvac {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Hvac
    }

    fn reads(&self) -> &'static [FieldKind] {
        &[]
    }

    fn writes(&self) -> &'static [FieldKind] {
        &[]
    }

    fn update_state(
        &mut self,
        _state: &SimulationState,
        ctx: &StepContext<'_>,
    ) -> PhysicsResult<StateUpdate> {
        let outdoor = ctx
            .boundary
            .ambient_temperature
            .unwrap_or(self.params.default_outdoor_k);
        self.last = self.operating_point(outdoor, ctx.outlet_temperature, ctx.heat_rate);
        Ok(StateUpdate::new())
    }

    fn diagnostics(&self) -> Diagnostics {
        vec![
            ("cop", self.last.cop),
            ("supply_temperature_k", self.last.supply_k),
            ("heating_output_w", self.last.heating_output_w),
            ("compressor_power_w", self.last.compressor_power_w),
            ("part_load_ratio", self.last.part_load_ratio),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heating_curve_is_clamped() {
        let h = EnhancedHvac::new(HvacParams::default()).unwrap();
        assert_eq!(h.supply_temperature(250.0), 308.15);
        assert_eq!(h.supply_temperature(300.0), 298.15);
        assert!((h.supply_temperature(275.65) - 303.15).abs() < 1e-9);
    }

    #[test]
    fn energy_balance_holds() {
        let h = EnhancedHvac::new(HvacParams::default()).unwrap();
        let op = h.operating_point(273.15, 280.0, 3000.0);
        assert!(op.cop > 1.0);
        assert!((op.heating_output_w - op.compressor_power_w - 3000.0).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&op.part_load_ratio));
    }

    #[test]
    fn warmer_source_improves_cop() {
        let h = EnhancedHvac::new(HvacParams::default()).unwrap();
        let cold = h.operating_point(273.15, 275.0, 1000.0).cop;
        let warm = h.operating_point(273.15, 285.0, 1000.0).cop;
        assert!(warm > cold);
    }
}
