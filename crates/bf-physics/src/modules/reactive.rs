//! Mineral precipitation and dissolution.
//!
//! For each mineral whose constituent species are all present in the fluid
//! composition, the saturation ratio `Ω = IAP/Ksp(T)` (van't Hoff
//! temperature dependence) drives a volume-fraction rate `k·(Ω − 1)·Vm`.
//! Dissolution never removes more mineral than has formed. Porosity loses
//! what the minerals gain; permeability follows Kozeny–Carman.

use bf_core::constants::R_GAS;
use bf_mesh::MaterialField;
use serde::{Deserialize, Serialize};

use super::{check_finite, to_field};
use crate::error::{PhysicsError, PhysicsResult};
use crate::module::{Diagnostics, ModuleKind, PhysicsModule, StepContext};
use crate::state::{FieldKind, SimulationState, StateUpdate};

const NAME: &str = "reactive_transport";
const MIN_POROSITY: f64 = 1e-4;
const T_REF_K: f64 = 298.15;

/// One entry of the fluid composition table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoluteConcentration {
    pub species: String,
    pub mol_per_l: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mineral {
    Calcite,
    Anhydrite,
    AmorphousSilica,
}

impl Mineral {
    pub const ALL: [Mineral; 3] = [Mineral::Calcite, Mineral::Anhydrite, Mineral::AmorphousSilica];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mineral::Calcite => "calcite",
            Mineral::Anhydrite => "anhydrite",
            Mineral::AmorphousSilica => "amorphous_silica",
        }
    }

    fn species(&self) -> &'static [&'static str] {
        match self {
            Mineral::Calcite => &["ca", "co3"],
            Mineral::Anhydrite => &["ca", "so4"],
            Mineral::AmorphousSilica => &["sio2"],
        }
    }

    /// log10 Ksp at 25 °C
    fn log_ksp_ref(&self) -> f64 {
        match self {
            Mineral::Calcite => -8.48,
            Mineral::Anhydrite => -4.36,
            Mineral::AmorphousSilica => -2.71,
        }
    }

    /// Dissolution enthalpy, J/mol. Negative means retrograde solubility.
    fn enthalpy(&self) -> f64 {
        match self {
            Mineral::Calcite => -10_600.0,
            Mineral::Anhydrite => -18_000.0,
            Mineral::AmorphousSilica => 14_000.0,
        }
    }

    /// Molar volume, m³/mol
    fn molar_volume(&self) -> f64 {
        match self {
            Mineral::Calcite => 36.93e-6,
            Mineral::Anhydrite => 45.94e-6,
            Mineral::AmorphousSilica => 29.0e-6,
        }
    }

    /// Solubility product at `temperature` (K), van't Hoff.
    pub fn ksp(&self, temperature: f64) -> f64 {
        let ln_k = self.log_ksp_ref() * std::f64::consts::LN_10
            - self.enthalpy() / R_GAS * (1.0 / temperature - 1.0 / T_REF_K);
        ln_k.exp()
    }
}

/// Normalise common spellings to the keys used in [`Mineral::species`].
fn species_key(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "ca" | "ca2+" | "ca++" | "calcium" => Some("ca"),
        "co3" | "co3--" | "co3 2-" | "co32-" | "hco3" | "hco3-" | "carbonate" | "bicarbonate" => {
            Some("co3")
        }
        "so4" | "so4--" | "so42-" | "sulfate" | "sulphate" => Some("so4"),
        "sio2" | "sio2(aq)" | "silica" => Some("sio2"),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveParams {
    /// mol/(m³·s) at Ω = 2
    pub rate_constant: f64,
}

impl Default for ReactiveParams {
    fn default() -> Self {
        Self {
            rate_constant: 1e-6,
        }
    }
}

#[derive(Clone)]
struct ActiveMineral {
    mineral: Mineral,
    ion_activity: f64,
}

#[derive(Clone)]
pub struct ReactiveTransport {
    params: ReactiveParams,
    active: Vec<ActiveMineral>,
    initial_porosity: Vec<f64>,
    initial_permeability: Vec<f64>,
    net_precipitated: f64,
    max_saturation_ratio: f64,
}

impl ReactiveTransport {
    pub fn new(
        materials: &MaterialField,
        composition: &[SoluteConcentration],
        params: ReactiveParams,
    ) -> PhysicsResult<Self> {
        if !(params.rate_constant.is_finite() && params.rate_constant >= 0.0) {
            return Err(PhysicsError::InvalidArg {
                what: "rate constant must be finite and non-negative",
            });
        }
        let mut totals: Vec<(&'static str, f64)> = Vec::new();
        for entry in composition {
            if !(entry.mol_per_l.is_finite() && entry.mol_per_l >= 0.0) {
                return Err(PhysicsError::InvalidArg {
                    what: "solute concentrations must be finite and non-negative",
                });
            }
            match species_key(&entry.species) {
                Some(key) => match totals.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, c)) => *c += entry.mol_per_l,
                    None => totals.push((key, entry.mol_per_l)),
                },
                None => tracing::warn!(species = %entry.species, "unknown solute ignored"),
            }
        }
        let active = Mineral::ALL
            .iter()
            .filter_map(|&mineral| {
                let mut iap = 1.0;
                for s in mineral.species() {
                    let c = totals.iter().find(|(k, _)| k == s)?.1;
                    if c <= 0.0 {
                        return None;
                    }
                    iap *= c;
                }
                Some(ActiveMineral {
                    mineral,
                    ion_activity: iap,
                })
            })
            .collect();
        Ok(Self {
            params,
            active,
            initial_porosity: materials.porosity(),
            initial_permeability: materials.permeability(),
            net_precipitated: 0.0,
            max_saturation_ratio: 0.0,
        })
    }

    pub fn active_minerals(&self) -> Vec<Mineral> {
        self.active.iter().map(|a| a.mineral).collect()
    }
}

/// Kozeny–Carman permeability for a porosity change from `phi0` to `phi`.
pub fn kozeny_carman(k0: f64, phi0: f64, phi: f64) -> f64 {
    k0 * (phi / phi0).powi(3) * ((1.0 - phi0) / (1.0 - phi)).powi(2)
}

impl PhysicsModule for ReactiveTransport {
    fn kind(&self) -> ModuleKind {
        ModuleKind::ReactiveTransport
    }

    fn reads(&self) -> &'static [FieldKind] {
        &[
            FieldKind::Temperature,
            FieldKind::MineralFraction,
            FieldKind::Porosity,
        ]
    }

    fn writes(&self) -> &'static [FieldKind] {
        &[
            FieldKind::MineralFraction,
            FieldKind::Precipitation,
            FieldKind::Porosity,
            FieldKind::Permeability,
        ]
    }

    fn update_state(
        &mut self,
        state: &SimulationState,
        ctx: &StepContext<'_>,
    ) -> PhysicsResult<StateUpdate> {
        if self.active.is_empty() {
            return Ok(StateUpdate::new());
        }
        let n = state.dims().len();
        if self.initial_porosity.len() != n {
            return Err(PhysicsError::ShapeMismatch {
                what: "reactive porosity",
                expected: n,
                got: self.initial_porosity.len(),
            });
        }

        let temperature = state.temperature.as_slice();
        let mut mineral = state.mineral_fraction.as_slice().to_vec();
        let mut porosity = state.porosity.as_slice().to_vec();
        let mut precipitation = vec![0.0; n];
        let mut permeability = vec![0.0; n];
        let mut max_omega = 0.0_f64;

        for idx in 0..n {
            let mut delta = 0.0;
            for a in &self.active {
                let omega = a.ion_activity / a.mineral.ksp(temperature[idx]);
                max_omega = max_omega.max(omega);
                delta += self.params.rate_constant * (omega - 1.0) * a.mineral.molar_volume() * ctx.dt;
            }
            // cannot dissolve what is not there, cannot fill more than the pores
            let headroom = (porosity[idx] - MIN_POROSITY).max(0.0);
            let delta = delta.clamp(-mineral[idx], headroom);
            mineral[idx] += delta;
            porosity[idx] -= delta;
            precipitation[idx] = delta;
            let phi0 = self.initial_porosity[idx];
            permeability[idx] = if phi0 > 0.0 && porosity[idx] < 1.0 {
                kozeny_carman(self.initial_permeability[idx], phi0, porosity[idx])
            } else {
                self.initial_permeability[idx]
            };
        }
        check_finite(NAME, "mineral fraction", &mineral)?;
        check_finite(NAME, "permeability", &permeability)?;

        self.net_precipitated = precipitation.iter().sum();
        self.max_saturation_ratio = max_omega;

        let like = &state.mineral_fraction;
        Ok(StateUpdate::new()
            .with(FieldKind::MineralFraction, to_field(like, mineral))
            .with(FieldKind::Precipitation, to_field(like, precipitation))
            .with(FieldKind::Porosity, to_field(like, porosity))
            .with(FieldKind::Permeability, to_field(like, permeability)))
    }

    fn diagnostics(&self) -> Diagnostics {
        vec![
            ("net_precipitated_fraction", self.net_precipitated),
            ("max_saturation_ratio", self.max_saturation_ratio),
            ("active_minerals", self.active.len() as f64),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryInputs;
    use bf_mesh::{CylindricalGrid, Field3, GridSpec, MaterialProperties};

    fn setup() -> (CylindricalGrid, MaterialField, SimulationState) {
        let grid = CylindricalGrid::generate(&GridSpec {
            nr: 4,
            ntheta: 2,
            nz: 4,
            ..GridSpec::default()
        })
        .unwrap();
        let d = grid.dims();
        let materials = MaterialField::uniform(d, MaterialProperties::default());
        let state = SimulationState::initial(&grid, Field3::filled(d, 330.0), &materials).unwrap();
        (grid, materials, state)
    }

    fn ctx<'a>(grid: &'a CylindricalGrid, previous: &'a SimulationState) -> StepContext<'a> {
        StepContext {
            step: 1,
            time: 86_400.0,
            dt: 86_400.0,
            grid,
            boundary: BoundaryInputs {
                inlet_temperature: 330.0,
                mass_flow: 0.3,
                specific_heat: 4186.0,
                ambient_temperature: None,
            },
            heat_rate: 0.0,
            outlet_temperature: 330.0,
            previous,
        }
    }

    fn solute(species: &str, mol_per_l: f64) -> SoluteConcentration {
        SoluteConcentration {
            species: species.to_string(),
            mol_per_l,
        }
    }

    #[test]
    fn empty_composition_is_a_no_op() {
        let (grid, materials, state) = setup();
        let mut module = ReactiveTransport::new(&materials, &[], ReactiveParams::default()).unwrap();
        assert!(module.active_minerals().is_empty());
        let update = module.update_state(&state, &ctx(&grid, &state)).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn calcite_solubility_is_retrograde() {
        assert!(Mineral::Calcite.ksp(350.0) < Mineral::Calcite.ksp(298.15));
        assert!(Mineral::AmorphousSilica.ksp(350.0) > Mineral::AmorphousSilica.ksp(298.15));
        let k25 = Mineral::Calcite.ksp(298.15);
        assert!((k25.log10() + 8.48).abs() < 1e-9);
    }

    #[test]
    fn supersaturated_calcite_clogs_pores() {
        let (grid, materials, state) = setup();
        let comp = [solute("Ca2+", 2e-3), solute("CO3", 1e-3)];
        let mut module = ReactiveTransport::new(&materials, &comp, ReactiveParams::default()).unwrap();
        assert_eq!(module.active_minerals(), vec![Mineral::Calcite]);
        let update = module.update_state(&state, &ctx(&grid, &state)).unwrap();
        let precip = update.get(FieldKind::Precipitation).unwrap();
        assert!(precip.as_slice().iter().all(|&v| v > 0.0));
        let phi = update.get(FieldKind::Porosity).unwrap().get(1, 0, 1);
        let k = update.get(FieldKind::Permeability).unwrap().get(1, 0, 1);
        assert!(phi < 0.1);
        assert!(k < 1e-13);
    }

    #[test]
    fn undersaturated_fluid_cannot_dissolve_missing_mineral() {
        let (grid, materials, state) = setup();
        let comp = [solute("SiO2", 1e-6)];
        let mut module = ReactiveTransport::new(&materials, &comp, ReactiveParams::default()).unwrap();
        let update = module.update_state(&state, &ctx(&grid, &state)).unwrap();
        assert!(update.get(FieldKind::MineralFraction).unwrap().is_all_zero());
        assert_eq!(update.get(FieldKind::Permeability).unwrap().get(1, 0, 1), 1e-13);
    }

    #[test]
    fn kozeny_carman_is_identity_at_initial_porosity() {
        assert_eq!(kozeny_carman(1e-13, 0.2, 0.2), 1e-13);
        assert!(kozeny_carman(1e-13, 0.2, 0.1) < 1e-13);
    }
}
