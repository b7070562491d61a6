//! Shared field state, replaced wholesale at every commit.

use std::sync::Arc;

use bf_core::constants::{G0_MPS2, P_ATM_PA, WATER_DENSITY};
use bf_mesh::{CylindricalGrid, Field3, GridDims, MaterialField};
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// Shared fields a stage may read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKind {
    Temperature,
    Pressure,
    Saturation,
    MineralFraction,
    Precipitation,
    Porosity,
    Permeability,
    RefinementLevel,
    Stress,
}

impl FieldKind {
    pub const ALL: [FieldKind; 9] = [
        FieldKind::Temperature,
        FieldKind::Pressure,
        FieldKind::Saturation,
        FieldKind::MineralFraction,
        FieldKind::Precipitation,
        FieldKind::Porosity,
        FieldKind::Permeability,
        FieldKind::RefinementLevel,
        FieldKind::Stress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Temperature => "temperature",
            FieldKind::Pressure => "pressure",
            FieldKind::Saturation => "saturation",
            FieldKind::MineralFraction => "mineral_fraction",
            FieldKind::Precipitation => "precipitation",
            FieldKind::Porosity => "porosity",
            FieldKind::Permeability => "permeability",
            FieldKind::RefinementLevel => "refinement_level",
            FieldKind::Stress => "stress",
        }
    }
}

/// Fields written by one stage, committed together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateUpdate {
    fields: Vec<(FieldKind, Field3)>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: FieldKind, field: Field3) -> Self {
        self.set(kind, field);
        self
    }

    /// Replaces an earlier write of the same field.
    pub fn set(&mut self, kind: FieldKind, field: Field3) {
        self.fields.retain(|(k, _)| *k != kind);
        self.fields.push((kind, field));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = FieldKind> + '_ {
        self.fields.iter().map(|(k, _)| *k)
    }

    pub fn get(&self, kind: FieldKind) -> Option<&Field3> {
        self.fields.iter().find(|(k, _)| *k == kind).map(|(_, f)| f)
    }
}

/// Snapshot of every shared field plus run counters.
///
/// Fields sit behind `Arc`, so cloning a state is cheap and a committed
/// snapshot never changes under a reader.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    dims: GridDims,
    pub temperature: Arc<Field3>,
    /// Pa
    pub pressure: Arc<Field3>,
    /// Gas saturation, 0..=1
    pub saturation: Arc<Field3>,
    /// Precipitated mineral volume fraction
    pub mineral_fraction: Arc<Field3>,
    /// Mineral volume fraction change over the last reactive update
    pub precipitation: Arc<Field3>,
    pub porosity: Arc<Field3>,
    /// m²
    pub permeability: Arc<Field3>,
    pub refinement_level: Arc<Field3>,
    /// Pa, compression negative
    pub stress: Arc<Field3>,
    /// s
    pub elapsed: f64,
    pub step: u64,
    /// Kernel iterations over the whole run
    pub iterations: u64,
}

impl SimulationState {
    /// Initial state: given temperature, hydrostatic pressure, dry pores,
    /// no minerals, porosity and permeability from the materials.
    pub fn initial(
        grid: &CylindricalGrid,
        temperature: Field3,
        materials: &MaterialField,
    ) -> PhysicsResult<Self> {
        let dims = grid.dims();
        check_dims("initial temperature", dims, &temperature)?;
        if materials.dims() != dims {
            return Err(PhysicsError::ShapeMismatch {
                what: "materials",
                expected: dims.len(),
                got: materials.dims().len(),
            });
        }

        let mut pressure = Field3::zeros(dims);
        for (idx, p) in pressure.as_mut_slice().iter_mut().enumerate() {
            let (_, _, k) = dims.coords(idx);
            *p = P_ATM_PA + WATER_DENSITY * G0_MPS2 * grid.z()[k];
        }
        let porosity = from_nodes("porosity", dims, materials.porosity())?;
        let permeability = from_nodes("permeability", dims, materials.permeability())?;
        let zeros = Arc::new(Field3::zeros(dims));

        Ok(Self {
            dims,
            temperature: Arc::new(temperature),
            pressure: Arc::new(pressure),
            saturation: zeros.clone(),
            mineral_fraction: zeros.clone(),
            precipitation: zeros.clone(),
            porosity: Arc::new(porosity),
            permeability: Arc::new(permeability),
            refinement_level: zeros.clone(),
            stress: zeros,
            elapsed: 0.0,
            step: 0,
            iterations: 0,
        })
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn field(&self, kind: FieldKind) -> &Arc<Field3> {
        match kind {
            FieldKind::Temperature => &self.temperature,
            FieldKind::Pressure => &self.pressure,
            FieldKind::Saturation => &self.saturation,
            FieldKind::MineralFraction => &self.mineral_fraction,
            FieldKind::Precipitation => &self.precipitation,
            FieldKind::Porosity => &self.porosity,
            FieldKind::Permeability => &self.permeability,
            FieldKind::RefinementLevel => &self.refinement_level,
            FieldKind::Stress => &self.stress,
        }
    }

    fn field_mut(&mut self, kind: FieldKind) -> &mut Arc<Field3> {
        match kind {
            FieldKind::Temperature => &mut self.temperature,
            FieldKind::Pressure => &mut self.pressure,
            FieldKind::Saturation => &mut self.saturation,
            FieldKind::MineralFraction => &mut self.mineral_fraction,
            FieldKind::Precipitation => &mut self.precipitation,
            FieldKind::Porosity => &mut self.porosity,
            FieldKind::Permeability => &mut self.permeability,
            FieldKind::RefinementLevel => &mut self.refinement_level,
            FieldKind::Stress => &mut self.stress,
        }
    }

    /// Copy of this state with `temperature` replaced.
    pub fn with_temperature(&self, temperature: Field3) -> PhysicsResult<Self> {
        check_dims("temperature", self.dims, &temperature)?;
        let mut next = self.clone();
        next.temperature = Arc::new(temperature);
        Ok(next)
    }

    /// New state with every field in `update` replaced. Nothing is applied
    /// unless every written field is in `declared` and has this state's shape.
    pub fn commit(
        &self,
        module: &'static str,
        declared: &[FieldKind],
        update: StateUpdate,
    ) -> PhysicsResult<Self> {
        for (kind, field) in &update.fields {
            if !declared.contains(kind) {
                return Err(PhysicsError::UndeclaredWrite {
                    module,
                    field: *kind,
                });
            }
            check_dims(kind.as_str(), self.dims, field)?;
        }
        let mut next = self.clone();
        for (kind, field) in update.fields {
            *next.field_mut(kind) = Arc::new(field);
        }
        Ok(next)
    }
}

fn from_nodes(what: &'static str, dims: GridDims, values: Vec<f64>) -> PhysicsResult<Field3> {
    let got = values.len();
    Field3::from_vec(dims, values).map_err(|_| PhysicsError::ShapeMismatch {
        what,
        expected: dims.len(),
        got,
    })
}

fn check_dims(what: &'static str, dims: GridDims, field: &Field3) -> PhysicsResult<()> {
    if field.dims() != dims {
        return Err(PhysicsError::ShapeMismatch {
            what,
            expected: dims.len(),
            got: field.dims().len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_mesh::{GridSpec, MaterialProperties};

    fn setup() -> (CylindricalGrid, SimulationState) {
        let grid = CylindricalGrid::generate(&GridSpec {
            nr: 4,
            ntheta: 3,
            nz: 4,
            ..GridSpec::default()
        })
        .unwrap();
        let d = grid.dims();
        let materials = MaterialField::uniform(d, MaterialProperties::default());
        let state = SimulationState::initial(&grid, Field3::filled(d, 283.15), &materials).unwrap();
        (grid, state)
    }

    #[test]
    fn initial_pressure_is_hydrostatic() {
        let (grid, state) = setup();
        let bottom = grid.dims().nz - 1;
        assert_eq!(state.pressure.get(0, 0, 0), P_ATM_PA);
        assert!(state.pressure.get(0, 0, bottom) > 1e6);
        assert!(state.precipitation.is_all_zero());
        assert_eq!(state.porosity.get(1, 1, 1), 0.1);
    }

    #[test]
    fn commit_replaces_declared_fields_only() {
        let (_, state) = setup();
        let d = state.dims();
        let update = StateUpdate::new().with(FieldKind::Pressure, Field3::filled(d, 5.0));
        let next = state
            .commit("test", &[FieldKind::Pressure], update)
            .unwrap();
        assert_eq!(next.pressure.get(1, 1, 1), 5.0);
        assert!(Arc::ptr_eq(&next.temperature, &state.temperature));
        assert_ne!(state.pressure.get(1, 1, 1), 5.0);
    }

    #[test]
    fn undeclared_write_is_rejected_atomically() {
        let (_, state) = setup();
        let d = state.dims();
        let update = StateUpdate::new()
            .with(FieldKind::Pressure, Field3::filled(d, 5.0))
            .with(FieldKind::Temperature, Field3::filled(d, 300.0));
        let err = state
            .commit("test", &[FieldKind::Pressure], update)
            .unwrap_err();
        assert_eq!(
            err,
            PhysicsError::UndeclaredWrite {
                module: "test",
                field: FieldKind::Temperature
            }
        );
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let (_, state) = setup();
        let other = GridDims::new(3, 1, 3).unwrap();
        let update = StateUpdate::new().with(FieldKind::Stress, Field3::zeros(other));
        assert!(matches!(
            state.commit("test", &[FieldKind::Stress], update),
            Err(PhysicsError::ShapeMismatch { .. })
        ));
    }
}
