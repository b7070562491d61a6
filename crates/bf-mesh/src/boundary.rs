//! Domain boundary policies.
//!
//! Transport only updates interior nodes; everything on the centerline shell,
//! the outer shell and the top/bottom levels is written here between sweeps.

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::field::Field3;

/// Treatment of one domain face.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoundaryPolicy {
    /// Fixed value, K
    Dirichlet { value_k: f64 },
    /// Zero gradient: copy from the interior neighbour
    Adiabatic,
    /// Prescribed heat flux. Accepted by configuration but not applied; see
    /// [`DomainBoundaries::validate`].
    FluxSpecified { flux_w_m2: f64 },
}

/// Inner-shell condition at one level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WallCondition {
    /// Borehole fluid temperature imposed on the ground-side node
    Fixed(f64),
    /// Below the exchanger: zero gradient
    Insulated,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainBoundaries {
    pub outer: BoundaryPolicy,
    pub surface: BoundaryPolicy,
    pub bottom: BoundaryPolicy,
}

impl Default for DomainBoundaries {
    fn default() -> Self {
        Self {
            outer: BoundaryPolicy::Adiabatic,
            surface: BoundaryPolicy::Adiabatic,
            bottom: BoundaryPolicy::Adiabatic,
        }
    }
}

impl DomainBoundaries {
    /// Flux conditions have no confirmed numerical treatment and are refused
    /// up front rather than approximated.
    pub fn validate(&self) -> MeshResult<()> {
        for (face, policy) in [
            ("outer", self.outer),
            ("surface", self.surface),
            ("bottom", self.bottom),
        ] {
            match policy {
                BoundaryPolicy::FluxSpecified { .. } => {
                    return Err(MeshError::Unsupported {
                        what: format!("flux-specified {face} boundary"),
                    });
                }
                BoundaryPolicy::Dirichlet { value_k } if !value_k.is_finite() => {
                    return Err(MeshError::Core(bf_core::BfError::NonFinite {
                        what: "boundary value",
                        value: value_k,
                    }));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Write every boundary node of `field`.
///
/// `wall` holds one condition per vertical level. `surface_override` replaces
/// the value of a Dirichlet surface (ambient temperature from a load provider).
/// Faces are written inner, outer, then surface and bottom, so the axial
/// faces own the corner nodes.
pub fn apply_boundaries(
    field: &mut Field3,
    bounds: &DomainBoundaries,
    wall: &[WallCondition],
    surface_override: Option<f64>,
) -> MeshResult<()> {
    let dims = field.dims();
    if wall.len() != dims.nz {
        return Err(MeshError::LengthMismatch {
            what: "wall conditions",
            expected: dims.nz,
            got: wall.len(),
        });
    }

    for (k, cond) in wall.iter().enumerate() {
        for j in 0..dims.ntheta {
            let v = match *cond {
                WallCondition::Fixed(t) => t,
                WallCondition::Insulated => field.get(1, j, k),
            };
            field.set(0, j, k, v);
        }
    }

    let last_r = dims.nr - 1;
    for j in 0..dims.ntheta {
        for k in 0..dims.nz {
            let v = face_value(bounds.outer, field.get(last_r - 1, j, k), None)?;
            field.set(last_r, j, k, v);
        }
    }

    let last_z = dims.nz - 1;
    for i in 0..dims.nr {
        for j in 0..dims.ntheta {
            let top = face_value(bounds.surface, field.get(i, j, 1), surface_override)?;
            field.set(i, j, 0, top);
            let bottom = face_value(bounds.bottom, field.get(i, j, last_z - 1), None)?;
            field.set(i, j, last_z, bottom);
        }
    }
    Ok(())
}

fn face_value(policy: BoundaryPolicy, neighbour: f64, value_override: Option<f64>) -> MeshResult<f64> {
    match policy {
        BoundaryPolicy::Dirichlet { value_k } => Ok(value_override.unwrap_or(value_k)),
        BoundaryPolicy::Adiabatic => Ok(neighbour),
        BoundaryPolicy::FluxSpecified { .. } => Err(MeshError::Unsupported {
            what: "flux-specified boundary".to_string(),
        }),
    }
}
