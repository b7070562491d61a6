//! Structured cylindrical mesh for borehole heat transport.
//!
//! Provides:
//! - `GridDims` and the one row-major node index shared by every backend
//! - `CylindricalGrid` with stretched radial/vertical spacing and a periodic angle
//! - `Field3` dense nodal arrays
//! - clamped per-node ground materials
//! - domain boundary policies and their application

pub mod boundary;
pub mod dims;
pub mod error;
pub mod field;
pub mod grid;
pub mod material;

pub use boundary::{BoundaryPolicy, DomainBoundaries, WallCondition, apply_boundaries};
pub use dims::{GridDims, WGSL_NODE_INDEX};
pub use error::{MeshError, MeshResult};
pub use field::Field3;
pub use grid::{CylindricalGrid, GridSpec};
pub use material::{GroundLayer, MaterialField, MaterialProperties};
