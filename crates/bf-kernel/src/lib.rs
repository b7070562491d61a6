//! Finite-difference transport kernel for cylindrical ground models.
//!
//! One sweep updates every interior node from the previous iterate:
//! diffusion over the non-uniform cylindrical Laplacian, optional dispersion
//! through the same operator, optional first-order upwind advection, then the
//! ±5 K step clamp and the [273, 473] K bound. The CPU backend (rayon) and the
//! GPU backend (wgpu, feature `gpu`) implement the same rule and the same
//! slot-based max-change reduction.

pub mod backend;
pub mod cpu;
pub mod error;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod reduction;
pub mod stencil;
pub mod update;

pub use backend::{BackendKind, BackendPreference, DeviceReport, TransportBackend, probe_device, select_backend};
pub use cpu::CpuBackend;
pub use error::{KernelError, KernelResult};
pub use reduction::{ChangeAccumulator, REDUCTION_SLOTS, max_change};
pub use stencil::StencilGeometry;
pub use update::{KernelInputs, MAX_STEP_CHANGE_K, T_MAX_K, T_MIN_K, VelocityField, update_node};
