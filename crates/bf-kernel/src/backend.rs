//! Backend abstraction and selection.

use bf_mesh::{CylindricalGrid, Field3};
use serde::{Deserialize, Serialize};

use crate::cpu::CpuBackend;
use crate::error::KernelResult;
use crate::update::KernelInputs;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Cpu,
    Gpu,
}

/// Requested backend. `Auto` tries the GPU and falls back silently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendPreference {
    Cpu,
    Gpu,
    #[default]
    Auto,
}

/// One transport implementation. Implementations must produce the same
/// iterate for the same inputs (up to the device's float precision).
pub trait TransportBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Human-readable name, e.g. the adapter.
    fn describe(&self) -> String;

    /// One sweep: every interior node of `next` is computed from `current`,
    /// every other node is copied. Returns the max |ΔT| over the sweep.
    ///
    /// Synchronous: `next` is fully written when this returns.
    fn sweep(
        &mut self,
        current: &Field3,
        next: &mut Field3,
        inputs: &KernelInputs<'_>,
        dt: f64,
    ) -> KernelResult<f64>;
}

/// Outcome of probing for a compute device.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceReport {
    pub available: bool,
    pub name: Option<String>,
    /// "gpu" or "cpu" class of the adapter found
    pub class: Option<String>,
    pub note: Option<String>,
}

/// Pick a backend for `grid`. Never fails: any GPU problem is logged and
/// the CPU backend is returned instead.
pub fn select_backend(
    preference: BackendPreference,
    grid: &CylindricalGrid,
) -> Box<dyn TransportBackend> {
    match preference {
        BackendPreference::Cpu => Box::new(CpuBackend::new(grid)),
        BackendPreference::Gpu | BackendPreference::Auto => match try_gpu(grid) {
            Ok(backend) => backend,
            Err(err) => {
                if preference == BackendPreference::Gpu {
                    tracing::warn!(error = %err, "GPU backend requested but unavailable, using CPU");
                } else {
                    tracing::info!(error = %err, "no GPU backend, using CPU");
                }
                Box::new(CpuBackend::new(grid))
            }
        },
    }
}

#[cfg(feature = "gpu")]
fn try_gpu(grid: &CylindricalGrid) -> KernelResult<Box<dyn TransportBackend>> {
    let ctx = crate::gpu::GpuContext::discover()?;
    let backend = crate::gpu::GpuBackend::new(ctx, grid)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "gpu"))]
fn try_gpu(_grid: &CylindricalGrid) -> KernelResult<Box<dyn TransportBackend>> {
    Err(crate::error::KernelError::DeviceUnavailable {
        reason: "built without the `gpu` feature".to_string(),
    })
}

/// Report what device discovery would find.
pub fn probe_device() -> DeviceReport {
    #[cfg(feature = "gpu")]
    {
        match crate::gpu::GpuContext::discover() {
            Ok(ctx) => DeviceReport {
                available: true,
                name: Some(ctx.adapter_name().to_string()),
                class: Some(ctx.class().as_str().to_string()),
                note: None,
            },
            Err(err) => DeviceReport {
                available: false,
                name: None,
                class: None,
                note: Some(err.to_string()),
            },
        }
    }
    #[cfg(not(feature = "gpu"))]
    {
        DeviceReport {
            available: false,
            name: None,
            class: None,
            note: Some("built without the `gpu` feature".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_mesh::GridSpec;

    #[test]
    fn cpu_preference_gives_cpu() {
        let grid = CylindricalGrid::generate(&GridSpec {
            nr: 4,
            ntheta: 2,
            nz: 4,
            ..GridSpec::default()
        })
        .unwrap();
        let backend = select_backend(BackendPreference::Cpu, &grid);
        assert_eq!(backend.kind(), BackendKind::Cpu);
    }

    #[test]
    fn auto_always_yields_a_backend() {
        let grid = CylindricalGrid::generate(&GridSpec {
            nr: 4,
            ntheta: 2,
            nz: 4,
            ..GridSpec::default()
        })
        .unwrap();
        let backend = select_backend(BackendPreference::Auto, &grid);
        assert!(!backend.describe().is_empty());
    }
}
