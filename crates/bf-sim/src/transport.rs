//! Drives one transport backend through a macro step.
//!
//! The macro interval is covered by explicit sub-steps no larger than the
//! stable step. Boundaries are re-applied before every sweep. The step is
//! converged when the change rate, scaled to the macro interval, falls
//! below the tolerance or when the interval is covered; running out of
//! iterations first accepts the step with a flag. A device backend that
//! fails mid-run is replaced by the CPU backend and the sub-step retried.

use bf_kernel::{
    BackendKind, CpuBackend, KernelInputs, StencilGeometry, TransportBackend, VelocityField,
};
use bf_mesh::{CylindricalGrid, DomainBoundaries, Field3, MaterialField, WallCondition, apply_boundaries};

use crate::error::{SimError, SimResult};

#[derive(Clone, Debug, PartialEq)]
pub struct TransportOutcome {
    pub temperature: Field3,
    pub iterations: u32,
    /// Largest nodal change of the last sweep, K
    pub max_change: f64,
    /// False when the iteration cap ended the step
    pub converged: bool,
}

pub struct TransportSolver {
    backend: Box<dyn TransportBackend>,
    grid: CylindricalGrid,
    geometry: StencilGeometry,
    diffusivity: Vec<f64>,
    advection: Option<(VelocityField, Vec<f64>)>,
    revision: u64,
    stable_dt: f64,
    scratch: Field3,
}

impl TransportSolver {
    pub fn new(backend: Box<dyn TransportBackend>, grid: &CylindricalGrid, materials: &MaterialField) -> SimResult<Self> {
        let dims = grid.dims();
        if materials.dims() != dims {
            return Err(SimError::InvalidArg {
                what: "material field does not match the grid",
            });
        }
        let mut solver = Self {
            backend,
            grid: grid.clone(),
            geometry: StencilGeometry::new(grid),
            diffusivity: materials.diffusivity(),
            advection: None,
            revision: 0,
            stable_dt: f64::INFINITY,
            scratch: Field3::zeros(dims),
        };
        solver.refresh_stability();
        Ok(solver)
    }

    pub fn backend_name(&self) -> String {
        self.backend.describe()
    }

    pub fn backend(&self) -> &dyn TransportBackend {
        self.backend.as_ref()
    }

    /// Largest sub-step for the current coefficients, s.
    pub fn stable_dt(&self) -> f64 {
        self.stable_dt
    }

    /// Replace the groundwater velocity and dispersion (`None` disables
    /// advection). Bumps the coefficient revision.
    pub fn set_advection(&mut self, advection: Option<(VelocityField, Vec<f64>)>) {
        self.advection = advection;
        self.refresh_stability();
    }

    fn inputs(&self) -> KernelInputs<'_> {
        KernelInputs {
            diffusivity: &self.diffusivity,
            velocity: self.advection.as_ref().map(|(v, _)| v),
            dispersion: self.advection.as_ref().map(|(_, d)| d.as_slice()),
            revision: self.revision,
        }
    }

    fn refresh_stability(&mut self) {
        self.revision += 1;
        self.stable_dt = self.geometry.stable_time_step(&self.inputs());
    }

    /// Integrate `start` over `dt_macro` seconds.
    pub fn advance(
        &mut self,
        start: &Field3,
        bounds: &DomainBoundaries,
        wall: &[WallCondition],
        surface_override: Option<f64>,
        dt_macro: f64,
        tolerance: f64,
        max_iterations: u32,
    ) -> SimResult<TransportOutcome> {
        if !(dt_macro > 0.0) {
            return Err(SimError::InvalidArg {
                what: "macro step must be positive",
            });
        }
        let mut current = start.clone();
        apply_boundaries(&mut current, bounds, wall, surface_override)?;

        let mut remaining = dt_macro;
        let mut iterations = 0;
        let mut max_change = 0.0;
        let converged = loop {
            let dt_sub = remaining.min(self.stable_dt);
            let inputs = KernelInputs {
                diffusivity: &self.diffusivity,
                velocity: self.advection.as_ref().map(|(v, _)| v),
                dispersion: self.advection.as_ref().map(|(_, d)| d.as_slice()),
                revision: self.revision,
            };
            max_change = match self.backend.sweep(&current, &mut self.scratch, &inputs, dt_sub) {
                Ok(change) => change,
                Err(err) if self.backend.kind() != BackendKind::Cpu => {
                    tracing::warn!(
                        backend = %self.backend.describe(),
                        error = %err,
                        "transport backend failed, continuing on CPU"
                    );
                    self.backend = Box::new(CpuBackend::new(&self.grid));
                    self.backend
                        .sweep(&current, &mut self.scratch, &inputs, dt_sub)?
                }
                Err(err) => return Err(err.into()),
            };
            std::mem::swap(&mut current, &mut self.scratch);
            apply_boundaries(&mut current, bounds, wall, surface_override)?;
            iterations += 1;
            remaining -= dt_sub;

            if remaining <= dt_macro * 1e-12 || max_change * dt_macro / dt_sub < tolerance {
                break true;
            }
            if iterations >= max_iterations {
                break false;
            }
        };

        if !converged {
            tracing::warn!(
                iterations,
                max_change,
                uncovered_s = remaining,
                "iteration cap reached, step accepted"
            );
        }
        Ok(TransportOutcome {
            temperature: current,
            iterations,
            max_change,
            converged,
        })
    }
}
