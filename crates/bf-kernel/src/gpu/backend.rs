//! Device-resident transport sweep.
//!
//! Buffers, pipelines and bind groups are created once per mesh. A sweep
//! uploads the temperature (and the node coefficients when their revision
//! changed), zeroes the slot accumulator, runs the transport and reduction
//! kernels, and blocks until the new field and the max change are back on
//! the host.

use std::sync::mpsc;

use bf_core::timing::{Timer, kernel_timing};
use bf_mesh::{CylindricalGrid, Field3, GridDims};
use wgpu::util::DeviceExt;

use super::shader::{REDUCE_SHADER, transport_shader};
use super::GpuContext;
use crate::backend::{BackendKind, TransportBackend};
use crate::cpu::check_shapes;
use crate::error::{KernelError, KernelResult};
use crate::reduction::REDUCTION_SLOTS;
use crate::stencil::StencilGeometry;
use crate::update::{KernelInputs, MAX_STEP_CHANGE_K, T_MAX_K, T_MIN_K};

const WORKGROUP: u32 = 64;
const MAX_GROUPS_PER_DIM: u32 = 65_535;
const FLAG_ADVECTION: u32 = 1;
const FLAG_DISPERSION: u32 = 2;

/// Must match `struct Params` in the transport shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct TransportParams {
    nr: u32,
    ntheta: u32,
    nz: u32,
    interior: u32,
    flags: u32,
    slot_count: u32,
    _pad0: u32,
    _pad1: u32,
    dt: f32,
    t_min: f32,
    t_max: f32,
    max_delta: f32,
}

/// Which side holds the authoritative temperature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Authority {
    Host,
    Device,
}

/// Hands authority back to the host once a download has finished, whether
/// or not it succeeded. On failure the host copy is still the caller's
/// `current` field.
fn settle<T>(authority: &mut Authority, downloaded: KernelResult<T>) -> KernelResult<T> {
    *authority = Authority::Host;
    downloaded
}

/// Every buffer the sweep touches. Dropping this releases device memory
/// immediately, including when construction fails partway.
struct DeviceBuffers {
    params: wgpu::Buffer,
    temp_in: wgpu::Buffer,
    temp_out: wgpu::Buffer,
    geometry: wgpu::Buffer,
    node_coeffs: wgpu::Buffer,
    slots: wgpu::Buffer,
    result: wgpu::Buffer,
    staging_temp: wgpu::Buffer,
    staging_result: wgpu::Buffer,
    field_bytes: u64,
}

impl DeviceBuffers {
    fn new(device: &wgpu::Device, nodes: usize, geometry: &[f32]) -> Self {
        let field_bytes = (nodes * std::mem::size_of::<f32>()) as u64;
        let make = |label: &str, size: u64, usage: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        };
        let storage = wgpu::BufferUsages::STORAGE;
        let dst = wgpu::BufferUsages::COPY_DST;
        let src = wgpu::BufferUsages::COPY_SRC;
        let readback = wgpu::BufferUsages::MAP_READ | dst;

        Self {
            params: make(
                "transport params",
                std::mem::size_of::<TransportParams>() as u64,
                wgpu::BufferUsages::UNIFORM | dst,
            ),
            temp_in: make("temperature in", field_bytes, storage | dst | src),
            temp_out: make("temperature out", field_bytes, storage | dst | src),
            geometry: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stencil geometry"),
                contents: bytemuck::cast_slice(geometry),
                usage: storage,
            }),
            node_coeffs: make("node coefficients", 5 * field_bytes, storage | dst),
            slots: make(
                "change slots",
                (REDUCTION_SLOTS * std::mem::size_of::<u32>()) as u64,
                storage | dst,
            ),
            result: make("max change", 4, storage | src),
            staging_temp: make("temperature readback", field_bytes, readback),
            staging_result: make("max change readback", 4, readback),
            field_bytes,
        }
    }
}

impl Drop for DeviceBuffers {
    fn drop(&mut self) {
        for buffer in [
            &self.params,
            &self.temp_in,
            &self.temp_out,
            &self.geometry,
            &self.node_coeffs,
            &self.slots,
            &self.result,
            &self.staging_temp,
            &self.staging_result,
        ] {
            buffer.destroy();
        }
    }
}

pub struct GpuBackend {
    ctx: GpuContext,
    dims: GridDims,
    geometry: StencilGeometry,
    transport_pipeline: wgpu::ComputePipeline,
    reduce_pipeline: wgpu::ComputePipeline,
    transport_group: wgpu::BindGroup,
    reduce_group: wgpu::BindGroup,
    // declared last: dropped after the bind groups that reference them
    buffers: DeviceBuffers,
    host_scratch: Vec<f32>,
    uploaded_revision: Option<u64>,
    authority: Authority,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn pipeline(
    device: &wgpu::Device,
    label: &str,
    source: String,
    entry_point: &str,
    entries: &[wgpu::BindGroupLayoutEntry],
) -> (wgpu::ComputePipeline, wgpu::BindGroupLayout) {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries,
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point,
    });
    (pipeline, layout)
}

/// Flatten the stencil geometry in the order the shader indexes it.
fn pack_geometry(geom: &StencilGeometry) -> Vec<f32> {
    let d = geom.dims();
    let mut out = Vec::with_capacity(7 * d.nr + 5 * d.nz);
    out.extend(geom.radial.iter().flat_map(|w| w.iter().map(|&v| v as f32)));
    for part in [&geom.angular, &geom.r_minus, &geom.r_plus, &geom.arc] {
        out.extend(part.iter().map(|&v| v as f32));
    }
    out.extend(geom.axial.iter().flat_map(|w| w.iter().map(|&v| v as f32)));
    for part in [&geom.z_minus, &geom.z_plus] {
        out.extend(part.iter().map(|&v| v as f32));
    }
    out
}

fn workgroup_grid(interior: u32) -> (u32, u32) {
    let groups = interior.div_ceil(WORKGROUP).max(1);
    let x = groups.min(MAX_GROUPS_PER_DIM);
    (x, groups.div_ceil(x))
}

impl GpuBackend {
    /// Allocate every device resource for `grid`. Any validation or
    /// allocation failure is returned as an error; resources created so far
    /// are released on the way out.
    pub fn new(ctx: GpuContext, grid: &CylindricalGrid) -> KernelResult<Self> {
        let dims = grid.dims();
        let geometry = StencilGeometry::new(grid);
        let device = &ctx.device;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let (transport_pipeline, transport_layout) = pipeline(
            device,
            "transport",
            transport_shader(),
            "transport_step",
            &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, false),
                storage_entry(3, true),
                storage_entry(4, true),
                storage_entry(5, false),
            ],
        );
        let (reduce_pipeline, reduce_layout) = pipeline(
            device,
            "reduce",
            REDUCE_SHADER.to_string(),
            "reduce_max",
            &[storage_entry(0, true), storage_entry(1, false)],
        );

        let buffers = DeviceBuffers::new(device, dims.len(), &pack_geometry(&geometry));

        let transport_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transport"),
            layout: &transport_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.temp_in.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.temp_out.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.geometry.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.node_coeffs.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: buffers.slots.as_entire_binding(),
                },
            ],
        });
        let reduce_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("reduce"),
            layout: &reduce_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.slots.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.result.as_entire_binding(),
                },
            ],
        });

        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation.or(oom) {
            return Err(KernelError::Backend {
                message: format!("device initialization failed: {err}"),
            });
        }

        Ok(Self {
            host_scratch: vec![0.0; dims.len()],
            ctx,
            dims,
            geometry,
            transport_pipeline,
            reduce_pipeline,
            transport_group,
            reduce_group,
            buffers,
            uploaded_revision: None,
            authority: Authority::Host,
        })
    }

    pub fn geometry(&self) -> &StencilGeometry {
        &self.geometry
    }

    fn upload_coefficients(&mut self, inputs: &KernelInputs<'_>) {
        let n = self.dims.len();
        let mut packed = vec![0.0_f32; 5 * n];
        for (dst, &src) in packed[..n].iter_mut().zip(inputs.diffusivity) {
            *dst = src as f32;
        }
        if let Some(disp) = inputs.dispersion {
            for (dst, &src) in packed[n..2 * n].iter_mut().zip(disp) {
                *dst = src as f32;
            }
        }
        if let Some(v) = inputs.velocity {
            for (c, comp) in [&v.vr, &v.vtheta, &v.vz].into_iter().enumerate() {
                let base = (2 + c) * n;
                for (dst, &src) in packed[base..base + n].iter_mut().zip(comp) {
                    *dst = src as f32;
                }
            }
        }
        self.ctx
            .queue
            .write_buffer(&self.buffers.node_coeffs, 0, bytemuck::cast_slice(&packed));
        self.uploaded_revision = Some(inputs.revision);
    }

    /// Block until both readback buffers are mapped, copy them out, unmap.
    fn download(&mut self) -> KernelResult<f32> {
        let timer = Timer::start();
        let buffers = &self.buffers;
        let (tx, rx) = mpsc::channel();
        let tx_result = tx.clone();
        buffers
            .staging_temp
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |r| {
                let _ = tx.send(("temperature", r));
            });
        buffers
            .staging_result
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |r| {
                let _ = tx_result.send(("max change", r));
            });
        self.ctx.device.poll(wgpu::Maintain::Wait);

        let mut failure = None;
        let mut mapped = Vec::with_capacity(2);
        for _ in 0..2 {
            match rx.recv() {
                Ok((what, Ok(()))) => mapped.push(what),
                Ok((what, Err(e))) => failure = Some(format!("mapping {what} failed: {e:?}")),
                Err(e) => failure = Some(format!("map callback dropped: {e}")),
            }
        }

        let mut change = 0.0_f32;
        if failure.is_none() {
            let data = buffers.staging_temp.slice(..).get_mapped_range();
            self.host_scratch
                .copy_from_slice(bytemuck::cast_slice::<u8, f32>(&data));
            drop(data);
            let data = buffers.staging_result.slice(..).get_mapped_range();
            change = bytemuck::cast_slice::<u8, f32>(&data)[0];
            drop(data);
        }
        for what in mapped {
            match what {
                "temperature" => buffers.staging_temp.unmap(),
                _ => buffers.staging_result.unmap(),
            }
        }
        timer.stop_into(&kernel_timing::GPU_TRANSFERS);

        match failure {
            Some(message) => Err(KernelError::Transfer { message }),
            None => Ok(change),
        }
    }
}

impl TransportBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn describe(&self) -> String {
        format!("wgpu {} ({})", self.ctx.adapter_name(), self.ctx.class().as_str())
    }

    fn sweep(
        &mut self,
        current: &Field3,
        next: &mut Field3,
        inputs: &KernelInputs<'_>,
        dt: f64,
    ) -> KernelResult<f64> {
        check_shapes(&self.geometry, current, next, inputs)?;
        debug_assert_eq!(self.authority, Authority::Host);
        let timer = Timer::start();

        if self.uploaded_revision != Some(inputs.revision) {
            self.upload_coefficients(inputs);
        }

        let mut flags = 0;
        if inputs.velocity.is_some() {
            flags |= FLAG_ADVECTION;
        }
        if inputs.dispersion.is_some() {
            flags |= FLAG_DISPERSION;
        }
        let interior = self.dims.interior_count() as u32;
        let params = TransportParams {
            nr: self.dims.nr as u32,
            ntheta: self.dims.ntheta as u32,
            nz: self.dims.nz as u32,
            interior,
            flags,
            slot_count: REDUCTION_SLOTS as u32,
            _pad0: 0,
            _pad1: 0,
            dt: dt as f32,
            t_min: T_MIN_K as f32,
            t_max: T_MAX_K as f32,
            max_delta: MAX_STEP_CHANGE_K as f32,
        };
        let queue = &self.ctx.queue;
        queue.write_buffer(&self.buffers.params, 0, bytemuck::bytes_of(&params));

        for (dst, &src) in self.host_scratch.iter_mut().zip(current.as_slice()) {
            *dst = src as f32;
        }
        queue.write_buffer(
            &self.buffers.temp_in,
            0,
            bytemuck::cast_slice(&self.host_scratch),
        );
        self.authority = Authority::Device;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("transport sweep"),
            });
        let field_bytes = self.buffers.field_bytes;
        encoder.copy_buffer_to_buffer(&self.buffers.temp_in, 0, &self.buffers.temp_out, 0, field_bytes);
        // a stale accumulator would hide convergence
        encoder.clear_buffer(&self.buffers.slots, 0, None);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("transport"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.transport_pipeline);
            pass.set_bind_group(0, &self.transport_group, &[]);
            let (gx, gy) = workgroup_grid(interior);
            pass.dispatch_workgroups(gx, gy, 1);
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("reduce"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.reduce_pipeline);
            pass.set_bind_group(0, &self.reduce_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&self.buffers.temp_out, 0, &self.buffers.staging_temp, 0, field_bytes);
        encoder.copy_buffer_to_buffer(&self.buffers.result, 0, &self.buffers.staging_result, 0, 4);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let downloaded = self.download();
        let change = settle(&mut self.authority, downloaded)?;
        for (dst, &src) in next.as_mut_slice().iter_mut().zip(&self.host_scratch) {
            *dst = src as f64;
        }

        timer.stop_into(&kernel_timing::GPU_SWEEPS);
        Ok(change as f64)
    }
}
