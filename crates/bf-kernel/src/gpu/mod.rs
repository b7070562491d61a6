//! wgpu compute backend.
//!
//! Discovery prefers a GPU-class adapter, accepts a CPU-class (software)
//! adapter next, and otherwise reports the device unavailable. Callers fall
//! back to [`crate::CpuBackend`]; absence of a device is never fatal.

mod backend;
mod shader;

pub use backend::GpuBackend;

/// Adapter class as reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    Gpu,
    Cpu,
}

impl DeviceClass {
    fn of(info: &wgpu::AdapterInfo) -> Self {
        match info.device_type {
            wgpu::DeviceType::DiscreteGpu
            | wgpu::DeviceType::IntegratedGpu
            | wgpu::DeviceType::VirtualGpu => DeviceClass::Gpu,
            wgpu::DeviceType::Cpu | wgpu::DeviceType::Other => DeviceClass::Cpu,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Gpu => "gpu",
            DeviceClass::Cpu => "cpu",
        }
    }
}

/// An opened device and its queue.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    class: DeviceClass,
}

impl GpuContext {
    /// Blocking device discovery.
    pub fn discover() -> crate::KernelResult<Self> {
        pollster::block_on(Self::discover_async())
    }

    async fn discover_async() -> crate::KernelResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let preferred = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await;

        let adapter = match preferred {
            Some(adapter) => adapter,
            None => instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: true,
                })
                .await
                .ok_or_else(|| crate::KernelError::DeviceUnavailable {
                    reason: "no GPU-class or CPU-class compute adapter found".to_string(),
                })?,
        };

        let info = adapter.get_info();
        let class = DeviceClass::of(&info);
        tracing::info!(adapter = %info.name, backend = ?info.backend, class = class.as_str(), "compute adapter selected");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("boreflow transport device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| crate::KernelError::DeviceUnavailable {
                reason: format!("failed to open device: {e}"),
            })?;

        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured wgpu error");
        }));

        Ok(Self {
            device,
            queue,
            adapter_name: info.name,
            class,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }
}
