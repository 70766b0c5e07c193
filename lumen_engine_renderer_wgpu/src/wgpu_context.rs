/// GpuContext - Shared GPU state for all WebGPU objects
///
/// Contains everything needed for GPU operations:
/// - Instance, adapter, device and queue
/// - Bind group layouts shared by every pipeline (texture, push constants)
/// - The linear sampler used by every texture

use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_debug, engine_err, engine_error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub(crate) const SOURCE: &str = "lumen::wgpu";

/// Largest push constant block a pipeline may declare
pub(crate) const MAX_PUSH_CONSTANT_SIZE: u32 = 128;

/// Shared GPU context for all WebGPU resources.
///
/// wgpu objects are reference counted internally; the context only gathers
/// what every resource needs so they can hold one `Arc<GpuContext>`.
pub struct GpuContext {
    pub(crate) instance: wgpu::Instance,
    pub(crate) adapter: wgpu::Adapter,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,

    /// Group 0 of sampled pipelines: texture + sampler
    pub(crate) texture_layout: wgpu::BindGroupLayout,
    /// Uniform block emulating push constants (dynamic offset)
    pub(crate) push_constant_layout: wgpu::BindGroupLayout,
    /// Linear clamp-to-edge sampler shared by every texture
    pub(crate) sampler: wgpu::Sampler,
    /// Dynamic offset alignment of uniform bindings
    pub(crate) uniform_alignment: u64,
}

impl GpuContext {
    pub(crate) fn new(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
    ) -> Self {
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let push_constant_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen push constant bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen linear sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment as u64;

        Self {
            instance,
            adapter,
            device,
            queue,
            texture_layout,
            push_constant_layout,
            sampler,
            uniform_alignment,
        }
    }

    /// Poll the device until `flag` is set or `timeout` expires
    ///
    /// wgpu only runs completion callbacks while the device is polled, so
    /// every CPU wait goes through here.
    pub(crate) fn wait_for_flag(&self, flag: &AtomicBool, timeout: Duration, what: &str) -> Result<()> {
        let start = Instant::now();
        loop {
            if flag.load(Ordering::Acquire) {
                return Ok(());
            }
            self.device
                .poll(wgpu::PollType::Poll)
                .map_err(|e| engine_err!(SOURCE, "Device poll failed while waiting for {}: {}", what, e))?;
            if flag.load(Ordering::Acquire) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                engine_error!(SOURCE, "Timed out after {:?} waiting for {}", timeout, what);
                return Err(Error::Timeout(format!("{} not signaled after {:?}", what, timeout)));
            }
            std::thread::sleep(Duration::from_micros(200));
        }
    }
}

/// Map a surface acquisition error to an engine error, logging it
///
/// `Outdated` and `Lost` are statuses handled by the swapchain and never
/// reach this function in practice.
pub(crate) fn map_surface_error(what: &str, error: wgpu::SurfaceError) -> Error {
    match error {
        wgpu::SurfaceError::Timeout => {
            engine_debug!(SOURCE, "Surface timeout during {}", what);
            Error::Timeout(format!("{}: surface texture not available", what))
        }
        wgpu::SurfaceError::OutOfMemory => {
            engine_error!(SOURCE, "Out of memory during {}", what);
            Error::OutOfMemory
        }
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost => Error::SwapchainOutOfDate,
        other => engine_err!(SOURCE, "Failed to {}: {}", what, other),
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        engine_debug!(SOURCE, "GPU context destroyed");
    }
}

#[cfg(test)]
#[path = "wgpu_context_tests.rs"]
mod tests;
