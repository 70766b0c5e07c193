/// WgpuDevice - WebGPU implementation of the GraphicsDevice trait

use lumen_engine::lumen::render::{
    AttachmentFlags, BackendKind, BufferDesc, PipelineDesc, SurfaceCapabilities, SwapchainDesc,
    TextureDesc, TextureFormat, Window, Swapchain as RendererSwapchain,
};
use lumen_engine::lumen::{Config, Error, GraphicsDevice, Result};
use lumen_engine::{engine_error, engine_info, engine_warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::wgpu_buffer::Buffer;
use crate::wgpu_command_recorder::CommandRecorder;
use crate::wgpu_context::{GpuContext, SOURCE};
use crate::wgpu_frame::{Fence, ImageView, RenderTarget, Semaphore};
use crate::wgpu_pipeline::Pipeline;
use crate::wgpu_surface::Surface;
use crate::wgpu_swapchain::Swapchain;
use crate::wgpu_texture::Texture;

/// Depth format of render target attachments (always renderable in WebGPU)
pub(crate) const DEPTH_FORMAT: TextureFormat = TextureFormat::D32_FLOAT;

/// Instance flags for the requested validation level
pub(crate) fn instance_flags(enable_validation: bool) -> wgpu::InstanceFlags {
    if enable_validation {
        wgpu::InstanceFlags::debugging()
    } else {
        wgpu::InstanceFlags::empty()
    }
}

/// Portable limits raised to the adapter's texture resolution
pub(crate) fn device_limits(adapter_limits: wgpu::Limits) -> wgpu::Limits {
    wgpu::Limits::downlevel_defaults().using_resolution(adapter_limits)
}

/// Depth format of a new render target, if it gets one
pub(crate) fn render_target_depth(attachments: AttachmentFlags) -> Option<TextureFormat> {
    attachments.contains(AttachmentFlags::DEPTH).then_some(DEPTH_FORMAT)
}

/// WebGPU graphics device
///
/// Every object it creates holds the same `Arc<GpuContext>`.
pub struct WgpuDevice {
    ctx: Arc<GpuContext>,
    frames_in_flight: usize,
    fence_timeout: Duration,
    adapter_name: String,
}

impl WgpuDevice {
    /// Create the WebGPU device
    ///
    /// The window is only used to pick an adapter able to present to it; each
    /// rendering context creates its own surface afterwards.
    ///
    /// # Arguments
    ///
    /// * `window` - Any window of the platform display
    /// * `config` - Engine configuration (validation, frame pacing)
    pub fn new(window: &Arc<dyn Window>, config: &Config) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: instance_flags(config.enable_validation),
            ..Default::default()
        });

        // Temporary surface for adapter selection
        let probe_surface = instance.create_surface(Arc::clone(window)).map_err(|e| {
            engine_error!(SOURCE, "Failed to create surface: {}", e);
            Error::InitializationFailed(format!("Failed to create surface: {}", e))
        })?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&probe_surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            engine_error!(SOURCE, "No WebGPU adapter can present to this window: {}", e);
            Error::InitializationFailed(format!("No suitable adapter: {}", e))
        })?;
        drop(probe_surface);

        let info = adapter.get_info();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("lumen device"),
            required_features: wgpu::Features::empty(),
            required_limits: device_limits(adapter.limits()),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to create WebGPU device: {}", e);
            Error::InitializationFailed(format!("Failed to create device: {}", e))
        })?;

        engine_info!(SOURCE, "WebGPU device ready: {} ({:?}, validation {})",
            info.name, info.backend, config.enable_validation);

        Ok(Self {
            ctx: Arc::new(GpuContext::new(instance, adapter, device, queue)),
            frames_in_flight: config.frames_in_flight.max(1),
            fence_timeout: config.fence_timeout,
            adapter_name: info.name,
        })
    }

    /// Name of the selected adapter
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }
}

impl GraphicsDevice for WgpuDevice {
    type Surface = Surface;
    type Swapchain = Swapchain;
    type ImageView = ImageView;
    type RenderTarget = RenderTarget;
    type CommandRecorder = CommandRecorder;
    type Fence = Fence;
    type Semaphore = Semaphore;
    type Buffer = Buffer;
    type Texture = Texture;
    type Pipeline = Pipeline;

    fn backend(&self) -> BackendKind {
        BackendKind::WebGpu
    }

    fn create_surface(&self, window: &Arc<dyn Window>) -> Result<Surface> {
        Surface::new(Arc::clone(&self.ctx), window)
    }

    fn surface_capabilities(&self, surface: &Surface) -> Result<SurfaceCapabilities> {
        Ok(surface.capabilities())
    }

    fn create_swapchain(
        &self,
        surface: &Surface,
        desc: &SwapchainDesc,
        old: Option<&Swapchain>,
    ) -> Result<Swapchain> {
        Swapchain::new(Arc::clone(&self.ctx), surface, desc, old)
    }

    fn create_image_view(&self, swapchain: &Swapchain, image_index: u32) -> Result<ImageView> {
        if image_index as usize >= swapchain.image_count() {
            engine_error!(SOURCE, "Image index {} out of range ({} images)", image_index, swapchain.image_count());
            return Err(Error::InvalidResource(format!("image index {} out of range", image_index)));
        }
        Ok(ImageView { image_index })
    }

    fn create_render_target(
        &self,
        swapchain: &Swapchain,
        _view: &ImageView,
        attachments: AttachmentFlags,
    ) -> Result<RenderTarget> {
        RenderTarget::new(&self.ctx, render_target_depth(attachments), swapchain.extent())
    }

    fn create_command_recorder(&self) -> Result<CommandRecorder> {
        Ok(CommandRecorder::new(Arc::clone(&self.ctx)))
    }

    fn create_fence(&self, signaled: bool) -> Result<Fence> {
        Ok(Fence::new(signaled))
    }

    fn create_semaphore(&self) -> Result<Semaphore> {
        Ok(Semaphore::new())
    }

    fn semaphore_slot_count(&self, _image_count: usize) -> usize {
        self.frames_in_flight
    }

    fn attach_acquired_image(&self, target: &mut RenderTarget, image_acquired: &Semaphore) -> Result<()> {
        target.color = Some(image_acquired.create_view()?);
        Ok(())
    }

    fn wait_for_fence(&self, fence: &Fence, timeout: Duration) -> Result<()> {
        self.ctx.wait_for_flag(&fence.signaled, timeout, "fence")
    }

    fn reset_fence(&self, fence: &Fence) -> Result<()> {
        fence.reset();
        Ok(())
    }

    fn submit(
        &self,
        recorder: &mut CommandRecorder,
        wait: &Semaphore,
        signal: &Semaphore,
        fence: &Fence,
    ) -> Result<()> {
        let commands = recorder.take_finished()?;
        self.ctx.queue.submit(std::iter::once(commands));

        // The surface texture follows the submission to presentation
        match wait.take()? {
            Some(texture) => signal.put(texture)?,
            None => engine_warn!(SOURCE, "Submission without an acquired surface texture"),
        }

        let signaled = Arc::clone(&fence.signaled);
        self.ctx.queue.on_submitted_work_done(move || signaled.store(true, Ordering::Release));
        Ok(())
    }

    fn depth_format(&self) -> Option<TextureFormat> {
        Some(DEPTH_FORMAT)
    }

    fn wait_idle(&self) -> Result<()> {
        let idle = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&idle);
        self.ctx.queue.on_submitted_work_done(move || flag.store(true, Ordering::Release));
        self.ctx.wait_for_flag(&idle, self.fence_timeout, "device idle")
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Buffer> {
        Buffer::new(Arc::clone(&self.ctx), desc)
    }

    fn write_buffer(&self, buffer: &Buffer, offset: u64, data: &[u8]) -> Result<()> {
        buffer.write(offset, data)
    }

    fn create_texture(&self, desc: &TextureDesc, data: &[u8]) -> Result<Texture> {
        Texture::new(&self.ctx, desc, data)
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Pipeline> {
        Pipeline::new(&self.ctx, desc)
    }
}

#[cfg(test)]
#[path = "wgpu_device_tests.rs"]
mod tests;
