/*!
# Lumen Engine - WebGPU Backend

WebGPU implementation of the Lumen rendering engine shell.

This crate implements [`GraphicsDevice`] on top of wgpu. WebGPU has no
explicit semaphores or indexed swapchain images; the backend maps the
engine's frame model onto configured surfaces, queue ordering and
completion callbacks so rendering contexts and the UI renderer run on it
unchanged.

# Example

```no_run
use std::sync::Arc;
use lumen_engine::lumen::{Config, RenderingContext, render::{AttachmentFlags, Window}};
use lumen_engine_renderer_wgpu::lumen::WgpuDevice;

fn start(window: Arc<winit::window::Window>) -> lumen_engine::lumen::Result<()> {
    let config = Config::default();
    let window: Arc<dyn Window> = window;
    let device = Arc::new(WgpuDevice::new(&window, &config)?);
    let _context = RenderingContext::new(device, window, AttachmentFlags::COLOR, config)?;
    Ok(())
}
```

[`GraphicsDevice`]: lumen_engine::lumen::GraphicsDevice
*/

use lumen_engine::lumen::render::ShaderSource;

// Shared state and helpers
mod wgpu_context;
mod wgpu_format;

// Presentation
mod wgpu_surface;
mod wgpu_swapchain;

// Frame objects and recording
mod wgpu_frame;
mod wgpu_command_recorder;

// Resources
mod wgpu_buffer;
mod wgpu_texture;
mod wgpu_pipeline;

mod wgpu_device;

// Main lumen namespace module
pub mod lumen {
    pub use crate::wgpu_device::WgpuDevice;
    pub use crate::wgpu_surface::Surface;
    pub use crate::wgpu_swapchain::Swapchain;
    pub use crate::wgpu_frame::{Fence, ImageView, RenderTarget, Semaphore};
    pub use crate::wgpu_command_recorder::CommandRecorder;
    pub use crate::wgpu_buffer::Buffer;
    pub use crate::wgpu_texture::Texture;
    pub use crate::wgpu_pipeline::Pipeline;
}

/// WGSL source of the UI pipeline
pub const UI_SHADER_WGSL: &str = include_str!("../shaders/ui.wgsl");

/// UI shader ready for [`lumen_engine::ui::UiRendererDesc`]
pub fn ui_shader() -> ShaderSource {
    ShaderSource::Wgsl(UI_SHADER_WGSL.to_string())
}
