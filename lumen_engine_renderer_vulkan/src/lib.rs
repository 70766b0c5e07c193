/*!
# Lumen Engine - Vulkan Backend

Vulkan implementation of the Lumen rendering engine shell.

This crate implements [`GraphicsDevice`] using the Ash library for Vulkan
bindings and gpu-allocator for memory management. Rendering contexts and the
UI renderer from `lumen_engine` run on top of it unchanged.

# Example

```no_run
use std::sync::Arc;
use lumen_engine::lumen::{Config, RenderingContext, render::{AttachmentFlags, Window}};
use lumen_engine_renderer_vulkan::lumen::VulkanDevice;

fn start(window: Arc<winit::window::Window>) -> lumen_engine::lumen::Result<()> {
    let config = Config::default();
    let device = Arc::new(VulkanDevice::new(&*window, &config)?);
    let window: Arc<dyn Window> = window;
    let _context = RenderingContext::new(device, window, AttachmentFlags::COLOR, config)?;
    Ok(())
}
```

[`GraphicsDevice`]: lumen_engine::lumen::GraphicsDevice
*/

// Shared state and helpers
mod debug;
mod vulkan_context;
mod vulkan_format;
mod vulkan_render_pass;

// Presentation
mod vulkan_surface;
mod vulkan_swapchain;

// Frame objects and recording
mod vulkan_frame;
mod vulkan_command_recorder;

// Resources
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_pipeline;
mod vulkan_shader;

mod vulkan_device;

// Main lumen namespace module
pub mod lumen {
    pub use crate::vulkan_device::VulkanDevice;
    pub use crate::vulkan_surface::Surface;
    pub use crate::vulkan_swapchain::Swapchain;
    pub use crate::vulkan_frame::{Fence, ImageView, RenderTarget, Semaphore};
    pub use crate::vulkan_command_recorder::CommandRecorder;
    pub use crate::vulkan_buffer::Buffer;
    pub use crate::vulkan_texture::Texture;
    pub use crate::vulkan_pipeline::Pipeline;
}

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};

// UI shader loading
pub use vulkan_shader::{load_spirv, ui_shader_from_dir, UI_FRAGMENT_SHADER_FILE, UI_VERTEX_SHADER_FILE};
