/// Surface - WebGPU presentation surface bound to one window

use lumen_engine::lumen::render::{Extent2D, SurfaceCapabilities, Window};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::engine_error;
use std::sync::Arc;

use crate::wgpu_context::{GpuContext, SOURCE};
use crate::wgpu_format::{wgpu_to_present_mode, wgpu_to_surface_format};

/// Frames a WebGPU surface may queue ahead of presentation
pub(crate) const MIN_SURFACE_IMAGES: u32 = 2;
pub(crate) const MAX_SURFACE_IMAGES: u32 = 4;

/// WebGPU surface
///
/// The wgpu surface owns a clone of the window handle, so it stays valid as
/// long as any swapchain built on it is alive.
pub struct Surface {
    ctx: Arc<GpuContext>,
    pub(crate) surface: Arc<wgpu::Surface<'static>>,
    window: Arc<dyn Window>,
}

/// Convert wgpu capabilities to engine capabilities
///
/// WebGPU surfaces report no extent limits or image counts: the extent always
/// follows the window (including a zero extent while minimized) and the image
/// count is the engine's own frame pacing.
pub(crate) fn capabilities_from_wgpu(caps: &wgpu::SurfaceCapabilities, max_dimension: u32) -> SurfaceCapabilities {
    SurfaceCapabilities {
        current_extent: None,
        min_extent: Extent2D::new(0, 0),
        max_extent: Extent2D::new(max_dimension, max_dimension),
        min_image_count: MIN_SURFACE_IMAGES,
        max_image_count: MAX_SURFACE_IMAGES,
        formats: caps.formats.iter().copied().map(wgpu_to_surface_format).collect(),
        present_modes: caps.present_modes.iter().copied().filter_map(wgpu_to_present_mode).collect(),
    }
}

impl Surface {
    /// Create a surface for a window and check the adapter can present to it
    pub(crate) fn new(ctx: Arc<GpuContext>, window: &Arc<dyn Window>) -> Result<Self> {
        let surface = ctx.instance.create_surface(Arc::clone(window)).map_err(|e| {
            engine_error!(SOURCE, "Failed to create surface: {}", e);
            Error::InitializationFailed(format!("Failed to create surface: {}", e))
        })?;

        if !ctx.adapter.is_surface_supported(&surface) {
            engine_error!(SOURCE, "Adapter cannot present to this window");
            return Err(Error::InitializationFailed("Surface not supported by the adapter".to_string()));
        }

        Ok(Self { ctx, surface: Arc::new(surface), window: Arc::clone(window) })
    }

    pub fn window(&self) -> &Arc<dyn Window> {
        &self.window
    }

    /// Raw wgpu capabilities (alpha modes live here)
    pub(crate) fn raw_capabilities(&self) -> wgpu::SurfaceCapabilities {
        self.surface.get_capabilities(&self.ctx.adapter)
    }

    /// Live capabilities converted to engine types
    pub(crate) fn capabilities(&self) -> SurfaceCapabilities {
        let max_dimension = self.ctx.device.limits().max_texture_dimension_2d;
        capabilities_from_wgpu(&self.raw_capabilities(), max_dimension)
    }
}

#[cfg(test)]
#[path = "wgpu_surface_tests.rs"]
mod tests;
