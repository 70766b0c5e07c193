/// Surface - Vulkan presentation surface bound to one window

use ash::vk;
use lumen_engine::lumen::render::{SurfaceCapabilities, Extent2D, Window};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::engine_error;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{vk_to_current_extent, vk_to_present_mode, vk_to_surface_format};

/// Vulkan surface
///
/// Keeps its window alive: the surface must not outlive the native window.
pub struct Surface {
    ctx: Arc<GpuContext>,
    pub(crate) surface: vk::SurfaceKHR,
    window: Arc<dyn Window>,
}

impl Surface {
    /// Create a surface for a window and check the present queue can use it
    pub(crate) fn new(ctx: Arc<GpuContext>, window: &Arc<dyn Window>) -> Result<Self> {
        let display_handle = window.display_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;

        let surface = unsafe {
            ash_window::create_surface(
                &ctx._entry,
                &ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?
        };

        let supported = unsafe {
            ctx.surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.present_queue_family, surface)
                .unwrap_or(false)
        };
        if !supported {
            unsafe { ctx.surface_loader.destroy_surface(surface, None) };
            engine_error!(SOURCE, "Present queue family {} cannot present to this window", ctx.present_queue_family);
            return Err(Error::InitializationFailed("Surface not supported by the present queue".to_string()));
        }

        Ok(Self { ctx, surface, window: Arc::clone(window) })
    }

    pub fn window(&self) -> &Arc<dyn Window> {
        &self.window
    }

    /// Raw Vulkan capabilities (transform and composite alpha live here)
    pub(crate) fn raw_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| map_vk_error("query surface capabilities", e))
        }
    }

    /// Raw Vulkan format / color space pairs, in the order the driver reports them
    pub(crate) fn raw_formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_formats(self.ctx.physical_device, self.surface)
                .map_err(|e| map_vk_error("query surface formats", e))
        }
    }

    /// Live capabilities converted to engine types
    pub(crate) fn capabilities(&self) -> Result<SurfaceCapabilities> {
        let caps = self.raw_capabilities()?;
        let formats = self.raw_formats()?;
        let present_modes = unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_present_modes(self.ctx.physical_device, self.surface)
                .map_err(|e| map_vk_error("query surface present modes", e))?
        };

        Ok(SurfaceCapabilities {
            current_extent: vk_to_current_extent(caps.current_extent),
            min_extent: Extent2D::new(caps.min_image_extent.width, caps.min_image_extent.height),
            max_extent: Extent2D::new(caps.max_image_extent.width, caps.max_image_extent.height),
            min_image_count: caps.min_image_count,
            max_image_count: caps.max_image_count,
            formats: formats.iter().map(vk_to_surface_format).collect(),
            present_modes: present_modes.into_iter().filter_map(vk_to_present_mode).collect(),
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
