/// Swapchain - Vulkan implementation of the engine Swapchain trait

use ash::vk;
use lumen_engine::lumen::render::{
    choose_image_count, choose_present_mode, choose_surface_format, resolve_extent,
    AcquireResult, Extent2D, PresentMode, PresentStatus, SurfaceFormat, SwapchainDesc,
    TextureFormat, Swapchain as RendererSwapchain,
};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_debug, engine_error, engine_warn};
use std::sync::Arc;

use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::{
    color_space_to_vk, extent_to_vk, present_mode_to_vk, texture_format_to_vk, vk_to_surface_format,
};
use crate::vulkan_frame::Semaphore;
use crate::vulkan_surface::Surface;

/// Vulkan swapchain
///
/// Owns the swapchain handle only. Image views and render targets are built
/// by the rendering context through the device, per image.
pub struct Swapchain {
    ctx: Arc<GpuContext>,
    pub(crate) swapchain: vk::SwapchainKHR,
    pub(crate) images: Vec<vk::Image>,
    /// Exact Vulkan format of the images (may be unknown to the engine)
    pub(crate) vk_format: vk::Format,
    surface_format: SurfaceFormat,
    extent: Extent2D,
    requested_extent: Extent2D,
    present_mode: PresentMode,
}

/// Preference order for the composite alpha mode
const COMPOSITE_ALPHA_ORDER: [vk::CompositeAlphaFlagsKHR; 4] = [
    vk::CompositeAlphaFlagsKHR::OPAQUE,
    vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::INHERIT,
];

pub(crate) fn choose_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    COMPOSITE_ALPHA_ORDER
        .into_iter()
        .find(|flag| supported.contains(*flag))
        .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// Pick the Vulkan format/color space pair behind the negotiated surface format
///
/// Reuses the driver's own pair when it reported one, so formats the engine
/// does not name keep their exact Vulkan value.
pub(crate) fn resolve_vk_surface_format(
    available: &[vk::SurfaceFormatKHR],
    chosen: SurfaceFormat,
) -> vk::SurfaceFormatKHR {
    available
        .iter()
        .find(|f| f.format != vk::Format::UNDEFINED && vk_to_surface_format(f) == chosen)
        .copied()
        .unwrap_or(vk::SurfaceFormatKHR {
            format: texture_format_to_vk(chosen.format),
            color_space: color_space_to_vk(chosen.color_space),
        })
}

impl Swapchain {
    /// Build a swapchain for a surface
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `surface` - Surface to present to
    /// * `desc` - Requested extent and format/mode preferences
    /// * `old` - Previous swapchain handed over to the driver when rebuilding
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        surface: &Surface,
        desc: &SwapchainDesc,
        old: Option<&Swapchain>,
    ) -> Result<Self> {
        let raw_caps = surface.raw_capabilities()?;
        let caps = surface.capabilities()?;
        let raw_formats = surface.raw_formats()?;

        let surface_format = choose_surface_format(&caps.formats, &desc.preferred_formats)
            .ok_or_else(|| {
                engine_error!(SOURCE, "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;
        let vk_surface_format = resolve_vk_surface_format(&raw_formats, surface_format);
        let present_mode = choose_present_mode(&caps.present_modes, &desc.present_modes);
        let image_count = choose_image_count(&caps, desc.min_image_count);
        let extent = resolve_extent(&caps, desc.requested_extent);

        if extent.is_empty() {
            engine_warn!(SOURCE, "Surface extent is empty, swapchain not created");
            return Err(Error::SwapchainOutOfDate);
        }

        let queue_families = [ctx.graphics_queue_family, ctx.present_queue_family];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(vk_surface_format.format)
            .image_color_space(vk_surface_format.color_space)
            .image_extent(extent_to_vk(extent))
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(raw_caps.current_transform)
            .composite_alpha(choose_composite_alpha(raw_caps.supported_composite_alpha))
            .present_mode(present_mode_to_vk(present_mode))
            .clipped(true)
            .old_swapchain(old.map(|s| s.swapchain).unwrap_or_else(vk::SwapchainKHR::null));

        create_info = if ctx.graphics_queue_family != ctx.present_queue_family {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain = unsafe {
            ctx.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| map_vk_error("create swapchain", e))?
        };

        let images = unsafe { ctx.swapchain_loader.get_swapchain_images(swapchain) };
        let images = match images {
            Ok(images) => images,
            Err(e) => {
                unsafe { ctx.swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(map_vk_error("get swapchain images", e));
            }
        };

        engine_debug!(SOURCE, "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            extent.width, extent.height, images.len(), vk_surface_format.format, present_mode);

        Ok(Self {
            ctx,
            swapchain,
            images,
            vk_format: vk_surface_format.format,
            surface_format,
            extent,
            requested_extent: desc.requested_extent,
            present_mode,
        })
    }

    /// Swapchain image by index
    pub(crate) fn image(&self, image_index: u32) -> Result<vk::Image> {
        self.images.get(image_index as usize).copied().ok_or_else(|| {
            engine_error!(SOURCE, "Swapchain image index {} out of range (count: {})",
                image_index, self.images.len());
            Error::InvalidResource(format!("Swapchain image index {} out of range", image_index))
        })
    }

    /// Consume a pending signal on a semaphore
    ///
    /// A suboptimal acquire still signals; the frame is abandoned, so an empty
    /// batch waits on the semaphore to return it to the unsignaled state.
    fn unsignal(&self, semaphore: &Semaphore) -> Result<()> {
        let wait_semaphores = [semaphore.semaphore];
        let wait_stages = [vk::PipelineStageFlags::ALL_COMMANDS];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages);

        let _queue = self.ctx.queue_guard()?;
        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| map_vk_error("release acquire semaphore", e))
        }
    }
}

impl RendererSwapchain for Swapchain {
    type Semaphore = Semaphore;

    fn acquire_next_image(&mut self, image_acquired: &Semaphore) -> Result<AcquireResult> {
        let result = unsafe {
            self.ctx.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                image_acquired.semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, false)) => Ok(AcquireResult::Acquired(image_index)),
            Ok((_, true)) => {
                self.unsignal(image_acquired)?;
                Ok(AcquireResult::Suboptimal)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireResult::OutOfDate),
            Err(e) => Err(map_vk_error("acquire swapchain image", e)),
        }
    }

    fn present(&mut self, image_index: u32, render_complete: &Semaphore) -> Result<PresentStatus> {
        let wait_semaphores = [render_complete.semaphore];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _queue = self.ctx.queue_guard()?;
        let result = unsafe { self.ctx.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) };

        match result {
            Ok(false) => Ok(PresentStatus::Success),
            Ok(true) => Ok(PresentStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
            Err(e) => Err(map_vk_error("present swapchain image", e)),
        }
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn requested_extent(&self) -> Extent2D {
        self.requested_extent
    }

    fn format(&self) -> TextureFormat {
        self.surface_format.format
    }

    fn surface_format(&self) -> SurfaceFormat {
        self.surface_format
    }

    fn present_mode(&self) -> PresentMode {
        self.present_mode
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
