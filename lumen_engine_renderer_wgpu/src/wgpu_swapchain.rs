/// Swapchain - WebGPU implementation of the engine Swapchain trait
///
/// A WebGPU surface is configured rather than owning a swapchain object, and
/// the surface textures it hands out are not indexed. The swapchain therefore
/// numbers acquisitions round-robin over its image count, which gives the
/// rendering context one frame object per in-flight texture.

use lumen_engine::lumen::render::{
    choose_image_count, choose_present_mode, choose_surface_format, resolve_extent,
    AcquireResult, Extent2D, PresentMode, PresentStatus, SurfaceFormat, SwapchainDesc,
    TextureFormat, Swapchain as RendererSwapchain,
};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_debug, engine_error, engine_warn};
use std::sync::Arc;

use crate::wgpu_context::{map_surface_error, GpuContext, SOURCE};
use crate::wgpu_format::{present_mode_to_wgpu, wgpu_to_surface_format};
use crate::wgpu_frame::Semaphore;
use crate::wgpu_surface::Surface;

/// WebGPU swapchain (a configured surface)
pub struct Swapchain {
    _ctx: Arc<GpuContext>,
    surface: Arc<wgpu::Surface<'static>>,
    /// Exact wgpu format of the surface textures (may be unknown to the engine)
    pub(crate) wgpu_format: wgpu::TextureFormat,
    surface_format: SurfaceFormat,
    image_count: u32,
    next_image: u32,
    extent: Extent2D,
    requested_extent: Extent2D,
    present_mode: PresentMode,
}

/// Pick the wgpu format behind the negotiated surface format
///
/// Falls back to the first reported format when the engine knows none of
/// them.
pub(crate) fn resolve_wgpu_format(
    available: &[wgpu::TextureFormat],
    chosen: Option<SurfaceFormat>,
) -> Option<(wgpu::TextureFormat, SurfaceFormat)> {
    let found = chosen.and_then(|chosen| {
        available
            .iter()
            .copied()
            .find(|f| wgpu_to_surface_format(*f) == chosen)
            .map(|f| (f, chosen))
    });
    found.or_else(|| available.first().map(|f| (*f, wgpu_to_surface_format(*f))))
}

/// Surface alpha mode: opaque when supported, else whatever the surface lists first
pub(crate) fn choose_alpha_mode(supported: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if supported.contains(&wgpu::CompositeAlphaMode::Opaque) {
        return wgpu::CompositeAlphaMode::Opaque;
    }
    supported.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

impl Swapchain {
    /// Configure a surface for presentation
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `surface` - Surface to present to
    /// * `desc` - Requested extent and format/mode preferences
    /// * `old` - Previous swapchain; reconfiguring replaces it in place
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        surface: &Surface,
        desc: &SwapchainDesc,
        old: Option<&Swapchain>,
    ) -> Result<Self> {
        let raw_caps = surface.raw_capabilities();
        let caps = surface.capabilities();

        // Engine-known formats only, so negotiation never lands on an unknown one
        let known: Vec<SurfaceFormat> = caps
            .formats
            .iter()
            .copied()
            .filter(|f| f.format != TextureFormat::Undefined)
            .collect();
        let chosen = choose_surface_format(&known, &desc.preferred_formats);
        let (wgpu_format, surface_format) = resolve_wgpu_format(&raw_caps.formats, chosen)
            .ok_or_else(|| {
                engine_error!(SOURCE, "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;

        let present_mode = choose_present_mode(&caps.present_modes, &desc.present_modes);
        let image_count = choose_image_count(&caps, desc.min_image_count);
        let extent = resolve_extent(&caps, desc.requested_extent);

        if extent.is_empty() {
            engine_warn!(SOURCE, "Surface extent is empty, swapchain not created");
            return Err(Error::SwapchainOutOfDate);
        }

        if old.is_some() {
            engine_debug!(SOURCE, "Reconfiguring surface in place");
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu_format,
            width: extent.width,
            height: extent.height,
            present_mode: present_mode_to_wgpu(present_mode),
            alpha_mode: choose_alpha_mode(&raw_caps.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: image_count.saturating_sub(1).max(1),
        };
        surface.surface.configure(&ctx.device, &config);

        engine_debug!(SOURCE, "Surface configured: {}x{}, {} frames, {:?}, {:?}",
            extent.width, extent.height, image_count, wgpu_format, present_mode);

        Ok(Self {
            surface: Arc::clone(&surface.surface),
            _ctx: ctx,
            wgpu_format,
            surface_format,
            image_count,
            next_image: 0,
            extent,
            requested_extent: desc.requested_extent,
            present_mode,
        })
    }
}

impl RendererSwapchain for Swapchain {
    type Semaphore = Semaphore;

    fn acquire_next_image(&mut self, image_acquired: &Semaphore) -> Result<AcquireResult> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                return Ok(AcquireResult::OutOfDate);
            }
            Err(e) => return Err(map_surface_error("acquire surface texture", e)),
        };

        if texture.suboptimal {
            // Dropping an unpresented texture hands it back to the surface
            drop(texture);
            return Ok(AcquireResult::Suboptimal);
        }

        image_acquired.put(texture)?;
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count;
        Ok(AcquireResult::Acquired(image_index))
    }

    fn present(&mut self, image_index: u32, render_complete: &Semaphore) -> Result<PresentStatus> {
        let texture = render_complete.take()?.ok_or_else(|| {
            engine_error!(SOURCE, "Present of image {} without a submitted surface texture", image_index);
            Error::InvalidState(format!("image {} was not submitted before present", image_index))
        })?;
        texture.present();
        Ok(PresentStatus::Success)
    }

    fn image_count(&self) -> usize {
        self.image_count as usize
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

#[cfg(test)]
#[path = "wgpu_swapchain_tests.rs"]
mod tests;
