/// Per-frame WebGPU objects: fences, semaphores, image views, render targets
///
/// WebGPU has no explicit GPU-GPU synchronization. Queue order already
/// serializes submission and presentation, so a semaphore here only carries
/// the acquired surface texture from acquisition to submission and on to
/// presentation.

use lumen_engine::lumen::render::{Extent2D, TextureFormat};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::{engine_err, engine_error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::wgpu_context::{GpuContext, SOURCE};
use crate::wgpu_format::texture_format_to_wgpu;

/// CPU-waitable completion signal
///
/// Set by a queue completion callback; only observed while the device is
/// polled.
pub struct Fence {
    pub(crate) signaled: Arc<AtomicBool>,
}

impl Fence {
    pub(crate) fn new(signaled: bool) -> Self {
        Self { signaled: Arc::new(AtomicBool::new(signaled)) }
    }

    pub(crate) fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}

/// Hand-off slot for the acquired surface texture
pub struct Semaphore {
    texture: Mutex<Option<wgpu::SurfaceTexture>>,
}

impl Semaphore {
    pub(crate) fn new() -> Self {
        Self { texture: Mutex::new(None) }
    }

    /// Store a surface texture, discarding one that was never presented
    pub(crate) fn put(&self, texture: wgpu::SurfaceTexture) -> Result<()> {
        let mut slot = self.lock()?;
        *slot = Some(texture);
        Ok(())
    }

    pub(crate) fn take(&self) -> Result<Option<wgpu::SurfaceTexture>> {
        Ok(self.lock()?.take())
    }

    /// Create a view of the held surface texture
    pub(crate) fn create_view(&self) -> Result<wgpu::TextureView> {
        let slot = self.lock()?;
        let texture = slot.as_ref().ok_or_else(|| {
            engine_error!(SOURCE, "No surface texture was acquired through this semaphore");
            Error::InvalidState("no acquired surface texture".to_string())
        })?;
        Ok(texture.texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    pub fn holds_texture(&self) -> bool {
        self.texture.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<wgpu::SurfaceTexture>>> {
        self.texture
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Surface texture lock poisoned"))
    }
}

/// Placeholder for one swapchain image
///
/// Surface textures only exist between acquisition and presentation, so the
/// real view is created per frame by `attach_acquired_image`.
pub struct ImageView {
    pub(crate) image_index: u32,
}

impl ImageView {
    pub fn image_index(&self) -> u32 {
        self.image_index
    }
}

/// Depth texture owned by a render target
struct DepthAttachment {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthAttachment {
    fn new(ctx: &GpuContext, format: TextureFormat, extent: Extent2D) -> Result<Self> {
        let wgpu_format = texture_format_to_wgpu(format)
            .filter(|f| f.is_depth_stencil_format())
            .ok_or_else(|| engine_err!(SOURCE, "{:?} is not a depth format", format))?;

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lumen depth attachment"),
            size: wgpu::Extent3d { width: extent.width, height: extent.height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self { _texture: texture, view })
    }
}

/// Color target for one swapchain image, with an optional depth attachment
pub struct RenderTarget {
    /// View of the surface texture acquired for the current frame
    pub(crate) color: Option<wgpu::TextureView>,
    pub(crate) extent: Extent2D,
    depth: Option<DepthAttachment>,
}

impl RenderTarget {
    pub(crate) fn new(ctx: &GpuContext, depth_format: Option<TextureFormat>, extent: Extent2D) -> Result<Self> {
        let depth = match depth_format {
            Some(format) => Some(DepthAttachment::new(ctx, format, extent)?),
            None => None,
        };
        Ok(Self { color: None, extent, depth })
    }

    pub(crate) fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref().map(|depth| &depth.view)
    }

    /// Whether the target carries a depth attachment
    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}
