/// Swapchain trait - presentable image chain for one surface

use crate::error::Result;
use crate::graphics_device::{
    AcquireResult, Extent2D, PresentMode, PresentStatus, SurfaceFormat, TextureFormat,
};

/// Parameters a rendering context passes when (re)building a swapchain
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainDesc {
    /// Surface extent resolved by the context at build time
    pub requested_extent: Extent2D,
    /// Surface formats in order of preference
    pub preferred_formats: Vec<SurfaceFormat>,
    /// Present modes in order of preference
    pub present_modes: Vec<PresentMode>,
    /// Minimum number of images
    pub min_image_count: u32,
}

/// Swapchain for presenting rendered images to a window
///
/// A swapchain is never resized in place: the owning rendering context builds
/// a new one (handing the old one to the backend) and drops the old.
pub trait Swapchain: Send {
    /// Backend synchronization primitive used for acquire/present
    type Semaphore;

    /// Acquire the next presentable image
    ///
    /// Non-blocking with respect to the GPU. `image_acquired` is signaled
    /// when the image is ready to be written.
    ///
    /// `Suboptimal` / `OutOfDate` are statuses, not errors: the caller rebuilds.
    fn acquire_next_image(&mut self, image_acquired: &Self::Semaphore) -> Result<AcquireResult>;

    /// Queue the image for presentation once `render_complete` is signaled
    fn present(&mut self, image_index: u32, render_complete: &Self::Semaphore) -> Result<PresentStatus>;

    /// Number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Negotiated extent of the swapchain images
    fn extent(&self) -> Extent2D;

    /// Extent that was requested when this swapchain was built
    fn requested_extent(&self) -> Extent2D;

    /// Pixel format of the swapchain images
    fn format(&self) -> TextureFormat;

    /// Negotiated surface format (format + color space)
    fn surface_format(&self) -> SurfaceFormat;

    /// Negotiated present mode
    fn present_mode(&self) -> PresentMode;
}
