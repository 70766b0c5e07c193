/// Per-image and per-slot GPU objects owned by a rendering context

use crate::error::Result;
use crate::graphics_device::{AttachmentFlags, Extent2D, GraphicsDevice, TextureFormat};

/// Objects belonging to one swapchain image
///
/// Fields drop in declaration order: the render target goes before the view
/// it references.
pub struct FrameObjects<D: GraphicsDevice> {
    pub(crate) recorder: D::CommandRecorder,
    pub(crate) render_target: D::RenderTarget,
    pub(crate) image_view: D::ImageView,
    /// Signaled when the GPU is done with this frame's commands
    pub(crate) fence: D::Fence,
}

impl<D: GraphicsDevice> FrameObjects<D> {
    pub(crate) fn new(
        device: &D,
        swapchain: &D::Swapchain,
        image_index: u32,
        attachments: AttachmentFlags,
    ) -> Result<Self> {
        let image_view = device.create_image_view(swapchain, image_index)?;
        let render_target = device.create_render_target(swapchain, &image_view, attachments)?;
        let recorder = device.create_command_recorder()?;
        // Created signaled so the first wait on a fresh frame returns at once
        let fence = device.create_fence(true)?;

        Ok(Self { recorder, render_target, image_view, fence })
    }

    pub fn recorder(&self) -> &D::CommandRecorder {
        &self.recorder
    }

    pub fn render_target(&self) -> &D::RenderTarget {
        &self.render_target
    }

    pub fn image_view(&self) -> &D::ImageView {
        &self.image_view
    }

    pub fn fence(&self) -> &D::Fence {
        &self.fence
    }
}

/// Acquire/present semaphore pair of one slot
pub struct FrameSemaphores<D: GraphicsDevice> {
    pub(crate) image_acquired: D::Semaphore,
    pub(crate) render_complete: D::Semaphore,
}

impl<D: GraphicsDevice> FrameSemaphores<D> {
    pub(crate) fn new(device: &D) -> Result<Self> {
        Ok(Self {
            image_acquired: device.create_semaphore()?,
            render_complete: device.create_semaphore()?,
        })
    }

    pub fn image_acquired(&self) -> &D::Semaphore {
        &self.image_acquired
    }

    pub fn render_complete(&self) -> &D::Semaphore {
        &self.render_complete
    }
}

/// Frame acquired by [`RenderingContext::begin_frame`](crate::rendering_context::RenderingContext::begin_frame)
///
/// Borrows the context: drop it before calling `submit_frame`.
pub struct FrameHandle<'a, D: GraphicsDevice> {
    /// Recorder, already begun
    pub recorder: &'a mut D::CommandRecorder,
    /// Render target of the acquired image
    pub render_target: &'a D::RenderTarget,
    /// Extent of the render target
    pub extent: Extent2D,
    /// Acquired swapchain image index
    pub image_index: u32,
    /// Frame object index (equals the image index)
    pub frame_index: usize,
    /// Color format of the render target
    pub format: TextureFormat,
}
