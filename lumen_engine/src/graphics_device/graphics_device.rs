/// GraphicsDevice trait - capability interface implemented by each backend

use std::sync::Arc;
use std::time::Duration;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentFlags, BackendKind, BufferDesc, CommandRecorder, PipelineDesc, SurfaceCapabilities,
    Swapchain, SwapchainDesc, TextureDesc, TextureFormat, Window,
};

/// Logical GPU device shared (through `Arc`) by every rendering context
///
/// The associated types are the backend's concrete objects, so the rendering
/// context and the UI renderer are statically dispatched and never downcast.
///
/// Device-level state is not mutated on the per-frame path except internal
/// caches guarded by a `Mutex`.
pub trait GraphicsDevice: Send + Sync + Sized + 'static {
    /// Presentation surface bound to one window
    type Surface: Send;
    /// Swapchain built on a surface
    type Swapchain: Swapchain<Semaphore = Self::Semaphore>;
    /// View on one swapchain image
    type ImageView: Send;
    /// Framebuffer: color view plus optional depth attachment
    type RenderTarget: Send;
    /// Per-frame command recorder (own pool)
    type CommandRecorder: CommandRecorder<
        RenderTarget = Self::RenderTarget,
        Buffer = Self::Buffer,
        Texture = Self::Texture,
        Pipeline = Self::Pipeline,
    >;
    /// CPU-waitable GPU completion signal
    type Fence: Send;
    /// GPU-GPU synchronization primitive
    type Semaphore: Send;
    type Buffer: Send;
    type Texture: Send;
    type Pipeline: Send;

    /// Which backend this device belongs to
    fn backend(&self) -> BackendKind;

    // ===== PRESENTATION =====

    /// Create a presentation surface for a window
    fn create_surface(&self, window: &Arc<dyn Window>) -> Result<Self::Surface>;

    /// Query live surface capabilities (extent limits, formats, present modes)
    fn surface_capabilities(&self, surface: &Self::Surface) -> Result<SurfaceCapabilities>;

    /// Create a swapchain, handing over the previous one when rebuilding
    fn create_swapchain(
        &self,
        surface: &Self::Surface,
        desc: &SwapchainDesc,
        old: Option<&Self::Swapchain>,
    ) -> Result<Self::Swapchain>;

    // ===== FRAME OBJECTS =====

    /// Create a view on a swapchain image
    fn create_image_view(&self, swapchain: &Self::Swapchain, image_index: u32) -> Result<Self::ImageView>;

    /// Create a render target for a swapchain image view
    ///
    /// A depth attachment is added when `attachments` contains `DEPTH` and the
    /// device reports a depth format.
    fn create_render_target(
        &self,
        swapchain: &Self::Swapchain,
        view: &Self::ImageView,
        attachments: AttachmentFlags,
    ) -> Result<Self::RenderTarget>;

    /// Create a command recorder with its own pool
    fn create_command_recorder(&self) -> Result<Self::CommandRecorder>;

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<Self::Fence>;

    /// Create a semaphore
    fn create_semaphore(&self) -> Result<Self::Semaphore>;

    /// Number of semaphore slots for a swapchain with `image_count` images
    fn semaphore_slot_count(&self, image_count: usize) -> usize;

    /// Bind the image acquired through `image_acquired` to a render target
    ///
    /// Backends whose render targets already reference their swapchain image
    /// do nothing here.
    fn attach_acquired_image(
        &self,
        _target: &mut Self::RenderTarget,
        _image_acquired: &Self::Semaphore,
    ) -> Result<()> {
        Ok(())
    }

    // ===== SYNCHRONIZATION & SUBMISSION =====

    /// Block until the fence is signaled
    ///
    /// Returns `Error::Timeout` when `timeout` expires first.
    fn wait_for_fence(&self, fence: &Self::Fence, timeout: Duration) -> Result<()>;

    /// Return a fence to the unsignaled state
    fn reset_fence(&self, fence: &Self::Fence) -> Result<()>;

    /// Submit recorded commands
    ///
    /// Waits on `wait` at color-attachment output, then signals `signal` and
    /// `fence` on completion.
    fn submit(
        &self,
        recorder: &mut Self::CommandRecorder,
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> Result<()>;

    /// Depth format supported for render target attachments, if any
    fn depth_format(&self) -> Option<TextureFormat>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;

    // ===== RESOURCES =====

    /// Create a host-visible buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Self::Buffer>;

    /// Write bytes into a buffer
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]) -> Result<()>;

    /// Create a sampled texture and upload its initial pixels
    fn create_texture(&self, desc: &TextureDesc, data: &[u8]) -> Result<Self::Texture>;

    /// Create a graphics pipeline
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Self::Pipeline>;
}
