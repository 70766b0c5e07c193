/// CommandRecorder trait - per-frame command recording

use crate::error::Result;
use crate::graphics_device::{IndexType, Rect2D, Viewport};

/// Records GPU commands for one frame
///
/// Each frame object owns one recorder with its own command pool. The
/// rendering context resets and begins it once the frame's fence has
/// signaled, and ends it before submission.
pub trait CommandRecorder: Send {
    type RenderTarget;
    type Buffer;
    type Texture;
    type Pipeline;

    /// Reset the recorder's pool and begin one-time-submit recording
    fn begin(&mut self) -> Result<()>;

    /// Finish recording
    fn end(&mut self) -> Result<()>;

    /// Whether `begin` was called without a matching `end`
    fn is_recording(&self) -> bool;

    /// Begin a render pass on the target
    ///
    /// # Arguments
    ///
    /// * `target` - Render target (color and optional depth attachment)
    /// * `clear_color` - Clear the color attachment when set, load it otherwise
    fn begin_render_pass(&mut self, target: &Self::RenderTarget, clear_color: Option<[f32; 4]>) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Self::Pipeline) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: &Self::Buffer, offset: u64) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: &Self::Buffer, offset: u64, index_type: IndexType) -> Result<()>;

    /// Bind the texture sampled by the pipeline
    fn bind_texture(&mut self, pipeline: &Self::Pipeline, texture: &Self::Texture) -> Result<()>;

    /// Set the dynamic viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the dynamic scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Update vertex-stage push constants
    fn push_constants(&mut self, pipeline: &Self::Pipeline, data: &[u8]) -> Result<()>;

    /// Indexed draw of one instance
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Offset into the bound index buffer (in indices)
    /// * `vertex_offset` - Value added to each index before fetching vertices
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;
}
