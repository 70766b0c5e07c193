/// CommandRecorder - WebGPU implementation of the engine CommandRecorder trait
///
/// A fresh command encoder is created by every `begin`. The open render pass
/// is detached from the encoder's lifetime so it can live in the recorder
/// between calls; the encoder stays locked until the pass is dropped by
/// `end_render_pass`.

use lumen_engine::lumen::render::{
    CommandRecorder as RendererCommandRecorder, Extent2D, IndexType, Rect2D, Viewport,
};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::engine_error;
use std::num::NonZeroU64;
use std::sync::Arc;

use crate::wgpu_buffer::Buffer;
use crate::wgpu_context::{GpuContext, MAX_PUSH_CONSTANT_SIZE, SOURCE};
use crate::wgpu_format::index_type_to_wgpu;
use crate::wgpu_frame::RenderTarget;
use crate::wgpu_pipeline::Pipeline;
use crate::wgpu_texture::Texture;

/// Push constant updates a recorder holds before its constant buffer grows
const INITIAL_PUSH_SLOTS: u64 = 16;

/// Recording state shared by every command
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordingState {
    pub recording: bool,
    pub in_render_pass: bool,
}

impl RecordingState {
    pub fn require_recording(&self, what: &str) -> Result<()> {
        if !self.recording {
            engine_error!(SOURCE, "{} called while the recorder is not recording", what);
            return Err(Error::InvalidState(format!("{}: command recorder is not recording", what)));
        }
        Ok(())
    }

    pub fn require_render_pass(&self, what: &str) -> Result<()> {
        self.require_recording(what)?;
        if !self.in_render_pass {
            engine_error!(SOURCE, "{} called outside a render pass", what);
            return Err(Error::InvalidState(format!("{}: no render pass open", what)));
        }
        Ok(())
    }

    pub fn require_no_render_pass(&self, what: &str) -> Result<()> {
        self.require_recording(what)?;
        if self.in_render_pass {
            engine_error!(SOURCE, "{} called while a render pass is still open", what);
            return Err(Error::InvalidState(format!("{}: render pass still open", what)));
        }
        Ok(())
    }
}

/// Color load operation: clear to the given color, or keep the contents
pub(crate) fn color_load_op(clear_color: Option<[f32; 4]>) -> wgpu::LoadOp<wgpu::Color> {
    match clear_color {
        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }),
        None => wgpu::LoadOp::Load,
    }
}

/// Restrict a viewport to the render target, `None` when nothing is left
///
/// WebGPU rejects viewports reaching outside the attachment.
pub(crate) fn clamp_viewport(viewport: Viewport, extent: Extent2D) -> Option<Viewport> {
    let x = viewport.x.clamp(0.0, extent.width as f32);
    let y = viewport.y.clamp(0.0, extent.height as f32);
    let width = (viewport.x + viewport.width).min(extent.width as f32) - x;
    let height = (viewport.y + viewport.height).min(extent.height as f32) - y;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(Viewport { x, y, width, height, ..viewport })
}

/// Restrict a scissor rectangle to the render target as `(x, y, width, height)`
pub(crate) fn clamp_scissor(scissor: Rect2D, extent: Extent2D) -> (u32, u32, u32, u32) {
    let x0 = (scissor.x.max(0) as u32).min(extent.width);
    let y0 = (scissor.y.max(0) as u32).min(extent.height);
    let x1 = (scissor.x as i64 + scissor.width as i64).clamp(0, extent.width as i64) as u32;
    let y1 = (scissor.y as i64 + scissor.height as i64).clamp(0, extent.height as i64) as u32;
    (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

/// Distance between two push constant slots in the constant buffer
pub(crate) fn push_slot_stride(uniform_alignment: u64) -> u64 {
    let alignment = uniform_alignment.max(1);
    (MAX_PUSH_CONSTANT_SIZE as u64).div_ceil(alignment) * alignment
}

/// Uniform buffer backing emulated push constants
///
/// Every update takes a new slot so earlier draws of the same recording keep
/// their values; slots are recycled by the next `begin`.
struct PushConstantBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: u64,
    used: u64,
}

impl PushConstantBuffer {
    fn new(ctx: &GpuContext, capacity: u64) -> Self {
        let stride = push_slot_stride(ctx.uniform_alignment);
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen push constants"),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen push constants"),
            layout: &ctx.push_constant_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(MAX_PUSH_CONSTANT_SIZE as u64),
                }),
            }],
        });
        Self { buffer, bind_group, stride, capacity, used: 0 }
    }

    /// Write `data` into a free slot and return its dynamic offset
    fn push(&mut self, ctx: &GpuContext, data: &[u8]) -> Result<u32> {
        if self.used == self.capacity {
            // Binds recorded so far keep the old buffer alive
            *self = Self::new(ctx, self.capacity * 2);
        }
        let offset = self.used * self.stride;
        ctx.queue.write_buffer(&self.buffer, offset, data);
        self.used += 1;
        u32::try_from(offset).map_err(|_| {
            engine_error!(SOURCE, "Push constant offset {} exceeds dynamic offset range", offset);
            Error::OutOfMemory
        })
    }
}

/// WebGPU command recorder
pub struct CommandRecorder {
    ctx: Arc<GpuContext>,
    encoder: Option<wgpu::CommandEncoder>,
    pass: Option<wgpu::RenderPass<'static>>,
    /// Commands finished by `end`, waiting for submission
    finished: Option<wgpu::CommandBuffer>,
    push_constants: PushConstantBuffer,
    /// Extent of the target of the open render pass
    target_extent: Extent2D,
    state: RecordingState,
}

/// The open render pass, or an `InvalidState` error
fn open_pass<'a>(
    state: &RecordingState,
    pass: &'a mut Option<wgpu::RenderPass<'static>>,
    what: &str,
) -> Result<&'a mut wgpu::RenderPass<'static>> {
    state.require_render_pass(what)?;
    pass.as_mut()
        .ok_or_else(|| Error::InvalidState(format!("{}: no render pass open", what)))
}

impl CommandRecorder {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        let push_constants = PushConstantBuffer::new(&ctx, INITIAL_PUSH_SLOTS);
        Self {
            ctx,
            encoder: None,
            pass: None,
            finished: None,
            push_constants,
            target_extent: Extent2D::default(),
            state: RecordingState::default(),
        }
    }

    /// Hand the finished command buffer over for submission
    pub(crate) fn take_finished(&mut self) -> Result<wgpu::CommandBuffer> {
        if self.state.recording {
            engine_error!(SOURCE, "Submit of a recorder that is still recording");
            return Err(Error::InvalidState("command recorder is still recording".to_string()));
        }
        self.finished.take().ok_or_else(|| {
            engine_error!(SOURCE, "Submit of a recorder with nothing recorded");
            Error::InvalidState("command recorder has no finished commands".to_string())
        })
    }

    fn check_buffer_offset(buffer: &Buffer, offset: u64) -> Result<()> {
        if offset > buffer.size() {
            engine_error!(SOURCE, "Bind offset {} is past the end of a {} byte buffer", offset, buffer.size());
            return Err(Error::InvalidResource(format!("bind offset {} past buffer end", offset)));
        }
        Ok(())
    }
}

impl RendererCommandRecorder for CommandRecorder {
    type RenderTarget = RenderTarget;
    type Buffer = Buffer;
    type Texture = Texture;
    type Pipeline = Pipeline;

    fn begin(&mut self) -> Result<()> {
        self.pass = None;
        self.finished = None;
        self.state = RecordingState::default();
        self.push_constants.used = 0;
        self.encoder = Some(self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lumen frame encoder"),
        }));
        self.state.recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.state.require_no_render_pass("end")?;
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| Error::InvalidState("end: no command encoder".to_string()))?;
        self.finished = Some(encoder.finish());
        self.state.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.state.recording
    }

    fn begin_render_pass(&mut self, target: &RenderTarget, clear_color: Option<[f32; 4]>) -> Result<()> {
        self.state.require_no_render_pass("begin_render_pass")?;
        let view = target.color.as_ref().ok_or_else(|| {
            engine_error!(SOURCE, "begin_render_pass on a target without an acquired image");
            Error::InvalidState("render target has no acquired image".to_string())
        })?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| Error::InvalidState("begin_render_pass: no command encoder".to_string()))?;

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load_op(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: target.depth_view().map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.pass = Some(pass.forget_lifetime());
        self.target_extent = target.extent;
        self.state.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.state.require_render_pass("end_render_pass")?;
        self.pass = None;
        self.state.in_render_pass = false;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline) -> Result<()> {
        let pass = open_pass(&self.state, &mut self.pass, "bind_pipeline")?;
        pass.set_pipeline(&pipeline.pipeline);
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Buffer, offset: u64) -> Result<()> {
        Self::check_buffer_offset(buffer, offset)?;
        let pass = open_pass(&self.state, &mut self.pass, "bind_vertex_buffer")?;
        pass.set_vertex_buffer(0, buffer.buffer.slice(offset..));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64, index_type: IndexType) -> Result<()> {
        Self::check_buffer_offset(buffer, offset)?;
        let pass = open_pass(&self.state, &mut self.pass, "bind_index_buffer")?;
        pass.set_index_buffer(buffer.buffer.slice(offset..), index_type_to_wgpu(index_type));
        Ok(())
    }

    fn bind_texture(&mut self, pipeline: &Pipeline, texture: &Texture) -> Result<()> {
        if !pipeline.sampled_texture {
            engine_error!(SOURCE, "bind_texture on a pipeline without a texture binding");
            return Err(Error::InvalidResource("pipeline does not sample textures".to_string()));
        }
        let pass = open_pass(&self.state, &mut self.pass, "bind_texture")?;
        pass.set_bind_group(0, &texture.bind_group, &[]);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        let extent = self.target_extent;
        let pass = open_pass(&self.state, &mut self.pass, "set_viewport")?;
        if let Some(vp) = clamp_viewport(viewport, extent) {
            pass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        let extent = self.target_extent;
        let pass = open_pass(&self.state, &mut self.pass, "set_scissor")?;
        let (x, y, width, height) = clamp_scissor(scissor, extent);
        pass.set_scissor_rect(x, y, width, height);
        Ok(())
    }

    fn push_constants(&mut self, pipeline: &Pipeline, data: &[u8]) -> Result<()> {
        self.state.require_render_pass("push_constants")?;
        if data.len() as u32 > pipeline.push_constant_size || data.len() % 4 != 0 {
            engine_error!(SOURCE, "Push constants of {} bytes do not fit the pipeline range of {} bytes",
                data.len(), pipeline.push_constant_size);
            return Err(Error::InvalidResource("push constants exceed pipeline range".to_string()));
        }
        let Some(group) = pipeline.push_constant_group else {
            return Err(Error::InvalidResource("pipeline has no push constants".to_string()));
        };

        let offset = self.push_constants.push(&self.ctx, data)?;
        let pass = open_pass(&self.state, &mut self.pass, "push_constants")?;
        pass.set_bind_group(group, &self.push_constants.bind_group, &[offset]);
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        let pass = open_pass(&self.state, &mut self.pass, "draw_indexed")?;
        pass.draw_indexed(first_index..first_index.saturating_add(index_count), vertex_offset, 0..1);
        Ok(())
    }
}

#[cfg(test)]
#[path = "wgpu_command_recorder_tests.rs"]
mod tests;
