/// CommandRecorder - Vulkan implementation of the engine CommandRecorder trait

use ash::vk;
use lumen_engine::lumen::render::{CommandRecorder as RendererCommandRecorder, IndexType, Rect2D, Viewport};
use lumen_engine::lumen::{Error, Result};
use lumen_engine::engine_error;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{map_vk_error, GpuContext, SOURCE};
use crate::vulkan_format::index_type_to_vk;
use crate::vulkan_frame::RenderTarget;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_texture::Texture;

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

/// Clear values for a render pass: color, then depth/stencil when present
pub(crate) fn clear_values(clear_color: Option<[f32; 4]>, has_depth: bool) -> Vec<vk::ClearValue> {
    let mut values = vec![vk::ClearValue {
        color: vk::ClearColorValue { float32: clear_color.unwrap_or([0.0; 4]) },
    }];
    if has_depth {
        values.push(vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
        });
    }
    values
}

/// Vulkan command recorder
///
/// Owns its command pool; `begin` resets the whole pool before recording.
pub struct CommandRecorder {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    pub(crate) command_buffer: vk::CommandBuffer,
    state: RecordingState,
}

impl CommandRecorder {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);

            let command_pool = ctx
                .device
                .create_command_pool(&command_pool_create_info, None)
                .map_err(|e| map_vk_error("create command pool", e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(map_vk_error("allocate command buffer", e));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer: command_buffers[0],
                state: RecordingState::default(),
            })
        }
    }
}

impl RendererCommandRecorder for CommandRecorder {
    type RenderTarget = RenderTarget;
    type Buffer = Buffer;
    type Texture = Texture;
    type Pipeline = Pipeline;

    fn begin(&mut self) -> Result<()> {
        self.state = RecordingState::default();
        unsafe {
            self.ctx
                .device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| map_vk_error("reset command pool", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| map_vk_error("begin command buffer", e))?;
        }
        self.state.recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.state.require_no_render_pass("end")?;
        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| map_vk_error("end command buffer", e))?;
        }
        self.state.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.state.recording
    }

    fn begin_render_pass(&mut self, target: &RenderTarget, clear_color: Option<[f32; 4]>) -> Result<()> {
        self.state.require_no_render_pass("begin_render_pass")?;

        // Both passes have the same clear value layout; LOAD ignores the color value
        let render_pass = if clear_color.is_some() { target.clear_pass } else { target.load_pass };
        let clear_values = clear_values(clear_color, target.has_depth());

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(target.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: target.extent.width, height: target.extent.height },
            })
            .clear_values(&clear_values);

        unsafe {
            self.ctx
                .device
                .cmd_begin_render_pass(self.command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        }
        self.state.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.state.require_render_pass("end_render_pass")?;
        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        self.state.in_render_pass = false;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline) -> Result<()> {
        self.state.require_render_pass("bind_pipeline")?;
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Buffer, offset: u64) -> Result<()> {
        self.state.require_recording("bind_vertex_buffer")?;
        unsafe {
            self.ctx
                .device
                .cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64, index_type: IndexType) -> Result<()> {
        self.state.require_recording("bind_index_buffer")?;
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn bind_texture(&mut self, pipeline: &Pipeline, texture: &Texture) -> Result<()> {
        self.state.require_recording("bind_texture")?;
        if !pipeline.sampled_texture {
            engine_error!(SOURCE, "bind_texture on a pipeline without a texture binding");
            return Err(Error::InvalidResource("pipeline does not sample textures".to_string()));
        }
        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                0,
                &[texture.descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.state.require_recording("set_viewport")?;
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.state.require_recording("set_scissor")?;
        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn push_constants(&mut self, pipeline: &Pipeline, data: &[u8]) -> Result<()> {
        self.state.require_recording("push_constants")?;
        if data.len() as u32 > pipeline.push_constant_size || data.len() % 4 != 0 {
            engine_error!(SOURCE, "Push constants of {} bytes do not fit the pipeline range of {} bytes",
                data.len(), pipeline.push_constant_size);
            return Err(Error::InvalidResource("push constants exceed pipeline range".to_string()));
        }
        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                pipeline.layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                data,
            );
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.state.require_render_pass("draw_indexed")?;
        unsafe {
            self.ctx
                .device
                .cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        unsafe {
            // Frees the command buffer with the pool
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_command_recorder_tests.rs"]
mod tests;
