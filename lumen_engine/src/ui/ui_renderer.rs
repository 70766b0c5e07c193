/// UiRenderer - records UI draw data into a rendering context's frame
///
/// Holds the device through `Arc` (no global backend state). Vertex and index
/// buffers are kept per context and per frame index: frame `i`'s buffers are
/// only rewritten after `begin_frame` has waited on frame `i`'s fence.

use std::mem::size_of;
use std::sync::Arc;
use glam::Vec2;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::error::Result;
use crate::graphics_device::{
    AttachmentFlags, BlendMode, BufferDesc, BufferUsage, CommandRecorder, CullMode,
    GraphicsDevice, IndexType, PipelineDesc, Rect2D, ShaderSource, TextureDesc, TextureFormat,
    VertexAttribute, VertexFormat, VertexLayout, Viewport,
};
use crate::rendering_context::{ContextId, FrameHandle, RenderingContext};
use crate::ui::{DrawData, DrawIdx, DrawVert, FontAtlas, TextureId};
use crate::{engine_debug, engine_warn};

const SOURCE: &str = "lumen::UiRenderer";

/// Size of the vertex-stage push constants: scale (vec2) + translate (vec2)
pub const UI_PUSH_CONSTANT_SIZE: u32 = 16;

/// GPU buffer sizes are rounded up to this
const BUFFER_ALIGNMENT: u64 = 256;

/// Interleaved layout of [`DrawVert`]
pub fn ui_vertex_layout() -> VertexLayout {
    VertexLayout {
        stride: size_of::<DrawVert>() as u32,
        attributes: vec![
            VertexAttribute { location: 0, format: VertexFormat::Float32x2, offset: 0 },
            VertexAttribute { location: 1, format: VertexFormat::Float32x2, offset: 8 },
            VertexAttribute { location: 2, format: VertexFormat::Unorm8x4, offset: 16 },
        ],
    }
}

/// Push constants mapping display coordinates to clip space
pub fn ui_push_constants(draw_data: &DrawData) -> [f32; 4] {
    let scale = Vec2::new(2.0 / draw_data.display_size.x, 2.0 / draw_data.display_size.y);
    let translate = Vec2::NEG_ONE - draw_data.display_pos * scale;
    [scale.x, scale.y, translate.x, translate.y]
}

/// Project a clip rectangle into framebuffer pixels
///
/// Returns `None` when nothing of it remains inside the framebuffer.
pub fn project_clip_rect(clip_rect: [f32; 4], draw_data: &DrawData) -> Option<Rect2D> {
    let offset = draw_data.display_pos;
    let scale = draw_data.framebuffer_scale;
    let fb = draw_data.framebuffer_size();

    let min = ((Vec2::new(clip_rect[0], clip_rect[1]) - offset) * scale).max(Vec2::ZERO);
    let max = ((Vec2::new(clip_rect[2], clip_rect[3]) - offset) * scale).min(fb);
    if max.x <= min.x || max.y <= min.y {
        return None;
    }

    Some(Rect2D {
        x: min.x as i32,
        y: min.y as i32,
        width: (max.x - min.x) as u32,
        height: (max.y - min.y) as u32,
    })
}

/// UI renderer creation parameters
#[derive(Debug, Clone)]
pub struct UiRendererDesc {
    /// UI shader for the device's backend
    pub shader: ShaderSource,
    /// Color format of the contexts rendered into
    pub color_format: TextureFormat,
    /// Attachments of those contexts' render targets
    pub attachments: AttachmentFlags,
    /// Clear the color attachment before drawing (load it when `None`)
    pub clear_color: Option<[f32; 4]>,
}

struct GpuBuffer<D: GraphicsDevice> {
    buffer: D::Buffer,
    size: u64,
}

/// Vertex and index buffers of one frame index
struct FrameRenderBuffers<D: GraphicsDevice> {
    vertex: Option<GpuBuffer<D>>,
    index: Option<GpuBuffer<D>>,
}

impl<D: GraphicsDevice> FrameRenderBuffers<D> {
    fn empty() -> Self {
        Self { vertex: None, index: None }
    }
}

/// Grow `slot` to hold at least `needed` bytes; never shrinks
fn ensure_buffer<'a, D: GraphicsDevice>(
    device: &D,
    slot: &'a mut Option<GpuBuffer<D>>,
    needed: u64,
    usage: BufferUsage,
) -> Result<&'a D::Buffer> {
    let gpu = match slot.take() {
        Some(existing) if existing.size >= needed => existing,
        _ => {
            let size = needed.div_ceil(BUFFER_ALIGNMENT) * BUFFER_ALIGNMENT;
            let buffer = device.create_buffer(&BufferDesc {
                label: format!("ui {:?} buffer", usage),
                size,
                usage,
            })?;
            GpuBuffer { buffer, size }
        }
    };
    Ok(&slot.insert(gpu).buffer)
}

/// Renderer backend for immediate-mode UI draw data
pub struct UiRenderer<D: GraphicsDevice> {
    buffers: FxHashMap<ContextId, Vec<FrameRenderBuffers<D>>>,
    textures: SlotMap<TextureId, D::Texture>,
    font_texture: Option<TextureId>,
    pipeline: D::Pipeline,
    clear_color: Option<[f32; 4]>,
    device: Arc<D>,
}

impl<D: GraphicsDevice> UiRenderer<D> {
    /// Create the UI pipeline
    ///
    /// Alpha blending, no culling, dynamic viewport/scissor, 16 bytes of
    /// push constants, one sampled texture.
    pub fn new(device: Arc<D>, desc: UiRendererDesc) -> Result<Self> {
        let depth_format = if desc.attachments.contains(AttachmentFlags::DEPTH) {
            device.depth_format()
        } else {
            None
        };

        let pipeline = device.create_pipeline(&PipelineDesc {
            label: "ui".to_string(),
            shader: desc.shader,
            vertex_layout: ui_vertex_layout(),
            color_format: desc.color_format,
            depth_format,
            blend: BlendMode::Alpha,
            cull_mode: CullMode::None,
            push_constant_size: UI_PUSH_CONSTANT_SIZE,
            sampled_texture: true,
        })?;

        engine_debug!(SOURCE, "UI pipeline created for {:?}", desc.color_format);

        Ok(Self {
            buffers: FxHashMap::default(),
            textures: SlotMap::with_key(),
            font_texture: None,
            pipeline,
            clear_color: desc.clear_color,
            device,
        })
    }

    // ===== TEXTURES =====

    /// Upload the font atlas, replacing a previously uploaded one
    pub fn upload_fonts(&mut self, atlas: &FontAtlas) -> Result<TextureId> {
        let texture = self.device.create_texture(
            &TextureDesc {
                label: "ui font atlas".to_string(),
                width: atlas.width,
                height: atlas.height,
                format: TextureFormat::R8G8B8A8_UNORM,
            },
            &atlas.pixels,
        )?;

        if let Some(old) = self.font_texture.take() {
            // Draws still in flight may sample the old atlas
            self.device.wait_idle()?;
            self.textures.remove(old);
        }
        let id = self.textures.insert(texture);
        self.font_texture = Some(id);
        Ok(id)
    }

    pub fn font_texture(&self) -> Option<TextureId> {
        self.font_texture
    }

    /// Make a texture drawable by UI commands
    pub fn register_texture(&mut self, texture: D::Texture) -> TextureId {
        self.textures.insert(texture)
    }

    /// Stop drawing a texture and hand it back
    ///
    /// The caller keeps it alive until frames referencing it have completed.
    pub fn unregister_texture(&mut self, id: TextureId) -> Option<D::Texture> {
        if self.font_texture == Some(id) {
            self.font_texture = None;
        }
        self.textures.remove(id)
    }

    // ===== RENDERING =====

    /// Begin a frame on `context` and record `draw_data` into it
    ///
    /// Submission stays with the caller (`context.submit_frame()`).
    pub fn render(&mut self, context: &mut RenderingContext<D>, draw_data: &DrawData) -> Result<()> {
        let id = context.id();
        let mut frame = context.begin_frame()?;
        self.record(&mut frame, id, draw_data)
    }

    /// Record `draw_data` into an acquired frame of context `context_id`
    pub fn record(&mut self, frame: &mut FrameHandle<'_, D>, context_id: ContextId, draw_data: &DrawData) -> Result<()> {
        let fb = draw_data.framebuffer_size();
        if fb.x <= 0.0 || fb.y <= 0.0 {
            return Ok(());
        }

        let per_frame = self.buffers.entry(context_id).or_default();
        if per_frame.len() <= frame.frame_index {
            per_frame.resize_with(frame.frame_index + 1, FrameRenderBuffers::empty);
        }
        let render_buffers = &mut per_frame[frame.frame_index];

        // Upload vertices and indices of all lists back to back
        let total_vtx = draw_data.total_vtx_count();
        let total_idx = draw_data.total_idx_count();
        let mut geometry = None;
        if total_vtx > 0 && total_idx > 0 {
            let vertex_size = (total_vtx * size_of::<DrawVert>()) as u64;
            let index_size = (total_idx * size_of::<DrawIdx>()) as u64;
            let vertex_buffer = ensure_buffer(&*self.device, &mut render_buffers.vertex, vertex_size, BufferUsage::Vertex)?;
            let index_buffer = ensure_buffer(&*self.device, &mut render_buffers.index, index_size, BufferUsage::Index)?;

            let mut vtx_dst = 0u64;
            let mut idx_dst = 0u64;
            for list in &draw_data.draw_lists {
                let vertices: &[u8] = bytemuck::cast_slice(&list.vtx_buffer);
                let indices: &[u8] = bytemuck::cast_slice(&list.idx_buffer);
                self.device.write_buffer(vertex_buffer, vtx_dst, vertices)?;
                self.device.write_buffer(index_buffer, idx_dst, indices)?;
                vtx_dst += vertices.len() as u64;
                idx_dst += indices.len() as u64;
            }
            geometry = Some((vertex_buffer, index_buffer));
        }

        let recorder = &mut *frame.recorder;
        recorder.begin_render_pass(frame.render_target, self.clear_color)?;

        let result = (|| -> Result<()> {
            // Render state
            recorder.bind_pipeline(&self.pipeline)?;
            if let Some((vertex_buffer, index_buffer)) = geometry {
                recorder.bind_vertex_buffer(vertex_buffer, 0)?;
                recorder.bind_index_buffer(index_buffer, 0, IndexType::U16)?;
            }
            recorder.set_viewport(Viewport {
                x: 0.0,
                y: 0.0,
                width: fb.x,
                height: fb.y,
                min_depth: 0.0,
                max_depth: 1.0,
            })?;
            let constants = ui_push_constants(draw_data);
            recorder.push_constants(&self.pipeline, bytemuck::cast_slice(&constants))?;

            if geometry.is_none() {
                return Ok(());
            }

            let mut bound_texture = None;
            let mut global_vtx = 0u32;
            let mut global_idx = 0u32;
            for list in &draw_data.draw_lists {
                for cmd in &list.commands {
                    let Some(scissor) = project_clip_rect(cmd.clip_rect, draw_data) else {
                        continue;
                    };
                    if bound_texture != Some(cmd.texture_id) {
                        let Some(texture) = self.textures.get(cmd.texture_id) else {
                            engine_warn!(SOURCE, "Draw command references unknown texture {:?}", cmd.texture_id);
                            continue;
                        };
                        recorder.bind_texture(&self.pipeline, texture)?;
                        bound_texture = Some(cmd.texture_id);
                    }
                    recorder.set_scissor(scissor)?;
                    recorder.draw_indexed(
                        cmd.elem_count,
                        cmd.idx_offset + global_idx,
                        (cmd.vtx_offset + global_vtx) as i32,
                    )?;
                }
                global_idx += list.idx_buffer.len() as u32;
                global_vtx += list.vtx_buffer.len() as u32;
            }

            // Leave a full-framebuffer scissor for anything recorded after us
            recorder.set_scissor(Rect2D { x: 0, y: 0, width: fb.x as u32, height: fb.y as u32 })
        })();

        recorder.end_render_pass()?;
        result
    }

    /// Drop the buffers of a destroyed context
    pub fn release_context(&mut self, context_id: ContextId) {
        if self.buffers.remove(&context_id).is_some() {
            engine_debug!(SOURCE, "Released UI buffers of context {}", context_id.value());
        }
    }

    /// Whether buffers are held for a context
    pub fn has_context_buffers(&self, context_id: ContextId) -> bool {
        self.buffers.contains_key(&context_id)
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }
}

#[cfg(test)]
#[path = "ui_renderer_tests.rs"]
mod tests;
