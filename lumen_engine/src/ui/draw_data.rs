/// Draw data produced by an immediate-mode UI library
///
/// The engine does not lay out widgets: the UI library fills these lists each
/// frame and the renderer turns them into indexed draws.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use slotmap::new_key_type;

new_key_type! {
    /// Texture referenced by draw commands
    pub struct TextureId;

    /// UI viewport (one OS window)
    pub struct ViewportId;
}

/// UI vertex: position, texture coordinates, packed RGBA8 color
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct DrawVert {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    /// RGBA, red in the lowest byte
    pub col: u32,
}

impl DrawVert {
    pub fn new(pos: [f32; 2], uv: [f32; 2], rgba: [u8; 4]) -> Self {
        Self { pos, uv, col: u32::from_le_bytes(rgba) }
    }
}

/// Index type of UI meshes
pub type DrawIdx = u16;

/// One indexed draw within a draw list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCmd {
    /// Number of indices
    pub elem_count: u32,
    /// First index within the list's index buffer
    pub idx_offset: u32,
    /// First vertex within the list's vertex buffer
    pub vtx_offset: u32,
    /// Clip rectangle `[min_x, min_y, max_x, max_y]` in display coordinates
    pub clip_rect: [f32; 4],
    pub texture_id: TextureId,
}

/// Vertices, indices and commands of one UI layer
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub vtx_buffer: Vec<DrawVert>,
    pub idx_buffer: Vec<DrawIdx>,
    pub commands: Vec<DrawCmd>,
}

/// Everything to draw for one viewport in one frame
#[derive(Debug, Clone, Default)]
pub struct DrawData {
    /// Top-left of the viewport in display coordinates
    pub display_pos: Vec2,
    /// Size of the viewport in display coordinates
    pub display_size: Vec2,
    /// Display to framebuffer pixel ratio (HiDPI)
    pub framebuffer_scale: Vec2,
    pub draw_lists: Vec<DrawList>,
}

impl DrawData {
    pub fn new(display_pos: Vec2, display_size: Vec2, framebuffer_scale: Vec2) -> Self {
        Self { display_pos, display_size, framebuffer_scale, draw_lists: Vec::new() }
    }

    pub fn total_vtx_count(&self) -> usize {
        self.draw_lists.iter().map(|l| l.vtx_buffer.len()).sum()
    }

    pub fn total_idx_count(&self) -> usize {
        self.draw_lists.iter().map(|l| l.idx_buffer.len()).sum()
    }

    /// Framebuffer size in pixels
    pub fn framebuffer_size(&self) -> Vec2 {
        self.display_size * self.framebuffer_scale
    }
}

/// RGBA8 font atlas texture built by the UI library
#[derive(Debug, Clone)]
pub struct FontAtlas {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes
    pub pixels: Vec<u8>,
}
