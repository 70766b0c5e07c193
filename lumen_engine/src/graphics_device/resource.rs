/// GPU resource descriptors (buffers, textures, pipelines)

use crate::graphics_device::TextureFormat;

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform/constant buffer
    Uniform,
}

/// Descriptor for creating a host-visible buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug label
    pub label: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Descriptor for creating a sampled 2D texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug label
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    /// Expected size of the initial pixel data in bytes
    pub fn data_size(&self) -> u64 {
        let texel = match self.format {
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            _ => 4,
        };
        self.width as u64 * self.height as u64 * texel
    }
}

/// Shader code handed to a backend
#[derive(Debug, Clone)]
pub enum ShaderSource {
    /// WGSL module with `vs_main` / `fs_main` entry points (WebGPU)
    Wgsl(String),
    /// SPIR-V words for each stage, entry point `main` (Vulkan)
    SpirV { vertex: Vec<u32>, fragment: Vec<u32> },
}

/// Vertex attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
    /// Four normalized unsigned bytes (packed RGBA color)
    Unorm8x4,
}

impl VertexFormat {
    /// Size in bytes of one attribute
    pub fn size(&self) -> u32 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Unorm8x4 => 4,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Single interleaved per-vertex buffer layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Stride in bytes between consecutive vertices
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// Color blending mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// No blending
    Opaque,
    /// Straight alpha: src * a + dst * (1 - a)
    Alpha,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

/// Descriptor for creating a graphics pipeline
///
/// Viewport and scissor are always dynamic. Pipelines that sample a texture
/// expose one combined texture/sampler binding in set 0.
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub label: String,
    pub shader: ShaderSource,
    pub vertex_layout: VertexLayout,
    /// Format of the color attachment rendered into
    pub color_format: TextureFormat,
    /// Depth attachment format, when render targets carry one
    pub depth_format: Option<TextureFormat>,
    pub blend: BlendMode,
    pub cull_mode: CullMode,
    /// Size in bytes of vertex-stage push constants (0 for none)
    pub push_constant_size: u32,
    /// Whether the pipeline samples a texture
    pub sampled_texture: bool,
}
