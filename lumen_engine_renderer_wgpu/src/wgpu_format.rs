/// Conversions between engine types and wgpu enums

use lumen_engine::lumen::render::{
    ColorSpace, IndexType, PresentMode, SurfaceFormat, TextureFormat, VertexFormat,
};

/// Convert TextureFormat to a wgpu format, `None` for `Undefined`
pub(crate) fn texture_format_to_wgpu(format: TextureFormat) -> Option<wgpu::TextureFormat> {
    let format = match format {
        TextureFormat::Undefined => return None,
        TextureFormat::R8G8B8A8_UNORM => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::R8G8B8A8_SRGB => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::B8G8R8A8_UNORM => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::B8G8R8A8_SRGB => wgpu::TextureFormat::Bgra8UnormSrgb,
        TextureFormat::A2B10G10R10_UNORM => wgpu::TextureFormat::Rgb10a2Unorm,
        TextureFormat::R16G16B16A16_SFLOAT => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::D16_UNORM => wgpu::TextureFormat::Depth16Unorm,
        TextureFormat::D32_FLOAT => wgpu::TextureFormat::Depth32Float,
        TextureFormat::D24_UNORM_S8_UINT => wgpu::TextureFormat::Depth24PlusStencil8,
        TextureFormat::D32_FLOAT_S8_UINT => wgpu::TextureFormat::Depth32FloatStencil8,
    };
    Some(format)
}

/// Convert a wgpu format to engine TextureFormat
///
/// Formats the engine does not know map to `Undefined`.
pub(crate) fn wgpu_to_texture_format(format: wgpu::TextureFormat) -> TextureFormat {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => TextureFormat::R8G8B8A8_UNORM,
        wgpu::TextureFormat::Rgba8UnormSrgb => TextureFormat::R8G8B8A8_SRGB,
        wgpu::TextureFormat::Bgra8Unorm => TextureFormat::B8G8R8A8_UNORM,
        wgpu::TextureFormat::Bgra8UnormSrgb => TextureFormat::B8G8R8A8_SRGB,
        wgpu::TextureFormat::Rgb10a2Unorm => TextureFormat::A2B10G10R10_UNORM,
        wgpu::TextureFormat::Rgba16Float => TextureFormat::R16G16B16A16_SFLOAT,
        wgpu::TextureFormat::Depth16Unorm => TextureFormat::D16_UNORM,
        wgpu::TextureFormat::Depth32Float => TextureFormat::D32_FLOAT,
        wgpu::TextureFormat::Depth24PlusStencil8 => TextureFormat::D24_UNORM_S8_UINT,
        wgpu::TextureFormat::Depth32FloatStencil8 => TextureFormat::D32_FLOAT_S8_UINT,
        _ => TextureFormat::Undefined,
    }
}

/// Surface format of a wgpu surface texture format
///
/// WebGPU has no color space selection: 8-bit and 10-bit formats present as
/// sRGB, half-float surfaces as extended linear sRGB.
pub(crate) fn wgpu_to_surface_format(format: wgpu::TextureFormat) -> SurfaceFormat {
    let color_space = match format {
        wgpu::TextureFormat::Rgba16Float => ColorSpace::ExtendedSrgbLinear,
        _ => ColorSpace::SrgbNonlinear,
    };
    SurfaceFormat::new(wgpu_to_texture_format(format), color_space)
}

pub(crate) fn present_mode_to_wgpu(mode: PresentMode) -> wgpu::PresentMode {
    match mode {
        PresentMode::Fifo => wgpu::PresentMode::Fifo,
        PresentMode::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
        PresentMode::Mailbox => wgpu::PresentMode::Mailbox,
        PresentMode::Immediate => wgpu::PresentMode::Immediate,
    }
}

/// Convert a wgpu present mode, `None` for the automatic modes
pub(crate) fn wgpu_to_present_mode(mode: wgpu::PresentMode) -> Option<PresentMode> {
    match mode {
        wgpu::PresentMode::Fifo => Some(PresentMode::Fifo),
        wgpu::PresentMode::FifoRelaxed => Some(PresentMode::FifoRelaxed),
        wgpu::PresentMode::Mailbox => Some(PresentMode::Mailbox),
        wgpu::PresentMode::Immediate => Some(PresentMode::Immediate),
        _ => None,
    }
}

pub(crate) fn vertex_format_to_wgpu(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

pub(crate) fn index_type_to_wgpu(index_type: IndexType) -> wgpu::IndexFormat {
    match index_type {
        IndexType::U16 => wgpu::IndexFormat::Uint16,
        IndexType::U32 => wgpu::IndexFormat::Uint32,
    }
}

#[cfg(test)]
#[path = "wgpu_format_tests.rs"]
mod tests;
