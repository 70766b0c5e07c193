//! Unit tests for vulkan_pipeline.rs (state translation, no GPU)

use super::*;
use lumen_engine::lumen::render::{TextureFormat, VertexLayout};

fn desc(shader: ShaderSource) -> PipelineDesc {
    PipelineDesc {
        label: "test".to_string(),
        shader,
        vertex_layout: VertexLayout { stride: 20, attributes: Vec::new() },
        color_format: TextureFormat::B8G8R8A8_UNORM,
        depth_format: None,
        blend: BlendMode::Alpha,
        cull_mode: CullMode::None,
        push_constant_size: 16,
        sampled_texture: true,
    }
}

#[test]
fn test_alpha_blend_factors() {
    let attachment = blend_attachment(BlendMode::Alpha);
    assert_eq!(attachment.blend_enable, vk::TRUE);
    assert_eq!(attachment.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
    assert_eq!(attachment.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    assert_eq!(attachment.color_write_mask, vk::ColorComponentFlags::RGBA);
}

#[test]
fn test_opaque_disables_blending() {
    let attachment = blend_attachment(BlendMode::Opaque);
    assert_eq!(attachment.blend_enable, vk::FALSE);
    assert_eq!(attachment.color_write_mask, vk::ColorComponentFlags::RGBA);
}

#[test]
fn test_cull_mode() {
    assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
}

#[test]
fn test_spirv_stages_accepted() {
    let desc = desc(ShaderSource::SpirV { vertex: vec![0x0723_0203, 1], fragment: vec![0x0723_0203, 2] });
    let (vertex, fragment) = spirv_stages(&desc).unwrap();
    assert_eq!(vertex[1], 1);
    assert_eq!(fragment[1], 2);
}

#[test]
fn test_wgsl_rejected() {
    let desc = desc(ShaderSource::Wgsl("@vertex fn vs_main() {}".to_string()));
    assert!(matches!(spirv_stages(&desc), Err(Error::InvalidResource(_))));
}

#[test]
fn test_empty_spirv_stage_rejected() {
    let desc = desc(ShaderSource::SpirV { vertex: vec![0x0723_0203], fragment: Vec::new() });
    assert!(matches!(spirv_stages(&desc), Err(Error::InvalidResource(_))));
}
