//! Unit tests for wgpu_pipeline.rs (descriptor translation, no GPU)

use super::*;
use lumen_engine::lumen::render::TextureFormat;
use lumen_engine::ui::{ui_vertex_layout, UI_PUSH_CONSTANT_SIZE};

fn desc(shader: ShaderSource) -> PipelineDesc {
    PipelineDesc {
        label: "test".to_string(),
        shader,
        vertex_layout: ui_vertex_layout(),
        color_format: TextureFormat::B8G8R8A8_UNORM,
        depth_format: None,
        blend: BlendMode::Alpha,
        cull_mode: CullMode::None,
        push_constant_size: UI_PUSH_CONSTANT_SIZE,
        sampled_texture: true,
    }
}

#[test]
fn test_alpha_blend_factors() {
    let blend = blend_state(BlendMode::Alpha).unwrap();
    assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
    assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    assert_eq!(blend.alpha.src_factor, wgpu::BlendFactor::One);
    assert_eq!(blend_state(BlendMode::Opaque), None);
}

#[test]
fn test_cull_modes() {
    assert_eq!(cull_mode_to_wgpu(CullMode::None), None);
    assert_eq!(cull_mode_to_wgpu(CullMode::Back), Some(wgpu::Face::Back));
}

#[test]
fn test_wgsl_source_accepted() {
    let desc = desc(ShaderSource::Wgsl(crate::UI_SHADER_WGSL.to_string()));
    assert_eq!(wgsl_source(&desc).unwrap(), crate::UI_SHADER_WGSL);
}

#[test]
fn test_spirv_and_empty_wgsl_rejected() {
    let spirv = desc(ShaderSource::SpirV { vertex: vec![0x0723_0203], fragment: vec![0x0723_0203] });
    assert!(matches!(wgsl_source(&spirv), Err(Error::InvalidResource(_))));

    let empty = desc(ShaderSource::Wgsl("  \n".to_string()));
    assert!(matches!(wgsl_source(&empty), Err(Error::InvalidResource(_))));
}

#[test]
fn test_push_constant_size_limits() {
    assert!(validate_push_constant_size("ui", UI_PUSH_CONSTANT_SIZE).is_ok());
    assert!(validate_push_constant_size("ui", 0).is_ok());
    assert!(validate_push_constant_size("ui", 18).is_err());
    assert!(validate_push_constant_size("ui", MAX_PUSH_CONSTANT_SIZE + 4).is_err());
}

#[test]
fn test_push_constant_group_follows_texture_group() {
    assert_eq!(push_constant_group(true, 16), Some(1));
    assert_eq!(push_constant_group(false, 16), Some(0));
    assert_eq!(push_constant_group(true, 0), None);
}
