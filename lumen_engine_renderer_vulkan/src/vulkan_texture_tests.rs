//! Unit tests for vulkan_texture.rs (validation only, no GPU)

use super::*;
use lumen_engine::lumen::render::TextureFormat;

fn desc(width: u32, height: u32, format: TextureFormat) -> TextureDesc {
    TextureDesc { label: "test".to_string(), width, height, format }
}

#[test]
fn test_valid_rgba_texture() {
    let desc = desc(4, 2, TextureFormat::R8G8B8A8_UNORM);
    assert!(validate_texture_desc(&desc, 4 * 2 * 4).is_ok());
}

#[test]
fn test_data_size_mismatch_rejected() {
    let desc = desc(4, 2, TextureFormat::R8G8B8A8_UNORM);
    let result = validate_texture_desc(&desc, 31);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_empty_extent_rejected() {
    let desc = desc(0, 2, TextureFormat::R8G8B8A8_UNORM);
    assert!(matches!(validate_texture_desc(&desc, 0), Err(Error::InvalidResource(_))));
}

#[test]
fn test_depth_format_rejected() {
    let desc = desc(2, 2, TextureFormat::D32_FLOAT);
    assert!(matches!(validate_texture_desc(&desc, 16), Err(Error::InvalidResource(_))));
}
