//! Unit tests for vulkan_swapchain.rs (selection helpers, no GPU)

use super::*;
use lumen_engine::lumen::render::ColorSpace;

#[test]
fn test_composite_alpha_prefers_opaque() {
    let supported = vk::CompositeAlphaFlagsKHR::OPAQUE | vk::CompositeAlphaFlagsKHR::INHERIT;
    assert_eq!(choose_composite_alpha(supported), vk::CompositeAlphaFlagsKHR::OPAQUE);
}

#[test]
fn test_composite_alpha_falls_back_to_first_supported() {
    let supported = vk::CompositeAlphaFlagsKHR::INHERIT | vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED;
    assert_eq!(choose_composite_alpha(supported), vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED);
}

#[test]
fn test_resolve_vk_surface_format_keeps_driver_pair() {
    let available = [
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];
    let chosen = SurfaceFormat::new(TextureFormat::B8G8R8A8_UNORM, ColorSpace::SrgbNonlinear);
    assert_eq!(resolve_vk_surface_format(&available, chosen), available[1]);
}

#[test]
fn test_resolve_vk_surface_format_unknown_format_uses_first_pair() {
    // A format the engine does not name converts to Undefined; picking it
    // must still hand the exact Vulkan value to the driver.
    let available = [vk::SurfaceFormatKHR {
        format: vk::Format::A2R10G10B10_UNORM_PACK32,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }];
    let chosen = vk_to_surface_format(&available[0]);
    assert_eq!(resolve_vk_surface_format(&available, chosen).format, vk::Format::A2R10G10B10_UNORM_PACK32);
}

#[test]
fn test_resolve_vk_surface_format_no_preference_surface() {
    let available = [vk::SurfaceFormatKHR {
        format: vk::Format::UNDEFINED,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }];
    let chosen = SurfaceFormat::new(TextureFormat::R8G8B8A8_SRGB, ColorSpace::SrgbNonlinear);
    let resolved = resolve_vk_surface_format(&available, chosen);
    assert_eq!(resolved.format, vk::Format::R8G8B8A8_SRGB);
    assert_eq!(resolved.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
}
