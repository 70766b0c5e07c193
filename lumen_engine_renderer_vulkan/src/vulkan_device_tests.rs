//! Unit tests for vulkan_device.rs (device selection helpers, no GPU)

use super::*;

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties { queue_flags: flags, queue_count: 1, ..Default::default() }
}

#[test]
fn test_queue_families_prefer_shared_family() {
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        family(vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::GRAPHICS),
    ];
    // Family 0 cannot present, family 2 does both
    let picked = pick_queue_families(&families, |i| i == 1 || i == 2);
    assert_eq!(picked, Some((2, 2)));
}

#[test]
fn test_queue_families_split_when_needed() {
    let families = [family(vk::QueueFlags::GRAPHICS), family(vk::QueueFlags::TRANSFER)];
    let picked = pick_queue_families(&families, |i| i == 1);
    assert_eq!(picked, Some((0, 1)));
}

#[test]
fn test_queue_families_none_without_present() {
    let families = [family(vk::QueueFlags::GRAPHICS)];
    assert_eq!(pick_queue_families(&families, |_| false), None);
}

#[test]
fn test_queue_families_none_without_graphics() {
    let families = [family(vk::QueueFlags::COMPUTE)];
    assert_eq!(pick_queue_families(&families, |_| true), None);
}

#[test]
fn test_depth_format_preference_order() {
    assert_eq!(pick_depth_format(|_| true), Some(TextureFormat::D32_FLOAT));
    assert_eq!(
        pick_depth_format(|f| f == vk::Format::D24_UNORM_S8_UINT),
        Some(TextureFormat::D24_UNORM_S8_UINT)
    );
    assert_eq!(pick_depth_format(|_| false), None);
}

#[test]
fn test_depth_candidates_are_depth_formats() {
    for format in DEPTH_FORMAT_CANDIDATES {
        assert!(format.is_depth());
    }
}
