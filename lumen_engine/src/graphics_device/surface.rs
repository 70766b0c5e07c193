/// Surface negotiation - backend-neutral selection of swapchain parameters
///
/// Both backends feed their live surface capabilities into these functions so
/// the selection rules are identical regardless of the API underneath.

use crate::graphics_device::{
    ColorSpace, Extent2D, PresentMode, SurfaceCapabilities, SurfaceFormat, TextureFormat,
};

/// Pick the swapchain surface format
///
/// Order: a lone `Undefined` entry means the surface has no preference, so the
/// first preferred pair is used as-is. Otherwise the first preferred pair that
/// is available wins, falling back to the first available format.
///
/// Returns `None` only when the surface reports no formats at all.
pub fn choose_surface_format(
    available: &[SurfaceFormat],
    preferred: &[SurfaceFormat],
) -> Option<SurfaceFormat> {
    let first = *available.first()?;

    if available.len() == 1 && first.format == TextureFormat::Undefined {
        return Some(preferred.first().copied().unwrap_or(SurfaceFormat::new(
            TextureFormat::B8G8R8A8_UNORM,
            ColorSpace::SrgbNonlinear,
        )));
    }

    for wanted in preferred {
        if let Some(found) = available
            .iter()
            .find(|f| f.format == wanted.format && f.color_space == wanted.color_space)
        {
            return Some(*found);
        }
    }

    Some(first)
}

/// Pick the present mode: first preferred mode the surface supports, else FIFO
pub fn choose_present_mode(available: &[PresentMode], preferred: &[PresentMode]) -> PresentMode {
    preferred
        .iter()
        .copied()
        .find(|mode| available.contains(mode))
        .unwrap_or(PresentMode::Fifo)
}

/// Resolve the swapchain extent
///
/// Uses the surface's current extent when it is defined, otherwise the
/// window's drawable size clamped to the surface limits.
pub fn resolve_extent(caps: &SurfaceCapabilities, window_size: Extent2D) -> Extent2D {
    match caps.current_extent {
        Some(extent) => extent,
        None => window_size.clamp(caps.min_extent, caps.max_extent),
    }
}

/// Pick the number of swapchain images
///
/// One more than the surface minimum (or the configured minimum if larger),
/// clamped to the surface maximum when it has one.
pub fn choose_image_count(caps: &SurfaceCapabilities, requested_min: u32) -> u32 {
    let mut count = (caps.min_image_count + 1).max(requested_min);
    if caps.max_image_count > 0 {
        count = count.min(caps.max_image_count);
    }
    count.max(1)
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
