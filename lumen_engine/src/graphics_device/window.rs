/// Window capability consumed by the engine

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use crate::graphics_device::Extent2D;

/// Anything a surface can be created for
///
/// The engine never creates or polls windows: it only needs the raw handles
/// for surface creation and the current drawable size for swapchain sizing.
pub trait Window: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Current drawable size in physical pixels (0x0 when minimized)
    fn drawable_size(&self) -> Extent2D;
}

impl Window for winit::window::Window {
    fn drawable_size(&self) -> Extent2D {
        let size = self.inner_size();
        Extent2D::new(size.width, size.height)
    }
}
