/// Graphics device module - backend capability traits and shared types

// Module declarations
pub mod types;
pub mod surface;
pub mod swapchain;
pub mod command_recorder;
pub mod resource;
pub mod window;
pub mod graphics_device;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use types::*;
pub use surface::*;
pub use swapchain::*;
pub use command_recorder::*;
pub use resource::*;
pub use window::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
