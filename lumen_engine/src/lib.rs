/*!
# Lumen Engine

Core traits and types for the Lumen rendering engine shell.

This crate provides the backend-agnostic side of the engine: the per-frame
rendering context (swapchain acquisition, in-flight tracking, rebuild on resize,
submission and presentation) and the UI renderer that drives it. Backends
(Vulkan, WebGPU) live in their own crates and implement [`GraphicsDevice`].

## Architecture

- **GraphicsDevice**: capability trait implemented by each backend
- **Swapchain**: presentable image chain for one surface
- **CommandRecorder**: per-frame command recording
- **RenderingContext**: the begin-frame / submit-frame state machine
- **UiRenderer**: records immediate-mode UI draw data into a frame
- **ViewportRegistry**: one rendering context per UI viewport window

[`GraphicsDevice`]: crate::graphics_device::GraphicsDevice
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod graphics_device;
pub mod rendering_context;
pub mod ui;

// Main lumen namespace module
pub mod lumen {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine (logger management)
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{Config, DebugSeverity, ValidationStats};

    // Backend capability trait
    pub use crate::graphics_device::GraphicsDevice;

    // Rendering context state machine
    pub use crate::rendering_context::{
        RenderingContext, FrameHandle, FrameState, ContextId, ContextStats,
    };

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, LogFacadeLogger};
    }

    // Render sub-module with all device-level types
    pub mod render {
        pub use crate::graphics_device::*;
    }

    // UI sub-module
    pub mod ui {
        pub use crate::ui::*;
    }
}

// Re-export math library at crate root
pub use glam;
