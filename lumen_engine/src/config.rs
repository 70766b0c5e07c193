/// Engine configuration shared by devices and rendering contexts

use std::time::Duration;
use crate::graphics_device::{ColorSpace, PresentMode, SurfaceFormat, TextureFormat};

/// Validation message severity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything the validation layers report
    All,
}

/// Counters of validation messages received since device creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    /// Total number of messages
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Engine configuration
///
/// Passed to backend device constructors (instance-level settings) and to
/// [`RenderingContext::new`](crate::rendering_context::RenderingContext::new)
/// (swapchain negotiation and frame pacing). Cloned contexts inherit it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name reported to the driver
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Minimum severity of validation messages forwarded to the logger
    pub debug_severity: DebugSeverity,
    /// Present modes in order of preference (FIFO is the fallback)
    pub present_modes: Vec<PresentMode>,
    /// Surface formats in order of preference
    pub preferred_surface_formats: Vec<SurfaceFormat>,
    /// Minimum number of swapchain images requested
    pub min_image_count: u32,
    /// Semaphore slot pool size on backends without per-image semaphores
    pub frames_in_flight: usize,
    /// Upper bound on every CPU wait for a GPU fence
    pub fence_timeout: Duration,
    /// Clear color used by the UI renderer
    pub clear_color: [f32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Lumen Application".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            present_modes: vec![PresentMode::Fifo],
            preferred_surface_formats: vec![
                SurfaceFormat::new(TextureFormat::B8G8R8A8_UNORM, ColorSpace::SrgbNonlinear),
                SurfaceFormat::new(TextureFormat::R8G8B8A8_UNORM, ColorSpace::SrgbNonlinear),
                SurfaceFormat::new(TextureFormat::B8G8R8A8_SRGB, ColorSpace::SrgbNonlinear),
                SurfaceFormat::new(TextureFormat::R8G8B8A8_SRGB, ColorSpace::SrgbNonlinear),
            ],
            min_image_count: 2,
            frames_in_flight: 2,
            fence_timeout: Duration::from_secs(5),
            clear_color: [0.45, 0.55, 0.60, 1.00],
        }
    }
}

impl Config {
    /// Prefer low-latency presentation when available (uncapped frame rate)
    pub fn with_unlimited_frame_rate(mut self) -> Self {
        self.present_modes = vec![PresentMode::Mailbox, PresentMode::Immediate, PresentMode::Fifo];
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
