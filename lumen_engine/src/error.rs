//! Error types for the Lumen engine
//!
//! This module defines the error type shared by the rendering context, the UI
//! renderer and every backend crate.

use std::fmt;

/// Result type for Lumen engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, WebGPU)
    BackendError(String),

    /// Out of host or GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, texture, pipeline, shader code, ...)
    InvalidResource(String),

    /// Initialization failed (instance, device, surface, swapchain)
    InitializationFailed(String),

    /// The logical device was lost
    DeviceLost,

    /// The swapchain could not produce an image even after a rebuild.
    ///
    /// Transient: the frame should be skipped and retried later.
    SwapchainOutOfDate,

    /// A bounded wait expired (fence wait, image acquisition)
    Timeout(String),

    /// Operation called in the wrong frame state (programmer error)
    InvalidState(String),
}

impl Error {
    /// Whether the caller may simply skip the current frame and try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::SwapchainOutOfDate | Error::Timeout(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost => write!(f, "Device lost"),
            Error::SwapchainOutOfDate => write!(f, "Swapchain out of date"),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
