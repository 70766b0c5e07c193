/// Rendering context module - per-window frame lifecycle

pub mod frame;
pub mod rendering_context;

pub use frame::*;
pub use rendering_context::*;
