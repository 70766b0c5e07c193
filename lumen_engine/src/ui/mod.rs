/// UI module - immediate-mode UI draw data, renderer backend and viewports

pub mod draw_data;
pub mod ui_renderer;
pub mod viewport;

pub use draw_data::*;
pub use ui_renderer::*;
pub use viewport::*;
