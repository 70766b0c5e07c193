//! Lumen demo: a main window and a secondary UI viewport on Vulkan or WebGPU
//!
//! ```text
//! LUMEN_BACKEND=wgpu cargo run -p lumen_demo
//! LUMEN_UI_SPIRV_DIR=path/to/spv cargo run -p lumen_demo
//! ```

mod app;
mod backend;
mod logging;
mod scene;
mod settings;

use anyhow::Result;
use lumen_engine::lumen::Config;
use lumen_engine_renderer_vulkan::lumen::VulkanDevice;
use lumen_engine_renderer_wgpu::lumen::WgpuDevice;

use settings::{BackendChoice, DemoSettings};

fn main() -> Result<()> {
    logging::init_logging();

    let settings = DemoSettings::from_env()?;
    let config = Config {
        app_name: "Lumen Demo".to_string(),
        enable_validation: settings.validation,
        ..Config::default()
    };
    log::info!("starting with {:?} (validation {})", settings.backend, settings.validation);

    match settings.backend {
        BackendChoice::Vulkan => app::run::<VulkanDevice>(settings, config),
        BackendChoice::Wgpu => app::run::<WgpuDevice>(settings, config),
    }
}
