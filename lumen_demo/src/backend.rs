//! Backend selection: how the demo creates each graphics device

use lumen_engine::lumen::render::{ShaderSource, Window};
use lumen_engine::lumen::{Config, GraphicsDevice, Result};
use lumen_engine_renderer_vulkan::lumen::VulkanDevice;
use lumen_engine_renderer_wgpu::lumen::WgpuDevice;
use std::sync::Arc;

use crate::settings::DemoSettings;

/// A graphics device the demo knows how to bring up
pub trait DemoBackend: GraphicsDevice {
    const NAME: &'static str;

    fn create(window: &Arc<dyn Window>, config: &Config) -> Result<Self>;

    /// UI shader in the form this backend consumes
    fn ui_shader(settings: &DemoSettings) -> Result<ShaderSource>;

    /// Print backend diagnostics at shutdown
    fn report() {}
}

impl DemoBackend for VulkanDevice {
    const NAME: &'static str = "Vulkan";

    fn create(window: &Arc<dyn Window>, config: &Config) -> Result<Self> {
        VulkanDevice::new(window, config)
    }

    fn ui_shader(settings: &DemoSettings) -> Result<ShaderSource> {
        lumen_engine_renderer_vulkan::ui_shader_from_dir(&settings.spirv_dir)
    }

    fn report() {
        lumen_engine_renderer_vulkan::print_validation_stats_report();
    }
}

impl DemoBackend for WgpuDevice {
    const NAME: &'static str = "WebGPU";

    fn create(window: &Arc<dyn Window>, config: &Config) -> Result<Self> {
        WgpuDevice::new(window, config)
    }

    fn ui_shader(_settings: &DemoSettings) -> Result<ShaderSource> {
        Ok(lumen_engine_renderer_wgpu::ui_shader())
    }
}
