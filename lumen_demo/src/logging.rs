//! Logging setup: env_logger behind the `log` facade, engine logs routed to it

use lumen_engine::lumen::log::LogFacadeLogger;
use lumen_engine::lumen::Engine;
use std::sync::Once;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

static INIT: Once = Once::new();

/// Initialize the global logger once; later calls are ignored
pub fn init_logging() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match std::env::var("RUST_LOG") {
            Ok(filter) => builder.parse_filters(&filter),
            Err(_) => builder.parse_filters(DEFAULT_FILTER),
        };
        builder.write_style(env_logger::WriteStyle::Auto);
        builder.init();

        Engine::set_logger(LogFacadeLogger);
        log::debug!("logging initialized");
    });
}
