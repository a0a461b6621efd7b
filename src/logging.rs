//! Logger setup for the viewer and tests

use std::sync::Once;

/// Logger configuration.
///
/// `filter` follows the `env_logger` filter syntax (e.g. "info",
/// "vxgi=debug,wgpu_core=warn"). When `None`, `RUST_LOG` is used, falling
/// back to `info`.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder
                    .filter_level(log::LevelFilter::Info)
                    // wgpu is very chatty at info
                    .filter_module("wgpu_core", log::LevelFilter::Warn)
                    .filter_module("wgpu_hal", log::LevelFilter::Warn)
                    .filter_module("naga", log::LevelFilter::Warn);
            }
        }

        // try_init: a test harness may already have installed a logger
        let _ = builder.try_init();
        log::debug!("logging initialized");
    });
}
