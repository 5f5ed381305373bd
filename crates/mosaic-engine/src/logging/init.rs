use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "mosaic_engine=trace,wgpu=warn"). When unset, `RUST_LOG` is consulted.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Level applied when neither `env_filter` nor `RUST_LOG` is set.
    pub default_level: log::LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            default_level: log::LevelFilter::Info,
        }
    }
}

/// wgpu is chatty at info; keep it quiet unless asked for explicitly.
const NOISY_CRATES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        let filter = config.env_filter.or_else(|| std::env::var("RUST_LOG").ok());
        match filter {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(config.default_level);
                for name in NOISY_CRATES {
                    builder.filter_module(name, log::LevelFilter::Warn);
                }
            }
        }

        builder.write_style(config.write_style);

        // try_init: a test harness may already have installed a logger.
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
