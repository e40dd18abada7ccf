use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use siteward_config::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `-v` raises the level above the
/// configured one (`-v` debug, `-vv` and beyond trace).
pub fn init(verbosity: u8, config: &LoggingConfig) {
    let filter = env_filter(verbosity, &config.level);

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).init();
        }
    }
}

fn env_filter(verbosity: u8, configured: &str) -> EnvFilter {
    let directive = match verbosity {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };

    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
