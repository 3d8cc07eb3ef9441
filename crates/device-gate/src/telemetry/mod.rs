//! Telemetry for the request gate
//!
//! - `metrics` - Prometheus counters and histograms for gate decisions
//! - [`init_tracing`] - one-time `tracing` subscriber setup for the binary

pub mod metrics;

pub use metrics::{GateMetrics, Outcome};

use thiserror::Error;

use crate::config::LogFormat;

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Failed to encode metrics: {0}")]
    EncodingFailed(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Calling this
/// twice is harmless.
pub fn init_tracing(format: LogFormat, default_level: tracing::Level) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default().add_directive(default_level.into())
        });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    // Already initialized elsewhere (tests, embedding applications)
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Map CLI verbosity flags to a default log level
pub fn level_for(verbose: u8, quiet: bool, base: tracing::Level) -> tracing::Level {
    if quiet {
        return tracing::Level::ERROR;
    }
    match verbose {
        0 => base,
        1 => tracing::Level::INFO.max(base),
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}
