// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines with source locations
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// `RUST_LOG` wins over the configured level; an unparsable level falls
/// back to `info`.
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber.
pub fn setup_logging(log_level: &str, format: LogFormat) -> anyhow::Result<()> {
    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(log_level))
        .with(layer)
        .try_init()?;

    Ok(())
}
