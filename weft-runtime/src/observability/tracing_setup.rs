//! Tracing subscriber setup with format selection.

use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::{config::LogFormat, TracingConfig};

/// Guard that handles cleanup when dropped.
///
/// Keeps the tracing infrastructure alive and flushes OpenTelemetry on drop
/// when it was enabled.
pub struct TracingGuard {
    #[cfg(feature = "otel")]
    otel_enabled: bool,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        #[cfg(feature = "otel")]
        if self.otel_enabled {
            crate::exporter::shutdown_otlp();
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// Returns a guard that must be kept alive for the duration of the program.
///
/// OpenTelemetry support requires the `otel` feature flag; without it the
/// `otel_enabled` config option is ignored and only logging is set up.
pub fn init_tracing(config: TracingConfig) -> Result<TracingGuard> {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(not(feature = "otel"))]
    if config.otel_enabled() {
        eprintln!(
            "Warning: OpenTelemetry requested but the 'otel' feature is not enabled. \
             Recompile with `--features otel` to enable trace export."
        );
    }

    #[cfg(feature = "otel")]
    {
        if config.otel_enabled() {
            init_with_otel(filter, &config)?;
            return Ok(TracingGuard { otel_enabled: true });
        }
    }

    init_without_otel(filter, &config)?;

    Ok(TracingGuard {
        #[cfg(feature = "otel")]
        otel_enabled: false,
    })
}

/// Initialize tracing without OpenTelemetry.
fn init_without_otel(filter: EnvFilter, config: &TracingConfig) -> Result<()> {
    match config.log_format() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .try_init()
                .context("failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(config.include_location())
                        .with_line_number(config.include_location()),
                )
                .try_init()
                .context("failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_file(config.include_location())
                        .with_line_number(config.include_location()),
                )
                .try_init()
                .context("failed to initialize tracing subscriber")?;
        }
    }
    Ok(())
}

/// Initialize tracing with an OpenTelemetry layer.
///
/// The otel layer is created inside each match arm because its type
/// parameter depends on the subscriber stack, which differs per log format.
#[cfg(feature = "otel")]
fn init_with_otel(filter: EnvFilter, config: &TracingConfig) -> Result<()> {
    use super::otel::init_otel_layer;

    match config.log_format() {
        LogFormat::Json => {
            let otel_layer =
                init_otel_layer(config).context("failed to initialize OpenTelemetry")?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .with(otel_layer)
                .try_init()
                .context("failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            let otel_layer =
                init_otel_layer(config).context("failed to initialize OpenTelemetry")?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(config.include_location())
                        .with_line_number(config.include_location()),
                )
                .with(otel_layer)
                .try_init()
                .context("failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            let otel_layer =
                init_otel_layer(config).context("failed to initialize OpenTelemetry")?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_file(config.include_location())
                        .with_line_number(config.include_location()),
                )
                .with(otel_layer)
                .try_init()
                .context("failed to initialize tracing subscriber")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_enough_for_tests() {
        // A second init in the same process fails to install the global
        // subscriber; the error must surface rather than panic.
        let first = init_tracing(TracingConfig::default());
        let second = init_tracing(TracingConfig::default());
        assert!(first.is_ok() || second.is_err());
    }
}
