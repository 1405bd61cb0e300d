//! Errors raised while installing logging or exporting batch metrics.

use std::path::PathBuf;

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Telemetry failures. None of these affect job outcomes.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Another global subscriber was already installed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A batch collector could not be built.
    #[error("failed to build metrics collector")]
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// A batch collector could not be registered.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// Text exposition encoding failed.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// Encoded exposition was not UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Underlying conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },
    /// The metrics dump could not be written.
    #[error("failed to write metrics file")]
    MetricsWrite {
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl TelemetryError {
    /// Message with the metric name or path and the source appended.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::SubscriberInstall { source } => format!("{self}: {source}"),
            Self::MetricsCollector { name, source } | Self::MetricsRegister { name, source } => {
                format!("{self} ({name}): {source}")
            }
            Self::MetricsEncode { source } => format!("{self}: {source}"),
            Self::MetricsUtf8 { source } => format!("{self}: {source}"),
            Self::MetricsWrite { path, source } => {
                format!("{self} ({}): {source}", path.display())
            }
        }
    }
}
