//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges describing one batch run.

use std::convert::TryFrom;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome label used for successful jobs.
pub const OUTCOME_SUCCEEDED: &str = "succeeded";
/// Outcome label used for failed jobs.
pub const OUTCOME_FAILED: &str = "failed";

/// Prometheus-backed metrics registry shared by the pipeline components.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    jobs_submitted_total: IntCounter,
    jobs_completed_total: IntCounterVec,
    jobs_in_flight: IntGauge,
    queue_depth: IntGauge,
    poll_requests_total: IntCounter,
    bytes_uploaded_total: IntCounter,
    bytes_downloaded_total: IntCounter,
    last_job_duration_ms: IntGauge,
}

/// Snapshot of the batch counters and gauges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Jobs handed to the work queue.
    pub jobs_submitted: u64,
    /// Jobs that produced an output file.
    pub jobs_succeeded: u64,
    /// Jobs that ended without an output file.
    pub jobs_failed: u64,
    /// Jobs currently executing.
    pub jobs_in_flight: i64,
    /// Jobs waiting in the queue.
    pub queue_depth: i64,
    /// Status queries issued.
    pub poll_requests: u64,
    /// Input bytes sent.
    pub bytes_uploaded: u64,
    /// Output bytes written.
    pub bytes_downloaded: u64,
    /// Wall-clock duration of the most recently finished job (ms).
    pub last_job_duration_ms: i64,
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl Metrics {
    /// Construct a new metrics registry with the batch collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let jobs_submitted_total =
            counter("batch_jobs_submitted_total", "Jobs handed to the work queue")?;
        let jobs_completed_total = IntCounterVec::new(
            Opts::new("batch_jobs_completed_total", "Jobs finished by outcome"),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "batch_jobs_completed_total",
            source,
        })?;
        let jobs_in_flight = gauge("batch_jobs_in_flight", "Jobs currently executing")?;
        let queue_depth = gauge("batch_queue_depth", "Jobs waiting for a worker")?;
        let poll_requests_total =
            counter("batch_poll_requests_total", "Status queries issued")?;
        let bytes_uploaded_total =
            counter("batch_bytes_uploaded_total", "Input bytes sent to the service")?;
        let bytes_downloaded_total = counter(
            "batch_bytes_downloaded_total",
            "Output bytes written to local storage",
        )?;
        let last_job_duration_ms = gauge(
            "batch_last_job_duration_ms",
            "Duration of the most recently finished job (ms)",
        )?;

        register(&registry, "batch_jobs_submitted_total", &jobs_submitted_total)?;
        register(&registry, "batch_jobs_completed_total", &jobs_completed_total)?;
        register(&registry, "batch_jobs_in_flight", &jobs_in_flight)?;
        register(&registry, "batch_queue_depth", &queue_depth)?;
        register(&registry, "batch_poll_requests_total", &poll_requests_total)?;
        register(&registry, "batch_bytes_uploaded_total", &bytes_uploaded_total)?;
        register(
            &registry,
            "batch_bytes_downloaded_total",
            &bytes_downloaded_total,
        )?;
        register(&registry, "batch_last_job_duration_ms", &last_job_duration_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                jobs_submitted_total,
                jobs_completed_total,
                jobs_in_flight,
                queue_depth,
                poll_requests_total,
                bytes_uploaded_total,
                bytes_downloaded_total,
                last_job_duration_ms,
            }),
        })
    }

    /// Count a job handed to the work queue.
    pub fn inc_submitted(&self) {
        self.inner.jobs_submitted_total.inc();
    }

    /// Count a finished job under its outcome label.
    pub fn inc_completed(&self, succeeded: bool) {
        let outcome = if succeeded {
            OUTCOME_SUCCEEDED
        } else {
            OUTCOME_FAILED
        };
        self.inner
            .jobs_completed_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Mark a job as started by a worker.
    pub fn job_started(&self) {
        self.inner.jobs_in_flight.inc();
    }

    /// Mark a job as finished by a worker.
    pub fn job_finished(&self, elapsed: Duration) {
        self.inner.jobs_in_flight.dec();
        self.inner
            .last_job_duration_ms
            .set(Self::duration_to_ms(elapsed));
    }

    /// Set the queue depth gauge.
    pub fn set_queue_depth(&self, depth: usize) {
        self.inner
            .queue_depth
            .set(i64::try_from(depth).unwrap_or(i64::MAX));
    }

    /// Count one status query.
    pub fn inc_poll_request(&self) {
        self.inner.poll_requests_total.inc();
    }

    /// Add uploaded bytes.
    pub fn add_bytes_uploaded(&self, bytes: u64) {
        self.inner.bytes_uploaded_total.inc_by(bytes);
    }

    /// Add downloaded bytes.
    pub fn add_bytes_downloaded(&self, bytes: u64) {
        self.inner.bytes_downloaded_total.inc_by(bytes);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Write the text exposition to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        fs::write(path, rendered).map_err(|source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Take a point-in-time snapshot of the batch counters and gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = &self.inner.jobs_completed_total;
        MetricsSnapshot {
            jobs_submitted: self.inner.jobs_submitted_total.get(),
            jobs_succeeded: completed.with_label_values(&[OUTCOME_SUCCEEDED]).get(),
            jobs_failed: completed.with_label_values(&[OUTCOME_FAILED]).get(),
            jobs_in_flight: self.inner.jobs_in_flight.get(),
            queue_depth: self.inner.queue_depth.get(),
            poll_requests: self.inner.poll_requests_total.get(),
            bytes_uploaded: self.inner.bytes_uploaded_total.get(),
            bytes_downloaded: self.inner.bytes_downloaded_total.get(),
            last_job_duration_ms: self.inner.last_job_duration_ms.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_submitted();
        metrics.inc_submitted();
        metrics.set_queue_depth(1);
        metrics.job_started();
        metrics.job_started();
        metrics.inc_poll_request();
        metrics.add_bytes_uploaded(1_024);
        metrics.add_bytes_downloaded(2_048);
        metrics.job_finished(Duration::from_millis(45));
        metrics.inc_completed(true);
        metrics.inc_completed(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_submitted, 2);
        assert_eq!(snapshot.jobs_succeeded, 1);
        assert_eq!(snapshot.jobs_failed, 1);
        assert_eq!(snapshot.jobs_in_flight, 1);
        assert_eq!(snapshot.queue_depth, 1);
        assert_eq!(snapshot.poll_requests, 1);
        assert_eq!(snapshot.bytes_uploaded, 1_024);
        assert_eq!(snapshot.bytes_downloaded, 2_048);
        assert_eq!(snapshot.last_job_duration_ms, 45);

        let rendered = metrics.render()?;
        assert!(rendered.contains("batch_jobs_submitted_total 2"));
        assert!(rendered.contains("batch_jobs_completed_total{outcome=\"succeeded\"} 1"));
        assert!(rendered.contains("batch_bytes_downloaded_total 2048"));
        Ok(())
    }

    #[test]
    fn write_to_dumps_exposition() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let metrics = Metrics::new()?;
        metrics.add_bytes_uploaded(7);
        let path = dir.path().join("batch.prom");
        metrics.write_to(&path)?;
        assert!(std::fs::read_to_string(&path)?.contains("batch_bytes_uploaded_total 7"));

        let err = metrics
            .write_to(&dir.path().join("missing/batch.prom"))
            .expect_err("parent directory is missing");
        assert!(matches!(err, TelemetryError::MetricsWrite { .. }));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_submitted();
        assert_eq!(second.snapshot().jobs_submitted, 0);
        Ok(())
    }

    #[test]
    fn snapshot_serializes_with_field_names() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let metrics = Metrics::new()?;
        metrics.inc_poll_request();
        let value = serde_json::to_value(metrics.snapshot())?;
        assert_eq!(value["poll_requests"], 1);
        assert_eq!(value["jobs_in_flight"], 0);
        Ok(())
    }
}
