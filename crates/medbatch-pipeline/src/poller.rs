//! Bounded status polling for one remote job.

use std::time::Duration;

use medbatch_core::{
    JobError, PipelineConfig, RemoteArtifacts, StepResult, TaskName, UsageId, WorkflowClient,
};
use medbatch_telemetry::Metrics;
use tokio::time::{Instant, sleep};
use tracing::debug;
use url::Url;

/// Terminal result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The remote job finished and reported its artifacts.
    Succeeded(RemoteArtifacts),
    /// The remote job reported a configured failure status.
    Failed(String),
    /// The deadline elapsed without a terminal status.
    TimedOut(Duration),
}

/// Repeatedly queries job status until success, failure, or the deadline.
pub struct StatusPoller<'a> {
    client: &'a dyn WorkflowClient,
    config: &'a PipelineConfig,
    metrics: &'a Metrics,
}

impl<'a> StatusPoller<'a> {
    /// Poller using `client` with the interval and deadline from `config`.
    #[must_use]
    pub const fn new(
        client: &'a dyn WorkflowClient,
        config: &'a PipelineConfig,
        metrics: &'a Metrics,
    ) -> Self {
        Self {
            client,
            config,
            metrics,
        }
    }

    /// Poll until a terminal status or until `poll_timeout` has elapsed since
    /// `started_at`. Each attempt sleeps the poll interval first.
    ///
    /// # Errors
    ///
    /// Status query failures end polling immediately. A success report without
    /// a usable `output_url` is an invalid response.
    pub async fn poll(
        &self,
        task: TaskName,
        usage_id: &UsageId,
        started_at: Instant,
    ) -> StepResult<PollOutcome> {
        let mut attempt: u32 = 0;
        loop {
            sleep(self.config.poll_interval).await;
            attempt += 1;
            self.metrics.inc_poll_request();
            let report = self.client.check_status(task, usage_id).await?;

            if report.is_success() {
                let output_url = report
                    .output_url
                    .as_deref()
                    .and_then(|raw| Url::parse(raw).ok())
                    .ok_or_else(|| JobError::invalid_response("check_status", "output_url"))?;
                debug!(attempt, "remote job finished");
                return Ok(PollOutcome::Succeeded(RemoteArtifacts {
                    input_url: report.input_url,
                    output_url,
                }));
            }

            if let Some(status) = report
                .status
                .as_deref()
                .filter(|status| self.config.is_failure_status(status))
            {
                return Ok(PollOutcome::Failed(status.to_string()));
            }

            let elapsed = started_at.elapsed();
            if elapsed >= self.config.poll_timeout {
                return Ok(PollOutcome::TimedOut(elapsed));
            }
            debug!(
                attempt,
                status = report.status.as_deref().unwrap_or("unknown"),
                "remote job still running"
            );
        }
    }
}
