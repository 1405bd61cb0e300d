//! Drives one job through destination, upload, polling and download.

use std::path::PathBuf;
use std::sync::Arc;

use medbatch_core::{
    Job, JobError, JobPhase, JobResult, PipelineConfig, StepResult, TransferExecutor,
    WorkflowClient,
};
use medbatch_telemetry::Metrics;
use tokio::time::Instant;
use tracing::{Instrument, Span, field, info, info_span, warn};

use crate::poller::{PollOutcome, StatusPoller};

/// Executes the per-job state machine with shared collaborators.
#[derive(Clone)]
pub struct JobRunner {
    workflow: Arc<dyn WorkflowClient>,
    transfer: Arc<dyn TransferExecutor>,
    config: Arc<PipelineConfig>,
    metrics: Metrics,
}

impl JobRunner {
    /// Runner sharing `workflow` and `transfer` across every job.
    #[must_use]
    pub fn new(
        workflow: Arc<dyn WorkflowClient>,
        transfer: Arc<dyn TransferExecutor>,
        config: Arc<PipelineConfig>,
        metrics: Metrics,
    ) -> Self {
        Self {
            workflow,
            transfer,
            config,
            metrics,
        }
    }

    /// Run `job` to a terminal phase. Every call yields exactly one result.
    pub async fn run(&self, mut job: Job) -> JobResult {
        let span = info_span!(
            "job",
            input = %job.input_path.display(),
            task = %job.task,
            usage_id = field::Empty,
        );
        async move {
            match self.drive(&mut job).await {
                Ok(output_path) => {
                    info!(output = %output_path.display(), "job succeeded");
                    job.succeed(output_path)
                }
                Err(err) => {
                    warn!(
                        phase = job.phase().as_str(),
                        kind = err.kind().as_str(),
                        error = %err.summary(),
                        "job failed"
                    );
                    job.fail(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, job: &mut Job) -> StepResult<PathBuf> {
        job.enter(JobPhase::AwaitingDestination);
        let grant = self.workflow.request_destination(job.task).await?;
        let started_at = Instant::now();
        Span::current().record("usage_id", grant.usage_id.as_str());
        job.usage_id = Some(grant.usage_id.clone());
        info!("upload destination acquired");

        job.enter(JobPhase::Uploading);
        let sent = self.transfer.upload(&grant, &job.input_path).await?;
        self.metrics.add_bytes_uploaded(sent);
        info!(bytes = sent, "input uploaded");

        job.enter(JobPhase::Polling);
        let poller = StatusPoller::new(self.workflow.as_ref(), &self.config, &self.metrics);
        let artifacts = match poller.poll(job.task, &grant.usage_id, started_at).await? {
            PollOutcome::Succeeded(artifacts) => artifacts,
            PollOutcome::Failed(status) => return Err(JobError::RemoteFailed { status }),
            PollOutcome::TimedOut(elapsed) => return Err(JobError::PollTimeout { elapsed }),
        };
        job.input_url.clone_from(&artifacts.input_url);
        job.output_url = Some(artifacts.output_url.clone());

        job.enter(JobPhase::Downloading);
        let file = self
            .transfer
            .download(&artifacts.output_url, &job.output_dir, &grant.usage_id)
            .await?;
        self.metrics.add_bytes_downloaded(file.bytes);
        Ok(file.path)
    }
}
