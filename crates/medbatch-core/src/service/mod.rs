//! Collaborator traits implemented by the remote client and filesystem adapters.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use crate::error::StepResult;
use crate::model::{DownloadedFile, JobResult, StatusReport, TaskName, UploadGrant, UsageId};

/// Authorized calls against the inference service API.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Ask the service for a pre-authorized upload destination.
    ///
    /// Any rejection is reported as `Unauthorized`; callers must not upload
    /// afterwards.
    async fn request_destination(&self, task: TaskName) -> StepResult<UploadGrant>;

    /// Query the current status of a submitted job once.
    async fn check_status(&self, task: TaskName, usage_id: &UsageId) -> StepResult<StatusReport>;
}

/// Unauthenticated transfers to and from pre-signed locations.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Send `input` to the granted destination, returning the bytes sent.
    async fn upload(&self, grant: &UploadGrant, input: &Path) -> StepResult<u64>;

    /// Fetch `output_url` into `destination_dir` as `{usage_id}-{basename}`.
    async fn download(
        &self,
        output_url: &Url,
        destination_dir: &Path,
        usage_id: &UsageId,
    ) -> StepResult<DownloadedFile>;
}

/// Source of input files for a batch.
pub trait InputCatalog: Send + Sync {
    /// Error raised when the input location cannot be read.
    type Error: std::error::Error + Send + Sync + 'static;

    /// List input files under `root` in submission order.
    ///
    /// # Errors
    ///
    /// Returns an error when `root` cannot be traversed.
    fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, Self::Error>;
}

/// Sink for the per-job outcomes of a batch.
pub trait ResultExporter: Send + Sync {
    /// Error raised when the summary cannot be written.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist `results` under `output_dir`, returning the summary location.
    ///
    /// # Errors
    ///
    /// Returns an error when the summary cannot be written.
    fn export(&self, output_dir: &Path, results: &[JobResult]) -> Result<PathBuf, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use std::sync::Arc;

    struct RejectingClient;

    #[async_trait]
    impl WorkflowClient for RejectingClient {
        async fn request_destination(&self, _task: TaskName) -> StepResult<UploadGrant> {
            Err(JobError::Unauthorized { status: 403 })
        }

        async fn check_status(
            &self,
            _task: TaskName,
            _usage_id: &UsageId,
        ) -> StepResult<StatusReport> {
            Ok(StatusReport {
                status: Some("task-running".into()),
                ..StatusReport::default()
            })
        }
    }

    #[tokio::test]
    async fn workflow_client_is_object_safe() {
        let client: Arc<dyn WorkflowClient> = Arc::new(RejectingClient);
        let err = client
            .request_destination(TaskName::MrProstateSeg)
            .await
            .expect_err("destination should be rejected");
        assert!(matches!(err, JobError::Unauthorized { status: 403 }));

        let usage = UsageId::new("u-1").expect("usage id");
        let report = client
            .check_status(TaskName::MrProstateSeg, &usage)
            .await
            .expect("status report");
        assert!(!report.is_success());
    }
}
