//! In-memory implementations of the workflow and transfer traits.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use medbatch_core::{
    DownloadedFile, JobError, StatusReport, StepResult, TaskName, TransferExecutor, UploadFields,
    UploadGrant, UsageId, WorkflowClient,
};
use url::Url;

/// Status reported while a fake job is still running.
pub const RUNNING_STATUS: &str = "task-running";

#[derive(Debug, Clone)]
enum StatusScript {
    SucceedAfter(usize),
    Always(String),
    SuccessWithoutOutput,
}

/// Scripted [`WorkflowClient`] issuing sequential usage ids (`u-1`, `u-2`, ...).
#[derive(Debug)]
pub struct FakeWorkflow {
    reject_with: Option<u16>,
    script: StatusScript,
    issued: AtomicUsize,
    destination_calls: AtomicUsize,
    status_calls: AtomicUsize,
    polls_by_usage: Mutex<HashMap<String, usize>>,
}

impl FakeWorkflow {
    fn with_script(script: StatusScript) -> Self {
        Self {
            reject_with: None,
            script,
            issued: AtomicUsize::new(0),
            destination_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            polls_by_usage: Mutex::new(HashMap::new()),
        }
    }

    /// Jobs report `task-running` for `running_polls` queries, then succeed.
    #[must_use]
    pub fn succeeding_after(running_polls: usize) -> Self {
        Self::with_script(StatusScript::SucceedAfter(running_polls))
    }

    /// Every status query reports `status`.
    #[must_use]
    pub fn always_reporting(status: &str) -> Self {
        Self::with_script(StatusScript::Always(status.to_string()))
    }

    /// Success is reported without an output URL.
    #[must_use]
    pub fn succeeding_without_output() -> Self {
        Self::with_script(StatusScript::SuccessWithoutOutput)
    }

    /// Every destination request is rejected with `status`.
    #[must_use]
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Self::succeeding_after(0)
        }
    }

    /// Destination requests received.
    #[must_use]
    pub fn destination_calls(&self) -> usize {
        self.destination_calls.load(Ordering::SeqCst)
    }

    /// Status queries received.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn record_poll(&self, usage_id: &UsageId) -> usize {
        let mut polls = self
            .polls_by_usage
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let count = polls.entry(usage_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Output URL the fake reports for `usage_id`.
#[must_use]
pub fn fake_output_url(usage_id: &UsageId) -> String {
    format!("https://store.invalid/outputs/{usage_id}/result.nii.gz?X-Amz-Signature=fake")
}

#[async_trait]
impl WorkflowClient for FakeWorkflow {
    async fn request_destination(&self, _task: TaskName) -> StepResult<UploadGrant> {
        self.destination_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.reject_with {
            return Err(JobError::Unauthorized { status });
        }
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let usage_id = UsageId::new(format!("u-{sequence}"))
            .ok_or_else(|| JobError::invalid_response("submit_job", "usage_id"))?;
        let upload_url = Url::parse("https://store.invalid/upload")
            .map_err(|err| JobError::transport("submit_job", err))?;
        Ok(UploadGrant {
            usage_id,
            upload_url,
            fields: UploadFields {
                key: format!("uploads/{sequence}"),
                policy: "policy".into(),
                algorithm: "AWS4-HMAC-SHA256".into(),
                credential: "credential".into(),
                date: "20240101T000000Z".into(),
                signature: "signature".into(),
            },
        })
    }

    async fn check_status(&self, _task: TaskName, usage_id: &UsageId) -> StepResult<StatusReport> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let polls = self.record_poll(usage_id);
        let report = match &self.script {
            StatusScript::SucceedAfter(running) if polls > *running => StatusReport {
                status: Some(medbatch_core::model::SUCCESS_STATUS.into()),
                input_url: Some(format!("https://store.invalid/inputs/{usage_id}")),
                output_url: Some(fake_output_url(usage_id)),
            },
            StatusScript::SucceedAfter(_) => StatusReport {
                status: Some(RUNNING_STATUS.into()),
                ..StatusReport::default()
            },
            StatusScript::Always(status) => StatusReport {
                status: Some(status.clone()),
                ..StatusReport::default()
            },
            StatusScript::SuccessWithoutOutput => StatusReport {
                status: Some(medbatch_core::model::SUCCESS_STATUS.into()),
                ..StatusReport::default()
            },
        };
        Ok(report)
    }
}

/// [`TransferExecutor`] that records calls, tracks concurrency and writes
/// `{usage_id}-result.nii.gz` on download.
#[derive(Debug, Default)]
pub struct FakeTransfer {
    upload_status: Option<u16>,
    download_status: Option<u16>,
    upload_delay: Duration,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeTransfer {
    /// Transfers that always succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads fail with `status`.
    #[must_use]
    pub const fn failing_upload(mut self, status: u16) -> Self {
        self.upload_status = Some(status);
        self
    }

    /// Downloads fail with `status`.
    #[must_use]
    pub const fn failing_download(mut self, status: u16) -> Self {
        self.download_status = Some(status);
        self
    }

    /// Hold each upload for `delay`.
    #[must_use]
    pub const fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    /// Upload attempts received.
    #[must_use]
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Download attempts received.
    #[must_use]
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Highest number of uploads observed in progress at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferExecutor for FakeTransfer {
    async fn upload(&self, _grant: &UploadGrant, input: &Path) -> StepResult<u64> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(status) = self.upload_status {
            return Err(JobError::UploadFailed { status });
        }
        let bytes = tokio::fs::read(input)
            .await
            .map_err(|err| JobError::io("read_input", input, err))?;
        Ok(u64::try_from(bytes.len()).unwrap_or(u64::MAX))
    }

    async fn download(
        &self,
        _output_url: &Url,
        destination_dir: &Path,
        usage_id: &UsageId,
    ) -> StepResult<DownloadedFile> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.download_status {
            return Err(JobError::DownloadFailed { status });
        }
        let path = destination_dir.join(format!("{usage_id}-result.nii.gz"));
        let body = format!("result for {usage_id}");
        tokio::fs::write(&path, body.as_bytes())
            .await
            .map_err(|err| JobError::io("write_output", &path, err))?;
        Ok(DownloadedFile {
            path,
            bytes: u64::try_from(body.len()).unwrap_or(u64::MAX),
        })
    }
}
