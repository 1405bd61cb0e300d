//! Job lifecycle types and remote protocol payloads shared across the workspace.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FailureKind, JobError};

/// Status value reported by the remote service once a job has finished.
pub const SUCCESS_STATUS: &str = "task-success";

/// Remote processing pipelines accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskName {
    /// Prostate segmentation on MR volumes.
    MrProstateSeg,
    /// Body-part detection on CT scans.
    CtScanBodyPartDetection,
}

impl TaskName {
    /// Every supported task, in CLI presentation order.
    pub const ALL: [Self; 2] = [Self::MrProstateSeg, Self::CtScanBodyPartDetection];

    /// Path segment used by the remote service.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MrProstateSeg => "mr-prostate-seg",
            Self::CtScanBodyPartDetection => "ct-scan-body-part-detection",
        }
    }
}

impl Display for TaskName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TaskName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|task| task.as_str() == value.trim())
            .ok_or_else(|| format!("unknown task '{value}'"))
    }
}

/// Opaque identifier assigned by the remote service to one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageId(String);

impl UsageId {
    /// Wrap a raw identifier, rejecting blank values.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UsageId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Signed form fields that must accompany the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFields {
    /// Object key the upload is stored under.
    pub key: String,
    /// Base64 upload policy document.
    pub policy: String,
    /// Signature algorithm identifier.
    #[serde(rename = "x-amz-algorithm")]
    pub algorithm: String,
    /// Credential scope.
    #[serde(rename = "x-amz-credential")]
    pub credential: String,
    /// Signing timestamp.
    #[serde(rename = "x-amz-date")]
    pub date: String,
    /// Request signature.
    #[serde(rename = "x-amz-signature")]
    pub signature: String,
}

impl UploadFields {
    /// Form fields as `(name, value)` pairs in protocol order.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("key", self.key.as_str()),
            ("policy", self.policy.as_str()),
            ("x-amz-algorithm", self.algorithm.as_str()),
            ("x-amz-credential", self.credential.as_str()),
            ("x-amz-date", self.date.as_str()),
            ("x-amz-signature", self.signature.as_str()),
        ]
    }
}

/// Pre-authorized upload destination issued for one submission.
#[derive(Debug, Clone)]
pub struct UploadGrant {
    /// Identifier used for status checks and output naming.
    pub usage_id: UsageId,
    /// Destination accepting the multipart form.
    pub upload_url: Url,
    /// Signed fields submitted alongside the file.
    pub fields: UploadFields,
}

/// One response from the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusReport {
    /// Remote job status, when reported.
    #[serde(default)]
    pub status: Option<String>,
    /// Location of the uploaded input.
    #[serde(default)]
    pub input_url: Option<String>,
    /// Location of the produced output.
    #[serde(default)]
    pub output_url: Option<String>,
}

impl StatusReport {
    /// Whether the remote job has completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(SUCCESS_STATUS)
    }
}

/// Remote locations reported on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifacts {
    /// Location of the uploaded input, when reported.
    pub input_url: Option<String>,
    /// Pre-signed location of the produced output.
    pub output_url: Url,
}

/// A result file written to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Absolute location of the written file.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes: u64,
}

/// Lifecycle phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Enumerated but not yet started.
    Created,
    /// Waiting for the remote service to issue an upload destination.
    AwaitingDestination,
    /// Sending the input file.
    Uploading,
    /// Waiting for the remote job to finish.
    Polling,
    /// Fetching the result file.
    Downloading,
    /// Finished with a local output file.
    Succeeded,
    /// Finished without an output file.
    Failed,
}

impl JobPhase {
    /// Label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AwaitingDestination => "awaiting_destination",
            Self::Uploading => "uploading",
            Self::Polling => "polling",
            Self::Downloading => "downloading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether `next` is a legal successor of this phase.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Succeeded | Self::Failed, _) => false,
            (_, Self::Failed)
            | (Self::Created, Self::AwaitingDestination)
            | (Self::AwaitingDestination, Self::Uploading)
            | (Self::Uploading, Self::Polling)
            | (Self::Polling, Self::Downloading)
            | (Self::Downloading, Self::Succeeded) => true,
            _ => false,
        }
    }
}

/// One unit of work, owned by exactly one worker while it runs.
#[derive(Debug, Clone)]
pub struct Job {
    /// Remote pipeline to run.
    pub task: TaskName,
    /// Local file submitted to the service.
    pub input_path: PathBuf,
    /// Directory receiving the result file.
    pub output_dir: PathBuf,
    phase: JobPhase,
    /// Assigned once the upload destination is issued.
    pub usage_id: Option<UsageId>,
    /// Reported by the service on completion.
    pub input_url: Option<String>,
    /// Reported by the service on completion.
    pub output_url: Option<Url>,
    /// Populated on success.
    pub output_path: Option<PathBuf>,
    /// Populated on failure.
    pub failure: Option<String>,
}

impl Job {
    /// Create a job in the `Created` phase.
    #[must_use]
    pub fn new(task: TaskName, input_path: impl Into<PathBuf>, output_dir: &Path) -> Self {
        Self {
            task,
            input_path: input_path.into(),
            output_dir: output_dir.to_path_buf(),
            phase: JobPhase::Created,
            usage_id: None,
            input_url: None,
            output_url: None,
            output_path: None,
            failure: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Move to `next`; illegal transitions leave the phase untouched.
    pub fn enter(&mut self, next: JobPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal job transition {} -> {}",
            self.phase.as_str(),
            next.as_str()
        );
        if self.phase.can_advance_to(next) {
            self.phase = next;
        }
    }

    /// Record completion and produce the success snapshot.
    pub fn succeed(&mut self, output_path: PathBuf) -> JobResult {
        self.enter(JobPhase::Succeeded);
        self.output_path = Some(output_path.clone());
        JobResult {
            input_path: self.input_path.clone(),
            usage_id: self.usage_id.clone(),
            outcome: JobOutcome::Succeeded { output_path },
        }
    }

    /// Record failure and produce the failure snapshot.
    pub fn fail(&mut self, error: &JobError) -> JobResult {
        self.enter(JobPhase::Failed);
        let message = error.summary();
        self.failure = Some(message.clone());
        JobResult {
            input_path: self.input_path.clone(),
            usage_id: self.usage_id.clone(),
            outcome: JobOutcome::Failed {
                kind: error.kind(),
                message,
            },
        }
    }
}

/// Immutable outcome of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    /// Local file that was submitted.
    pub input_path: PathBuf,
    /// Remote identifier, when one was assigned.
    pub usage_id: Option<UsageId>,
    /// Success or failure details.
    pub outcome: JobOutcome,
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Result file written locally.
    Succeeded {
        /// Location of the result file.
        output_path: PathBuf,
    },
    /// Job ended without a result file.
    Failed {
        /// Failure classification.
        kind: FailureKind,
        /// Human-readable explanation.
        message: String,
    },
}

impl JobResult {
    /// Whether the job produced an output file.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Succeeded { .. })
    }

    /// Output file location on success.
    #[must_use]
    pub fn output_path(&self) -> Option<&Path> {
        match &self.outcome {
            JobOutcome::Succeeded { output_path } => Some(output_path),
            JobOutcome::Failed { .. } => None,
        }
    }

    /// Failure classification on failure.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            JobOutcome::Succeeded { .. } => None,
            JobOutcome::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Failure message on failure.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Succeeded { .. } => None,
            JobOutcome::Failed { message, .. } => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_name_round_trips_through_wire_string() {
        for task in TaskName::ALL {
            assert_eq!(task.as_str().parse::<TaskName>(), Ok(task));
        }
        assert!("prostate".parse::<TaskName>().is_err());
        assert_eq!(TaskName::MrProstateSeg.to_string(), "mr-prostate-seg");
    }

    #[test]
    fn usage_id_rejects_blank_values() {
        assert!(UsageId::new("   ").is_none());
        assert_eq!(UsageId::new(" u-1 ").map(|id| id.to_string()), Some("u-1".into()));
    }

    #[test]
    fn upload_fields_deserialize_signed_names() -> Result<(), serde_json::Error> {
        let fields: UploadFields = serde_json::from_value(json!({
            "key": "uploads/a.nii.gz",
            "policy": "cG9saWN5",
            "x-amz-algorithm": "AWS4-HMAC-SHA256",
            "x-amz-credential": "cred",
            "x-amz-date": "20240101T000000Z",
            "x-amz-signature": "sig"
        }))?;
        let names: Vec<_> = fields.pairs().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            [
                "key",
                "policy",
                "x-amz-algorithm",
                "x-amz-credential",
                "x-amz-date",
                "x-amz-signature"
            ]
        );
        assert_eq!(fields.pairs()[5].1, "sig");
        Ok(())
    }

    #[test]
    fn status_report_tolerates_missing_fields() -> Result<(), serde_json::Error> {
        let pending: StatusReport = serde_json::from_value(json!({"status": "task-running"}))?;
        assert!(!pending.is_success());
        let empty: StatusReport = serde_json::from_value(json!({}))?;
        assert_eq!(empty, StatusReport::default());
        let done: StatusReport = serde_json::from_value(json!({
            "status": "task-success",
            "input_url": "https://bucket/in",
            "output_url": "https://bucket/out"
        }))?;
        assert!(done.is_success());
        Ok(())
    }

    #[test]
    fn phases_only_advance_forward() {
        use JobPhase::{
            AwaitingDestination, Created, Downloading, Failed, Polling, Succeeded, Uploading,
        };
        let chain = [
            Created,
            AwaitingDestination,
            Uploading,
            Polling,
            Downloading,
            Succeeded,
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]));
            assert!(!pair[1].can_advance_to(pair[0]));
        }
        assert!(Polling.can_advance_to(Failed));
        assert!(!Created.can_advance_to(Polling));
        assert!(!Succeeded.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Failed));
        assert!(Failed.is_terminal());
    }

    #[test]
    fn job_failure_snapshot_carries_kind_and_message() {
        let mut job = Job::new(
            TaskName::MrProstateSeg,
            "/in/a.nii.gz",
            Path::new("/out"),
        );
        job.enter(JobPhase::AwaitingDestination);
        let result = job.fail(&JobError::Unauthorized { status: 401 });
        assert_eq!(job.phase(), JobPhase::Failed);
        assert!(!result.is_success());
        assert_eq!(result.failure_kind(), Some(FailureKind::Unauthorized));
        assert_eq!(
            result.message(),
            Some("unauthorized or not subscribed (status 401)")
        );
        assert!(result.output_path().is_none());
    }

    #[test]
    fn job_success_snapshot_carries_output() {
        let mut job = Job::new(
            TaskName::CtScanBodyPartDetection,
            "/in/b.nii.gz",
            Path::new("/out"),
        );
        for phase in [
            JobPhase::AwaitingDestination,
            JobPhase::Uploading,
            JobPhase::Polling,
            JobPhase::Downloading,
        ] {
            job.enter(phase);
        }
        job.usage_id = UsageId::new("u-9");
        let result = job.succeed(PathBuf::from("/out/u-9-b.nii.gz"));
        assert!(result.is_success());
        assert_eq!(result.output_path(), Some(Path::new("/out/u-9-b.nii.gz")));
        assert_eq!(result.usage_id.as_ref().map(UsageId::as_str), Some("u-9"));
    }
}
