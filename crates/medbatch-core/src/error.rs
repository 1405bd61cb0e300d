//! # Design
//!
//! - Job-local failures carry constant messages; operational context lives in fields.
//! - Source errors are preserved so callers can render full chains.
//! - `FailureKind` is the stable classification recorded alongside each failed result.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for a single step of the job workflow.
pub type StepResult<T> = Result<T, JobError>;

/// Failures that terminate a single job. None of them abort the batch.
#[derive(Debug, Error)]
pub enum JobError {
    /// Destination request was rejected (bad token or task not subscribed).
    #[error("unauthorized or not subscribed")]
    Unauthorized {
        /// HTTP status returned by the submit endpoint.
        status: u16,
    },
    /// The remote service answered with a payload we could not use.
    #[error("invalid response from remote service")]
    InvalidResponse {
        /// Operation that received the payload.
        operation: &'static str,
        /// Field that was missing or malformed.
        field: &'static str,
    },
    /// Upload to the pre-signed destination did not return 204.
    #[error("upload failed")]
    UploadFailed {
        /// HTTP status returned by the upload destination.
        status: u16,
    },
    /// The remote job did not reach `task-success` before the deadline.
    #[error("polling timed out")]
    PollTimeout {
        /// Wall-clock time spent since the destination was acquired.
        elapsed: Duration,
    },
    /// The remote job reported a terminal failure status.
    #[error("remote task failed")]
    RemoteFailed {
        /// Status string reported by the remote service.
        status: String,
    },
    /// The status endpoint answered with a non-success HTTP status.
    #[error("status check failed")]
    StatusCheckFailed {
        /// HTTP status returned by the status endpoint.
        status: u16,
    },
    /// Fetching the result file did not return 200.
    #[error("download failed")]
    DownloadFailed {
        /// HTTP status returned by the output URL.
        status: u16,
    },
    /// The derived output file name would escape the output directory.
    #[error("unsafe output file name")]
    UnsafeOutputName {
        /// Offending file name.
        name: String,
    },
    /// A network call failed before a response was received.
    #[error("remote request failed")]
    Transport {
        /// Operation that issued the request.
        operation: &'static str,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Local file IO failed.
    #[error("local file operation failed")]
    Io {
        /// Operation that touched the filesystem.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The batch was cancelled before this job was started.
    #[error("job cancelled before start")]
    Cancelled,
}

impl JobError {
    /// Build a transport error from any boxed source.
    pub fn transport(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            operation,
            source: source.into(),
        }
    }

    /// Build an IO error for the given path.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Build an invalid-response error.
    #[must_use]
    pub const fn invalid_response(operation: &'static str, field: &'static str) -> Self {
        Self::InvalidResponse { operation, field }
    }

    /// Stable classification of the failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized { .. } => FailureKind::Unauthorized,
            Self::InvalidResponse { .. } => FailureKind::InvalidResponse,
            Self::UploadFailed { .. } => FailureKind::UploadFailed,
            Self::PollTimeout { .. } => FailureKind::PollTimeout,
            Self::RemoteFailed { .. } => FailureKind::RemoteFailed,
            Self::StatusCheckFailed { .. } => FailureKind::StatusCheckFailed,
            Self::DownloadFailed { .. } => FailureKind::DownloadFailed,
            Self::UnsafeOutputName { .. } => FailureKind::UnsafeOutputName,
            Self::Transport { .. } => FailureKind::Transport,
            Self::Io { .. } => FailureKind::Io,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Human-readable message recorded in the batch summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let base = self.to_string();
        match self {
            Self::Unauthorized { status }
            | Self::UploadFailed { status }
            | Self::StatusCheckFailed { status }
            | Self::DownloadFailed { status } => format!("{base} (status {status})"),
            Self::InvalidResponse { operation, field } => {
                format!("{base} ({operation}: {field})")
            }
            Self::PollTimeout { elapsed } => format!("{base} after {}s", elapsed.as_secs()),
            Self::RemoteFailed { status } => format!("{base} (status {status})"),
            Self::UnsafeOutputName { name } => format!("{base} ({name})"),
            Self::Transport { operation, source } => format!("{base} ({operation}: {source})"),
            Self::Io {
                operation,
                path,
                source,
            } => format!("{base} ({operation} {}: {source})", path.display()),
            Self::Cancelled => base,
        }
    }
}

/// Classification recorded with every failed job result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Destination request rejected.
    Unauthorized,
    /// Remote payload unusable.
    InvalidResponse,
    /// Upload rejected.
    UploadFailed,
    /// Poll deadline elapsed.
    PollTimeout,
    /// Remote job reported failure.
    RemoteFailed,
    /// Status endpoint rejected the query.
    StatusCheckFailed,
    /// Result download rejected.
    DownloadFailed,
    /// Output name rejected.
    UnsafeOutputName,
    /// Network failure.
    Transport,
    /// Local filesystem failure.
    Io,
    /// Never started because the batch was cancelled.
    Cancelled,
}

impl FailureKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidResponse => "invalid_response",
            Self::UploadFailed => "upload_failed",
            Self::PollTimeout => "poll_timeout",
            Self::RemoteFailed => "remote_failed",
            Self::StatusCheckFailed => "status_check_failed",
            Self::DownloadFailed => "download_failed",
            Self::UnsafeOutputName => "unsafe_output_name",
            Self::Transport => "transport",
            Self::Io => "io",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Errors raised while validating pipeline configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A field held a value outside its accepted range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn job_error_kinds_and_summaries() {
        let cases = vec![
            (
                JobError::Unauthorized { status: 401 },
                FailureKind::Unauthorized,
                "unauthorized or not subscribed (status 401)",
            ),
            (
                JobError::UploadFailed { status: 403 },
                FailureKind::UploadFailed,
                "upload failed (status 403)",
            ),
            (
                JobError::PollTimeout {
                    elapsed: Duration::from_secs(121),
                },
                FailureKind::PollTimeout,
                "polling timed out after 121s",
            ),
            (
                JobError::RemoteFailed {
                    status: "task-failed".into(),
                },
                FailureKind::RemoteFailed,
                "remote task failed (status task-failed)",
            ),
            (
                JobError::invalid_response("submit_job", "usage_id"),
                FailureKind::InvalidResponse,
                "invalid response from remote service (submit_job: usage_id)",
            ),
            (
                JobError::DownloadFailed { status: 404 },
                FailureKind::DownloadFailed,
                "download failed (status 404)",
            ),
            (
                JobError::Cancelled,
                FailureKind::Cancelled,
                "job cancelled before start",
            ),
        ];

        for (err, kind, summary) in cases {
            assert_eq!(err.kind(), kind);
            assert_eq!(err.summary(), summary);
        }
    }

    #[test]
    fn io_and_transport_errors_keep_sources() {
        let io_err = JobError::io("read_input", "/data/a.nii.gz", io::Error::other("denied"));
        assert!(io_err.source().is_some());
        assert_eq!(io_err.kind(), FailureKind::Io);
        assert!(io_err.summary().contains("/data/a.nii.gz"));

        let transport = JobError::transport("upload", io::Error::other("reset"));
        assert!(transport.source().is_some());
        assert_eq!(transport.summary(), "remote request failed (upload: reset)");
    }

    #[test]
    fn failure_kind_labels_are_snake_case() {
        assert_eq!(FailureKind::PollTimeout.as_str(), "poll_timeout");
        assert_eq!(FailureKind::Unauthorized.as_str(), "unauthorized");
    }
}
