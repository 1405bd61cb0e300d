//! Pipeline tuning knobs and their defaults.
//!
//! # Design
//! - Defaults are named constants so the CLI and tests agree on them.
//! - `validate` runs once before any job is created.

use std::time::Duration;

use crate::error::ConfigError;

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 3;
/// Default delay before each status query.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Default wall-clock ceiling for the polling phase.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);
/// Remote status that ends polling as a failure unless overridden.
pub const DEFAULT_FAILURE_STATUS: &str = "task-failed";

/// Settings shared by the worker pool and status poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of concurrent workers; also the queue capacity.
    pub workers: usize,
    /// Sleep before every status query.
    pub poll_interval: Duration,
    /// Maximum time between destination acquisition and a terminal status.
    pub poll_timeout: Duration,
    /// Remote statuses that stop polling with a failure.
    pub failure_statuses: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            failure_statuses: vec![DEFAULT_FAILURE_STATUS.to_string()],
        }
    }
}

impl PipelineConfig {
    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidField {
                field: "workers",
                reason: "must be at least 1",
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "poll_interval",
                reason: "must be greater than zero",
            });
        }
        if self.poll_timeout < self.poll_interval {
            return Err(ConfigError::InvalidField {
                field: "poll_timeout",
                reason: "must not be shorter than the poll interval",
            });
        }
        if self
            .failure_statuses
            .iter()
            .any(|status| status.trim().is_empty())
        {
            return Err(ConfigError::InvalidField {
                field: "failure_statuses",
                reason: "must not contain blank entries",
            });
        }
        Ok(())
    }

    /// Whether `status` is configured to end polling as a failure.
    #[must_use]
    pub fn is_failure_status(&self, status: &str) -> bool {
        self.failure_statuses.iter().any(|entry| entry == status)
    }
}
