//! Batch-level failures. Job failures never surface here; they become results.

use std::error::Error;
use std::path::PathBuf;

use medbatch_core::ConfigError;
use thiserror::Error;

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Pipeline settings were rejected before any work started.
    #[error("invalid pipeline configuration")]
    InvalidConfig(#[from] ConfigError),
    /// The input catalog could not be read.
    #[error("failed to discover inputs")]
    Discover {
        /// Root that was scanned.
        path: PathBuf,
        /// Underlying catalog error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The result collector task panicked or was aborted.
    #[error("result collector failed")]
    Collector {
        /// Underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
    /// Fewer or more results than submitted jobs were collected.
    #[error("result count does not match submitted jobs")]
    ResultCountMismatch {
        /// Jobs submitted.
        expected: usize,
        /// Results collected.
        actual: usize,
    },
    /// The batch summary could not be written.
    #[error("failed to export batch summary")]
    Export {
        /// Directory the summary was written to.
        path: PathBuf,
        /// Underlying exporter error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl BatchError {
    /// Whether the failure stems from operator input rather than the runtime.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::Discover { .. })
    }

    /// Message with the first source appended when present.
    #[must_use]
    pub fn detail(&self) -> String {
        match self.source() {
            Some(source) => format!("{self}: {source}"),
            None => match self {
                Self::ResultCountMismatch { expected, actual } => {
                    format!("{self} (expected {expected}, collected {actual})")
                }
                _ => self.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn validation_classification() {
        let config = BatchError::from(ConfigError::InvalidField {
            field: "workers",
            reason: "must be at least 1",
        });
        assert!(config.is_validation());
        assert_eq!(
            config.detail(),
            "invalid pipeline configuration: invalid value for 'workers': must be at least 1"
        );

        let export = BatchError::Export {
            path: PathBuf::from("/out"),
            source: Box::new(io::Error::other("disk full")),
        };
        assert!(!export.is_validation());
        assert_eq!(export.detail(), "failed to export batch summary: disk full");

        let mismatch = BatchError::ResultCountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            mismatch.detail(),
            "result count does not match submitted jobs (expected 3, collected 2)"
        );
    }
}
