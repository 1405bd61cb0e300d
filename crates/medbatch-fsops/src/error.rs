//! # Design
//!
//! - Provide structured, constant-message errors for input discovery and result export.
//! - Capture operation context (paths, fields) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by the filesystem collaborators.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Human-readable detail including the operation and path.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Io {
                operation,
                path,
                source,
            } => format!("{self}: {operation} {}: {source}", path.display()),
            Self::Walkdir {
                operation,
                path,
                source,
            } => format!("{self}: {operation} {}: {source}", path.display()),
            Self::InvalidInput {
                field,
                reason,
                value,
            } => match value {
                Some(value) => format!("{self}: {field} {reason} ({value})"),
                None => format!("{self}: {field} {reason}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn walkdir_error() -> walkdir::Error {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing");
        WalkDir::new(&missing)
            .into_iter()
            .find_map(Result::err)
            .expect("walking a missing root should fail")
    }

    #[test]
    fn fsops_error_messages_are_constant_and_sources_kept() {
        let cases = vec![
            (
                FsOpsError::io("export.write", "/out/results.csv", io::Error::other("full")),
                "fsops io failure",
                true,
            ),
            (
                FsOpsError::walkdir("scan.walk", "/in", walkdir_error()),
                "fsops walkdir failure",
                true,
            ),
            (
                FsOpsError::InvalidInput {
                    field: "input_dir",
                    reason: "not a directory",
                    value: Some("/in/file".into()),
                },
                "fsops invalid input",
                false,
            ),
        ];

        for (err, message, has_source) in cases {
            assert_eq!(err.to_string(), message);
            assert_eq!(err.source().is_some(), has_source);
        }
    }

    #[test]
    fn detail_includes_context() {
        let err = FsOpsError::io("export.write", "/out/results.csv", io::Error::other("full"));
        assert_eq!(
            err.detail(),
            "fsops io failure: export.write /out/results.csv: full"
        );
        let invalid = FsOpsError::InvalidInput {
            field: "input_dir",
            reason: "not a directory",
            value: None,
        };
        assert_eq!(invalid.detail(), "fsops invalid input: input_dir not a directory");
    }
}
