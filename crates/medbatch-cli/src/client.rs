//! Error types and remote client wiring for the CLI.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use medbatch_pipeline::BatchError;
use medbatch_remote::{
    BearerToken, HttpTransfer, HttpWorkflowClient, RemoteConfig, RemoteSetupError,
};

use crate::cli::Cli;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<RemoteSetupError> for CliError {
    fn from(err: RemoteSetupError) -> Self {
        match err {
            RemoteSetupError::InvalidToken => Self::validation(err.to_string()),
            RemoteSetupError::InvalidApiRoot { ref url } => {
                Self::validation(format!("{err} ({url})"))
            }
            RemoteSetupError::InvalidTraceId | RemoteSetupError::ClientBuild { .. } => {
                Self::failure(err)
            }
        }
    }
}

impl From<BatchError> for CliError {
    fn from(err: BatchError) -> Self {
        if err.is_validation() {
            Self::validation(err.detail())
        } else {
            Self::failure(err)
        }
    }
}

/// Remote adapters shared by every worker of one batch.
pub(crate) struct CliDependencies {
    pub(crate) workflow: Arc<HttpWorkflowClient>,
    pub(crate) transfer: Arc<HttpTransfer>,
}

impl CliDependencies {
    /// Build both HTTP adapters, tagging every request with `trace_id`.
    pub(crate) fn from_cli(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let config = RemoteConfig {
            api_root: cli.api_url.clone(),
            api_timeout: Duration::from_secs(cli.api_timeout_secs),
            transfer_timeout: Duration::from_secs(cli.transfer_timeout_secs),
        };
        let token = BearerToken::new(&cli.token)?;
        Ok(Self {
            workflow: Arc::new(HttpWorkflowClient::new(&config, &token, trace_id)?),
            transfer: Arc::new(HttpTransfer::new(&config, trace_id)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbatch_core::ConfigError;

    #[test]
    fn exit_codes_separate_validation_from_failure() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow::anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn remote_setup_errors_are_classified() {
        assert!(matches!(
            CliError::from(RemoteSetupError::InvalidToken),
            CliError::Validation(_)
        ));
        let root = CliError::from(RemoteSetupError::InvalidApiRoot {
            url: "ftp://host".into(),
        });
        assert_eq!(
            root.display_message(),
            "api root must be an absolute http(s) url (ftp://host)"
        );
        assert!(matches!(
            CliError::from(RemoteSetupError::InvalidTraceId),
            CliError::Failure(_)
        ));
    }

    #[test]
    fn invalid_pipeline_config_is_a_validation_error() {
        let err = CliError::from(BatchError::InvalidConfig(ConfigError::InvalidField {
            field: "workers",
            reason: "must be at least 1",
        }));
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("workers"));
    }
}
