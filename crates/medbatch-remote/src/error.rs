//! Errors raised while constructing remote clients.

use thiserror::Error;

/// Setup failures; these abort the batch before any job starts.
#[derive(Debug, Error)]
pub enum RemoteSetupError {
    /// The bearer token was empty or not a valid header value.
    #[error("api token is empty or contains invalid characters")]
    InvalidToken,
    /// The trace identifier could not be used as a header value.
    #[error("trace identifier contains invalid characters")]
    InvalidTraceId,
    /// The API root cannot serve as a base for endpoint paths.
    #[error("api root must be an absolute http(s) url")]
    InvalidApiRoot {
        /// Offending URL.
        url: String,
    },
    /// The HTTP client could not be built.
    #[error("failed to build http client")]
    ClientBuild {
        /// Role of the client being built.
        role: &'static str,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_render_constant_messages() {
        assert_eq!(
            RemoteSetupError::InvalidToken.to_string(),
            "api token is empty or contains invalid characters"
        );
        assert_eq!(
            RemoteSetupError::InvalidApiRoot {
                url: "mailto:ops@example.com".into()
            }
            .to_string(),
            "api root must be an absolute http(s) url"
        );
    }
}
