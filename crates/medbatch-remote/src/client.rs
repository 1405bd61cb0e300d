//! HTTP client construction and the bearer credential.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::RemoteSetupError;

/// Header carrying the batch trace identifier on every request.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Opaque API token sent as `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerToken {
    header: HeaderValue,
}

impl BearerToken {
    /// Wrap a raw token; the value is used verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteSetupError::InvalidToken`] when the token is blank or
    /// cannot be carried in a header.
    pub fn new(raw: &str) -> Result<Self, RemoteSetupError> {
        if raw.trim().is_empty() {
            return Err(RemoteSetupError::InvalidToken);
        }
        let mut header = HeaderValue::from_str(&format!("Bearer {raw}"))
            .map_err(|_| RemoteSetupError::InvalidToken)?;
        header.set_sensitive(true);
        Ok(Self { header })
    }

    pub(crate) fn header_value(&self) -> HeaderValue {
        self.header.clone()
    }
}

impl Debug for BearerToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("BearerToken(<redacted>)")
    }
}

/// Client for API calls: bearer token and trace id on every request.
pub(crate) fn authorized_client(
    token: &BearerToken,
    trace_id: &str,
    timeout: Duration,
) -> Result<Client, RemoteSetupError> {
    let mut default_headers = base_headers(trace_id)?;
    default_headers.insert(AUTHORIZATION, token.header_value());
    build_client("api", default_headers, timeout)
}

/// Client for pre-signed transfers: trace id only, never the token.
pub(crate) fn transfer_client(trace_id: &str, timeout: Duration) -> Result<Client, RemoteSetupError> {
    build_client("transfer", base_headers(trace_id)?, timeout)
}

fn base_headers(trace_id: &str) -> Result<HeaderMap, RemoteSetupError> {
    let mut default_headers = HeaderMap::new();
    let request_id =
        HeaderValue::from_str(trace_id).map_err(|_| RemoteSetupError::InvalidTraceId)?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);
    Ok(default_headers)
}

fn build_client(
    role: &'static str,
    default_headers: HeaderMap,
    timeout: Duration,
) -> Result<Client, RemoteSetupError> {
    Client::builder()
        .timeout(timeout)
        .default_headers(default_headers)
        .build()
        .map_err(|source| RemoteSetupError::ClientBuild { role, source })
}
