//! Authorized submit and status calls against the inference API.

use async_trait::async_trait;
use medbatch_core::{
    JobError, StatusReport, StepResult, TaskName, UploadFields, UploadGrant, UsageId,
    WorkflowClient,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::{BearerToken, authorized_client};
use crate::config::{RemoteConfig, RemoteEndpoints};
use crate::error::RemoteSetupError;

/// [`WorkflowClient`] speaking HTTP with one shared authorized client.
#[derive(Clone)]
pub struct HttpWorkflowClient {
    client: Client,
    endpoints: RemoteEndpoints,
}

impl HttpWorkflowClient {
    /// Build the client for `config`, tagging every request with `trace_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the API root is unusable or the HTTP client
    /// cannot be constructed.
    pub fn new(
        config: &RemoteConfig,
        token: &BearerToken,
        trace_id: &str,
    ) -> Result<Self, RemoteSetupError> {
        Ok(Self {
            client: authorized_client(token, trace_id, config.api_timeout)?,
            endpoints: RemoteEndpoints::new(&config.api_root)?,
        })
    }
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    async fn request_destination(&self, task: TaskName) -> StepResult<UploadGrant> {
        let url = self.endpoints.submit_job(task)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| JobError::transport("submit_job", err))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "submit-job rejected");
            return Err(JobError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| JobError::transport("submit_job", err))?;
        let payload: Value = serde_json::from_slice(&body)
            .map_err(|_| JobError::invalid_response("submit_job", "body"))?;
        parse_grant(&payload)
    }

    async fn check_status(&self, task: TaskName, usage_id: &UsageId) -> StepResult<StatusReport> {
        let url = self.endpoints.check_job_status(task, usage_id)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| JobError::transport("check_status", err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::StatusCheckFailed {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| JobError::transport("check_status", err))?;
        serde_json::from_slice(&body).map_err(|_| JobError::invalid_response("check_status", "body"))
    }
}

fn parse_grant(payload: &Value) -> StepResult<UploadGrant> {
    let usage_id = match payload.get("usage_id") {
        Some(Value::String(text)) => UsageId::new(text.as_str()),
        Some(Value::Number(number)) => UsageId::new(number.to_string()),
        _ => None,
    }
    .ok_or_else(|| JobError::invalid_response("submit_job", "usage_id"))?;

    let upload_url = payload
        .get("url")
        .and_then(Value::as_str)
        .and_then(|raw| Url::parse(raw).ok())
        .ok_or_else(|| JobError::invalid_response("submit_job", "url"))?;

    let fields = payload
        .get("fields")
        .cloned()
        .and_then(|raw| serde_json::from_value::<UploadFields>(raw).ok())
        .ok_or_else(|| JobError::invalid_response("submit_job", "fields"))?;

    Ok(UploadGrant {
        usage_id,
        upload_url,
        fields,
    })
}
