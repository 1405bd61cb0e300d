//! httpmock-backed stand-in for the inference service and its object store.

use httpmock::Mock;
use httpmock::prelude::*;
use serde_json::{Value, json};

/// Path the fake object store accepts uploads on.
pub const UPLOAD_PATH: &str = "/bucket/upload";
/// Path the fake object store serves results from.
pub const OUTPUT_PATH: &str = "/bucket/outputs/segmentation.nii.gz";
/// Bytes served as the result file.
pub const OUTPUT_BODY: &[u8] = b"segmentation-bytes";

/// One mock server playing both the API and the object store.
pub struct MockRemote {
    server: MockServer,
}

impl MockRemote {
    /// Start a fresh server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
        }
    }

    /// Borrow the underlying server for ad-hoc mocks.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Root URL to configure clients with.
    #[must_use]
    pub fn api_root(&self) -> String {
        self.server.base_url()
    }

    /// Path of the submit endpoint for `task`.
    #[must_use]
    pub fn submit_path(task: &str) -> String {
        format!("/{task}/api/v2/submit-job")
    }

    /// Path of the status endpoint for `task`.
    #[must_use]
    pub fn status_path(task: &str) -> String {
        format!("/{task}/api/v2/check-job-status")
    }

    /// Body returned by a successful submit call.
    #[must_use]
    pub fn grant_body(&self, usage_id: &Value) -> Value {
        json!({
            "usage_id": usage_id,
            "url": self.server.url(UPLOAD_PATH),
            "fields": {
                "key": "uploads/${filename}",
                "policy": "cG9saWN5",
                "x-amz-algorithm": "AWS4-HMAC-SHA256",
                "x-amz-credential": "AKIA/20240101/us-east-1/s3/aws4_request",
                "x-amz-date": "20240101T000000Z",
                "x-amz-signature": "deadbeef"
            }
        })
    }

    /// Body returned by a status call once the job has finished.
    #[must_use]
    pub fn success_body(&self) -> Value {
        json!({
            "status": "task-success",
            "input_url": self.server.url("/bucket/inputs/volume.nii.gz"),
            "output_url": format!("{}?X-Amz-Signature=abc&X-Amz-Expires=60", self.server.url(OUTPUT_PATH)),
        })
    }

    /// Submit endpoint answering with a grant for `usage_id`.
    pub fn submit_ok(&self, task: &str, token: &str, usage_id: &str) -> Mock<'_> {
        let body = self.grant_body(&json!(usage_id));
        let path = Self::submit_path(task);
        let auth = format!("Bearer {token}");
        self.server.mock(move |when, then| {
            when.method(GET)
                .path(path.as_str())
                .header("authorization", auth.as_str());
            then.status(200)
                .header("content-type", "application/json")
                .json_body(body);
        })
    }

    /// Submit endpoint rejecting every call with `status`.
    pub fn submit_rejected(&self, task: &str, status: u16) -> Mock<'_> {
        let path = Self::submit_path(task);
        self.server.mock(move |when, then| {
            when.method(GET).path(path.as_str());
            then.status(status)
                .header("content-type", "application/json")
                .json_body(json!({"detail": "not subscribed"}));
        })
    }

    /// Object store accepting uploads with `status`.
    pub fn upload_responds(&self, status: u16) -> Mock<'_> {
        self.server.mock(move |when, then| {
            when.method(POST).path(UPLOAD_PATH);
            then.status(status);
        })
    }

    /// Status endpoint answering `body` for `usage_id`.
    pub fn status_responds(&self, task: &str, usage_id: &str, body: Value) -> Mock<'_> {
        let path = Self::status_path(task);
        let usage_id = usage_id.to_string();
        self.server.mock(move |when, then| {
            when.method(GET)
                .path(path.as_str())
                .query_param("usage_id", usage_id.as_str());
            then.status(200)
                .header("content-type", "application/json")
                .json_body(body);
        })
    }

    /// Status endpoint reporting success for `usage_id`.
    pub fn status_success(&self, task: &str, usage_id: &str) -> Mock<'_> {
        self.status_responds(task, usage_id, self.success_body())
    }

    /// Object store serving the result file with `status`.
    pub fn output_responds(&self, status: u16) -> Mock<'_> {
        self.server.mock(move |when, then| {
            when.method(GET).path(OUTPUT_PATH);
            then.status(status).body(OUTPUT_BODY);
        })
    }
}
