//! Connection settings and endpoint layout of the inference service.

use std::time::Duration;

use medbatch_core::{JobError, StepResult, TaskName, UsageId};
use url::Url;

use crate::error::RemoteSetupError;

/// Production API root.
pub const DEFAULT_API_ROOT: &str = "https://medical-ai.sawtellelabs.com";
/// Default per-request timeout for API calls.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);
/// Default per-request timeout for uploads and downloads.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Remote connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Root all task endpoints hang off.
    pub api_root: Url,
    /// Timeout applied to submit and status calls.
    pub api_timeout: Duration,
    /// Timeout applied to uploads and downloads.
    pub transfer_timeout: Duration,
}

impl RemoteConfig {
    /// Settings pointing at `api_root` with default timeouts.
    #[must_use]
    pub const fn new(api_root: Url) -> Self {
        Self {
            api_root,
            api_timeout: DEFAULT_API_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }
}

/// Endpoint builder rooted at the configured API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoints {
    root: Url,
}

impl RemoteEndpoints {
    /// Validate `root` and normalise it to end with a slash.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteSetupError::InvalidApiRoot`] when `root` is not an
    /// http(s) URL usable as a base.
    pub fn new(root: &Url) -> Result<Self, RemoteSetupError> {
        if root.cannot_be_a_base() || !matches!(root.scheme(), "http" | "https") {
            return Err(RemoteSetupError::InvalidApiRoot {
                url: root.to_string(),
            });
        }
        let mut root = root.clone();
        root.set_query(None);
        root.set_fragment(None);
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        Ok(Self { root })
    }

    /// `{root}/{task}/api/v2/submit-job`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the path cannot be joined.
    pub fn submit_job(&self, task: TaskName) -> StepResult<Url> {
        self.root
            .join(&format!("{task}/api/v2/submit-job"))
            .map_err(|err| JobError::transport("submit_job", err))
    }

    /// `{root}/{task}/api/v2/check-job-status?usage_id=<id>`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the path cannot be joined.
    pub fn check_job_status(&self, task: TaskName, usage_id: &UsageId) -> StepResult<Url> {
        let mut url = self
            .root
            .join(&format!("{task}/api/v2/check-job-status"))
            .map_err(|err| JobError::transport("check_status", err))?;
        url.query_pairs_mut()
            .append_pair("usage_id", usage_id.as_str());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("valid url")
    }

    #[test]
    fn endpoints_append_task_paths() -> StepResult<()> {
        let endpoints = RemoteEndpoints::new(&url(DEFAULT_API_ROOT)).expect("endpoints");
        assert_eq!(
            endpoints.submit_job(TaskName::MrProstateSeg)?.as_str(),
            "https://medical-ai.sawtellelabs.com/mr-prostate-seg/api/v2/submit-job"
        );
        let usage = UsageId::new("abc 1").expect("usage id");
        assert_eq!(
            endpoints
                .check_job_status(TaskName::CtScanBodyPartDetection, &usage)?
                .as_str(),
            "https://medical-ai.sawtellelabs.com/ct-scan-body-part-detection/api/v2/check-job-status?usage_id=abc+1"
        );
        Ok(())
    }

    #[test]
    fn endpoints_keep_root_prefix() -> StepResult<()> {
        let endpoints = RemoteEndpoints::new(&url("http://proxy.local/inference")).expect("endpoints");
        assert_eq!(
            endpoints.submit_job(TaskName::MrProstateSeg)?.as_str(),
            "http://proxy.local/inference/mr-prostate-seg/api/v2/submit-job"
        );
        Ok(())
    }

    #[test]
    fn endpoints_reject_non_http_roots() {
        assert!(matches!(
            RemoteEndpoints::new(&url("mailto:ops@example.com")),
            Err(RemoteSetupError::InvalidApiRoot { .. })
        ));
        assert!(RemoteEndpoints::new(&url("ftp://files.example.com")).is_err());
    }

    #[test]
    fn config_defaults_timeouts() {
        let config = RemoteConfig::new(url(DEFAULT_API_ROOT));
        assert_eq!(config.api_timeout, Duration::from_secs(30));
        assert_eq!(config.transfer_timeout, Duration::from_secs(300));
    }
}
