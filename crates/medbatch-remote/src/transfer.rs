//! Uploads to and downloads from pre-signed object-store locations.
//!
//! Uploads read the whole input into memory before sending; inputs are
//! expected to be single imaging volumes, not multi-gigabyte archives.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use medbatch_core::{
    DownloadedFile, JobError, StepResult, TransferExecutor, UploadGrant, UsageId,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::client::transfer_client;
use crate::config::RemoteConfig;
use crate::error::RemoteSetupError;

/// [`TransferExecutor`] using one shared client that never carries the token.
#[derive(Clone)]
pub struct HttpTransfer {
    client: Client,
}

impl HttpTransfer {
    /// Build the transfer client for `config`, tagging requests with `trace_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: &RemoteConfig, trace_id: &str) -> Result<Self, RemoteSetupError> {
        Ok(Self {
            client: transfer_client(trace_id, config.transfer_timeout)?,
        })
    }
}

#[async_trait]
impl TransferExecutor for HttpTransfer {
    async fn upload(&self, grant: &UploadGrant, input: &Path) -> StepResult<u64> {
        let bytes = tokio::fs::read(input)
            .await
            .map_err(|err| JobError::io("read_input", input, err))?;
        let sent = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        let file_name = input
            .file_name()
            .map_or_else(|| "input".to_string(), |name| name.to_string_lossy().into_owned());

        let form = grant
            .fields
            .pairs()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name, value.to_string())
            })
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(grant.upload_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| JobError::transport("upload", err))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            return Err(JobError::UploadFailed {
                status: status.as_u16(),
            });
        }
        debug!(bytes = sent, "upload accepted");
        Ok(sent)
    }

    async fn download(
        &self,
        output_url: &Url,
        destination_dir: &Path,
        usage_id: &UsageId,
    ) -> StepResult<DownloadedFile> {
        let path = output_path(destination_dir, usage_id, output_url)?;

        let response = self
            .client
            .get(output_url.clone())
            .send()
            .await
            .map_err(|err| JobError::transport("download", err))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(JobError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| JobError::transport("download", err))?;
        tokio::fs::write(&path, &body)
            .await
            .map_err(|err| JobError::io("write_output", &path, err))?;

        Ok(DownloadedFile {
            path,
            bytes: u64::try_from(body.len()).unwrap_or(u64::MAX),
        })
    }
}

/// Local file name for a result: `{usage_id}-{basename}`.
///
/// The basename is the last path segment of `output_url`; the query never
/// contributes.
///
/// # Errors
///
/// Returns [`JobError::UnsafeOutputName`] when the basename is empty, `.` or
/// `..`, or when the name contains a path separator.
pub fn output_file_name(usage_id: &UsageId, output_url: &Url) -> StepResult<String> {
    let basename = output_url.path().rsplit('/').next().unwrap_or_default();
    let name = format!("{usage_id}-{basename}");
    if matches!(basename, "" | "." | "..") || name.contains(['/', '\\']) {
        return Err(JobError::UnsafeOutputName { name });
    }
    Ok(name)
}

/// Absolute destination for a result, always a direct child of
/// `destination_dir`.
///
/// # Errors
///
/// Returns [`JobError::UnsafeOutputName`] for names rejected by
/// [`output_file_name`] or that would not land directly in the directory, and
/// [`JobError::Io`] when the directory cannot be made absolute.
pub fn output_path(
    destination_dir: &Path,
    usage_id: &UsageId,
    output_url: &Url,
) -> StepResult<PathBuf> {
    let name = output_file_name(usage_id, output_url)?;
    let dir = std::path::absolute(destination_dir)
        .map_err(|err| JobError::io("resolve_output_dir", destination_dir, err))?;
    let path = dir.join(&name);
    if path.parent() != Some(dir.as_path()) {
        return Err(JobError::UnsafeOutputName { name });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use medbatch_core::{UploadFields, UsageId};
    use medbatch_test_support::mocks::{MockRemote, OUTPUT_BODY, OUTPUT_PATH, UPLOAD_PATH};
    use tempfile::TempDir;

    fn transfer() -> HttpTransfer {
        let config = RemoteConfig::new(Url::parse("http://unused.local").expect("url"));
        HttpTransfer::new(&config, "batch-trace").expect("transfer client")
    }

    fn usage(raw: &str) -> UsageId {
        UsageId::new(raw).expect("usage id")
    }

    fn grant_for(remote: &MockRemote) -> UploadGrant {
        UploadGrant {
            usage_id: usage("u-1"),
            upload_url: Url::parse(&remote.server().url(UPLOAD_PATH)).expect("upload url"),
            fields: UploadFields {
                key: "uploads/a".into(),
                policy: "p".into(),
                algorithm: "AWS4-HMAC-SHA256".into(),
                credential: "c".into(),
                date: "d".into(),
                signature: "s".into(),
            },
        }
    }

    #[test]
    fn output_name_strips_query_and_prefixes_usage_id() {
        let url = Url::parse("https://bucket.example.com/out/seg.nii.gz?X-Amz-Signature=abc")
            .expect("url");
        assert_eq!(
            output_file_name(&usage("u-1"), &url).expect("name"),
            "u-1-seg.nii.gz"
        );
    }

    #[test]
    fn output_name_rejects_unsafe_values() {
        let trailing = Url::parse("https://bucket.example.com/out/").expect("url");
        assert!(matches!(
            output_file_name(&usage("u-1"), &trailing),
            Err(JobError::UnsafeOutputName { .. })
        ));
        let url = Url::parse("https://bucket.example.com/out/seg.nii.gz").expect("url");
        assert!(output_file_name(&usage("../etc"), &url).is_err());
        assert!(output_file_name(&usage("../x"), &url).is_err());
        assert!(output_file_name(&usage("a\\b"), &url).is_err());
        let parent = Url::parse("https://bucket.example.com/out/..").expect("url");
        assert!(output_file_name(&usage("u-1"), &parent).is_err());
    }

    #[test]
    fn output_name_keeps_double_dots_inside_names() {
        let url = Url::parse("https://bucket.example.com/out/seg..v2.nii.gz").expect("url");
        assert_eq!(
            output_file_name(&usage("u-1"), &url).expect("name"),
            "u-1-seg..v2.nii.gz"
        );
        assert_eq!(
            output_file_name(&usage("run..7"), &url).expect("name"),
            "run..7-seg..v2.nii.gz"
        );
    }

    #[test]
    fn output_path_is_absolute_child_of_destination() {
        let url = Url::parse("https://bucket.example.com/out/segmentation.nii.gz").expect("url");
        let path = output_path(Path::new("rel-out"), &usage("u-1"), &url).expect("path");
        assert!(path.is_absolute());
        assert!(path.ends_with("rel-out/u-1-segmentation.nii.gz"));
        assert_eq!(
            path.parent().and_then(Path::file_name),
            Some(std::ffi::OsStr::new("rel-out"))
        );
    }

    #[tokio::test]
    async fn upload_posts_multipart_without_authorization() {
        let remote = MockRemote::start().await;
        let mock = remote.server().mock(|when, then| {
            when.method(POST)
                .path(UPLOAD_PATH)
                .header_exists("x-request-id")
                .header_missing("authorization");
            then.status(204);
        });
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("case.nii.gz");
        std::fs::write(&input, b"volume").expect("write input");

        let sent = transfer()
            .upload(&grant_for(&remote), &input)
            .await
            .expect("upload");
        mock.assert();
        assert_eq!(sent, 6);
    }

    #[tokio::test]
    async fn upload_requires_no_content_status() {
        let remote = MockRemote::start().await;
        remote.upload_responds(200);
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("case.nii.gz");
        std::fs::write(&input, b"volume").expect("write input");

        let err = transfer()
            .upload(&grant_for(&remote), &input)
            .await
            .expect_err("200 is not accepted");
        assert!(matches!(err, JobError::UploadFailed { status: 200 }));
    }

    #[tokio::test]
    async fn upload_reports_unreadable_input() {
        let remote = MockRemote::start().await;
        let mock = remote.upload_responds(204);
        let dir = TempDir::new().expect("tempdir");

        let err = transfer()
            .upload(&grant_for(&remote), &dir.path().join("missing.nii.gz"))
            .await
            .expect_err("missing input");
        assert!(matches!(err, JobError::Io { .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn download_writes_prefixed_file() {
        let remote = MockRemote::start().await;
        let mock = remote.output_responds(200);
        let dir = TempDir::new().expect("tempdir");
        let url = Url::parse(&format!("{}?sig=1", remote.server().url(OUTPUT_PATH))).expect("url");

        let file = transfer()
            .download(&url, dir.path(), &usage("u-5"))
            .await
            .expect("download");
        mock.assert();
        assert_eq!(file.path, dir.path().join("u-5-segmentation.nii.gz"));
        assert_eq!(std::fs::read(&file.path).expect("read output"), OUTPUT_BODY);
        assert_eq!(file.bytes, OUTPUT_BODY.len() as u64);
    }

    #[tokio::test]
    async fn download_skips_write_on_error_status() {
        let remote = MockRemote::start().await;
        remote.output_responds(403);
        let dir = TempDir::new().expect("tempdir");
        let url = Url::parse(&remote.server().url(OUTPUT_PATH)).expect("url");

        let err = transfer()
            .download(&url, dir.path(), &usage("u-5"))
            .await
            .expect_err("forbidden");
        assert!(matches!(err, JobError::DownloadFailed { status: 403 }));
        assert!(std::fs::read_dir(dir.path()).expect("read dir").next().is_none());
    }
}
