//! `results.csv` summary export.
//!
//! Rows follow RFC 4180: fields containing commas, quotes or line breaks are
//! quoted and embedded quotes doubled.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use medbatch_core::{JobResult, ResultExporter};
use tracing::info;

use crate::error::{FsOpsError, FsOpsResult};

/// File name of the batch summary.
pub const SUMMARY_FILE_NAME: &str = "results.csv";

const HEADER: [&str; 3] = ["input_path", "output_path", "message"];

/// Writes one CSV row per job result.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl ResultExporter for CsvExporter {
    type Error = FsOpsError;

    fn export(&self, output_dir: &Path, results: &[JobResult]) -> FsOpsResult<PathBuf> {
        let path = output_dir.join(SUMMARY_FILE_NAME);
        let document = render(results);
        fs::write(&path, document).map_err(|source| FsOpsError::io("export.write", &path, source))?;
        info!(path = %path.display(), rows = results.len(), "summary written");
        Ok(path)
    }
}

/// Render the full CSV document, header included.
#[must_use]
pub fn render(results: &[JobResult]) -> String {
    let mut document = String::new();
    push_row(&mut document, HEADER);
    for result in results {
        let input = result.input_path.display().to_string();
        let output = result
            .output_path()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let message = result.message().unwrap_or_default();
        push_row(&mut document, [input.as_str(), output.as_str(), message]);
    }
    document
}

fn push_row(document: &mut String, fields: [&str; 3]) {
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            document.push(',');
        }
        push_field(document, field);
    }
    document.push_str("\r\n");
}

fn push_field(document: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        let _ = write!(document, "\"{}\"", field.replace('"', "\"\""));
    } else {
        document.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbatch_core::{FailureKind, JobOutcome, UsageId};
    use tempfile::TempDir;

    fn success(input: &str, output: &str) -> JobResult {
        JobResult {
            input_path: PathBuf::from(input),
            usage_id: UsageId::new("u-1"),
            outcome: JobOutcome::Succeeded {
                output_path: PathBuf::from(output),
            },
        }
    }

    fn failure(input: &str, message: &str) -> JobResult {
        JobResult {
            input_path: PathBuf::from(input),
            usage_id: None,
            outcome: JobOutcome::Failed {
                kind: FailureKind::Unauthorized,
                message: message.to_string(),
            },
        }
    }

    #[test]
    fn render_writes_header_and_one_row_per_result() {
        let document = render(&[
            success("/in/a.nii.gz", "/out/u-1-a.nii.gz"),
            failure("/in/b.nii.gz", "upload failed (status 403)"),
        ]);
        let rows: Vec<_> = document.split("\r\n").collect();
        assert_eq!(rows[0], "input_path,output_path,message");
        assert_eq!(rows[1], "/in/a.nii.gz,/out/u-1-a.nii.gz,");
        assert_eq!(rows[2], "/in/b.nii.gz,,upload failed (status 403)");
        assert_eq!(rows[3], "");
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn render_quotes_special_characters() {
        let document = render(&[failure("/in/a,b.nii.gz", "remote said \"no\"")]);
        assert!(document.contains("\"/in/a,b.nii.gz\",,\"remote said \"\"no\"\"\""));
    }

    #[test]
    fn export_writes_results_csv() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = CsvExporter.export(dir.path(), &[success("/in/a.nii.gz", "/out/x")])?;
        assert_eq!(path, dir.path().join(SUMMARY_FILE_NAME));
        let written = fs::read_to_string(&path)?;
        assert!(written.starts_with("input_path,output_path,message\r\n"));
        Ok(())
    }

    #[test]
    fn export_into_missing_dir_fails_with_context() {
        let dir = TempDir::new().expect("tempdir");
        let err = CsvExporter
            .export(&dir.path().join("absent"), &[])
            .expect_err("missing directory");
        assert!(matches!(
            err,
            FsOpsError::Io {
                operation: "export.write",
                ..
            }
        ));
    }
}
