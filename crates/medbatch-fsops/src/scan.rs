//! Recursive, extension-filtered input discovery.

use std::path::{Path, PathBuf};

use medbatch_core::InputCatalog;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// Default input extension (compressed NIfTI volumes).
pub const DEFAULT_EXTENSION: &str = ".nii.gz";

/// Finds regular files whose name ends with a fixed suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionScanner {
    extension: String,
}

impl ExtensionScanner {
    /// Scanner matching `extension`; a leading dot is added when missing.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] for a blank extension.
    pub fn new(extension: &str) -> FsOpsResult<Self> {
        let trimmed = extension.trim();
        if trimmed.trim_start_matches('.').is_empty() {
            return Err(FsOpsError::InvalidInput {
                field: "extension",
                reason: "must not be empty",
                value: Some(extension.to_string()),
            });
        }
        let extension = if trimmed.starts_with('.') {
            trimmed.to_string()
        } else {
            format!(".{trimmed}")
        };
        Ok(Self { extension })
    }

    /// Suffix matched against file names.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn matches(&self, name: &str) -> bool {
        name.len() > self.extension.len() && name.ends_with(&self.extension)
    }
}

impl Default for ExtensionScanner {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl InputCatalog for ExtensionScanner {
    type Error = FsOpsError;

    fn discover(&self, root: &Path) -> FsOpsResult<Vec<PathBuf>> {
        ensure_input_dir(root)?;
        let mut inputs = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|source| FsOpsError::walkdir("scan.walk", root, source))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.matches(name))
            {
                inputs.push(entry.into_path());
            }
        }
        inputs.sort();
        debug!(
            root = %root.display(),
            extension = %self.extension,
            count = inputs.len(),
            "input discovery complete"
        );
        Ok(inputs)
    }
}

/// Fail unless `root` is an existing directory.
///
/// # Errors
///
/// Returns [`FsOpsError::InvalidInput`] when `root` is missing or not a
/// directory.
pub fn ensure_input_dir(root: &Path) -> FsOpsResult<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(FsOpsError::InvalidInput {
            field: "input_dir",
            reason: "must be an existing directory",
            value: Some(root.display().to_string()),
        })
    }
}
