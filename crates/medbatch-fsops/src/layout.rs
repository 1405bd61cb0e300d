//! Output directory preparation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FsOpsError, FsOpsResult};

/// Create `dir` (and parents) when missing and return its canonical form.
///
/// # Errors
///
/// Returns an error when the directory cannot be created or resolved, or when
/// `dir` names an existing non-directory.
pub fn prepare_output_dir(dir: &Path) -> FsOpsResult<PathBuf> {
    if dir.exists() && !dir.is_dir() {
        return Err(FsOpsError::InvalidInput {
            field: "output_dir",
            reason: "exists but is not a directory",
            value: Some(dir.display().to_string()),
        });
    }
    fs::create_dir_all(dir).map_err(|source| FsOpsError::io("output.create_dir", dir, source))?;
    fs::canonicalize(dir).map_err(|source| FsOpsError::io("output.canonicalize", dir, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prepare_creates_nested_directories() -> FsOpsResult<()> {
        let root = TempDir::new().expect("tempdir");
        let target = root.path().join("results/run-1");
        let prepared = prepare_output_dir(&target)?;
        assert!(prepared.is_dir());
        assert!(prepared.is_absolute());
        assert_eq!(prepare_output_dir(&target)?, prepared);
        Ok(())
    }

    #[test]
    fn prepare_rejects_existing_file() {
        let root = TempDir::new().expect("tempdir");
        let file = root.path().join("occupied");
        fs::write(&file, b"x").expect("write file");
        assert!(matches!(
            prepare_output_dir(&file),
            Err(FsOpsError::InvalidInput {
                field: "output_dir",
                ..
            })
        ));
    }
}
