//! Input-tree fixtures on temporary directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Extension carried by generated input volumes.
pub const VOLUME_EXTENSION: &str = ".nii.gz";

/// A temporary input folder plus a separate output folder.
pub struct BatchDirs {
    input: TempDir,
    output: TempDir,
    volumes: Vec<PathBuf>,
}

impl BatchDirs {
    /// Create `count` volumes spread over a nested tree, plus a few files that
    /// must be ignored by an extension-filtered scan.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary tree cannot be written.
    pub fn with_volumes(count: usize) -> io::Result<Self> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        let mut volumes = Vec::with_capacity(count);
        for index in 0..count {
            let relative = if index % 2 == 0 {
                PathBuf::from(format!("case-{index:02}{VOLUME_EXTENSION}"))
            } else {
                PathBuf::from(format!("nested/series/case-{index:02}{VOLUME_EXTENSION}"))
            };
            let bytes = format!("volume-{index}").into_bytes();
            volumes.push(write_file(input.path(), &relative, &bytes)?);
        }
        write_file(input.path(), Path::new("notes.txt"), b"ignored")?;
        write_file(input.path(), Path::new("nested/case.nii"), b"ignored")?;
        volumes.sort();
        Ok(Self {
            input,
            output,
            volumes,
        })
    }

    /// Root of the input tree.
    #[must_use]
    pub fn input(&self) -> &Path {
        self.input.path()
    }

    /// Output folder (exists, empty at creation).
    #[must_use]
    pub fn output(&self) -> &Path {
        self.output.path()
    }

    /// Generated volumes in sorted order.
    #[must_use]
    pub fn volumes(&self) -> &[PathBuf] {
        &self.volumes
    }
}

/// Write `bytes` under `root/relative`, creating parent directories.
///
/// # Errors
///
/// Returns an error when the directory or file cannot be created.
pub fn write_file(root: &Path, relative: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_dirs_lay_out_volumes_and_noise() -> io::Result<()> {
        let dirs = BatchDirs::with_volumes(3)?;
        assert_eq!(dirs.volumes().len(), 3);
        for volume in dirs.volumes() {
            assert!(volume.starts_with(dirs.input()));
            assert!(volume.is_file());
        }
        assert!(dirs.input().join("notes.txt").is_file());
        assert!(fs::read_dir(dirs.output())?.next().is_none());
        Ok(())
    }
}
