//! Scratch files written on the local host before they are uploaded.
//!
//! Rendered configuration and derived keys only live long enough to be
//! transferred. [`StagedFile`] owns such a file and removes it when dropped,
//! so cleanup happens on every exit path including early returns on error.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ProvisionError;

/// RAII guard to ensure temporary file cleanup even on error.
#[derive(Debug)]
pub(crate) struct TempFileGuard {
    path: Utf8PathBuf,
}

impl TempFileGuard {
    pub(crate) fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("cleaned up temp file: {}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("temp file already removed: {}", self.path);
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path,
                    error_kind = ?e.kind(),
                    "failed to cleanup temp file: {}",
                    e,
                );
            }
        }
    }
}

/// A file in the system temp directory that is deleted on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: Utf8PathBuf,
    _guard: TempFileGuard,
}

impl StagedFile {
    /// Writes `content` verbatim to a new uniquely named file in the system
    /// temp directory. The file name starts with `prefix`.
    pub fn create(prefix: &str, content: &str) -> Result<Self, ProvisionError> {
        let tmp_dir = Utf8PathBuf::from_path_buf(std::env::temp_dir()).map_err(|p| {
            ProvisionError::Configuration(format!(
                "temp directory is not valid UTF-8: {}",
                p.display()
            ))
        })?;
        Self::create_in(&tmp_dir, prefix, content)
    }

    /// Same as [`StagedFile::create`] but inside `dir`.
    pub fn create_in(dir: &Utf8Path, prefix: &str, content: &str) -> Result<Self, ProvisionError> {
        let path = dir.join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::write(&path, content)
            .map_err(|e| ProvisionError::io(format!("failed to write staged file: {}", path), e))?;
        tracing::debug!("staged {} bytes at {}", content.len(), path);
        Ok(Self {
            _guard: TempFileGuard::new(path.clone()),
            path,
        })
    }

    /// Local path of the staged file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
