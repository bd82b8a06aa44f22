//! Remote home directory resolution.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::ProvisionError;

/// Home directory used on the target when the profile does not set one.
pub const DEFAULT_HOME_DIR: &str = "/root";

/// Resolves the remote home directory that uploads are placed under.
///
/// An empty value falls back to [`DEFAULT_HOME_DIR`]. A configured value is
/// returned unchanged, but it must be an absolute path without `..`
/// components. Existence is not checked here because the directory lives on
/// the target, not on the local host.
pub fn resolve_home_dir(configured: &str) -> Result<Utf8PathBuf, ProvisionError> {
    if configured.is_empty() {
        return Ok(Utf8PathBuf::from(DEFAULT_HOME_DIR));
    }

    let path = Utf8Path::new(configured);
    if !path.is_absolute() {
        return Err(ProvisionError::Configuration(format!(
            "home directory '{}' must be an absolute path",
            configured
        )));
    }
    if path.components().any(|c| c == Utf8Component::ParentDir) {
        return Err(ProvisionError::Configuration(format!(
            "home directory '{}' contains '..' components",
            configured
        )));
    }

    Ok(path.to_owned())
}
