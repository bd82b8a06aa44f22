//! Rootfs directory target.
//!
//! Remote absolute paths are translated to be relative to the rootfs
//! directory (`/root/ssl.crt` becomes `<rootfs>/root/ssl.crt`), files are
//! copied on the host, and commands run through `chroot <rootfs> /bin/sh -c`.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use super::{Communicator, ensure_success};
use crate::error::ProvisionError;
use crate::executor::{CommandExecutor, CommandSpec};

/// Communicator for a bootstrapped rootfs directory.
pub struct ChrootCommunicator {
    rootfs: Utf8PathBuf,
    shell: String,
    executor: Arc<dyn CommandExecutor>,
    dry_run: bool,
}

impl ChrootCommunicator {
    pub fn new(rootfs: Utf8PathBuf, executor: Arc<dyn CommandExecutor>, dry_run: bool) -> Self {
        Self {
            rootfs,
            shell: "/bin/sh".to_string(),
            executor,
            dry_run,
        }
    }

    /// Overrides the shell used inside the rootfs.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn rootfs(&self) -> &Utf8Path {
        &self.rootfs
    }

    /// Maps a target path to its location on the host.
    pub fn host_path(&self, remote: &Utf8Path) -> Result<Utf8PathBuf, ProvisionError> {
        if remote.components().any(|c| c == Utf8Component::ParentDir) {
            return Err(ProvisionError::Configuration(format!(
                "target path '{}' contains '..' components, \
                which is not allowed for security reasons",
                remote
            )));
        }
        Ok(self.rootfs.join(remote.as_str().trim_start_matches('/')))
    }
}

impl Communicator for ChrootCommunicator {
    fn name(&self) -> &'static str {
        "chroot"
    }

    fn upload(&self, source: &Utf8Path, destination: &Utf8Path) -> Result<()> {
        let target = self.host_path(destination)?;
        if self.dry_run {
            info!("dry run: copy {} to {}", source, target);
            return Ok(());
        }

        let parent = target.parent().unwrap_or(self.rootfs.as_path());
        if !parent.is_dir() {
            return Err(ProvisionError::Configuration(format!(
                "target directory {} does not exist in rootfs {}",
                destination.parent().unwrap_or(destination),
                self.rootfs
            ))
            .into());
        }

        fs::copy(source, &target)
            .map_err(|e| ProvisionError::io(format!("failed to copy {} to {}", source, target), e))?;
        debug!("copied {} to {}", source, target);
        Ok(())
    }

    fn run(&self, command: &str) -> Result<()> {
        let spec = CommandSpec::new(
            "chroot",
            vec![
                self.rootfs.to_string(),
                self.shell.clone(),
                "-c".to_string(),
                command.to_string(),
            ],
        );
        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to run command in {}: {}", self.rootfs, command))?;
        ensure_success(&spec, &result)
    }
}
