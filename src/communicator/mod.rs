//! Channels to the machine being provisioned.
//!
//! A communicator knows how to copy a local file to a path on the target and
//! how to run a shell command there. Two implementations exist:
//! - [`ChrootCommunicator`] for a rootfs directory on the local host
//! - [`SshCommunicator`] for a running machine reachable over SSH

use anyhow::Result;
use camino::Utf8Path;

use crate::error::ProvisionError;
use crate::executor::{CommandSpec, ExecutionResult};

pub mod chroot;
pub mod ssh;

pub use chroot::ChrootCommunicator;
pub use ssh::SshCommunicator;

/// Trait for communicator implementations.
pub trait Communicator {
    /// Returns the name of this communicator.
    fn name(&self) -> &'static str;

    /// Copies the local file `source` to `destination` on the target.
    ///
    /// `destination` is always a full file path; directory handling is done
    /// by the caller.
    fn upload(&self, source: &Utf8Path, destination: &Utf8Path) -> Result<()>;

    /// Runs a shell command on the target and fails on a non-zero exit.
    fn run(&self, command: &str) -> Result<()>;
}

/// Turns an unsuccessful execution result into an `Execution` error.
pub(crate) fn ensure_success(spec: &CommandSpec, result: &ExecutionResult) -> Result<()> {
    if result.success() {
        return Ok(());
    }
    let status = match result.status {
        Some(status) => status.to_string(),
        None => "unknown status".to_string(),
    };
    Err(ProvisionError::Execution {
        command: spec.display(),
        status,
    }
    .into())
}
