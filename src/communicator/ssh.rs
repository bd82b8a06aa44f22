//! SSH target reached through the `scp` and `ssh` clients.

use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

use super::{Communicator, ensure_success};
use crate::executor::{CommandExecutor, CommandSpec};

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Communicator for a running machine reachable over SSH.
///
/// Authentication is non-interactive (`BatchMode=yes`): either an identity
/// file or an agent must be available.
pub struct SshCommunicator {
    host: String,
    user: String,
    port: u16,
    identity_file: Option<Utf8PathBuf>,
    executor: Arc<dyn CommandExecutor>,
}

impl SshCommunicator {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port: DEFAULT_SSH_PORT,
            identity_file: None,
            executor,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_identity_file(mut self, identity_file: Option<Utf8PathBuf>) -> Self {
        self.identity_file = identity_file;
        self
    }

    fn login(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Options shared by `ssh` and `scp`. The port flag differs in case.
    fn common_args(&self, port_flag: &str) -> Vec<String> {
        let mut args = vec![
            port_flag.to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string());
        }
        args
    }

    pub(crate) fn upload_spec(&self, source: &Utf8Path, destination: &Utf8Path) -> CommandSpec {
        let mut args = self.common_args("-P");
        args.push(source.to_string());
        args.push(format!("{}:{}", self.login(), destination));
        CommandSpec::new("scp", args)
    }

    pub(crate) fn run_spec(&self, command: &str) -> CommandSpec {
        let mut args = self.common_args("-p");
        args.push(self.login());
        args.push("--".to_string());
        args.push(command.to_string());
        CommandSpec::new("ssh", args)
    }
}

impl Communicator for SshCommunicator {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn upload(&self, source: &Utf8Path, destination: &Utf8Path) -> Result<()> {
        let spec = self.upload_spec(source, destination);
        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to copy {} to {}", source, self.host))?;
        ensure_success(&spec, &result)
    }

    fn run(&self, command: &str) -> Result<()> {
        let spec = self.run_spec(command);
        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to run command on {}: {}", self.host, command))?;
        ensure_success(&spec, &result)
    }
}
