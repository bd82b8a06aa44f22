//! One provisioning run against a target.
//!
//! Steps run strictly in order and the first failure ends the run. Files
//! already uploaded are left in place; a rerun overwrites them.
//!
//! 1. resolve the home directory
//! 2. gate on the TLS configuration and upload the TLS assets
//! 3. derive the JWKS public key and upload it
//! 4. upload the additional files
//! 5. run the user commands, then the TLS install commands

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::info;

use crate::communicator::Communicator;
use crate::config::{Profile, TlsConfig};
use crate::error::ProvisionError;
use crate::home::resolve_home_dir;
use crate::jwks::derive_jwks_public_key_pem;
use crate::staging::StagedFile;
use crate::template::{Variables, interpolate};
use crate::tls::{TlsRequest, build_tls_transfer_plan, should_skip_tls, tls_install_commands};
use crate::upload::{provision_upload, upload_plan};

/// File name of the derived public key under the home directory.
pub const PUBLIC_KEY_FILE_NAME: &str = "publicKey.txt";

/// Builds the full command list of a run.
///
/// User commands are interpolated and come first; the TLS install commands
/// follow unless TLS was skipped.
pub fn command_list(
    commands: &[String],
    home_dir: &Utf8Path,
    skip_tls: bool,
    vars: &Variables,
) -> Result<Vec<String>, ProvisionError> {
    let mut list = commands
        .iter()
        .map(|command| interpolate(command, vars))
        .collect::<Result<Vec<_>, _>>()?;
    list.extend(tls_install_commands(home_dir, skip_tls));
    Ok(list)
}

/// Executes a profile through a communicator.
pub struct Provisioner<'a> {
    profile: &'a Profile,
    communicator: &'a dyn Communicator,
}

impl<'a> Provisioner<'a> {
    pub fn new(profile: &'a Profile, communicator: &'a dyn Communicator) -> Self {
        Self {
            profile,
            communicator,
        }
    }

    #[tracing::instrument(skip(self), fields(communicator = self.communicator.name()))]
    pub fn run(&self) -> Result<()> {
        let home_dir = resolve_home_dir(&self.profile.home_dir)?;
        let tls = self.profile.tls_or_default();
        let skip_tls = should_skip_tls(&tls.cert_source, &tls.key_source, &tls.domain)?;

        let vars = Variables {
            home_dir: home_dir.to_string(),
            domain: tls.domain.clone(),
            jwt_issuer: self
                .profile
                .jwks
                .as_ref()
                .map(|jwks| jwks.issuer.clone())
                .unwrap_or_default(),
        };

        info!("provisioning into {}", home_dir);

        if !skip_tls {
            self.stage_tls(&tls, &home_dir)
                .context("failed to configure TLS")?;
        }
        self.install_public_key(&home_dir)
            .context("failed to install JWKS public key")?;
        self.upload_files(&vars)?;

        let commands = command_list(&self.profile.commands, &home_dir, skip_tls, &vars)?;
        for (index, command) in commands.iter().enumerate() {
            info!("running command {}/{}: {}", index + 1, commands.len(), command);
            self.communicator
                .run(command)
                .with_context(|| format!("failed to run command {}", index + 1))?;
        }

        info!("provisioning completed successfully");
        Ok(())
    }

    fn stage_tls(&self, tls: &TlsConfig, home_dir: &Utf8Path) -> Result<(), ProvisionError> {
        let proxy = tls.proxy_config.as_ref().ok_or_else(|| {
            ProvisionError::Configuration(
                "tls: proxy_config is required when TLS is configured".to_string(),
            )
        })?;

        let request = TlsRequest {
            cert_source: tls.cert_source.clone(),
            key_source: tls.key_source.clone(),
            domain: tls.domain.clone(),
            home_dir: home_dir.to_owned(),
            proxy_config: proxy.render(&tls.domain)?,
        };

        let plan = build_tls_transfer_plan(&request)?;
        upload_plan(self.communicator, &plan)
    }

    fn install_public_key(&self, home_dir: &Utf8Path) -> Result<(), ProvisionError> {
        let Some(jwks) = &self.profile.jwks else {
            return Ok(());
        };

        let pem = derive_jwks_public_key_pem(&jwks.url, jwks.timeout())?;
        let staged = StagedFile::create("publicKey", &pem)?;
        let destination = home_dir.join(PUBLIC_KEY_FILE_NAME);
        provision_upload(self.communicator, staged.path(), destination.as_str())
    }

    fn upload_files(&self, vars: &Variables) -> Result<()> {
        for (index, file) in self.profile.files.iter().enumerate() {
            let source = interpolate(&file.source, vars)?;
            let destination = interpolate(&file.destination, vars)?;
            provision_upload(self.communicator, Utf8Path::new(&source), &destination)
                .with_context(|| format!("failed to upload files[{}]", index))?;
        }
        Ok(())
    }
}
