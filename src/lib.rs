pub mod cli;
pub mod communicator;
pub mod config;
pub mod error;
pub mod executor;
pub mod home;
pub mod jwks;
pub mod provision;
pub mod staging;
pub mod template;
pub mod tls;
pub mod upload;

pub use error::ProvisionError;

use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::communicator::{ChrootCommunicator, Communicator, SshCommunicator};
use crate::config::TargetConfig;
use crate::executor::CommandExecutor;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Creates the communicator for the profile's target.
pub fn build_communicator(
    target: &TargetConfig,
    executor: Arc<dyn CommandExecutor>,
    dry_run: bool,
) -> Box<dyn Communicator> {
    match target {
        TargetConfig::Ssh(ssh) => Box::new(
            SshCommunicator::new(&ssh.host, &ssh.user, executor)
                .with_port(ssh.port)
                .with_identity_file(ssh.identity_file.clone()),
        ),
        TargetConfig::Chroot(chroot) => Box::new(
            ChrootCommunicator::new(chroot.rootfs.clone(), executor, dry_run)
                .with_shell(&chroot.shell),
        ),
    }
}

pub fn run_apply(opts: &cli::ApplyArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let profile = config::load_profile(opts.file.as_path())
        .with_context(|| format!("failed to load profile from {}", opts.file))?;
    profile.validate().context("profile validation failed")?;

    info!("provisioning {} target", profile.target);
    let communicator = build_communicator(&profile.target, executor, opts.dry_run);
    provision::Provisioner::new(&profile, communicator.as_ref()).run()
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let profile = config::load_profile(opts.file.as_path())?;
    profile.validate().context("profile validation failed")?;
    info!("validation successful:\n{:#?}", profile);
    Ok(())
}

pub fn run_jwks(opts: &cli::JwksArgs) -> Result<()> {
    config::validate_jwks_url(&opts.url)?;
    let pem = jwks::derive_jwks_public_key_pem(&opts.url, Duration::from_secs(opts.timeout))?;

    match &opts.output {
        Some(path) => {
            fs::write(path, &pem).map_err(|e| ProvisionError::io(path.as_str(), e))?;
            info!("wrote public key to {}", path);
        }
        None => {
            std::io::stdout()
                .write_all(pem.as_bytes())
                .context("failed to write public key to stdout")?;
        }
    }
    Ok(())
}
