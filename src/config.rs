//! YAML profile describing one provisioning run.

use std::fs::{self, File};
use std::io::BufReader;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use strum::Display;
use tracing::debug;

use crate::communicator::ssh::DEFAULT_SSH_PORT;
use crate::error::ProvisionError;
use crate::home::resolve_home_dir;
use crate::tls::{render_proxy_config, should_skip_tls};

/// Where the machine being provisioned lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Display)]
#[serde(tag = "type", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetConfig {
    /// Running machine reached over SSH
    Ssh(SshTarget),
    /// Rootfs directory on the local host
    Chroot(ChrootTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SshTarget {
    pub host: String,
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<Utf8PathBuf>,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChrootTarget {
    pub rootfs: Utf8PathBuf,
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

/// TLS assets and the reverse-proxy configuration that serves them.
///
/// `cert_source`, `key_source` and `domain` are set together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub cert_source: String,
    #[serde(default)]
    pub key_source: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub proxy_config: Option<ProxyConfig>,
}

/// Reverse-proxy configuration template.
///
/// Exactly one of `template` (file) or `content` (inline) is set. Every
/// occurrence of `placeholder` is replaced with the TLS domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub template: Option<Utf8PathBuf>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub placeholder: String,
}

impl ProxyConfig {
    fn validate(&self) -> Result<(), ProvisionError> {
        match (&self.template, &self.content) {
            (Some(_), Some(_)) => Err(ProvisionError::Configuration(
                "proxy_config: 'template' and 'content' are mutually exclusive".to_string(),
            )),
            (None, None) => Err(ProvisionError::Configuration(
                "proxy_config: either 'template' or 'content' must be specified".to_string(),
            )),
            (Some(path), None) if !path.is_file() => Err(ProvisionError::Configuration(format!(
                "proxy_config template is not a file: {}",
                path
            ))),
            _ => Ok(()),
        }
    }

    /// Reads the template and substitutes the placeholder with `domain`.
    pub fn render(&self, domain: &str) -> Result<String, ProvisionError> {
        self.validate()?;
        let template = match &self.template {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                ProvisionError::io(format!("failed to read proxy config template: {}", path), e)
            })?,
            None => self.content.clone().unwrap_or_default(),
        };
        Ok(render_proxy_config(&template, &self.placeholder, domain))
    }
}

/// JWKS endpoint whose first key is installed as `publicKey.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwksConfig {
    pub url: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    crate::jwks::DEFAULT_FETCH_TIMEOUT.as_secs()
}

impl JwksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// An additional file to upload. Both sides may contain placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileUpload {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub target: TargetConfig,
    #[serde(default)]
    pub home_dir: String,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub jwks: Option<JwksConfig>,
    #[serde(default)]
    pub files: Vec<FileUpload>,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Profile {
    /// Returns the TLS section, or an empty one when absent.
    pub fn tls_or_default(&self) -> TlsConfig {
        self.tls.clone().unwrap_or_default()
    }

    /// Resolves relative local paths against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Utf8Path) {
        let resolve = |path: &mut String| {
            if !path.is_empty()
                && !path.starts_with("{{")
                && Utf8Path::new(path.as_str()).is_relative()
            {
                *path = base_dir.join(&*path).into_string();
            }
        };

        if let Some(tls) = &mut self.tls {
            resolve(&mut tls.cert_source);
            resolve(&mut tls.key_source);
            if let Some(ProxyConfig {
                template: Some(template),
                ..
            }) = &mut tls.proxy_config
                && template.is_relative()
            {
                *template = base_dir.join(&*template);
            }
        }
        for file in &mut self.files {
            resolve(&mut file.source);
        }
        match &mut self.target {
            TargetConfig::Chroot(chroot) if chroot.rootfs.is_relative() => {
                chroot.rootfs = base_dir.join(&chroot.rootfs);
            }
            TargetConfig::Ssh(SshTarget {
                identity_file: Some(identity),
                ..
            }) if identity.is_relative() => {
                *identity = base_dir.join(&*identity);
            }
            _ => {}
        }
    }

    /// Checks the profile for inconsistent or missing values.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        resolve_home_dir(&self.home_dir)?;

        match &self.target {
            TargetConfig::Ssh(ssh) => {
                if ssh.host.trim().is_empty() {
                    return Err(ProvisionError::Configuration(
                        "ssh target: host must not be empty".to_string(),
                    ));
                }
                if ssh.user.trim().is_empty() {
                    return Err(ProvisionError::Configuration(
                        "ssh target: user must not be empty".to_string(),
                    ));
                }
            }
            TargetConfig::Chroot(chroot) => {
                if !chroot.shell.starts_with('/') {
                    return Err(ProvisionError::Configuration(format!(
                        "chroot target: shell path must be absolute: {}",
                        chroot.shell
                    )));
                }
            }
        }

        let tls = self.tls_or_default();
        let skip = should_skip_tls(&tls.cert_source, &tls.key_source, &tls.domain)?;
        if !skip {
            match &tls.proxy_config {
                Some(proxy) => proxy.validate()?,
                None => {
                    return Err(ProvisionError::Configuration(
                        "tls: proxy_config is required when TLS is configured".to_string(),
                    ));
                }
            }
        }

        if let Some(jwks) = &self.jwks {
            validate_jwks_url(&jwks.url)?;
            if jwks.timeout_secs == 0 {
                return Err(ProvisionError::Configuration(
                    "jwks: timeout_secs must be greater than zero".to_string(),
                ));
            }
        }

        for (index, file) in self.files.iter().enumerate() {
            if file.source.trim().is_empty() || file.destination.trim().is_empty() {
                return Err(ProvisionError::Configuration(format!(
                    "files[{}]: source and destination must not be empty",
                    index
                )));
            }
        }

        for (index, command) in self.commands.iter().enumerate() {
            if command.trim().is_empty() {
                return Err(ProvisionError::Configuration(format!(
                    "commands[{}] must not be empty",
                    index
                )));
            }
        }

        Ok(())
    }
}

/// Accepts absolute `http` and `https` URLs only.
pub fn validate_jwks_url(raw: &str) -> Result<url::Url, ProvisionError> {
    let parsed = url::Url::parse(raw).map_err(|e| {
        ProvisionError::Configuration(format!("jwks: invalid url '{}': {}", raw, e))
    })?;
    if matches!(parsed.scheme(), "http" | "https") {
        return Ok(parsed);
    }
    Err(ProvisionError::Configuration(format!(
        "jwks: unsupported url scheme '{}' in '{}'",
        parsed.scheme(),
        raw
    )))
}

/// Loads a profile from a YAML file and resolves its relative paths.
pub fn load_profile(path: &Utf8Path) -> Result<Profile, ProvisionError> {
    let file = File::open(path).map_err(|e| ProvisionError::io(path.as_str(), e))?;
    let reader = BufReader::new(file);
    let mut profile: Profile = serde_yaml::from_reader(reader).map_err(|e| {
        ProvisionError::Configuration(format!("failed to parse yaml: {}: {}", path, e))
    })?;

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
        _ => Utf8PathBuf::from("."),
    };
    profile.resolve_paths(&base_dir);
    debug!("loaded profile from {}", path);
    Ok(profile)
}
