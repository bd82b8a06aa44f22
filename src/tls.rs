//! TLS asset staging for reverse-proxy deployments.
//!
//! TLS provisioning is all-or-nothing: a certificate, its key and the domain
//! they serve are configured together or not at all. When configured, the
//! certificate, the key and a rendered nginx configuration are uploaded into
//! the target's home directory and later moved into place by the commands
//! from [`tls_install_commands`].

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::staging::StagedFile;

/// File name of the uploaded certificate under the home directory.
pub const CERT_FILE_NAME: &str = "ssl.crt";
/// File name of the uploaded certificate key under the home directory.
pub const KEY_FILE_NAME: &str = "ssl.key";
/// File name of the uploaded reverse-proxy configuration under the home directory.
pub const PROXY_CONFIG_FILE_NAME: &str = "nginx-ssl.conf";

const PROXY_CONFIG_STAGING_PREFIX: &str = "nginx-config-file";

/// Decides whether TLS provisioning is skipped.
///
/// Returns `Ok(true)` when none of the three values are set and `Ok(false)`
/// when all of them are. A partial configuration is an error.
pub fn should_skip_tls(
    cert_source: &str,
    key_source: &str,
    domain: &str,
) -> Result<bool, ProvisionError> {
    match (cert_source.is_empty(), key_source.is_empty(), domain.is_empty()) {
        (false, false, false) => Ok(false),
        (true, true, true) => Ok(true),
        _ => Err(ProvisionError::Configuration(
            "certificate source, certificate key source and domain must be set together"
                .to_string(),
        )),
    }
}

/// Inputs needed to stage a TLS deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsRequest {
    /// Local path of the certificate (chain).
    pub cert_source: String,
    /// Local path of the certificate's private key.
    pub key_source: String,
    /// Domain served by the reverse proxy.
    pub domain: String,
    /// Remote home directory the assets are uploaded to.
    pub home_dir: Utf8PathBuf,
    /// Fully rendered reverse-proxy configuration text.
    pub proxy_config: String,
}

impl TlsRequest {
    /// Evaluates the TLS gate for this request.
    pub fn should_skip(&self) -> Result<bool, ProvisionError> {
        should_skip_tls(&self.cert_source, &self.key_source, &self.domain)
    }
}

/// One pending upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Local source path.
    pub source: Utf8PathBuf,
    /// Remote destination path.
    pub destination: Utf8PathBuf,
}

/// An ordered set of pending uploads with unique sources.
///
/// The plan owns any files it staged locally; they are deleted when the plan
/// is dropped, whether or not the transfers succeeded.
#[derive(Debug, Default)]
pub struct TransferPlan {
    transfers: Vec<Transfer>,
    staged: Vec<StagedFile>,
}

impl TransferPlan {
    /// Creates a plan with no transfers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a transfer. Each source may only appear once.
    pub fn push(
        &mut self,
        source: impl Into<Utf8PathBuf>,
        destination: impl Into<Utf8PathBuf>,
    ) -> Result<(), ProvisionError> {
        let source = source.into();
        if self.transfers.iter().any(|t| t.source == source) {
            return Err(ProvisionError::Configuration(format!(
                "'{}' is planned for upload more than once",
                source
            )));
        }
        self.transfers.push(Transfer {
            source,
            destination: destination.into(),
        });
        Ok(())
    }

    /// Adds a transfer whose source is a staged file owned by the plan.
    pub fn push_staged(
        &mut self,
        staged: StagedFile,
        destination: impl Into<Utf8PathBuf>,
    ) -> Result<(), ProvisionError> {
        self.push(staged.path(), destination)?;
        self.staged.push(staged);
        Ok(())
    }

    /// Returns the planned transfers in upload order.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Returns the destination planned for `source`, if any.
    pub fn destination_of(&self, source: &Utf8Path) -> Option<&Utf8Path> {
        self.transfers
            .iter()
            .find(|t| t.source == source)
            .map(|t| t.destination.as_path())
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}

/// Builds the upload plan for a TLS deployment.
///
/// Returns an empty plan when TLS is skipped. Otherwise the rendered proxy
/// configuration is staged to a temporary file and the plan maps the
/// certificate, the key and that file to `ssl.crt`, `ssl.key` and
/// `nginx-ssl.conf` under the request's home directory.
pub fn build_tls_transfer_plan(request: &TlsRequest) -> Result<TransferPlan, ProvisionError> {
    if request.should_skip()? {
        info!("TLS is not configured, skipping certificate upload");
        return Ok(TransferPlan::empty());
    }

    let home = &request.home_dir;
    let mut plan = TransferPlan::empty();
    plan.push(request.cert_source.as_str(), home.join(CERT_FILE_NAME))?;
    plan.push(request.key_source.as_str(), home.join(KEY_FILE_NAME))?;

    let staged = StagedFile::create(PROXY_CONFIG_STAGING_PREFIX, &request.proxy_config)?;
    debug!("staged proxy config for {} at {}", request.domain, staged.path());
    plan.push_staged(staged, home.join(PROXY_CONFIG_FILE_NAME))?;

    Ok(plan)
}

/// Returns the commands that move uploaded TLS assets into place.
///
/// Empty when `skip` is true.
pub fn tls_install_commands(home_dir: &Utf8Path, skip: bool) -> Vec<String> {
    if skip {
        return Vec::new();
    }
    vec![
        format!(
            "sudo mv {} /etc/nginx/sites-enabled/default",
            home_dir.join(PROXY_CONFIG_FILE_NAME)
        ),
        format!("sudo mv {} /etc/ssl/certs/server.crt", home_dir.join(CERT_FILE_NAME)),
        format!("sudo mv {} /etc/ssl/private/server.key", home_dir.join(KEY_FILE_NAME)),
    ]
}

/// Substitutes the template's placeholder host name with `domain`.
///
/// Every occurrence is replaced. An empty placeholder leaves the template
/// untouched.
pub fn render_proxy_config(template: &str, placeholder: &str, domain: &str) -> String {
    if placeholder.is_empty() {
        return template.to_string();
    }
    template.replace(placeholder, domain)
}
