//! Single-file uploads through a communicator.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{error, info};

use crate::communicator::Communicator;
use crate::error::ProvisionError;
use crate::tls::TransferPlan;

/// Resolves the final remote path for `source`.
///
/// A destination ending in `/` names a directory; the source's file name is
/// appended to it.
pub fn upload_destination(source: &Utf8Path, destination: &str) -> Utf8PathBuf {
    if destination.ends_with('/')
        && let Some(file_name) = source.file_name()
    {
        return Utf8PathBuf::from(format!("{}{}", destination, file_name));
    }
    Utf8PathBuf::from(destination)
}

/// Uploads one local file to `destination` on the target.
///
/// The source must exist and be a regular file. Communicator failures are
/// reported as [`ProvisionError::Transfer`] naming both ends.
pub fn provision_upload(
    communicator: &dyn Communicator,
    source: &Utf8Path,
    destination: &str,
) -> Result<(), ProvisionError> {
    info!("uploading {} => {}", source, destination);

    let metadata = fs::metadata(source)
        .map_err(|e| ProvisionError::io(format!("failed to read upload source: {}", source), e))?;
    if metadata.is_dir() {
        return Err(ProvisionError::Configuration(format!(
            "source should be a file; '{}', however, is a directory",
            source
        )));
    }

    let target = upload_destination(source, destination);
    communicator.upload(source, &target).map_err(|e| {
        error!("upload failed: {:#}", e);
        if !destination.ends_with('/') && format!("{:#}", e).contains("Is a directory") {
            error!(
                "this can occur when the destination is a directory without a trailing slash"
            );
        }
        ProvisionError::Transfer {
            source_path: source.to_string(),
            destination: target.to_string(),
            message: format!("{:#}", e),
        }
    })
}

/// Uploads every transfer of `plan` in order, stopping at the first failure.
pub fn upload_plan(
    communicator: &dyn Communicator,
    plan: &TransferPlan,
) -> Result<(), ProvisionError> {
    for transfer in plan.transfers() {
        provision_upload(communicator, &transfer.source, transfer.destination.as_str())?;
    }
    Ok(())
}
