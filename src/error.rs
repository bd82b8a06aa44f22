//! Domain-specific error types for imgprov.
//!
//! This module defines `ProvisionError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of a provisioning
//! run. Library functions return `Result<T, ProvisionError>` for programmatic
//! error handling, while trait boundaries continue to use `anyhow::Result`.
//!
//! `ProvisionError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at trait boundaries that return `anyhow::Result`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent, user-friendly messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message
/// directly (e.g., "I/O error: storage full").
///
/// The path or operation context is provided separately via
/// `ProvisionError::Io { context }`.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for imgprov.
///
/// Provides typed variants for common failure modes, enabling callers
/// to match on error kinds programmatically rather than parsing error
/// message strings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProvisionError {
    /// Caller-supplied configuration is malformed or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The JWKS endpoint could not be reached or answered with a non-success status.
    #[error("network error: {url}: {message}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// Transport error or HTTP status line.
        message: String,
    },

    /// A JWKS document or one of its coordinates could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// Decoded key material does not form a valid public key.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A file could not be transferred to the target.
    #[error("error uploading '{source_path}' to '{destination}': {message}")]
    Transfer {
        /// Local source path.
        source_path: String,
        /// Remote destination path.
        destination: String,
        /// Failure reported by the communicator.
        message: String,
    },

    /// A remote or local command failed (non-zero exit, spawn failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Human-readable reason for the failure: exit code, signal information,
        /// or a description of the internal error.
        status: String,
    },

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred.
        ///
        /// This is either a file path (e.g., `"/etc/profile.yml"`) or an operation
        /// description with a path (e.g., `"failed to stage proxy config: /tmp/x"`).
        context: String,
        /// Human-readable description of the I/O failure, derived from
        /// [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    /// Creates an `Io` variant with the `message` field automatically derived
    /// from the `source` via [`io_error_kind_message`].
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates a `Network` variant for the given URL.
    pub(crate) fn network(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display() {
        let err = ProvisionError::Configuration("home directory must be absolute".to_string());
        assert_eq!(err.to_string(), "configuration error: home directory must be absolute");
    }

    #[test]
    fn test_network_display() {
        let err = ProvisionError::network("https://auth.example.com/jwks", "404 Not Found");
        assert_eq!(
            err.to_string(),
            "network error: https://auth.example.com/jwks: 404 Not Found"
        );
    }

    #[test]
    fn test_transfer_display() {
        let err = ProvisionError::Transfer {
            source_path: "certs/server.crt".to_string(),
            destination: "/root/ssl.crt".to_string(),
            message: "scp exited with status 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "error uploading 'certs/server.crt' to '/root/ssl.crt': scp exited with status 1"
        );
    }

    #[test]
    fn test_execution_display() {
        let err = ProvisionError::Execution {
            command: "ssh".to_string(),
            status: "exit status: 255".to_string(),
        };
        assert_eq!(err.to_string(), "command execution failed: ssh: exit status: 255");
    }

    #[test]
    fn test_io_display() {
        let source = io::Error::new(io::ErrorKind::NotFound, "entity not found");
        let err = ProvisionError::io("/path/to/server.crt", source);
        assert_eq!(err.to_string(), "/path/to/server.crt: I/O error: not found");
    }

    #[test]
    fn test_io_source_preserved() {
        let source = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = ProvisionError::io("/etc/ssl/private/server.key", source);
        match &err {
            ProvisionError::Io { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_io_error_kind_message_other() {
        let err = io::Error::new(io::ErrorKind::StorageFull, "no space left on device");
        let msg = io_error_kind_message(&err);
        assert!(msg.starts_with("I/O error: "));
    }

    #[test]
    fn test_into_anyhow_error() {
        let err = ProvisionError::Parse("no keys found in JWKS".to_string());
        let anyhow_err: anyhow::Error = err.into();
        let downcast = anyhow_err.downcast_ref::<ProvisionError>();
        assert!(matches!(downcast, Some(ProvisionError::Parse(_))));
    }
}
