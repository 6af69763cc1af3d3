//! core::errors
//!
//! Error taxonomy shared across the crate.
//!
//! # Design
//!
//! Every module defines its own `thiserror` enum (`CryptoError`,
//! `StoreError`, `HistoryError`, ...) so callers can match on typed
//! failures without string inspection. Each of those enums exposes a
//! `kind()` method that maps the failure into the flat [`ErrorKind`]
//! taxonomy defined here. The CLI translates a kind into the process
//! exit code; the core never calls `std::process::exit` itself.
//!
//! Exit codes are part of the tool's public contract: scripts depend on
//! them to distinguish "wrong passphrase" from "network trouble".

use serde::Serialize;

/// Flat classification of every failure the tool can surface.
///
/// The variants mirror the exit-code table in the user documentation.
/// A `kind()` never loses the underlying error; it only labels it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No config file found; `envault init` has not been run.
    NotConfigured,
    /// Config file exists but is malformed or has invalid values.
    InvalidConfig,
    /// The working directory is not inside a git repository.
    NotInProject,
    /// The project has no manifest or the manifest lists no files.
    NoTrackedFiles,
    /// Bad command-line arguments or repo identifiers.
    InvalidArgs,
    /// A tracked path failed traversal-safety validation.
    InvalidPath,
    /// Encryption failed.
    Encrypt,
    /// Decryption failed (usually a wrong passphrase).
    Decrypt,
    /// No passphrase could be resolved.
    Passphrase,
    /// A file exceeded the 2 MiB size limit.
    FileSizeExceeded,
    /// A history (git) operation failed.
    History,
    /// A ref could not be resolved in the cache history.
    RefNotFound,
    /// A commit was requested but nothing changed.
    NothingToCommit,
    /// The cache history has not been initialized.
    NotInitialized,
    /// An object-store operation failed.
    ObjectStore,
    /// An upload to the object store failed.
    Upload,
    /// A download from the object store failed.
    Download,
    /// The repository does not exist in the remote store.
    RepoNotFound,
    /// A file was not found locally, in the cache, or remotely.
    FileNotFound,
    /// Local files would be overwritten by a pull.
    Conflict,
    /// The remote head moved while a push was in flight.
    RemoteChanged,
    /// The operation was cancelled by the user or timed out.
    Cancelled,
    /// Filesystem permission denied.
    PermissionDenied,
    /// Anything not covered above.
    Unknown,
}

impl ErrorKind {
    /// Process exit code for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::NotConfigured => 1,
            ErrorKind::NotInProject => 2,
            ErrorKind::NoTrackedFiles => 3,
            ErrorKind::Conflict | ErrorKind::RemoteChanged => 4,
            ErrorKind::Decrypt | ErrorKind::Passphrase => 5,
            ErrorKind::Upload | ErrorKind::Encrypt => 6,
            ErrorKind::Download => 7,
            ErrorKind::InvalidConfig | ErrorKind::FileSizeExceeded => 8,
            ErrorKind::ObjectStore => 9,
            ErrorKind::History | ErrorKind::NothingToCommit | ErrorKind::NotInitialized => 10,
            ErrorKind::Cancelled => 11,
            ErrorKind::InvalidArgs | ErrorKind::InvalidPath => 12,
            ErrorKind::FileNotFound | ErrorKind::RepoNotFound | ErrorKind::RefNotFound => 13,
            ErrorKind::PermissionDenied => 14,
            ErrorKind::Unknown => 99,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(ErrorKind::NotConfigured.exit_code(), 1);
        assert_eq!(ErrorKind::NotInProject.exit_code(), 2);
        assert_eq!(ErrorKind::NoTrackedFiles.exit_code(), 3);
        assert_eq!(ErrorKind::Conflict.exit_code(), 4);
        assert_eq!(ErrorKind::RemoteChanged.exit_code(), 4);
        assert_eq!(ErrorKind::Decrypt.exit_code(), 5);
        assert_eq!(ErrorKind::Passphrase.exit_code(), 5);
        assert_eq!(ErrorKind::Upload.exit_code(), 6);
        assert_eq!(ErrorKind::Encrypt.exit_code(), 6);
        assert_eq!(ErrorKind::Download.exit_code(), 7);
        assert_eq!(ErrorKind::InvalidConfig.exit_code(), 8);
        assert_eq!(ErrorKind::FileSizeExceeded.exit_code(), 8);
        assert_eq!(ErrorKind::ObjectStore.exit_code(), 9);
        assert_eq!(ErrorKind::History.exit_code(), 10);
        assert_eq!(ErrorKind::Cancelled.exit_code(), 11);
        assert_eq!(ErrorKind::InvalidArgs.exit_code(), 12);
        assert_eq!(ErrorKind::InvalidPath.exit_code(), 12);
        assert_eq!(ErrorKind::FileNotFound.exit_code(), 13);
        assert_eq!(ErrorKind::RepoNotFound.exit_code(), 13);
        assert_eq!(ErrorKind::RefNotFound.exit_code(), 13);
        assert_eq!(ErrorKind::PermissionDenied.exit_code(), 14);
        assert_eq!(ErrorKind::Unknown.exit_code(), 99);
    }
}
