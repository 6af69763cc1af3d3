//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Build the component stack (store, encrypter, cache, syncer)
//! - Delegate to command handlers and format their results
//! - Translate typed errors into process exit codes
//!
//! The core never exits the process; [`exit_code`] walks an error chain
//! and maps the first recognized typed error onto the documented exit
//! code table.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::path::PathBuf;

use anyhow::Result;

use crate::ui::output::Output;

/// Per-invocation context derived from the global flags.
#[derive(Debug)]
pub struct Context {
    /// Config file override.
    pub config_path: Option<PathBuf>,
    /// Repository identity override (`owner/name`).
    pub repo_override: Option<String>,
    /// Whether prompts are allowed.
    pub interactive: bool,
    /// Output sink.
    pub out: Output,
}

/// Run the CLI application.
///
/// This is the entry point called from `main`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        config_path: cli.config.clone(),
        repo_override: cli.repo.clone(),
        interactive: cli.interactive(),
        out: Output::new(cli.quiet, cli.verbose, cli.json),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Exit code for an error chain.
///
/// Walks the chain and classifies the first typed error found; anything
/// unrecognized maps to the unknown-error code.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    use crate::core::errors::ErrorKind;

    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<crate::sync::SyncError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::cache::CacheError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::crypto::CryptoError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::store::StoreError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::history::HistoryError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::project::ProjectError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::core::config::ConfigError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::core::types::TypeError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::core::paths::PathError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::core::limits::LimitError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::core::lock::LockError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<crate::ui::prompts::PromptError>() {
            return e.kind().exit_code();
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                return ErrorKind::PermissionDenied.exit_code();
            }
        }
    }

    ErrorKind::Unknown.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoError;
    use crate::sync::SyncError;

    #[test]
    fn exit_code_classifies_typed_errors() {
        let err = anyhow::Error::new(SyncError::RepoNotFound);
        assert_eq!(exit_code(&err), 13);

        let err = anyhow::Error::new(CryptoError::Decrypt("bad".into()));
        assert_eq!(exit_code(&err), 5);
    }

    #[test]
    fn exit_code_sees_through_context() {
        let err = anyhow::Error::new(SyncError::RemoteChanged {
            expected: "aaaaaaa".into(),
            actual: "bbbbbbb".into(),
        })
        .context("push failed");
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn unknown_errors_map_to_99() {
        let err = anyhow::anyhow!("mystery");
        assert_eq!(exit_code(&err), 99);
    }

    #[test]
    fn permission_denied_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = anyhow::Error::new(io);
        assert_eq!(exit_code(&err), 14);
    }
}
