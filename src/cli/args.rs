//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! Available on all commands:
//! - `--config <path>`: config file (default `~/.envault/config.toml`)
//! - `--repo <owner/name>` / `-r`: override repository identity
//! - `--verbose` / `-v`, `--quiet` / `-q`
//! - `--json`: machine-readable output
//! - `--non-interactive`: disable prompts (CI)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Manage encrypted environment files.
///
/// Files listed in a project's .envault manifest are encrypted with age
/// and mirrored to an object-store bucket with full version history.
#[derive(Parser, Debug)]
#[command(name = "envault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.envault/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override repository (owner/name)
    #[arg(short, long, global = true, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable interactive prompts (for CI/CD)
    #[arg(long, global = true)]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether prompts are allowed.
    pub fn interactive(&self) -> bool {
        !self.non_interactive && !self.quiet
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize envault configuration interactively
    Init,

    /// Encrypt and upload environment files
    Push {
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Show what would be pushed without pushing
        #[arg(long)]
        dry_run: bool,

        /// Push even if the remote changed underneath
        #[arg(long)]
        force: bool,

        /// Allow push with missing tracked files (non-interactive mode)
        #[arg(long)]
        allow_missing: bool,
    },

    /// Download and decrypt environment files
    Pull {
        /// Pull a specific version (commit hash or prefix)
        #[arg(long, value_name = "REF")]
        r#ref: Option<String>,

        /// Overwrite local files without confirmation
        #[arg(long)]
        force: bool,

        /// Show what would be pulled without pulling
        #[arg(long)]
        dry_run: bool,

        /// Skip conflicting files instead of aborting
        #[arg(long, conflicts_with = "force")]
        skip_conflicts: bool,
    },

    /// Show repository info and file status
    Status,

    /// Show version history
    Log {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = crate::core::constants::DEFAULT_LOG_COUNT)]
        count: usize,
    },

    /// List repositories in the bucket
    List,

    /// Show changes between versions
    ///
    /// With no refs: local files against the latest remote. One ref:
    /// local files against that ref. Two refs: one ref against the
    /// other.
    Diff {
        /// Zero, one, or two refs
        #[arg(value_name = "REF", num_args = 0..=2)]
        refs: Vec<String>,
    },

    /// Test decryption of every tracked file with the current passphrase
    Verify,

    /// Remove a file from tracking
    Rm {
        /// Tracked path to remove
        file: String,
    },

    /// Restore files from a previous version
    Revert {
        /// Commit hash or prefix to restore from
        r#ref: String,
    },

    /// Delete an entire repository from the bucket
    Delete {
        /// Repository to delete (owner/name)
        repo: String,

        /// Confirm permanent deletion in non-interactive mode
        #[arg(long)]
        yes_delete_permanently: bool,

        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-encrypt all repositories with a new passphrase
    #[command(name = "rotate-passphrase")]
    RotatePassphrase,

    /// Diagnose configuration, cache, and storage problems
    Doctor {
        /// Attempt to fix cache issues by resetting from the remote
        #[arg(long)]
        fix: bool,
    },

    /// Base64-encode a service account JSON file for the config
    Encode {
        /// Path to the service account JSON file
        file: PathBuf,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}
