//! project
//!
//! Project-side concerns: identity from the git remote, the tracked-file
//! manifest, and plaintext file I/O rooted at the project.

mod discovery;
mod envfiles;
mod identity;

pub use discovery::Discovery;
pub use envfiles::{is_tracked, parse_manifest, remove_from_manifest, write_manifest};
pub use identity::{parse_remote_url, repo_id_from_url};

use thiserror::Error;

use crate::core::errors::ErrorKind;
use crate::core::types::TypeError;

/// Errors from project discovery and file access.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not in a git repository")]
    NotInRepo,

    #[error("no usable remote URL: {0}")]
    NoRemote(String),

    /// The project has no tracked-file manifest.
    #[error("no {0} file found (create one listing files to track)")]
    NoManifest(String),

    /// The manifest exists but lists nothing.
    #[error("no files tracked")]
    NoFilesTracked,

    #[error("invalid path at line {line}: {source}")]
    InvalidManifestPath {
        line: usize,
        #[source]
        source: TypeError,
    },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("{what} exceeds maximum size of {limit} bytes")]
    TooLarge { what: String, limit: u64 },

    #[error("project i/o error: {0}")]
    Io(String),
}

impl ProjectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectError::NotInRepo | ProjectError::NoRemote(_) => ErrorKind::NotInProject,
            ProjectError::NoManifest(_) | ProjectError::NoFilesTracked => ErrorKind::NoTrackedFiles,
            ProjectError::InvalidManifestPath { source, .. } => source.kind(),
            ProjectError::Type(e) => e.kind(),
            ProjectError::FileNotFound(_) => ErrorKind::FileNotFound,
            ProjectError::TooLarge { .. } => ErrorKind::FileSizeExceeded,
            ProjectError::Io(_) => ErrorKind::Unknown,
        }
    }
}
