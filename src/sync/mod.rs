//! sync
//!
//! Push/pull orchestration over the cache, the encrypter, and the
//! tracked-file list.
//!
//! # Design
//!
//! The [`Syncer`] drives a three-way comparison between the project's
//! plaintext files, the decrypted cache blobs, and the remote store.
//! The cache is the transactional staging area; the remote `HEAD`
//! object is the optimistic-concurrency anchor. See [`Syncer::push`]
//! and [`Syncer::pull`] for the protocols.

mod conflict;
mod pull;
mod push;

pub use conflict::{ConflictAction, ConflictResolver};
pub use pull::PullOptions;
pub use push::PushOptions;

use thiserror::Error;

use crate::cache::{Cache, CacheError};
use crate::core::errors::ErrorKind;
use crate::core::types::{short_hash, FileStatus, SyncStatus};
use crate::crypto::{CryptoError, Encrypter};
use crate::history::HistoryError;
use crate::project::{Discovery, ProjectError};

/// Errors from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    /// The repository has never been pushed.
    #[error("repository not found in remote storage")]
    RepoNotFound,

    /// Another machine pushed between our head snapshot and commit.
    #[error(
        "remote changed during push (expected {expected}, found {actual}); \
         run 'envault pull' first or use --force to override"
    )]
    RemoteChanged { expected: String, actual: String },

    /// Local files would be overwritten and no resolver accepted them.
    #[error("local files would be overwritten: {}; use --force to overwrite", .0.join(", "))]
    Conflict(Vec<String>),

    /// The user aborted at a prompt.
    #[error("operation cancelled by user")]
    UserCancelled,

    /// The push found nothing to record.
    #[error("nothing to commit")]
    NothingToCommit,

    /// The operation exceeded its overall deadline.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Cache(e) => e.kind(),
            SyncError::Crypto(e) => e.kind(),
            SyncError::Project(e) => e.kind(),
            SyncError::RepoNotFound => ErrorKind::RepoNotFound,
            SyncError::RemoteChanged { .. } => ErrorKind::RemoteChanged,
            SyncError::Conflict(_) => ErrorKind::Conflict,
            SyncError::UserCancelled | SyncError::Timeout => ErrorKind::Cancelled,
            SyncError::NothingToCommit => ErrorKind::NothingToCommit,
        }
    }
}

/// Orchestrates push and pull for one project.
pub struct Syncer {
    discovery: Discovery,
    encrypter: Box<dyn Encrypter>,
    cache: Cache,
}

impl Syncer {
    pub fn new(discovery: Discovery, encrypter: Box<dyn Encrypter>, cache: Cache) -> Self {
        Self {
            discovery,
            encrypter,
            cache,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub(crate) fn encrypter(&self) -> &dyn Encrypter {
        self.encrypter.as_ref()
    }

    /// Make sure a local cache exists: reuse it, rebuild it from the
    /// remote, or initialize it empty, in that order.
    pub async fn ensure_cache_initialized(&mut self) -> Result<(), SyncError> {
        if self.cache.exists() {
            return Ok(());
        }
        if self.cache.exists_remote().await? {
            self.cache.sync_from_storage().await?;
            return Ok(());
        }
        Ok(self.cache.init()?)
    }

    /// Local-vs-remote head relationship.
    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        let local_head = match self.cache.head() {
            Ok(head) => head,
            Err(CacheError::History(HistoryError::NotInitialized)) => String::new(),
            Err(e) => return Err(e.into()),
        };

        // A missing or unborn remote reads as empty.
        let remote_head = self.cache.get_remote_head().await.unwrap_or_default();

        Ok(SyncStatus {
            in_sync: local_head == remote_head,
            local_head,
            remote_head,
        })
    }

    /// Per-file status of every tracked path.
    ///
    /// `modified` is true only when a file exists on both sides and the
    /// local plaintext differs from the decrypted cache blob; it is
    /// best-effort in that an undecryptable blob reports unmodified
    /// rather than failing the whole listing.
    pub fn file_statuses(&self) -> Result<Vec<FileStatus>, SyncError> {
        let files = self.discovery.tracked_files()?;
        let mut statuses = Vec::with_capacity(files.len());

        for file in files {
            let local_exists = self.discovery.file_exists(&file);
            let cached = self.cache.read_encrypted(&file).ok();
            let cache_exists = cached.is_some();

            let modified = match (&cached, local_exists) {
                (Some(blob), true) => {
                    match (self.discovery.read_file(&file), self.encrypter.decrypt(blob)) {
                        (Ok(local), Ok(plain)) => local != plain,
                        _ => false,
                    }
                }
                _ => false,
            };

            statuses.push(FileStatus {
                path: file.to_string(),
                local_exists,
                cache_exists,
                modified,
            });
        }

        Ok(statuses)
    }
}

impl std::fmt::Debug for Syncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("repo_id", self.cache.repo_id())
            .finish_non_exhaustive()
    }
}

/// Render a head hash for diagnostics, tolerating absence.
pub(crate) fn describe_head(head: Option<&str>) -> String {
    match head {
        Some(h) if !h.is_empty() => short_hash(h).to_string(),
        _ => "(none)".to_string(),
    }
}
