//! cache
//!
//! Per-project encrypted mirror: a git-versioned working tree of
//! ciphertext blobs, synchronized with the remote object store.
//!
//! # Layout
//!
//! ```text
//! <cache_base>/<owner>/<name>/.git/          history metadata
//! <cache_base>/<owner>/<name>/<path>.age     encrypted blobs
//! ```
//!
//! The remote mirrors the working tree under `<owner>/<name>/`, plus a
//! `HEAD` object holding the current commit hash - the anchor for
//! optimistic concurrency.
//!
//! # Lifecycle
//!
//! A cache is `absent` until [`Cache::init`] or a
//! [`Cache::sync_from_storage`] creates it. During an operation it is
//! the single source of truth; a corrupted cache is recovered with
//! [`Cache::reset`], which rebuilds from the remote.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::core::constants::{CIPHER_EXT, HEAD_OBJECT, MAX_FILE_SIZE, MAX_HEAD_SIZE};
use crate::core::errors::ErrorKind;
use crate::core::limits::check_limit;
use crate::core::paths::{create_dir_private, secure_join, write_private, PathError};
use crate::core::types::{Commit, RepoId, TrackedPath};
use crate::history::{History, HistoryError};
use crate::store::{ObjectStore, StoreError};

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("failed to upload {key}: {source}")]
    Upload {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to download {key}: {source}")]
    Download {
        key: String,
        #[source]
        source: StoreError,
    },

    /// Store failures outside an upload/download (list, exists, delete).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Remote HEAD is present but not a 40-character lowercase hex hash.
    #[error("invalid remote HEAD: {0}")]
    InvalidRemoteHead(String),

    #[error("{what} exceeds maximum size of {limit} bytes")]
    TooLarge { what: String, limit: u64 },

    #[error("failed to write {path}: {message}")]
    WriteFailed { path: String, message: String },
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::History(e) => e.kind(),
            CacheError::Path(e) => e.kind(),
            CacheError::Upload { .. } => ErrorKind::Upload,
            CacheError::Download { source, .. } => match source {
                StoreError::NotFound(_) => ErrorKind::FileNotFound,
                StoreError::TooLarge { .. } => ErrorKind::FileSizeExceeded,
                _ => ErrorKind::Download,
            },
            CacheError::Store(e) => e.kind(),
            CacheError::InvalidRemoteHead(_) => ErrorKind::Download,
            CacheError::TooLarge { .. } => ErrorKind::FileSizeExceeded,
            CacheError::WriteFailed { .. } => ErrorKind::Download,
        }
    }
}

/// Health report from [`Cache::validate`].
#[derive(Debug, Default)]
pub struct CacheHealth {
    /// The cache directory exists.
    pub exists: bool,
    /// The history opens and responds.
    pub history_valid: bool,
    /// HEAD resolves to a commit.
    pub head_valid: bool,
    /// Number of encrypted blobs in the working tree.
    pub file_count: usize,
    /// First problem encountered, if any.
    pub error: Option<String>,
}

/// The per-project encrypted mirror.
pub struct Cache {
    base: PathBuf,
    repo_id: RepoId,
    store: Arc<dyn ObjectStore>,
    history: History,
}

impl Cache {
    /// Open (without creating) the cache for `repo_id` under
    /// `cache_base`.
    pub fn new(
        cache_base: &Path,
        repo_id: RepoId,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, CacheError> {
        let base = cache_base
            .join(repo_id.owner())
            .join(repo_id.name());
        let history = History::open(&base)?;
        Ok(Self {
            base,
            repo_id,
            store,
            history,
        })
    }

    /// Cache root directory.
    pub fn path(&self) -> &Path {
        &self.base
    }

    pub fn repo_id(&self) -> &RepoId {
        &self.repo_id
    }

    /// Whether the cache exists locally.
    pub fn exists(&self) -> bool {
        self.base.join(".git").exists()
    }

    /// Initialize an empty cache. Idempotent.
    pub fn init(&mut self) -> Result<(), CacheError> {
        Ok(self.history.init()?)
    }

    /// Absolute path of the ciphertext for a tracked path, validated
    /// against traversal before any I/O.
    pub fn cipher_path(&self, path: &TrackedPath) -> Result<PathBuf, CacheError> {
        Ok(secure_join(&self.base, &path.cipher_name())?)
    }

    /// Read the encrypted blob for `path` from the working tree.
    pub fn read_encrypted(&self, path: &TrackedPath) -> Result<Vec<u8>, CacheError> {
        self.cipher_path(path)?;
        Ok(self.history.read_file(&path.cipher_name(), "")?)
    }

    /// Read the encrypted blob for `path` at a specific ref.
    pub fn read_encrypted_at_ref(
        &self,
        path: &TrackedPath,
        reference: &str,
    ) -> Result<Vec<u8>, CacheError> {
        self.cipher_path(path)?;
        Ok(self.history.read_file(&path.cipher_name(), reference)?)
    }

    /// Write an encrypted blob into the working tree.
    pub fn write_encrypted(&self, path: &TrackedPath, content: &[u8]) -> Result<(), CacheError> {
        self.cipher_path(path)?;
        Ok(self.history.write_file(&path.cipher_name(), content)?)
    }

    /// Remove the encrypted blob for `path` and stage the removal.
    pub fn remove_encrypted(&self, path: &TrackedPath) -> Result<(), CacheError> {
        self.cipher_path(path)?;
        Ok(self.history.remove_file(&path.cipher_name())?)
    }

    pub fn stage_all(&self) -> Result<(), CacheError> {
        Ok(self.history.stage_all(&format!("*{CIPHER_EXT}"))?)
    }

    pub fn commit(&self, message: &str) -> Result<String, CacheError> {
        Ok(self.history.commit(message)?)
    }

    pub fn head(&self) -> Result<String, CacheError> {
        Ok(self.history.head()?)
    }

    pub fn has_changes(&self) -> Result<bool, CacheError> {
        Ok(self.history.has_changes()?)
    }

    pub fn log(&self, n: usize) -> Result<Vec<Commit>, CacheError> {
        Ok(self.history.log(n)?)
    }

    pub fn checkout(&self, reference: &str) -> Result<(), CacheError> {
        Ok(self.history.checkout(reference)?)
    }

    pub fn checkout_branch(&self, branch: &str) -> Result<(), CacheError> {
        Ok(self.history.checkout_branch(branch)?)
    }

    pub fn default_branch(&self) -> Result<String, CacheError> {
        Ok(self.history.default_branch()?)
    }

    /// Relative paths of every `.age` file in the working tree.
    pub fn list_cipher_files(&self) -> Result<Vec<String>, CacheError> {
        let mut files = Vec::new();
        if self.base.exists() {
            walk_cipher_files(&self.base, &self.base, &mut files).map_err(|e| {
                CacheError::WriteFailed {
                    path: self.base.display().to_string(),
                    message: format!("failed to list files: {e}"),
                }
            })?;
        }
        files.sort();
        Ok(files)
    }

    /// Tracked file names in the cache (cipher files minus extension).
    pub fn list_tracked_files(&self) -> Result<Vec<String>, CacheError> {
        Ok(self
            .list_cipher_files()?
            .into_iter()
            .map(|f| f.strip_suffix(CIPHER_EXT).map(str::to_string).unwrap_or(f))
            .collect())
    }

    /// Upload the working tree to the remote and overwrite remote HEAD.
    ///
    /// Remote objects under the prefix with no local counterpart are
    /// deleted (HEAD excepted), so deletions converge on every push.
    /// HEAD is written last: an interrupted sync leaves the old head
    /// pointing at fully-uploaded blobs.
    pub async fn sync_to_storage(&self) -> Result<(), CacheError> {
        let prefix = self.repo_id.remote_prefix();
        let files = self.list_cipher_files()?;

        for file in &files {
            let local = secure_join(&self.base, file)?;
            let data = fs::read(&local).map_err(|e| CacheError::WriteFailed {
                path: file.clone(),
                message: e.to_string(),
            })?;
            let key = format!("{prefix}{file}");
            self.store
                .upload(&key, &data)
                .await
                .map_err(|source| CacheError::Upload { key: key.clone(), source })?;
        }

        // Reconcile: drop remote objects that no longer exist locally.
        let head_key = format!("{prefix}{HEAD_OBJECT}");
        let remote_keys = self.store.list(&prefix).await?;
        for key in remote_keys {
            if key == head_key {
                continue;
            }
            let rel = key.strip_prefix(&prefix).unwrap_or(&key);
            if !files.iter().any(|f| f == rel) {
                self.store.delete(&key).await?;
            }
        }

        let head = self.head()?;
        self.store
            .upload(&head_key, head.as_bytes())
            .await
            .map_err(|source| CacheError::Upload {
                key: head_key,
                source,
            })?;

        Ok(())
    }

    /// Download every remote blob into the working tree.
    ///
    /// Initializes the history if needed. Does not commit: the remote's
    /// committed state is its blobs plus the HEAD pointer.
    pub async fn sync_from_storage(&mut self) -> Result<(), CacheError> {
        create_dir_private(&self.base).map_err(|e| CacheError::WriteFailed {
            path: self.base.display().to_string(),
            message: e.to_string(),
        })?;
        self.init()?;

        let prefix = self.repo_id.remote_prefix();
        let keys = self.store.list(&prefix).await?;

        for key in keys {
            if key.ends_with(&format!("/{HEAD_OBJECT}")) {
                continue;
            }

            let rel = key.strip_prefix(&prefix).unwrap_or(&key);
            // A hostile listing must not escape the cache root.
            let local = secure_join(&self.base, rel)?;

            let data = self
                .store
                .download(&key)
                .await
                .map_err(|source| CacheError::Download { key: key.clone(), source })?;
            check_limit(&data, MAX_FILE_SIZE, &key).map_err(|_| CacheError::TooLarge {
                what: key.clone(),
                limit: MAX_FILE_SIZE,
            })?;

            if let Some(dir) = local.parent() {
                create_dir_private(dir).map_err(|e| CacheError::WriteFailed {
                    path: rel.to_string(),
                    message: e.to_string(),
                })?;
            }
            write_private(&local, &data).map_err(|e| CacheError::WriteFailed {
                path: rel.to_string(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Fetch and validate the remote HEAD hash.
    pub async fn get_remote_head(&self) -> Result<String, CacheError> {
        let key = format!("{}{HEAD_OBJECT}", self.repo_id.remote_prefix());
        let data = self
            .store
            .download(&key)
            .await
            .map_err(|source| CacheError::Download { key: key.clone(), source })?;
        check_limit(&data, MAX_HEAD_SIZE, &key).map_err(|_| CacheError::TooLarge {
            what: key.clone(),
            limit: MAX_HEAD_SIZE,
        })?;

        let head = String::from_utf8_lossy(&data).trim().to_string();
        if !is_valid_head(&head) {
            return Err(CacheError::InvalidRemoteHead(
                "expected a 40-character lowercase hex hash".to_string(),
            ));
        }
        Ok(head)
    }

    /// Whether the repository exists remotely (its HEAD object exists).
    pub async fn exists_remote(&self) -> Result<bool, CacheError> {
        let key = format!("{}{HEAD_OBJECT}", self.repo_id.remote_prefix());
        Ok(self.store.exists(&key).await?)
    }

    /// Delete every remote object under this repository's prefix.
    pub async fn delete_remote(&self) -> Result<(), CacheError> {
        let prefix = self.repo_id.remote_prefix();
        for key in self.store.list(&prefix).await? {
            self.store.delete(&key).await?;
        }
        Ok(())
    }

    /// Diagnostic health check of the local cache.
    pub fn validate(&self) -> CacheHealth {
        let mut health = CacheHealth::default();

        if !self.base.exists() {
            // Absent is a healthy starting state.
            return health;
        }
        health.exists = true;

        if !self.exists() {
            health.error = Some("cache exists but history metadata is missing".to_string());
            return health;
        }

        match self.history.head() {
            Ok(head) => health.head_valid = !head.is_empty(),
            Err(HistoryError::NotInitialized) => {}
            Err(e) => {
                health.error = Some(format!("failed to read HEAD: {e}"));
                return health;
            }
        }
        health.history_valid = true;

        match self.list_cipher_files() {
            Ok(files) => health.file_count = files.len(),
            Err(e) => health.error = Some(format!("failed to list files: {e}")),
        }

        health
    }

    /// Remove the local cache and rebuild: from the remote when one
    /// exists, otherwise empty.
    pub async fn reset(&mut self) -> Result<(), CacheError> {
        if self.base.exists() {
            fs::remove_dir_all(&self.base).map_err(|e| CacheError::WriteFailed {
                path: self.base.display().to_string(),
                message: e.to_string(),
            })?;
        }
        self.history = History::open(&self.base)?;

        if self.exists_remote().await? {
            self.sync_from_storage().await
        } else {
            self.init()
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("base", &self.base)
            .field("repo_id", &self.repo_id)
            .finish_non_exhaustive()
    }
}

/// Whether `s` is a full lowercase hex commit hash.
fn is_valid_head(s: &str) -> bool {
    s.len() == 40
        && s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Collect `.age` files under `dir`, relative to `root`, skipping the
/// history metadata and the lock file.
fn walk_cipher_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<String>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();

        if path.is_dir() {
            if name == ".git" {
                continue;
            }
            walk_cipher_files(root, &path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext == CIPHER_EXT.trim_start_matches('.'))
        {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn new_cache(dir: &TempDir, store: &MemoryStore) -> Cache {
        let id = RepoId::new("acme", "api").unwrap();
        Cache::new(dir.path(), id, Arc::new(store.clone())).unwrap()
    }

    fn tracked(p: &str) -> TrackedPath {
        TrackedPath::new(p).unwrap()
    }

    #[test]
    fn head_validation() {
        assert!(is_valid_head(&"a".repeat(40)));
        assert!(is_valid_head(&"0123456789abcdef0123456789abcdef01234567".to_string()));
        assert!(!is_valid_head(&"A".repeat(40)));
        assert!(!is_valid_head(&"a".repeat(39)));
        assert!(!is_valid_head(&"g".repeat(40)));
        assert!(!is_valid_head(""));
    }

    #[tokio::test]
    async fn write_read_remove_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut cache = new_cache(&dir, &store);
        cache.init().unwrap();

        let path = tracked(".env");
        cache.write_encrypted(&path, b"blob").unwrap();
        assert_eq!(cache.read_encrypted(&path).unwrap(), b"blob");

        cache.remove_encrypted(&path).unwrap();
        assert!(cache.read_encrypted(&path).is_err());
    }

    #[tokio::test]
    async fn sync_to_storage_uploads_blobs_and_head() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut cache = new_cache(&dir, &store);
        cache.init().unwrap();

        cache.write_encrypted(&tracked(".env"), b"blob").unwrap();
        cache.stage_all().unwrap();
        let hash = cache.commit("add").unwrap();

        cache.sync_to_storage().await.unwrap();

        assert_eq!(store.get("acme/api/.env.age").unwrap(), b"blob");
        assert_eq!(store.get("acme/api/HEAD").unwrap(), hash.as_bytes());
    }

    #[tokio::test]
    async fn sync_to_storage_deletes_orphans() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut cache = new_cache(&dir, &store);
        cache.init().unwrap();

        // Remote has a blob the cache no longer carries.
        store.put("acme/api/.env.old.age", "stale");

        cache.write_encrypted(&tracked(".env"), b"blob").unwrap();
        cache.stage_all().unwrap();
        cache.commit("add").unwrap();
        cache.sync_to_storage().await.unwrap();

        assert!(store.get("acme/api/.env.old.age").is_none());
        assert!(store.get("acme/api/.env.age").is_some());
        assert!(store.get("acme/api/HEAD").is_some());
    }

    #[tokio::test]
    async fn sync_from_storage_populates_working_tree() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.put("acme/api/.env.age", "remote-blob");
        store.put("acme/api/sub/.env.age", "nested-blob");
        store.put("acme/api/HEAD", "a".repeat(40));

        let mut cache = new_cache(&dir, &store);
        cache.sync_from_storage().await.unwrap();

        assert_eq!(cache.read_encrypted(&tracked(".env")).unwrap(), b"remote-blob");
        assert_eq!(
            cache.read_encrypted(&tracked("sub/.env")).unwrap(),
            b"nested-blob"
        );
        // HEAD object is not materialized as a file
        assert!(!dir.path().join("acme/api/HEAD").exists());
    }

    #[tokio::test]
    async fn sync_from_storage_rejects_traversal_keys() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.put("acme/api/../escape.age", "evil");

        let mut cache = new_cache(&dir, &store);
        // The key lists under the prefix but must not escape the root.
        assert!(cache.sync_from_storage().await.is_err());
    }

    #[tokio::test]
    async fn remote_head_roundtrip_and_validation() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let cache = new_cache(&dir, &store);

        assert!(!cache.exists_remote().await.unwrap());

        let hash = "0123456789abcdef0123456789abcdef01234567";
        store.put("acme/api/HEAD", format!("{hash}\n"));
        assert!(cache.exists_remote().await.unwrap());
        assert_eq!(cache.get_remote_head().await.unwrap(), hash);

        store.put("acme/api/HEAD", "not a hash");
        assert!(matches!(
            cache.get_remote_head().await,
            Err(CacheError::InvalidRemoteHead(_))
        ));
    }

    #[tokio::test]
    async fn oversized_remote_blob_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.put("acme/api/big.age", vec![b'x'; (MAX_FILE_SIZE + 1) as usize]);

        let mut cache = new_cache(&dir, &store);
        let err = cache.sync_from_storage().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileSizeExceeded);
    }

    #[tokio::test]
    async fn delete_remote_clears_prefix_only() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.put("acme/api/.env.age", "x");
        store.put("acme/api/HEAD", "y");
        store.put("acme/other/.env.age", "keep");

        let cache = new_cache(&dir, &store);
        cache.delete_remote().await.unwrap();

        assert!(store.get("acme/api/.env.age").is_none());
        assert!(store.get("acme/api/HEAD").is_none());
        assert!(store.get("acme/other/.env.age").is_some());
    }

    #[tokio::test]
    async fn validate_reports_states() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut cache = new_cache(&dir, &store);

        let health = cache.validate();
        assert!(!health.exists);
        assert!(health.error.is_none());

        cache.init().unwrap();
        cache.write_encrypted(&tracked(".env"), b"x").unwrap();
        cache.stage_all().unwrap();
        cache.commit("add").unwrap();

        let health = cache.validate();
        assert!(health.exists);
        assert!(health.history_valid);
        assert!(health.head_valid);
        assert_eq!(health.file_count, 1);
    }

    #[tokio::test]
    async fn reset_rebuilds_from_remote() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut cache = new_cache(&dir, &store);
        cache.init().unwrap();
        cache.write_encrypted(&tracked("local-only"), b"x").unwrap();

        store.put("acme/api/.env.age", "remote");
        store.put("acme/api/HEAD", "a".repeat(40));

        cache.reset().await.unwrap();
        assert_eq!(cache.read_encrypted(&tracked(".env")).unwrap(), b"remote");
        assert!(cache.read_encrypted(&tracked("local-only")).is_err());
    }

    #[tokio::test]
    async fn reset_without_remote_reinitializes_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut cache = new_cache(&dir, &store);
        cache.init().unwrap();
        cache.write_encrypted(&tracked(".env"), b"x").unwrap();

        cache.reset().await.unwrap();
        assert!(cache.exists());
        assert!(cache.list_cipher_files().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_cipher_files_skips_metadata() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut cache = new_cache(&dir, &store);
        cache.init().unwrap();

        cache.write_encrypted(&tracked(".env"), b"1").unwrap();
        cache.write_encrypted(&tracked("sub/.env"), b"2").unwrap();
        fs::write(cache.path().join("notes.txt"), "not a blob").unwrap();

        let files = cache.list_cipher_files().unwrap();
        assert_eq!(files, vec![".env.age".to_string(), "sub/.env.age".to_string()]);
    }
}
