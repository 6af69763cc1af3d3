//! history
//!
//! Linear version-control store over a working tree, backed by git2.
//!
//! # Design
//!
//! This module is the cache's only door to git; everything the sync
//! engine does to the version store flows through [`History`]. The
//! cache owns one instance per project and stores only encrypted blobs
//! in its working tree, so the history never sees plaintext.
//!
//! The store is deliberately linear - one branch, no merges. Commits
//! carry a fixed tool identity so caches are reproducible across
//! machines.
//!
//! # Permissions
//!
//! Directories are created 0700 and files 0600; the working tree holds
//! ciphertext, but the history metadata embeds file names worth hiding.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::constants::{SHORT_HASH_LEN, TOOL_EMAIL, TOOL_NAME};
use crate::core::errors::ErrorKind;
use crate::core::paths::{create_dir_private, write_private};
use crate::core::types::Commit;

/// Errors from history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The history has not been initialized yet.
    #[error("cache history not initialized")]
    NotInitialized,

    /// A commit was requested with no staged changes.
    #[error("nothing to commit")]
    NothingToCommit,

    /// A ref could not be resolved.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// A file is absent from the working tree or the named ref.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Underlying git failure.
    #[error("git error: {0}")]
    Git(String),

    /// Filesystem failure.
    #[error("history i/o error: {0}")]
    Io(String),
}

impl HistoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HistoryError::NotInitialized => ErrorKind::NotInitialized,
            HistoryError::NothingToCommit => ErrorKind::NothingToCommit,
            HistoryError::RefNotFound(_) => ErrorKind::RefNotFound,
            HistoryError::FileNotFound(_) => ErrorKind::FileNotFound,
            HistoryError::Git(_) | HistoryError::Io(_) => ErrorKind::History,
        }
    }
}

fn git_err(e: git2::Error) -> HistoryError {
    HistoryError::Git(e.message().to_string())
}

/// A linear git history colocated with its working tree.
pub struct History {
    path: PathBuf,
    repo: Option<git2::Repository>,
}

impl History {
    /// Open the history at `path`, if one exists.
    ///
    /// A missing repository is not an error; [`History::init`] creates
    /// it on demand.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let repo = match git2::Repository::open(&path) {
            Ok(repo) => Some(repo),
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(git_err(e)),
        };
        Ok(Self { path, repo })
    }

    /// Initialize the repository. Idempotent.
    pub fn init(&mut self) -> Result<(), HistoryError> {
        if self.repo.is_some() {
            return Ok(());
        }
        create_dir_private(&self.path).map_err(|e| HistoryError::Io(e.to_string()))?;
        self.repo = Some(git2::Repository::init(&self.path).map_err(git_err)?);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.repo.is_some()
    }

    /// Root of the working tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn repo(&self) -> Result<&git2::Repository, HistoryError> {
        self.repo.as_ref().ok_or(HistoryError::NotInitialized)
    }

    /// Stage every new, modified, and deleted file matching `pathspec`.
    pub fn stage_all(&self, pathspec: &str) -> Result<(), HistoryError> {
        let repo = self.repo()?;
        let mut index = repo.index().map_err(git_err)?;
        index
            .add_all([pathspec].iter(), git2::IndexAddOption::DEFAULT, None)
            .map_err(git_err)?;
        index.update_all([pathspec].iter(), None).map_err(git_err)?;
        index.write().map_err(git_err)?;
        Ok(())
    }

    /// Create a commit from the staged index with the tool identity.
    ///
    /// Returns the full 40-character hash. Fails with
    /// [`HistoryError::NothingToCommit`] when the staged tree matches
    /// the current head.
    pub fn commit(&self, message: &str) -> Result<String, HistoryError> {
        let repo = self.repo()?;

        let mut index = repo.index().map_err(git_err)?;
        let tree_id = index.write_tree().map_err(git_err)?;
        let tree = repo.find_tree(tree_id).map_err(git_err)?;

        let parent = match self.head_commit()? {
            Some(commit) => {
                if commit.tree_id() == tree_id {
                    return Err(HistoryError::NothingToCommit);
                }
                Some(commit)
            }
            None => {
                if tree.len() == 0 {
                    return Err(HistoryError::NothingToCommit);
                }
                None
            }
        };

        let sig =
            git2::Signature::now(TOOL_NAME, TOOL_EMAIL).map_err(git_err)?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(git_err)?;

        Ok(oid.to_string())
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>, HistoryError> {
        let repo = self.repo()?;
        match repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(git_err)?;
                Ok(Some(commit))
            }
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(git_err(e)),
        }
    }

    /// Current head hash, or the empty string before the first commit.
    pub fn head(&self) -> Result<String, HistoryError> {
        Ok(self
            .head_commit()?
            .map(|c| c.id().to_string())
            .unwrap_or_default())
    }

    /// The most recent `n` commits, newest first.
    pub fn log(&self, n: usize) -> Result<Vec<Commit>, HistoryError> {
        let repo = self.repo()?;

        if self.head_commit()?.is_none() {
            return Ok(Vec::new());
        }

        let mut walk = repo.revwalk().map_err(git_err)?;
        walk.push_head().map_err(git_err)?;

        let mut commits = Vec::new();
        for oid in walk.take(n) {
            let oid = oid.map_err(git_err)?;
            let commit = repo.find_commit(oid).map_err(git_err)?;
            commits.push(self.describe(&commit)?);
        }
        Ok(commits)
    }

    fn describe(&self, commit: &git2::Commit<'_>) -> Result<Commit, HistoryError> {
        let repo = self.repo()?;
        let hash = commit.id().to_string();

        let tree = commit.tree().map_err(git_err)?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree().map_err(git_err)?),
            Err(_) => None,
        };
        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(git_err)?;
        let files = diff
            .deltas()
            .filter_map(|d| d.new_file().path().or_else(|| d.old_file().path()))
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        Ok(Commit {
            short_hash: hash[..SHORT_HASH_LEN.min(hash.len())].to_string(),
            hash,
            message: commit.message().unwrap_or_default().trim_end().to_string(),
            author: commit.author().name().unwrap_or_default().to_string(),
            date: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
                .unwrap_or_else(Utc::now),
            files,
        })
    }

    /// Detach to the commit named by `reference` (hash or prefix) and
    /// force the working tree to match it.
    pub fn checkout(&self, reference: &str) -> Result<(), HistoryError> {
        let repo = self.repo()?;

        let object = repo
            .revparse_single(reference)
            .map_err(|_| HistoryError::RefNotFound(reference.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| HistoryError::RefNotFound(reference.to_string()))?;

        let mut opts = git2::build::CheckoutBuilder::new();
        opts.force();
        repo.checkout_tree(commit.as_object(), Some(&mut opts))
            .map_err(git_err)?;
        repo.set_head_detached(commit.id()).map_err(git_err)?;
        Ok(())
    }

    /// Re-attach HEAD to a branch and force the working tree to its
    /// tip.
    pub fn checkout_branch(&self, branch: &str) -> Result<(), HistoryError> {
        let repo = self.repo()?;
        let refname = format!("refs/heads/{branch}");
        repo.find_reference(&refname)
            .map_err(|_| HistoryError::RefNotFound(branch.to_string()))?;
        repo.set_head(&refname).map_err(git_err)?;

        let mut opts = git2::build::CheckoutBuilder::new();
        opts.force();
        repo.checkout_head(Some(&mut opts)).map_err(git_err)?;
        Ok(())
    }

    /// Name of the default branch (`main` or `master`).
    pub fn default_branch(&self) -> Result<String, HistoryError> {
        let repo = self.repo()?;
        for name in ["main", "master"] {
            if repo.find_branch(name, git2::BranchType::Local).is_ok() {
                return Ok(name.to_string());
            }
        }
        Err(HistoryError::RefNotFound(
            "no default branch (checked main, master)".to_string(),
        ))
    }

    /// Read a file from the working tree (`reference` empty) or from the
    /// tree of the named commit.
    pub fn read_file(&self, path: &str, reference: &str) -> Result<Vec<u8>, HistoryError> {
        self.repo()?;

        if reference.is_empty() {
            let full = self.path.join(path);
            return match fs::read(&full) {
                Ok(data) => Ok(data),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(HistoryError::FileNotFound(path.to_string()))
                }
                Err(e) => Err(HistoryError::Io(e.to_string())),
            };
        }

        let repo = self.repo()?;
        let object = repo
            .revparse_single(reference)
            .map_err(|_| HistoryError::RefNotFound(reference.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| HistoryError::RefNotFound(reference.to_string()))?;
        let tree = commit.tree().map_err(git_err)?;
        let entry = tree
            .get_path(Path::new(path))
            .map_err(|_| HistoryError::FileNotFound(format!("{path} at {reference}")))?;
        let blob = repo
            .find_blob(entry.id())
            .map_err(|_| HistoryError::FileNotFound(format!("{path} at {reference}")))?;
        Ok(blob.content().to_vec())
    }

    /// Write a file into the working tree (0600, parents 0700).
    pub fn write_file(&self, path: &str, content: &[u8]) -> Result<(), HistoryError> {
        let full = self.path.join(path);
        if let Some(dir) = full.parent() {
            create_dir_private(dir).map_err(|e| HistoryError::Io(e.to_string()))?;
        }
        write_private(&full, content).map_err(|e| HistoryError::Io(e.to_string()))
    }

    /// Remove a file from the working tree and stage the removal.
    pub fn remove_file(&self, path: &str) -> Result<(), HistoryError> {
        let repo = self.repo()?;

        let full = self.path.join(path);
        match fs::remove_file(&full) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HistoryError::FileNotFound(path.to_string()))
            }
            Err(e) => return Err(HistoryError::Io(e.to_string())),
        }

        let mut index = repo.index().map_err(git_err)?;
        // The path may never have been committed; a missing index entry
        // is fine.
        let _ = index.remove_path(Path::new(path));
        index.write().map_err(git_err)?;
        Ok(())
    }

    /// Whether any staged or unstaged modification exists.
    pub fn has_changes(&self) -> Result<bool, HistoryError> {
        let repo = self.repo()?;
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true);
        let statuses = repo.statuses(Some(&mut opts)).map_err(git_err)?;
        Ok(!statuses.is_empty())
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("path", &self.path)
            .field("initialized", &self.repo.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_initialized(dir: &TempDir) -> History {
        let mut history = History::open(dir.path().join("repo")).unwrap();
        history.init().unwrap();
        history
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut history = History::open(dir.path().join("repo")).unwrap();
        assert!(!history.is_initialized());
        history.init().unwrap();
        history.init().unwrap();
        assert!(history.is_initialized());
    }

    #[test]
    fn open_finds_existing_repo() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repo");
        {
            let mut history = History::open(&path).unwrap();
            history.init().unwrap();
        }
        let reopened = History::open(&path).unwrap();
        assert!(reopened.is_initialized());
    }

    #[test]
    fn uninitialized_operations_fail() {
        let dir = TempDir::new().unwrap();
        let history = History::open(dir.path().join("repo")).unwrap();
        assert!(matches!(
            history.head(),
            Err(HistoryError::NotInitialized)
        ));
        assert!(matches!(
            history.stage_all("*"),
            Err(HistoryError::NotInitialized)
        ));
    }

    #[test]
    fn head_is_empty_before_first_commit() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);
        assert_eq!(history.head().unwrap(), "");
    }

    #[test]
    fn commit_returns_full_hash() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        history.write_file(".env.age", b"blob").unwrap();
        history.stage_all("*").unwrap();
        let hash = history.commit("add .env").unwrap();

        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(history.head().unwrap(), hash);
    }

    #[test]
    fn empty_commit_is_rejected() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        assert!(matches!(
            history.commit("nothing"),
            Err(HistoryError::NothingToCommit)
        ));

        history.write_file("a.age", b"1").unwrap();
        history.stage_all("*").unwrap();
        history.commit("add").unwrap();

        // Same tree again
        history.stage_all("*").unwrap();
        assert!(matches!(
            history.commit("again"),
            Err(HistoryError::NothingToCommit)
        ));
    }

    #[test]
    fn log_is_newest_first_and_truncated() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        for i in 0..3 {
            history
                .write_file("f.age", format!("v{i}").as_bytes())
                .unwrap();
            history.stage_all("*").unwrap();
            history.commit(&format!("commit {i}")).unwrap();
        }

        let log = history.log(2).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "commit 2");
        assert_eq!(log[1].message, "commit 1");
        assert_eq!(log[0].author, TOOL_NAME);
        assert_eq!(log[0].short_hash.len(), 7);
        assert_eq!(log[0].files, vec!["f.age".to_string()]);
    }

    #[test]
    fn log_on_empty_history_is_empty() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);
        assert!(history.log(10).unwrap().is_empty());
    }

    #[test]
    fn checkout_restores_working_tree() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        history.write_file("f.age", b"old").unwrap();
        history.stage_all("*").unwrap();
        let first = history.commit("first").unwrap();

        history.write_file("f.age", b"new").unwrap();
        history.stage_all("*").unwrap();
        history.commit("second").unwrap();

        history.checkout(&first).unwrap();
        assert_eq!(history.read_file("f.age", "").unwrap(), b"old");
        assert_eq!(history.head().unwrap(), first);
    }

    #[test]
    fn checkout_accepts_hash_prefix() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        history.write_file("f.age", b"x").unwrap();
        history.stage_all("*").unwrap();
        let hash = history.commit("c").unwrap();

        history.checkout(&hash[..7]).unwrap();
        assert_eq!(history.head().unwrap(), hash);
    }

    #[test]
    fn checkout_unknown_ref_fails() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);
        history.write_file("f.age", b"x").unwrap();
        history.stage_all("*").unwrap();
        history.commit("c").unwrap();

        assert!(matches!(
            history.checkout("deadbeef"),
            Err(HistoryError::RefNotFound(_))
        ));
    }

    #[test]
    fn read_file_at_ref() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        history.write_file("f.age", b"v1").unwrap();
        history.stage_all("*").unwrap();
        let first = history.commit("first").unwrap();

        history.write_file("f.age", b"v2").unwrap();
        history.stage_all("*").unwrap();
        history.commit("second").unwrap();

        assert_eq!(history.read_file("f.age", &first).unwrap(), b"v1");
        assert_eq!(history.read_file("f.age", "").unwrap(), b"v2");
        assert!(matches!(
            history.read_file("missing.age", &first),
            Err(HistoryError::FileNotFound(_))
        ));
    }

    #[test]
    fn remove_file_stages_removal() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        history.write_file("f.age", b"x").unwrap();
        history.stage_all("*").unwrap();
        history.commit("add").unwrap();

        history.remove_file("f.age").unwrap();
        history.stage_all("*").unwrap();
        history.commit("remove").unwrap();

        assert!(matches!(
            history.read_file("f.age", ""),
            Err(HistoryError::FileNotFound(_))
        ));
    }

    #[test]
    fn remove_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);
        assert!(matches!(
            history.remove_file("nope.age"),
            Err(HistoryError::FileNotFound(_))
        ));
    }

    #[test]
    fn has_changes_tracks_working_tree() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);
        assert!(!history.has_changes().unwrap());

        history.write_file("f.age", b"x").unwrap();
        assert!(history.has_changes().unwrap());

        history.stage_all("*").unwrap();
        history.commit("add").unwrap();
        assert!(!history.has_changes().unwrap());
    }

    #[test]
    fn default_branch_exists_after_first_commit() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        assert!(history.default_branch().is_err());

        history.write_file("f.age", b"x").unwrap();
        history.stage_all("*").unwrap();
        history.commit("c").unwrap();

        let branch = history.default_branch().unwrap();
        assert!(branch == "main" || branch == "master", "got {branch}");
    }

    #[test]
    fn checkout_branch_reattaches_head_and_restores_tip() {
        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);

        history.write_file("f.age", b"old").unwrap();
        history.stage_all("*").unwrap();
        let first = history.commit("first").unwrap();

        history.write_file("f.age", b"new").unwrap();
        history.stage_all("*").unwrap();
        let tip = history.commit("second").unwrap();

        history.checkout(&first).unwrap();
        assert_eq!(history.read_file("f.age", "").unwrap(), b"old");

        let branch = history.default_branch().unwrap();
        history.checkout_branch(&branch).unwrap();
        assert_eq!(history.head().unwrap(), tip);
        assert_eq!(history.read_file("f.age", "").unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn working_tree_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let history = open_initialized(&dir);
        history.write_file("sub/f.age", b"x").unwrap();

        let file_mode = fs::metadata(history.path().join("sub/f.age"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(file_mode, 0o600);

        let dir_mode = fs::metadata(history.path().join("sub"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }
}
