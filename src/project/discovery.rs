//! project::discovery
//!
//! Locating the project and reading/writing its plaintext files.

use std::fs;
use std::path::{Path, PathBuf};

use super::{envfiles, identity, ProjectError};
use crate::core::constants::{MANIFEST_FILE, MAX_FILE_SIZE};
use crate::core::limits::{read_limited, LimitError};
use crate::core::paths::{create_dir_private, secure_join, write_private};
use crate::core::types::{RepoId, TrackedPath};

/// A discovered project: its root directory and repository identity.
#[derive(Debug)]
pub struct Discovery {
    root: PathBuf,
    repo_id: RepoId,
}

impl Discovery {
    /// Discover the project containing `start` (or the current
    /// directory) by walking up to the git repository, then deriving the
    /// identity from its remote URL (`origin` preferred).
    pub fn discover(start: Option<&Path>) -> Result<Self, ProjectError> {
        let start = match start {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir().map_err(|_| ProjectError::NotInRepo)?,
        };

        let repo = git2::Repository::discover(&start).map_err(|_| ProjectError::NotInRepo)?;
        let root = repo
            .workdir()
            .ok_or(ProjectError::NotInRepo)?
            .to_path_buf();

        let url = remote_url(&repo)?;
        let repo_id = identity::repo_id_from_url(&url)?;

        Ok(Self { root, repo_id })
    }

    /// Build a discovery with an explicit root and identity (used by the
    /// `--repo` override).
    pub fn with_identity(root: PathBuf, repo_id: RepoId) -> Self {
        Self { root, repo_id }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_id(&self) -> &RepoId {
        &self.repo_id
    }

    /// Path of the project's manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Validated tracked paths from the manifest.
    pub fn tracked_files(&self) -> Result<Vec<TrackedPath>, ProjectError> {
        envfiles::parse_manifest(&self.manifest_path())
    }

    fn resolve(&self, path: &TrackedPath) -> Result<PathBuf, ProjectError> {
        secure_join(&self.root, path.as_str())
            .map_err(|e| ProjectError::Type(crate::core::types::TypeError::InvalidTrackedPath {
                path: path.as_str().to_string(),
                reason: e.to_string(),
            }))
    }

    /// Whether the tracked file exists in the project.
    pub fn file_exists(&self, path: &TrackedPath) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    /// Read a tracked file's plaintext, capped at 2 MiB.
    pub fn read_file(&self, path: &TrackedPath) -> Result<Vec<u8>, ProjectError> {
        let full = self.resolve(path)?;
        let file = match fs::File::open(&full) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProjectError::FileNotFound(path.to_string()))
            }
            Err(e) => return Err(ProjectError::Io(e.to_string())),
        };

        read_limited(file, MAX_FILE_SIZE, path.as_str()).map_err(|e| match e {
            LimitError::Exceeded { what, limit } => ProjectError::TooLarge { what, limit },
            LimitError::Io { source, .. } => ProjectError::Io(source.to_string()),
        })
    }

    /// Write a tracked file's plaintext (0600, parents 0700).
    pub fn write_file(&self, path: &TrackedPath, content: &[u8]) -> Result<(), ProjectError> {
        let full = self.resolve(path)?;
        if let Some(dir) = full.parent() {
            create_dir_private(dir).map_err(|e| ProjectError::Io(e.to_string()))?;
        }
        write_private(&full, content).map_err(|e| ProjectError::Io(e.to_string()))
    }
}

/// Pick the remote URL, preferring `origin`.
fn remote_url(repo: &git2::Repository) -> Result<String, ProjectError> {
    let remotes = repo
        .remotes()
        .map_err(|e| ProjectError::NoRemote(e.message().to_string()))?;

    if let Ok(origin) = repo.find_remote("origin") {
        if let Some(url) = origin.url() {
            return Ok(url.to_string());
        }
    }

    for name in remotes.iter().flatten() {
        if let Ok(remote) = repo.find_remote(name) {
            if let Some(url) = remote.url() {
                return Ok(url.to_string());
            }
        }
    }

    Err(ProjectError::NoRemote(
        "no remotes configured".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git_project(dir: &TempDir, remote: &str) -> PathBuf {
        let root = dir.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        let repo = git2::Repository::init(&root).unwrap();
        repo.remote("origin", remote).unwrap();
        root
    }

    #[test]
    fn discovers_identity_from_origin() {
        let dir = TempDir::new().unwrap();
        let root = git_project(&dir, "git@github.com:acme/api.git");

        let discovery = Discovery::discover(Some(&root)).unwrap();
        assert_eq!(discovery.repo_id().to_string(), "acme/api");
        assert_eq!(
            discovery.root().canonicalize().unwrap(),
            root.canonicalize().unwrap()
        );
    }

    #[test]
    fn discovers_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        let root = git_project(&dir, "https://github.com/acme/api");
        let sub = root.join("src").join("deep");
        fs::create_dir_all(&sub).unwrap();

        let discovery = Discovery::discover(Some(&sub)).unwrap();
        assert_eq!(discovery.repo_id().to_string(), "acme/api");
    }

    #[test]
    fn outside_a_repo_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Discovery::discover(Some(dir.path())),
            Err(ProjectError::NotInRepo)
        ));
    }

    #[test]
    fn repo_without_remotes_fails() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        git2::Repository::init(&root).unwrap();

        assert!(matches!(
            Discovery::discover(Some(&root)),
            Err(ProjectError::NoRemote(_))
        ));
    }

    #[test]
    fn file_io_roundtrip() {
        let dir = TempDir::new().unwrap();
        let root = git_project(&dir, "git@github.com:acme/api.git");
        let discovery = Discovery::discover(Some(&root)).unwrap();

        let path = TrackedPath::new("config/.env").unwrap();
        assert!(!discovery.file_exists(&path));

        discovery.write_file(&path, b"FOO=bar\n").unwrap();
        assert!(discovery.file_exists(&path));
        assert_eq!(discovery.read_file(&path).unwrap(), b"FOO=bar\n");
    }

    #[test]
    fn read_missing_file() {
        let dir = TempDir::new().unwrap();
        let root = git_project(&dir, "git@github.com:acme/api.git");
        let discovery = Discovery::discover(Some(&root)).unwrap();

        let path = TrackedPath::new(".env").unwrap();
        assert!(matches!(
            discovery.read_file(&path),
            Err(ProjectError::FileNotFound(_))
        ));
    }

    #[test]
    fn tracked_files_reads_manifest() {
        let dir = TempDir::new().unwrap();
        let root = git_project(&dir, "git@github.com:acme/api.git");
        fs::write(root.join(MANIFEST_FILE), ".env\n.env.local\n").unwrap();

        let discovery = Discovery::discover(Some(&root)).unwrap();
        let files = discovery.tracked_files().unwrap();
        assert_eq!(files.len(), 2);
    }
}
