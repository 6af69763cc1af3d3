//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoId`] - Validated `owner/name` repository identity
//! - [`TrackedPath`] - Validated relative path of a tracked file
//! - [`Commit`] - One entry in the cache history
//! - [`FileStatus`] / [`SyncStatus`] - Derived status views
//! - [`PushResult`] / [`PullResult`] - Operation outcomes
//!
//! # Validation
//!
//! `RepoId` and `TrackedPath` enforce validity at construction time, so
//! invalid identities and traversal-prone paths cannot flow into the
//! cache or the object store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::constants::{CIPHER_EXT, SHORT_HASH_LEN};
use super::errors::ErrorKind;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository id: {0}")]
    InvalidRepoId(String),

    #[error("invalid tracked path {path:?}: {reason}")]
    InvalidTrackedPath { path: String, reason: String },
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TypeError::InvalidRepoId(_) => ErrorKind::InvalidArgs,
            TypeError::InvalidTrackedPath { .. } => ErrorKind::InvalidPath,
        }
    }
}

/// Repository identity as `owner/name`.
///
/// The owner is restricted to `[A-Za-z0-9._-]+`; the name additionally
/// permits `/` for nested paths. The identity determines both the cache
/// subdirectory and the remote object prefix.
///
/// # Example
///
/// ```
/// use envault::core::types::RepoId;
///
/// let id = RepoId::new("acme", "billing/api").unwrap();
/// assert_eq!(id.remote_prefix(), "acme/billing/api/");
/// assert_eq!(id.cache_subpath(), "acme/billing/api");
///
/// assert!(RepoId::new("", "x").is_err());
/// assert!(RepoId::new("a b", "x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoId {
    owner: String,
    name: String,
}

fn valid_id_char(c: char, allow_slash: bool) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') || (allow_slash && c == '/')
}

impl RepoId {
    /// Create a validated repository identity.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let name = name.into();

        if owner.is_empty() || !owner.chars().all(|c| valid_id_char(c, false)) {
            return Err(TypeError::InvalidRepoId(format!(
                "owner {owner:?} may only contain alphanumerics, dots, underscores, and dashes"
            )));
        }
        if name.is_empty() || !name.chars().all(|c| valid_id_char(c, true)) {
            return Err(TypeError::InvalidRepoId(format!(
                "name {name:?} may only contain alphanumerics, dots, underscores, dashes, and slashes"
            )));
        }

        Ok(Self { owner, name })
    }

    /// Parse an `owner/name` string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Self::new(owner, name),
            _ => Err(TypeError::InvalidRepoId(format!(
                "expected owner/name, got {s:?}"
            ))),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote object prefix for this repository (`owner/name/`).
    pub fn remote_prefix(&self) -> String {
        format!("{}/{}/", self.owner, self.name)
    }

    /// Cache subdirectory for this repository (`owner/name`).
    pub fn cache_subpath(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A validated, POSIX-style relative path naming a tracked file.
///
/// The path is stored verbatim (`"./foo"` and `"foo"` are distinct), but
/// construction rejects anything that could escape a base directory:
///
/// - empty strings and control characters (tab excepted)
/// - absolute paths
/// - paths whose lexically-cleaned form is `..`, begins with `../`,
///   contains `/../`, or ends with `/..`
///
/// # Example
///
/// ```
/// use envault::core::types::TrackedPath;
///
/// let p = TrackedPath::new(".env").unwrap();
/// assert_eq!(p.cipher_name(), ".env.age");
///
/// assert!(TrackedPath::new("../secrets").is_err());
/// assert!(TrackedPath::new("/etc/passwd").is_err());
/// assert!(TrackedPath::new("a/../../b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackedPath(String);

impl TrackedPath {
    /// Create a validated tracked path.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        let invalid = |reason: &str| TypeError::InvalidTrackedPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        if path.chars().any(|c| (c as u32) < 0x20 && c != '\t') {
            return Err(invalid("path contains control characters"));
        }
        if path.starts_with('/') {
            return Err(invalid("absolute paths are not allowed"));
        }

        let cleaned = clean_path(path);
        if cleaned == ".."
            || cleaned.starts_with("../")
            || cleaned.contains("/../")
            || cleaned.ends_with("/..")
        {
            return Err(invalid("path escapes the base directory"));
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ciphertext file name for this path (`<path>.age`).
    pub fn cipher_name(&self) -> String {
        format!("{}{}", self.0, CIPHER_EXT)
    }
}

impl AsRef<str> for TrackedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lexically clean a slash-separated path.
///
/// Removes `.` components and empty components, and resolves `..`
/// against preceding components where possible. Leading `..` components
/// that cannot be resolved are preserved, which is exactly what the
/// escape checks above look for.
pub(crate) fn clean_path(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(&last) if last != "..") {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    if out.is_empty() {
        ".".to_string()
    } else {
        out.join("/")
    }
}

/// One entry in the cache history.
#[derive(Debug, Clone, Serialize)]
pub struct Commit {
    /// Full 40-character commit hash.
    pub hash: String,
    /// 7-character hash prefix.
    pub short_hash: String,
    /// Commit message.
    pub message: String,
    /// Author name (always the tool identity).
    pub author: String,
    /// Commit timestamp.
    pub date: DateTime<Utc>,
    /// Paths changed by this commit, relative to the cache root.
    pub files: Vec<String>,
}

/// Truncate a full hash to its short form for display.
pub fn short_hash(hash: &str) -> &str {
    if hash.len() > SHORT_HASH_LEN {
        &hash[..SHORT_HASH_LEN]
    } else {
        hash
    }
}

/// Status of one tracked file, derived from local and cache state.
#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    /// Path relative to the project root.
    pub path: String,
    /// Whether the file exists in the project.
    pub local_exists: bool,
    /// Whether an encrypted copy exists in the cache.
    pub cache_exists: bool,
    /// Whether local plaintext differs from the decrypted cache copy.
    pub modified: bool,
}

/// Sync relationship between the local cache and the remote store.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    /// Local cache HEAD (empty if no commits).
    pub local_head: String,
    /// Remote HEAD (empty if the remote is missing).
    pub remote_head: String,
    /// True when the two heads match.
    pub in_sync: bool,
}

/// Outcome of a push operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushResult {
    /// Hash of the created commit (empty for dry runs).
    pub commit_hash: String,
    pub files_added: usize,
    pub files_updated: usize,
    pub files_deleted: usize,
}

/// Outcome of a pull operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullResult {
    pub files_created: usize,
    pub files_updated: usize,
    /// Files already up to date.
    pub files_skipped: usize,
    /// Conflicting files skipped at the user's request.
    pub files_skipped_conflict: usize,
    /// The ref the pull materialized.
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Files whose local content would be overwritten.
    pub files_with_conflicts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_accepts_valid_identities() {
        let id = RepoId::new("acme-corp", "api").unwrap();
        assert_eq!(id.to_string(), "acme-corp/api");
        assert_eq!(id.remote_prefix(), "acme-corp/api/");

        // Nested names are allowed
        let nested = RepoId::new("acme", "team/service").unwrap();
        assert_eq!(nested.cache_subpath(), "acme/team/service");
    }

    #[test]
    fn repo_id_rejects_invalid_identities() {
        assert!(RepoId::new("", "api").is_err());
        assert!(RepoId::new("acme", "").is_err());
        assert!(RepoId::new("acme corp", "api").is_err());
        assert!(RepoId::new("acme/sub", "api").is_err());
        assert!(RepoId::new("acme", "api name").is_err());
    }

    #[test]
    fn repo_id_parse() {
        let id = RepoId::parse("acme/api").unwrap();
        assert_eq!(id.owner(), "acme");
        assert_eq!(id.name(), "api");

        let nested = RepoId::parse("acme/team/service").unwrap();
        assert_eq!(nested.owner(), "acme");
        assert_eq!(nested.name(), "team/service");

        assert!(RepoId::parse("acme").is_err());
        assert!(RepoId::parse("/api").is_err());
        assert!(RepoId::parse("acme/").is_err());
    }

    #[test]
    fn tracked_path_accepts_normal_paths() {
        for p in [".env", ".env.local", "config/.env", "a/b/c.txt", "./x"] {
            assert!(TrackedPath::new(p).is_ok(), "{p} should be valid");
        }
    }

    #[test]
    fn tracked_path_rejects_traversal() {
        for p in [
            "",
            "..",
            "../x",
            "a/../../b",
            "a/..",
            "/abs",
            "a/b/../../../c",
        ] {
            assert!(TrackedPath::new(p).is_err(), "{p} should be rejected");
        }
    }

    #[test]
    fn tracked_path_rejects_control_characters() {
        assert!(TrackedPath::new("a\x07b").is_err());
        assert!(TrackedPath::new("a\nb").is_err());
        // Tab is explicitly permitted
        assert!(TrackedPath::new("a\tb").is_ok());
    }

    #[test]
    fn tracked_path_stored_verbatim() {
        let dotted = TrackedPath::new("./foo").unwrap();
        let plain = TrackedPath::new("foo").unwrap();
        assert_ne!(dotted, plain);
        assert_eq!(dotted.cipher_name(), "./foo.age");
    }

    #[test]
    fn interior_dotdot_resolving_inside_base_is_allowed() {
        // a/b/../c cleans to a/c, which stays inside the base
        assert!(TrackedPath::new("a/b/../c").is_ok());
    }

    #[test]
    fn clean_path_cases() {
        assert_eq!(clean_path("a/./b"), "a/b");
        assert_eq!(clean_path("a//b"), "a/b");
        assert_eq!(clean_path("a/b/.."), "a");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path("a/../.."), "..");
        assert_eq!(clean_path("."), ".");
    }

    #[test]
    fn short_hash_truncates() {
        let h = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(short_hash(h), "0123456");
        assert_eq!(short_hash("abc"), "abc");
    }
}
