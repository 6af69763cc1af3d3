//! core::paths
//!
//! Traversal-safe composition of a base directory with externally
//! supplied relative paths.
//!
//! # Design
//!
//! Every path that reaches the filesystem through the cache is built
//! here. Object keys listed from the remote and file names recorded in
//! the cache history are both attacker-influenced inputs, so the same
//! rules apply to each: no absolute paths, no components that escape the
//! base once the path is lexically cleaned, and the joined result must
//! sit textually under the base.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::errors::ErrorKind;
use super::types::clean_path;

/// Errors from secure path composition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("absolute path not allowed: {0:?}")]
    Absolute(String),

    #[error("path traversal not allowed: {0:?}")]
    Traversal(String),

    #[error("path escapes base directory: {0:?}")]
    EscapesBase(String),
}

impl PathError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidPath
    }
}

/// Safely join a base directory with a relative path.
///
/// The relative path is interpreted as slash-separated regardless of
/// platform. Returns the joined absolute path, or an error if the input
/// is absolute, escapes the base after lexical cleaning, or contains
/// components that would resolve outside the base.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use envault::core::paths::secure_join;
///
/// let base = Path::new("/cache/acme/api");
/// assert_eq!(
///     secure_join(base, "config/.env.age").unwrap(),
///     Path::new("/cache/acme/api/config/.env.age"),
/// );
/// assert!(secure_join(base, "../other/.env.age").is_err());
/// assert!(secure_join(base, "/etc/passwd").is_err());
/// ```
pub fn secure_join(base: &Path, relative: &str) -> Result<PathBuf, PathError> {
    if relative.starts_with('/') || Path::new(relative).is_absolute() {
        return Err(PathError::Absolute(relative.to_string()));
    }

    let cleaned = clean_path(relative);
    if cleaned == ".." || cleaned.starts_with("../") {
        return Err(PathError::Traversal(relative.to_string()));
    }

    let mut joined = base.to_path_buf();
    if cleaned != "." {
        for comp in cleaned.split('/') {
            joined.push(comp);
        }
    }

    // Belt-and-suspenders: the joined path must sit textually under the
    // base when compared with the platform separator.
    if joined != base && !joined.starts_with(base) {
        return Err(PathError::EscapesBase(relative.to_string()));
    }

    Ok(joined)
}

/// Create a directory and any missing parents with 0700 permissions.
pub fn create_dir_private(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
    }
    #[cfg(not(unix))]
    std::fs::create_dir_all(dir)
}

/// Write a file with 0600 permissions, truncating any existing content.
pub fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut f = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        f.write_all(data)
    }
    #[cfg(not(unix))]
    std::fs::write(path, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_simple_paths() {
        let base = Path::new("/base");
        assert_eq!(secure_join(base, "a").unwrap(), PathBuf::from("/base/a"));
        assert_eq!(
            secure_join(base, "a/b/c").unwrap(),
            PathBuf::from("/base/a/b/c")
        );
    }

    #[test]
    fn normalizes_dot_components() {
        let base = Path::new("/base");
        assert_eq!(
            secure_join(base, "./a/./b").unwrap(),
            PathBuf::from("/base/a/b")
        );
        assert_eq!(
            secure_join(base, "a/x/../b").unwrap(),
            PathBuf::from("/base/a/b")
        );
    }

    #[test]
    fn rejects_absolute() {
        assert!(matches!(
            secure_join(Path::new("/base"), "/etc/passwd"),
            Err(PathError::Absolute(_))
        ));
    }

    #[test]
    fn rejects_traversal() {
        let base = Path::new("/base");
        for p in ["..", "../x", "a/../../x", "../../etc/passwd"] {
            assert!(secure_join(base, p).is_err(), "{p} should be rejected");
        }
    }

    #[test]
    fn result_stays_under_base() {
        let base = Path::new("/base/deep");
        let joined = secure_join(base, "x/y.age").unwrap();
        assert!(joined.starts_with(base));
    }

    #[test]
    fn sibling_prefix_does_not_match() {
        // /base2 must not be treated as inside /base
        let base = Path::new("/base");
        let joined = secure_join(base, "x").unwrap();
        assert!(joined.starts_with("/base/"));
    }

    #[cfg(unix)]
    #[test]
    fn private_dirs_and_files() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        create_dir_private(&nested).unwrap();
        for dir in [&nested, &tmp.path().join("a")] {
            let mode = std::fs::metadata(dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700, "{}", dir.display());
        }

        let file = nested.join("f");
        write_private(&file, b"data").unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
