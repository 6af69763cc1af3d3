//! project::envfiles
//!
//! The `.envault` manifest: one tracked path per line, `#` comments.
//!
//! Paths are validated at parse time so nothing traversal-prone reaches
//! the cache, and stored verbatim otherwise.

use std::fs;
use std::path::Path;

use super::ProjectError;
use crate::core::constants::MANIFEST_FILE;
use crate::core::types::TrackedPath;

/// Parse a manifest file into validated tracked paths.
///
/// A missing file maps to [`ProjectError::NoManifest`]; an empty list
/// (after comments) to [`ProjectError::NoFilesTracked`].
pub fn parse_manifest(path: &Path) -> Result<Vec<TrackedPath>, ProjectError> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProjectError::NoManifest(MANIFEST_FILE.to_string()))
        }
        Err(e) => return Err(ProjectError::Io(e.to_string())),
    };

    let mut files = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let tracked = TrackedPath::new(line)
            .map_err(|source| ProjectError::InvalidManifestPath {
                line: idx + 1,
                source,
            })?;
        if !files.contains(&tracked) {
            files.push(tracked);
        }
    }

    if files.is_empty() {
        return Err(ProjectError::NoFilesTracked);
    }

    Ok(files)
}

/// Write a manifest listing `files`, one per line.
pub fn write_manifest(path: &Path, files: &[TrackedPath]) -> Result<(), ProjectError> {
    let mut out = String::new();
    for f in files {
        out.push_str(f.as_str());
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| ProjectError::Io(e.to_string()))
}

/// Whether `file` appears in the manifest.
pub fn is_tracked(path: &Path, file: &str) -> Result<bool, ProjectError> {
    Ok(parse_manifest(path)?.iter().any(|f| f.as_str() == file))
}

/// Remove `file` from the manifest, preserving comments and order.
///
/// Fails with [`ProjectError::FileNotFound`] when the file is not
/// listed.
pub fn remove_from_manifest(path: &Path, file: &str) -> Result<(), ProjectError> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProjectError::NoManifest(MANIFEST_FILE.to_string()))
        }
        Err(e) => return Err(ProjectError::Io(e.to_string())),
    };

    let mut found = false;
    let kept: Vec<&str> = contents
        .lines()
        .filter(|raw| {
            if raw.trim() == file {
                found = true;
                false
            } else {
                true
            }
        })
        .collect();

    if !found {
        return Err(ProjectError::FileNotFound(format!(
            "file not tracked: {file}"
        )));
    }

    let mut out = kept.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| ProjectError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_paths_skipping_comments() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, "# secrets\n.env\n\n.env.local\nconfig/.env\n");

        let files = parse_manifest(&path).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, vec![".env", ".env.local", "config/.env"]);
    }

    #[test]
    fn duplicates_are_collapsed() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, ".env\n.env\n");
        assert_eq!(parse_manifest(&path).unwrap().len(), 1);
    }

    #[test]
    fn missing_manifest() {
        let dir = TempDir::new().unwrap();
        let err = parse_manifest(&dir.path().join(MANIFEST_FILE)).unwrap_err();
        assert!(matches!(err, ProjectError::NoManifest(_)));
    }

    #[test]
    fn empty_manifest_tracks_nothing() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, "# only comments\n\n");
        assert!(matches!(
            parse_manifest(&path),
            Err(ProjectError::NoFilesTracked)
        ));
    }

    #[test]
    fn traversal_paths_are_rejected_with_line_numbers() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, ".env\n../secrets\n");
        let err = parse_manifest(&path).unwrap_err();
        match err {
            ProjectError::InvalidManifestPath { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn is_tracked_checks_membership() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, ".env\n.env.local\n");
        assert!(is_tracked(&path, ".env").unwrap());
        assert!(!is_tracked(&path, ".env.test").unwrap());
    }

    #[test]
    fn remove_preserves_comments() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, "# keep me\n.env\n.env.local\n");

        remove_from_manifest(&path, ".env").unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "# keep me\n.env.local\n");

        assert!(matches!(
            remove_from_manifest(&path, ".env"),
            Err(ProjectError::FileNotFound(_))
        ));
    }

    #[test]
    fn write_then_parse_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let files = vec![
            TrackedPath::new(".env").unwrap(),
            TrackedPath::new("config/.env").unwrap(),
        ];
        write_manifest(&path, &files).unwrap();
        assert_eq!(parse_manifest(&path).unwrap(), files);
    }
}
