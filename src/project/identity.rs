//! project::identity
//!
//! Repository identity from a git remote URL.

use super::ProjectError;
use crate::core::types::RepoId;

/// Extract `(owner, name)` from a git remote URL.
///
/// Handles the common remote spellings; a trailing `.git` is dropped:
///
/// - `git@host:owner/name.git`
/// - `ssh://git@host/owner/name.git`
/// - `https://host/owner/name`
///
/// # Example
///
/// ```
/// use envault::project::parse_remote_url;
///
/// let (owner, name) = parse_remote_url("git@github.com:acme/api.git").unwrap();
/// assert_eq!((owner.as_str(), name.as_str()), ("acme", "api"));
///
/// let (owner, name) = parse_remote_url("https://github.com/acme/team/api").unwrap();
/// assert_eq!((owner.as_str(), name.as_str()), ("acme", "team/api"));
///
/// assert!(parse_remote_url("file:///local/repo").is_none());
/// ```
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let url = url.trim();

    // scp-like syntax: git@host:owner/name
    if let Some((user_host, path)) = url.split_once(':') {
        if user_host.contains('@') && !user_host.contains('/') && !path.starts_with("//") {
            return split_owner_name(path);
        }
    }

    // URL syntax: scheme://[user@]host/owner/name
    if let Some((scheme, rest)) = url.split_once("://") {
        if !matches!(scheme, "ssh" | "http" | "https" | "git") {
            return None;
        }
        let (host, path) = rest.split_once('/')?;
        if host.is_empty() {
            return None;
        }
        return split_owner_name(path);
    }

    None
}

fn split_owner_name(path: &str) -> Option<(String, String)> {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, name) = path.split_once('/')?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}

/// Parse a remote URL into a validated [`RepoId`].
pub fn repo_id_from_url(url: &str) -> Result<RepoId, ProjectError> {
    let (owner, name) =
        parse_remote_url(url).ok_or_else(|| ProjectError::NoRemote(url.to_string()))?;
    Ok(RepoId::new(owner, name)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scp_style() {
        assert_eq!(
            parse_remote_url("git@github.com:acme/api.git"),
            Some(("acme".into(), "api".into()))
        );
        assert_eq!(
            parse_remote_url("git@github.com:acme/api"),
            Some(("acme".into(), "api".into()))
        );
    }

    #[test]
    fn parses_https() {
        assert_eq!(
            parse_remote_url("https://github.com/acme/api.git"),
            Some(("acme".into(), "api".into()))
        );
        assert_eq!(
            parse_remote_url("http://git.internal/acme/api"),
            Some(("acme".into(), "api".into()))
        );
    }

    #[test]
    fn parses_ssh_url() {
        assert_eq!(
            parse_remote_url("ssh://git@github.com/acme/api.git"),
            Some(("acme".into(), "api".into()))
        );
    }

    #[test]
    fn nested_names_are_preserved() {
        assert_eq!(
            parse_remote_url("https://gitlab.com/acme/team/api.git"),
            Some(("acme".into(), "team/api".into()))
        );
    }

    #[test]
    fn rejects_unparseable() {
        assert!(parse_remote_url("not a url").is_none());
        assert!(parse_remote_url("file:///local/repo").is_none());
        assert!(parse_remote_url("https://host").is_none());
        assert!(parse_remote_url("https://host/owner-only").is_none());
    }

    #[test]
    fn repo_id_validation_applies() {
        // Parsed but invalid as an identity
        assert!(repo_id_from_url("https://host/ow ner/name").is_err());
        let id = repo_id_from_url("git@github.com:acme/api.git").unwrap();
        assert_eq!(id.to_string(), "acme/api");
    }
}
