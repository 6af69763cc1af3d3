//! core::config
//!
//! User configuration: schema, loading, validation, and atomic save.
//!
//! # Location
//!
//! In order of precedence:
//! 1. `--config <path>` CLI flag
//! 2. `$ENVAULT_CONFIG` if set
//! 3. `~/.envault/config.toml`
//!
//! # Example
//!
//! ```toml
//! bucket = "acme-envault"
//! passphrase_env = "ENVAULT_PASSPHRASE"
//! passphrase_command = ["op", "read", "op://vault/envault/password"]
//!
//! # Optional: base64-encoded service account JSON (see `envault encode`)
//! credentials = "eyJ0eXBlIjoi..."
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants;
use super::errors::ErrorKind;
use super::paths::{create_dir_private, write_private};

/// Errors from configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file does not exist.
    #[error("not configured: no config file at {path} (run 'envault init')")]
    NotConfigured { path: String },

    #[error("failed to read config: {0}")]
    ReadFailed(String),

    #[error("failed to parse config at {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid config: {0}")]
    InvalidValue(String),

    #[error("failed to write config: {0}")]
    WriteFailed(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::NotConfigured { .. } => ErrorKind::NotConfigured,
            _ => ErrorKind::InvalidConfig,
        }
    }
}

fn default_passphrase_env() -> Option<String> {
    Some(constants::DEFAULT_PASSPHRASE_ENV.to_string())
}

/// User configuration.
///
/// Unknown fields are rejected so typos surface at load time rather than
/// silently changing behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Object-store bucket name. Required.
    pub bucket: String,

    /// Environment variable consulted first for the passphrase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase_env: Option<String>,

    /// Argument vector of a command whose stdout is the passphrase.
    /// The first element is the executable; no shell is involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase_command: Option<Vec<String>>,

    /// Base64-encoded service account JSON for the object store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    /// Static OAuth bearer token for the object store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Argument vector of a command whose stdout is an OAuth bearer
    /// token (e.g. `["gcloud", "auth", "print-access-token"]`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_command: Option<Vec<String>>,

    /// Override for the cache base directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            passphrase_env: default_passphrase_env(),
            passphrase_command: None,
            credentials: None,
            access_token: None,
            access_token_command: None,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_config_path(path);

        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotConfigured {
                    path: path.display().to_string(),
                })
            }
            Err(e) => return Err(ConfigError::ReadFailed(e.to_string())),
        };

        let cfg: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::InvalidValue("bucket is required".into()));
        }

        if let Some(args) = &self.passphrase_command {
            if args.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "passphrase_command must name an executable; \
                     the shell-string form is not supported, use an argument \
                     vector like [\"pass\", \"show\", \"envault\"]"
                        .into(),
                ));
            }
        }

        if let Some(args) = &self.access_token_command {
            if args.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "access_token_command must name an executable".into(),
                ));
            }
        }

        if let Some(creds) = &self.credentials {
            validate_credentials(creds)?;
        }

        Ok(())
    }

    /// Save the configuration atomically (write temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            create_dir_private(dir).map_err(|e| ConfigError::WriteFailed(e.to_string()))?;
        }

        let data =
            toml::to_string_pretty(self).map_err(|e| ConfigError::WriteFailed(e.to_string()))?;

        let tmp = path.with_extension("toml.tmp");
        write_private(&tmp, data.as_bytes()).map_err(|e| ConfigError::WriteFailed(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ConfigError::WriteFailed(e.to_string())
        })?;

        Ok(())
    }

    /// Whether any non-interactive passphrase source is configured.
    pub fn has_passphrase_config(&self) -> bool {
        self.passphrase_env
            .as_deref()
            .is_some_and(|v| !v.is_empty())
            || self
                .passphrase_command
                .as_ref()
                .is_some_and(|v| !v.is_empty())
    }

    /// Cache base directory, falling back to `~/.envault/cache`.
    pub fn cache_base(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        constants::default_cache_dir().ok_or_else(|| {
            ConfigError::InvalidValue("cannot determine home directory; set cache_dir".into())
        })
    }
}

/// Resolve the effective config path from an optional override.
pub fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    if let Some(p) = path {
        return p.to_path_buf();
    }
    if let Some(p) = std::env::var_os(constants::CONFIG_ENV_VAR) {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    constants::default_config_path().unwrap_or_else(|| PathBuf::from(constants::CONFIG_FILE))
}

/// Whether a config file exists at the resolved path.
pub fn config_exists(path: Option<&Path>) -> bool {
    resolve_config_path(path).exists()
}

/// Structural check of base64-encoded service account JSON.
///
/// Catches the common failure of pasting raw JSON (not base64) or an
/// unrelated file before any network call is attempted.
fn validate_credentials(encoded: &str) -> Result<(), ConfigError> {
    use base64::Engine;

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ConfigError::InvalidValue(format!("credentials are not valid base64: {e}")))?;

    let json: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|e| ConfigError::InvalidValue(format!("credentials are not valid JSON: {e}")))?;

    match json.get("type").and_then(|t| t.as_str()) {
        Some("service_account" | "authorized_user" | "external_account") => Ok(()),
        Some(other) => Err(ConfigError::InvalidValue(format!(
            "unsupported credential type: {other}"
        ))),
        None => Err(ConfigError::InvalidValue(
            "credentials missing 'type' field".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_minimal_config() {
        let cfg: Config = toml::from_str(r#"bucket = "my-bucket""#).unwrap();
        assert_eq!(cfg.bucket, "my-bucket");
        assert_eq!(
            cfg.passphrase_env.as_deref(),
            Some(constants::DEFAULT_PASSPHRASE_ENV)
        );
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<Config, _> =
            toml::from_str("bucket = \"b\"\npassphrase_comand = [\"x\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_bucket() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue(msg)) if msg.contains("bucket")
        ));
    }

    #[test]
    fn rejects_shell_string_passphrase_command() {
        // The TOML type itself refuses a bare string for the argv field.
        let result: Result<Config, _> =
            toml::from_str("bucket = \"b\"\npassphrase_command = \"pass show envault\"\n");
        assert!(result.is_err());

        // And an empty vector is rejected at validation.
        let cfg: Config = toml::from_str("bucket = \"b\"\npassphrase_command = []\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("argument vector"));
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config {
            bucket: "bkt".into(),
            passphrase_command: Some(vec!["pass".into(), "show".into(), "envault".into()]),
            ..Config::default()
        };
        cfg.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config {
            bucket: "bkt".into(),
            ..Config::default()
        };
        cfg.save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn missing_config_maps_to_not_configured() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::NotConfigured { .. }));
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[test]
    fn credentials_must_be_base64_json() {
        use base64::Engine;

        let cfg = |creds: &str| Config {
            bucket: "b".into(),
            credentials: Some(creds.to_string()),
            ..Config::default()
        };

        assert!(cfg("{not base64}").validate().is_err());

        let raw = base64::engine::general_purpose::STANDARD.encode("not json");
        assert!(cfg(&raw).validate().is_err());

        let ok = base64::engine::general_purpose::STANDARD
            .encode(r#"{"type":"service_account","project_id":"p"}"#);
        cfg(&ok).validate().unwrap();

        let bad_type =
            base64::engine::general_purpose::STANDARD.encode(r#"{"type":"mystery"}"#);
        assert!(cfg(&bad_type).validate().is_err());
    }
}
