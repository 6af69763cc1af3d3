//! core::constants
//!
//! Tool-wide constants shared across modules.

use std::path::PathBuf;

/// File extension for age-encrypted files (includes the dot).
pub const CIPHER_EXT: &str = ".age";

/// Directory under the user's home for envault data.
pub const ENVAULT_DIR: &str = ".envault";

/// Config file name inside the envault directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Subdirectory of the envault directory holding per-project caches.
pub const CACHE_DIR: &str = "cache";

/// Project manifest listing tracked files, one relative path per line.
pub const MANIFEST_FILE: &str = ".envault";

/// Default environment variable consulted for the passphrase.
pub const DEFAULT_PASSPHRASE_ENV: &str = "ENVAULT_PASSPHRASE";

/// Environment variable overriding the config file path.
pub const CONFIG_ENV_VAR: &str = "ENVAULT_CONFIG";

/// scrypt work factor (log₂N) for new encryption envelopes.
///
/// Pinned so ciphertexts are reproducible across machines; envelopes
/// written at other work factors still decrypt.
pub const SCRYPT_LOG_N: u8 = 18;

/// Maximum size of a plaintext or encrypted file (2 MiB).
///
/// Enforced at every read path that handles remote or decrypted bytes,
/// bounding memory against corrupt or malicious input.
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// Maximum size of the remote HEAD object.
pub const MAX_HEAD_SIZE: u64 = 1024;

/// Number of characters in a short commit hash.
pub const SHORT_HASH_LEN: usize = 7;

/// Default number of log entries to show.
pub const DEFAULT_LOG_COUNT: usize = 10;

/// Commit author name used for all cache commits.
pub const TOOL_NAME: &str = "envault";

/// Commit author email used for all cache commits.
pub const TOOL_EMAIL: &str = "envault@local";

/// Well-known object name holding the remote head hash.
pub const HEAD_OBJECT: &str = "HEAD";

/// Overall timeout applied to one push or pull operation.
pub const OPERATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// Maximum time allowed for a configured passphrase command to finish.
pub const PASSPHRASE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Default envault directory (`~/.envault`).
///
/// Returns `None` when the home directory cannot be determined.
pub fn default_envault_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(ENVAULT_DIR))
}

/// Default config file path (`~/.envault/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    default_envault_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Default cache base directory (`~/.envault/cache`).
pub fn default_cache_dir() -> Option<PathBuf> {
    default_envault_dir().map(|dir| dir.join(CACHE_DIR))
}
