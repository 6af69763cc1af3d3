//! crypto::passphrase
//!
//! Passphrase resolution.
//!
//! # Resolution order
//!
//! 1. The environment variable named by the config, if set and non-empty
//! 2. The configured command (explicit argument vector, no shell),
//!    stdout trimmed, 30 second timeout
//! 3. An interactive prompt when stdin is a terminal
//!
//! The resolved passphrase is memoized for the lifetime of one
//! operation so a push never prompts twice.

use std::process::Stdio;
use std::sync::Mutex;

use tokio::process::Command;

use super::CryptoError;
use crate::core::config::Config;
use crate::core::constants::PASSPHRASE_TIMEOUT;
use crate::ui::prompts;

/// Resolves the passphrase from the configured sources.
pub struct PassphraseResolver {
    env_var: Option<String>,
    command: Option<Vec<String>>,
    interactive: bool,
    cached: Mutex<Option<String>>,
}

impl PassphraseResolver {
    /// Build a resolver from the loaded config.
    ///
    /// `interactive` gates the prompt fallback; pass `false` in CI.
    pub fn new(config: &Config, interactive: bool) -> Self {
        Self {
            env_var: config.passphrase_env.clone(),
            command: config.passphrase_command.clone(),
            interactive,
            cached: Mutex::new(None),
        }
    }

    /// Resolve the passphrase, first source wins.
    pub async fn resolve(&self) -> Result<String, CryptoError> {
        if let Some(cached) = self.cached.lock().expect("passphrase cache poisoned").clone() {
            return Ok(cached);
        }

        let pass = self.resolve_uncached().await?;
        *self.cached.lock().expect("passphrase cache poisoned") = Some(pass.clone());
        Ok(pass)
    }

    async fn resolve_uncached(&self) -> Result<String, CryptoError> {
        if let Some(var) = self.env_var.as_deref().filter(|v| !v.is_empty()) {
            if let Ok(pass) = std::env::var(var) {
                if !pass.is_empty() {
                    return Ok(pass);
                }
            }
        }

        if let Some(args) = self.command.as_deref().filter(|a| !a.is_empty()) {
            return run_passphrase_command(args).await;
        }

        if self.interactive && prompts::stdin_is_terminal() {
            return prompts::passphrase("Enter passphrase: ")
                .map_err(|e| CryptoError::Passphrase(e.to_string()));
        }

        Err(CryptoError::Passphrase(
            "no passphrase source available (set passphrase_env or passphrase_command, \
             or run interactively)"
                .into(),
        ))
    }
}

impl std::fmt::Debug for PassphraseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassphraseResolver")
            .field("env_var", &self.env_var)
            .field("command", &self.command.as_ref().map(|a| a.first()))
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

/// Run the configured passphrase command and return its trimmed stdout.
async fn run_passphrase_command(args: &[String]) -> Result<String, CryptoError> {
    let mut cmd = Command::new(&args[0]);
    cmd.args(&args[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(PASSPHRASE_TIMEOUT, async {
        cmd.spawn()
            .map_err(|e| CryptoError::Passphrase(format!("failed to run {}: {e}", args[0])))?
            .wait_with_output()
            .await
            .map_err(|e| CryptoError::Passphrase(format!("passphrase command failed: {e}")))
    })
    .await
    .map_err(|_| {
        CryptoError::Passphrase(format!(
            "passphrase command timed out after {}s",
            PASSPHRASE_TIMEOUT.as_secs()
        ))
    })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        return Err(CryptoError::Passphrase(if stderr.is_empty() {
            format!("passphrase command exited with {}", output.status)
        } else {
            format!("passphrase command failed: {stderr}")
        }));
    }

    let pass = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    if pass.is_empty() {
        return Err(CryptoError::Passphrase(
            "passphrase command returned empty output".into(),
        ));
    }

    Ok(pass)
}
