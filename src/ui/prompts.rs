//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts write to stderr and read from stdin, and are only usable
//! when stdin is a terminal. Non-interactive callers must pass
//! explicit flags (`--force`, `--yes-delete-permanently`, ...) instead.

use std::io::{BufRead, IsTerminal, Write};

use thiserror::Error;

use crate::core::errors::ErrorKind;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("prompt i/o error: {0}")]
    Io(String),
}

impl PromptError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Cancelled
    }
}

/// Whether stdin is attached to a terminal.
pub fn stdin_is_terminal() -> bool {
    std::io::stdin().is_terminal()
}

fn read_line() -> Result<String, PromptError> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| PromptError::Io(e.to_string()))?;
    Ok(line.trim().to_string())
}

fn prompt(message: &str) -> Result<(), PromptError> {
    let mut stderr = std::io::stderr().lock();
    write!(stderr, "{message}").map_err(|e| PromptError::Io(e.to_string()))?;
    stderr.flush().map_err(|e| PromptError::Io(e.to_string()))
}

/// Ask a yes/no question. Empty input picks `default`.
pub fn confirm(message: &str, default: bool) -> Result<bool, PromptError> {
    if !stdin_is_terminal() {
        return Err(PromptError::NotInteractive);
    }

    let hint = if default { "[Y/n]" } else { "[y/N]" };
    prompt(&format!("{message} {hint} "))?;

    let answer = read_line()?;
    Ok(match answer.to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}

/// Confirmation for destructive actions; requires typing `yes` in full.
pub fn confirm_danger(message: &str) -> Result<bool, PromptError> {
    if !stdin_is_terminal() {
        return Err(PromptError::NotInteractive);
    }

    prompt(&format!("{message}\nType 'yes' to continue: "))?;
    Ok(read_line()? == "yes")
}

/// Free-form input with an optional default.
pub fn input(message: &str, default: &str) -> Result<String, PromptError> {
    if !stdin_is_terminal() {
        return Err(PromptError::NotInteractive);
    }

    if default.is_empty() {
        prompt(&format!("{message}: "))?;
    } else {
        prompt(&format!("{message} [{default}]: "))?;
    }

    let answer = read_line()?;
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer
    })
}

/// Hidden passphrase input.
pub fn passphrase(message: &str) -> Result<String, PromptError> {
    if !stdin_is_terminal() {
        return Err(PromptError::NotInteractive);
    }

    let pass = rpassword::prompt_password(message).map_err(|e| PromptError::Io(e.to_string()))?;
    if pass.is_empty() {
        return Err(PromptError::Io("passphrase cannot be empty".to_string()));
    }
    Ok(pass)
}

/// Prompt for a new passphrase, entered twice.
pub fn new_passphrase() -> Result<String, PromptError> {
    let first = passphrase("Enter new passphrase: ")?;
    let second = passphrase("Confirm passphrase: ")?;
    if first != second {
        return Err(PromptError::Io("passphrases do not match".to_string()));
    }
    Ok(first)
}

/// Ask what to do with one conflicting file during a pull.
///
/// Returns the normalized choice: `'o'` (overwrite), `'s'` (skip), or
/// `'a'` (abort, the default).
pub fn conflict_choice(file: &str) -> Result<char, PromptError> {
    if !stdin_is_terminal() {
        return Err(PromptError::NotInteractive);
    }

    prompt(&format!(
        "{file} has local changes. (o)verwrite, (s)kip, (a)bort? [a] "
    ))?;

    let answer = read_line()?;
    Ok(match answer.to_lowercase().as_str() {
        "o" | "overwrite" => 'o',
        "s" | "skip" => 's',
        _ => 'a',
    })
}
