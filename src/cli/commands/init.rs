//! `envault init`
//!
//! Interactive configuration setup.

use anyhow::Result;
use base64::Engine;

use crate::cli::Context;
use crate::core::config::{config_exists, resolve_config_path, Config};
use crate::core::constants::DEFAULT_PASSPHRASE_ENV;
use crate::ui::prompts;

pub fn init(ctx: &Context) -> Result<()> {
    let out = &ctx.out;

    if !ctx.interactive || !prompts::stdin_is_terminal() {
        anyhow::bail!("init requires interactive mode");
    }

    let config_path = resolve_config_path(ctx.config_path.as_deref());

    if config_exists(ctx.config_path.as_deref()) {
        let ok = prompts::confirm("Configuration already exists. Overwrite?", false)?;
        if !ok {
            out.println("Aborted.");
            return Ok(());
        }
    }

    out.println("Setting up envault configuration...");
    out.blank();

    let bucket = prompts::input("Bucket name", "")?;
    if bucket.is_empty() {
        anyhow::bail!("bucket name is required");
    }

    let mut config = Config {
        bucket,
        ..Config::default()
    };

    out.blank();
    out.println("How would you like to provide the passphrase?");
    out.println("  1. Environment variable");
    out.println("  2. Command (e.g., 1Password CLI)");
    out.println("  3. Enter manually each time");

    match prompts::input("Selection", "1")?.as_str() {
        "1" => {
            let var = prompts::input("Environment variable name", DEFAULT_PASSPHRASE_ENV)?;
            config.passphrase_env = Some(var);
        }
        "2" => {
            out.println("Enter command and arguments (space-separated, e.g., 'pass show envault').");
            out.println("Use quotes for arguments with spaces (e.g., 'op read \"my secret\"').");
            let raw = prompts::input("Command", "")?;
            if raw.is_empty() {
                anyhow::bail!("command is required");
            }
            let args = parse_shell_args(&raw)?;
            config.passphrase_env = None;
            config.passphrase_command = Some(args);
        }
        "3" => {
            config.passphrase_env = None;
            out.println("Passphrase will be requested when needed.");
        }
        other => anyhow::bail!("invalid selection: {other}"),
    }

    out.blank();
    out.println("Storage authentication:");
    out.println("  1. Token command (e.g., gcloud auth print-access-token)");
    out.println("  2. Service account JSON file");
    out.println("  3. None (public bucket)");

    match prompts::input("Selection", "1")?.as_str() {
        "1" => {
            let raw = prompts::input("Token command", "gcloud auth print-access-token")?;
            config.access_token_command = Some(parse_shell_args(&raw)?);
        }
        "2" => {
            let path = prompts::input("Path to service account JSON", "")?;
            if !path.is_empty() {
                let contents = std::fs::read(&path)
                    .map_err(|e| anyhow::anyhow!("failed to read {path}: {e}"))?;
                config.credentials = Some(
                    base64::engine::general_purpose::STANDARD.encode(&contents),
                );
            }
        }
        "3" => {}
        other => anyhow::bail!("invalid selection: {other}"),
    }

    config.validate()?;
    config.save(&config_path)?;

    out.blank();
    out.success(format!("Configuration saved to {}", config_path.display()));
    out.blank();
    out.println("Next steps:");
    out.println("  1. Create a .envault file in your project listing files to track");
    out.println("  2. Run 'envault doctor' to verify your setup");
    out.println("  3. Run 'envault push' to encrypt and upload your files");

    Ok(())
}

/// Split a command string into arguments, respecting single and double
/// quotes and backslash escapes.
fn parse_shell_args(s: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }

        match c {
            '\\' if quote != Some('\'') => escaped = true,
            '"' | '\'' => match quote {
                None => quote = Some(c),
                Some(q) if q == c => quote = None,
                Some(_) => current.push(c),
            },
            ' ' | '\t' if quote.is_none() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if quote.is_some() {
        anyhow::bail!("unclosed quote");
    }
    if !current.is_empty() {
        args.push(current);
    }
    if args.is_empty() {
        anyhow::bail!("no command specified");
    }

    Ok(args)
}
