//! `envault encode`

use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};
use base64::Engine;

use crate::cli::Context;

/// Base64-encode a service account JSON file for the `credentials`
/// config field.
pub fn encode(ctx: &Context, file: &Path) -> Result<()> {
    let out = &ctx.out;

    let contents = std::fs::read(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    // Catch the wrong file before it lands in the config.
    let json: serde_json::Value =
        serde_json::from_slice(&contents).context("file is not valid JSON")?;
    if json.get("type").and_then(|t| t.as_str()).is_none() {
        anyhow::bail!("file does not look like a service account (missing 'type' field)");
    }

    let encoded = base64::engine::general_purpose::STANDARD.encode(&contents);
    println!("{encoded}");

    out.verbose("add this value as 'credentials' in your config file");
    Ok(())
}
