//! `envault delete`

use anyhow::Result;

use super::{build_store, runtime};
use crate::cli::Context;
use crate::core::config::Config;
use crate::core::types::RepoId;
use crate::sync::SyncError;
use crate::ui::prompts;

pub fn delete(ctx: &Context, repo: &str, yes_delete_permanently: bool, dry_run: bool) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(delete_async(ctx, repo, yes_delete_permanently, dry_run))
}

async fn delete_async(
    ctx: &Context,
    repo: &str,
    yes_delete_permanently: bool,
    dry_run: bool,
) -> Result<()> {
    let out = &ctx.out;
    let repo_id = RepoId::parse(repo)?;

    let config = Config::load(ctx.config_path.as_deref())?;
    let store = build_store(&config).await?;

    let prefix = repo_id.remote_prefix();
    let objects = store.list(&prefix).await?;
    if objects.is_empty() {
        return Err(SyncError::RepoNotFound.into());
    }

    if dry_run {
        out.dry_run_header();
        out.println(format!("Would delete {repo_id} ({} files)", objects.len()));
        return Ok(());
    }

    if ctx.interactive && prompts::stdin_is_terminal() {
        let ok = prompts::confirm_danger(&format!(
            "This will permanently delete {repo_id} and all its history ({} files).",
            objects.len()
        ))?;
        if !ok {
            out.println("Aborted.");
            return Ok(());
        }
    } else if !yes_delete_permanently {
        anyhow::bail!(
            "delete requires confirmation; use --yes-delete-permanently in non-interactive mode"
        );
    }

    for key in &objects {
        store.delete(key).await?;
    }

    out.println(format!("Deleted {repo_id} ({} files)", objects.len()));
    Ok(())
}
