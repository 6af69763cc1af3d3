//! `envault push`

use anyhow::Result;

use super::{project_context, run_op, runtime};
use crate::cli::Context;
use crate::core::types::short_hash;
use crate::sync::{PushOptions, SyncError};
use crate::ui::prompts;

pub fn push(
    ctx: &Context,
    message: Option<String>,
    dry_run: bool,
    force: bool,
    allow_missing: bool,
) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(push_async(ctx, message, dry_run, force, allow_missing))
}

async fn push_async(
    ctx: &Context,
    message: Option<String>,
    dry_run: bool,
    force: bool,
    allow_missing: bool,
) -> Result<()> {
    let out = &ctx.out;
    let mut pc = project_context(ctx).await?;

    // Missing tracked files turn into deletions; make sure that is what
    // the user wants.
    let files = pc.syncer.discovery().tracked_files()?;
    let missing: Vec<String> = files
        .iter()
        .filter(|f| !pc.syncer.discovery().file_exists(f))
        .map(|f| f.to_string())
        .collect();

    if !missing.is_empty() {
        out.warn("missing tracked files:");
        for f in &missing {
            out.println(format!("  {f}"));
        }

        let existing = files.len() - missing.len();
        if existing == 0 {
            // Still legal: every file deleted. Require explicit intent.
            if !force && !allow_missing && !dry_run {
                anyhow::bail!(
                    "all tracked files are missing; use --force to push the deletions"
                );
            }
        } else if !dry_run && !force && !allow_missing {
            if ctx.interactive && prompts::stdin_is_terminal() {
                let ok = prompts::confirm(
                    &format!("Push {existing} of {} files anyway?", files.len()),
                    false,
                )?;
                if !ok {
                    out.println("Aborted.");
                    return Ok(());
                }
            } else {
                anyhow::bail!(
                    "push requires confirmation; use --allow-missing in non-interactive mode"
                );
            }
        }
    }

    if dry_run {
        out.dry_run_header();
    }

    let opts = PushOptions {
        message,
        dry_run,
        force,
    };

    let result = match run_op(pc.syncer.push(opts)).await {
        Err(SyncError::NothingToCommit) => {
            out.println("Nothing to push - all files are up to date");
            return Ok(());
        }
        other => other?,
    };

    if out.is_json() {
        out.json(&result)?;
        return Ok(());
    }

    out.println(if dry_run { "Would push:" } else { "Pushed:" });
    if result.files_added > 0 {
        out.println(format!("  {} file(s) added", result.files_added));
    }
    if result.files_updated > 0 {
        out.println(format!("  {} file(s) updated", result.files_updated));
    }
    if result.files_deleted > 0 {
        out.println(format!("  {} file(s) deleted", result.files_deleted));
    }

    if !dry_run && !result.commit_hash.is_empty() {
        out.blank();
        out.println(format!("Commit: {}", short_hash(&result.commit_hash)));
    }

    Ok(())
}
