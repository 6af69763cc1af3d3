//! `envault revert`

use anyhow::Result;

use super::{project_context, run_op, runtime};
use crate::cli::Context;
use crate::sync::PullOptions;
use crate::ui::prompts;

pub fn revert(ctx: &Context, reference: &str) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(revert_async(ctx, reference))
}

async fn revert_async(ctx: &Context, reference: &str) -> Result<()> {
    let out = &ctx.out;
    let mut pc = project_context(ctx).await?;

    if ctx.interactive && prompts::stdin_is_terminal() {
        let ok = prompts::confirm(&format!("Restore files from {reference}?"), false)?;
        if !ok {
            out.println("Aborted.");
            return Ok(());
        }
    }

    let opts = PullOptions {
        reference: Some(reference.to_string()),
        // Restoring an old version overwrites by definition.
        force: true,
        ..PullOptions::default()
    };
    let result = run_op(pc.syncer.pull(opts)).await?;

    // Re-attach the cache to its branch tip so the follow-up push sees
    // the restored files as changes and records the reversion as a new
    // commit on the linear history.
    if let Ok(branch) = pc.syncer.cache().default_branch() {
        pc.syncer.cache().checkout_branch(&branch)?;
    }

    if out.is_json() {
        out.json(&result)?;
        return Ok(());
    }

    out.println(format!("Reverted to {reference}"));
    if result.files_created > 0 {
        out.println(format!("  {} file(s) created", result.files_created));
    }
    if result.files_updated > 0 {
        out.println(format!("  {} file(s) updated", result.files_updated));
    }

    out.blank();
    out.println("Review the changes, then run 'envault push' to save.");

    Ok(())
}
