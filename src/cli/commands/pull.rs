//! `envault pull`

use anyhow::Result;

use super::{project_context, run_op, runtime};
use crate::cli::Context;
use crate::core::types::{short_hash, TrackedPath};
use crate::sync::{ConflictAction, PullOptions};
use crate::ui::prompts;

pub fn pull(
    ctx: &Context,
    reference: Option<String>,
    force: bool,
    dry_run: bool,
    skip_conflicts: bool,
) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(pull_async(ctx, reference, force, dry_run, skip_conflicts))
}

async fn pull_async(
    ctx: &Context,
    reference: Option<String>,
    force: bool,
    dry_run: bool,
    skip_conflicts: bool,
) -> Result<()> {
    let out = &ctx.out;
    let mut pc = project_context(ctx).await?;

    let skip_all = |_: &TrackedPath| ConflictAction::Skip;
    let ask = |path: &TrackedPath| match prompts::conflict_choice(path.as_str()) {
        Ok('o') => ConflictAction::Overwrite,
        Ok('s') => ConflictAction::Skip,
        _ => ConflictAction::Abort,
    };

    let opts = PullOptions {
        reference,
        force,
        dry_run,
        resolver: if skip_conflicts {
            Some(&skip_all)
        } else if !force && ctx.interactive && prompts::stdin_is_terminal() {
            Some(&ask)
        } else {
            None
        },
    };

    if dry_run {
        out.dry_run_header();
    }

    let result = run_op(pc.syncer.pull(opts)).await?;

    if out.is_json() {
        out.json(&result)?;
        return Ok(());
    }

    out.println(if dry_run { "Would pull:" } else { "Pulled:" });
    if result.files_created > 0 {
        out.println(format!("  {} file(s) created", result.files_created));
    }
    if result.files_updated > 0 {
        out.println(format!("  {} file(s) updated", result.files_updated));
    }
    if result.files_skipped > 0 {
        out.println(format!("  {} file(s) unchanged", result.files_skipped));
    }
    if result.files_skipped_conflict > 0 {
        out.println(format!(
            "  {} file(s) skipped (conflicts)",
            result.files_skipped_conflict
        ));
    }

    if !result.ref_name.is_empty() {
        out.blank();
        out.println(format!("At ref: {}", short_hash(&result.ref_name)));
    }

    Ok(())
}
