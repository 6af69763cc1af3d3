//! `envault log`

use anyhow::Result;

use super::{project_context, runtime};
use crate::cli::Context;

pub fn log(ctx: &Context, count: usize) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(log_async(ctx, count))
}

async fn log_async(ctx: &Context, count: usize) -> Result<()> {
    let out = &ctx.out;
    let mut pc = project_context(ctx).await?;

    // Show remote history when there is one; a never-pushed project
    // still gets its local cache log.
    if pc.syncer.cache().exists_remote().await? {
        pc.syncer.cache_mut().sync_from_storage().await?;
    }

    let commits = pc.syncer.cache().log(count)?;

    if out.is_json() {
        out.json(&commits)?;
        return Ok(());
    }

    if commits.is_empty() {
        out.println("No history yet");
        return Ok(());
    }

    for commit in &commits {
        out.println(format!(
            "{}  {}  {}",
            commit.short_hash,
            commit.date.format("%Y-%m-%d %H:%M"),
            commit.message
        ));
        if !commit.files.is_empty() {
            out.verbose(format!("    files: {}", commit.files.join(", ")));
        }
    }

    Ok(())
}
