//! `envault rm`

use anyhow::Result;

use super::{project_context, run_op, runtime};
use crate::cli::Context;
use crate::core::types::TrackedPath;
use crate::project;
use crate::sync::{PushOptions, SyncError};
use crate::ui::prompts;

pub fn rm(ctx: &Context, file: &str) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(rm_async(ctx, file))
}

async fn rm_async(ctx: &Context, file: &str) -> Result<()> {
    let out = &ctx.out;
    let tracked = TrackedPath::new(file)?;
    let mut pc = project_context(ctx).await?;

    let manifest = pc.syncer.discovery().manifest_path();
    if !project::is_tracked(&manifest, file)? {
        out.println(format!("File not tracked: {file}"));
        return Ok(());
    }

    if ctx.interactive && prompts::stdin_is_terminal() {
        let ok = prompts::confirm(&format!("Remove {file} from tracking?"), false)?;
        if !ok {
            out.println("Aborted.");
            return Ok(());
        }
    }

    project::remove_from_manifest(&manifest, file)?;

    if let Err(e) = pc.syncer.cache().remove_encrypted(&tracked) {
        // The file may never have been pushed.
        out.verbose(format!("could not remove from cache: {e}"));
    }

    let opts = PushOptions {
        message: Some(format!("Remove {file}")),
        ..PushOptions::default()
    };
    match run_op(pc.syncer.push(opts)).await {
        Ok(_) | Err(SyncError::NothingToCommit) => {}
        Err(e) => out.warn(format!("failed to push removal to remote: {e}")),
    }

    out.println(format!("Removed {file} from tracking"));
    out.println("Local file was not deleted.");

    Ok(())
}
