//! `envault status`

use anyhow::Result;
use serde::Serialize;

use super::{project_context, runtime};
use crate::cli::Context;
use crate::core::types::{short_hash, FileStatus, SyncStatus};

#[derive(Serialize)]
struct StatusReport<'a> {
    repository: String,
    bucket: &'a str,
    remote_exists: bool,
    sync: SyncStatus,
    files: Vec<FileStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_error: Option<String>,
}

pub fn status(ctx: &Context) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(status_async(ctx))
}

async fn status_async(ctx: &Context) -> Result<()> {
    let out = &ctx.out;
    let pc = project_context(ctx).await?;
    let cache = pc.syncer.cache();

    if out.is_json() {
        let mut remote_error = None;
        let remote_exists = match cache.exists_remote().await {
            Ok(exists) => exists,
            Err(e) => {
                remote_error = Some(e.to_string());
                false
            }
        };

        let report = StatusReport {
            repository: cache.repo_id().to_string(),
            bucket: &pc.config.bucket,
            remote_exists,
            sync: pc.syncer.status().await?,
            files: pc.syncer.file_statuses()?,
            remote_error,
        };
        out.json(&report)?;
        return Ok(());
    }

    out.println(format!("Repository: {}", cache.repo_id()));
    out.println(format!("Bucket: {}", pc.config.bucket));
    out.blank();

    match cache.exists_remote().await {
        Ok(true) => {
            out.println("Remote: initialized");
            let sync = pc.syncer.status().await?;
            if !sync.remote_head.is_empty() {
                out.println(format!("Remote HEAD: {}", short_hash(&sync.remote_head)));
            }
            if !sync.local_head.is_empty() {
                out.println(format!("Local HEAD:  {}", short_hash(&sync.local_head)));
            }
            out.println(if sync.in_sync {
                "In sync with remote"
            } else {
                "Out of sync with remote"
            });
        }
        Ok(false) => {
            out.println("Remote: not initialized (run 'envault push' to initialize)")
        }
        Err(e) => out.warn(format!("could not check remote status: {e}")),
    }

    out.blank();
    out.println("Tracked files:");

    let statuses = pc.syncer.file_statuses()?;
    if statuses.is_empty() {
        out.println("  (no files tracked)");
        return Ok(());
    }

    let (mut added, mut modified, mut deleted, mut unchanged) = (0, 0, 0, 0);
    for s in &statuses {
        let marker = match (s.local_exists, s.cache_exists, s.modified) {
            (true, false, _) => {
                added += 1;
                "+ (not pushed)"
            }
            (false, true, _) => {
                deleted += 1;
                "- (deleted locally)"
            }
            (_, _, true) => {
                modified += 1;
                "M (modified)"
            }
            _ => {
                unchanged += 1;
                "  (up to date)"
            }
        };
        out.println(format!("  {} {}", marker, s.path));
    }

    out.blank();
    out.println(format!(
        "Summary: {added} added, {modified} modified, {deleted} deleted, {unchanged} unchanged"
    ));

    Ok(())
}
