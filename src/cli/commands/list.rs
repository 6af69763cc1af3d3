//! `envault list`

use anyhow::Result;
use serde::Serialize;

use super::{build_store, repos_from_keys, runtime};
use crate::cli::Context;
use crate::core::config::Config;
use crate::core::constants::HEAD_OBJECT;
use crate::ui::output::format_size;

#[derive(Serialize)]
struct RepoEntry {
    repository: String,
    file_count: usize,
    total_size: u64,
    last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn list(ctx: &Context) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(list_async(ctx))
}

async fn list_async(ctx: &Context) -> Result<()> {
    let out = &ctx.out;
    let config = Config::load(ctx.config_path.as_deref())?;
    let store = build_store(&config).await?;

    let objects = store.list_with_metadata("").await?;
    let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
    let repos = repos_from_keys(keys.iter().copied());

    let mut entries = Vec::with_capacity(repos.len());
    for repo in repos {
        let prefix = format!("{repo}/");
        let head_key = format!("{prefix}{HEAD_OBJECT}");

        let mut file_count = 0;
        let mut total_size = 0;
        let mut last_updated = None;
        for obj in objects.iter().filter(|o| o.key.starts_with(&prefix)) {
            if obj.key != head_key {
                file_count += 1;
                total_size += obj.size;
            }
            if last_updated < obj.updated {
                last_updated = obj.updated;
            }
        }

        entries.push(RepoEntry {
            repository: repo,
            file_count,
            total_size,
            last_updated,
        });
    }

    if out.is_json() {
        out.json(&entries)?;
        return Ok(());
    }

    if entries.is_empty() {
        out.println("No repositories found");
        return Ok(());
    }

    for entry in &entries {
        let updated = entry
            .last_updated
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.println(format!(
            "{}  {} file(s), {}, updated {}",
            entry.repository,
            entry.file_count,
            format_size(entry.total_size),
            updated
        ));
    }

    Ok(())
}
