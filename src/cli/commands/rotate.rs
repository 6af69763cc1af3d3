//! `envault rotate-passphrase`

use std::sync::Arc;

use anyhow::Result;

use super::{build_store, repos_from_keys, runtime};
use crate::cache::Cache;
use crate::cli::Context;
use crate::core::config::Config;
use crate::core::constants::CIPHER_EXT;
use crate::core::lock::CacheLock;
use crate::core::types::{RepoId, TrackedPath};
use crate::crypto::{AgeEncrypter, Encrypter, PassphraseResolver};
use crate::store::ObjectStore;
use crate::ui::prompts;

pub fn rotate(ctx: &Context) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(rotate_async(ctx))
}

async fn rotate_async(ctx: &Context) -> Result<()> {
    let out = &ctx.out;

    if !ctx.interactive || !prompts::stdin_is_terminal() {
        anyhow::bail!("rotate-passphrase requires interactive mode");
    }

    let config = Config::load(ctx.config_path.as_deref())?;
    let store = build_store(&config).await?;

    out.println("First, verify your current passphrase...");
    let resolver = PassphraseResolver::new(&config, true);
    let current = AgeEncrypter::new(resolver.resolve().await?);

    out.blank();
    out.println("Now, enter a new passphrase...");
    let new = AgeEncrypter::new(prompts::new_passphrase()?);

    let objects = store.list("").await?;

    // Prove the current passphrase opens the existing data before
    // touching anything.
    if let Some(sample) = objects.iter().find(|k| k.ends_with(CIPHER_EXT)) {
        let blob = store.download(sample).await?;
        current.verify(&blob).map_err(|e| {
            anyhow::Error::new(e).context("current passphrase cannot decrypt existing files")
        })?;
    }

    let repos = repos_from_keys(objects.iter().map(String::as_str));
    if repos.is_empty() {
        out.println("No repositories found");
        return Ok(());
    }

    let ok = prompts::confirm_danger(&format!(
        "This will re-encrypt {} repositories with the new passphrase.",
        repos.len()
    ))?;
    if !ok {
        out.println("Aborted.");
        return Ok(());
    }

    for repo in &repos {
        out.println(format!("Processing {repo}..."));
        let repo_id = match RepoId::parse(repo) {
            Ok(id) => id,
            Err(e) => {
                out.warn(format!("skipping invalid repo path {repo}: {e}"));
                continue;
            }
        };

        match rotate_repo(&config, store.clone(), repo_id, &current, &new).await {
            Ok(()) => out.println(format!("  Rotated {repo}")),
            Err(e) => out.error(format!("failed to rotate {repo}: {e}")),
        }
    }

    out.blank();
    out.success("Passphrase rotation complete!");
    out.blank();
    out.println("IMPORTANT: update your passphrase configuration to use the new passphrase.");

    Ok(())
}

async fn rotate_repo(
    config: &Config,
    store: Arc<dyn ObjectStore>,
    repo_id: RepoId,
    current: &dyn Encrypter,
    new: &dyn Encrypter,
) -> Result<()> {
    let mut cache = Cache::new(&config.cache_base()?, repo_id, store)?;
    let _lock = CacheLock::acquire(cache.path())?;

    cache.sync_from_storage().await?;

    for file in cache.list_tracked_files()? {
        let path = TrackedPath::new(file)?;
        let encrypted = cache.read_encrypted(&path)?;
        let plain = current.decrypt(&encrypted)?;
        let reencrypted = new.encrypt(&plain)?;
        cache.write_encrypted(&path, &reencrypted)?;
    }

    cache.stage_all()?;
    cache.commit("Rotate passphrase")?;
    cache.sync_to_storage().await?;

    Ok(())
}
