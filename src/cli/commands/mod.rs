//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each handler validates its arguments, builds the component stack it
//! needs, calls the sync engine, and formats the result. Handlers do
//! not mutate the cache directly.
//!
//! # Async
//!
//! The engine is async because storage is. Handlers are synchronous
//! entry points that create a runtime and `block_on` their async body,
//! so `main` stays a plain function.

mod completion;
mod delete;
mod diff;
mod doctor;
mod encode;
mod init;
mod list;
mod log_cmd;
mod pull;
mod push;
mod revert;
mod rm;
mod rotate;
mod status;
mod verify;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};

use super::args::Command;
use super::Context;
use crate::cache::Cache;
use crate::core::config::Config;
use crate::core::constants::OPERATION_TIMEOUT;
use crate::core::lock::CacheLock;
use crate::core::types::RepoId;
use crate::crypto::{AgeEncrypter, PassphraseResolver};
use crate::project::Discovery;
use crate::store::{GcsStore, ObjectStore, RetryingStore};
use crate::sync::{SyncError, Syncer};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init => init::init(ctx),
        Command::Push {
            message,
            dry_run,
            force,
            allow_missing,
        } => push::push(ctx, message, dry_run, force, allow_missing),
        Command::Pull {
            r#ref,
            force,
            dry_run,
            skip_conflicts,
        } => pull::pull(ctx, r#ref, force, dry_run, skip_conflicts),
        Command::Status => status::status(ctx),
        Command::Log { count } => log_cmd::log(ctx, count),
        Command::List => list::list(ctx),
        Command::Diff { refs } => diff::diff(ctx, refs),
        Command::Verify => verify::verify(ctx),
        Command::Rm { file } => rm::rm(ctx, &file),
        Command::Revert { r#ref } => revert::revert(ctx, &r#ref),
        Command::Delete {
            repo,
            yes_delete_permanently,
            dry_run,
        } => delete::delete(ctx, &repo, yes_delete_permanently, dry_run),
        Command::RotatePassphrase => rotate::rotate(ctx),
        Command::Doctor { fix } => doctor::doctor(ctx, fix),
        Command::Encode { file } => encode::encode(ctx, &file),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Create the per-command runtime.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to create async runtime")
}

/// Run an engine operation under the overall deadline, aborting on
/// Ctrl-C.
pub(crate) async fn run_op<T>(
    fut: impl Future<Output = Result<T, SyncError>>,
) -> Result<T, SyncError> {
    tokio::select! {
        result = fut => result,
        _ = tokio::signal::ctrl_c() => Err(SyncError::UserCancelled),
        _ = tokio::time::sleep(OPERATION_TIMEOUT) => Err(SyncError::Timeout),
    }
}

/// Everything a project-scoped command needs.
pub(crate) struct ProjectContext {
    pub config: Config,
    pub syncer: Syncer,
    /// Held for the duration of the operation; released on drop.
    _lock: CacheLock,
}

/// Build the full component stack for a project-scoped command:
/// config, discovery (or `--repo` override), object store with retry,
/// resolved passphrase, cache, and the cache lock.
pub(crate) async fn project_context(ctx: &Context) -> Result<ProjectContext> {
    let config = Config::load(ctx.config_path.as_deref())?;

    let discovery = match &ctx.repo_override {
        Some(value) => {
            let repo_id = RepoId::parse(value)?;
            let root = match Discovery::discover(None) {
                Ok(d) => d.root().to_path_buf(),
                Err(e) => {
                    ctx.out.verbose(format!("project discovery unavailable: {e}"));
                    std::env::current_dir().context("cannot determine working directory")?
                }
            };
            Discovery::with_identity(root, repo_id)
        }
        None => Discovery::discover(None)?,
    };

    let store = build_store(&config).await?;

    let resolver = PassphraseResolver::new(&config, ctx.interactive);
    let passphrase = resolver.resolve().await?;
    let encrypter = Box::new(AgeEncrypter::new(passphrase));

    let repo_id = discovery.repo_id().clone();
    let cache = Cache::new(&config.cache_base()?, repo_id, store)?;
    let lock = CacheLock::acquire(cache.path())?;

    Ok(ProjectContext {
        config,
        syncer: Syncer::new(discovery, encrypter, cache),
        _lock: lock,
    })
}

/// Build the retrying object store from config.
pub(crate) async fn build_store(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    let token = resolve_access_token(config).await?;
    let gcs = match token {
        Some(token) => GcsStore::with_token(&config.bucket, token),
        None => GcsStore::new(&config.bucket),
    };
    Ok(Arc::new(RetryingStore::new(gcs)))
}

/// Resolve the OAuth bearer token: static config value first, then the
/// configured token command.
async fn resolve_access_token(config: &Config) -> Result<Option<String>> {
    if let Some(token) = config.access_token.as_deref() {
        if !token.is_empty() {
            return Ok(Some(token.to_string()));
        }
    }

    if let Some(args) = config.access_token_command.as_deref() {
        if !args.is_empty() {
            let token = command_stdout(args)
                .await
                .context("access_token_command failed")?;
            return Ok(Some(token));
        }
    }

    Ok(None)
}

/// Run a configured command (explicit argv, no shell) and return its
/// trimmed stdout.
pub(crate) async fn command_stdout(args: &[String]) -> Result<String> {
    use std::process::Stdio;

    let output = tokio::time::timeout(
        crate::core::constants::PASSPHRASE_TIMEOUT,
        tokio::process::Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .context("command timed out")?
    .with_context(|| format!("failed to run {}", args[0]))?;

    if !output.status.success() {
        anyhow::bail!(
            "{} exited with {}: {}",
            args[0],
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    if stdout.is_empty() {
        anyhow::bail!("{} produced no output", args[0]);
    }
    Ok(stdout)
}

/// Group object keys into `owner/name` repositories.
pub(crate) fn repos_from_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut repos: Vec<String> = Vec::new();
    for key in keys {
        let mut parts = key.splitn(3, '/');
        if let (Some(owner), Some(name), Some(_)) = (parts.next(), parts.next(), parts.next()) {
            let repo = format!("{owner}/{name}");
            if !repos.contains(&repo) {
                repos.push(repo);
            }
        }
    }
    repos.sort();
    repos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repos_from_keys_dedupes_and_sorts() {
        let keys = [
            "acme/api/.env.age",
            "acme/api/HEAD",
            "acme/web/.env.age",
            "beta/svc/config/.env.age",
            "stray",
        ];
        assert_eq!(
            repos_from_keys(keys.iter().copied()),
            vec!["acme/api", "acme/web", "beta/svc"]
        );
    }
}
