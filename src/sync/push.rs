//! sync::push
//!
//! The push protocol.

use super::{describe_head, SyncError, Syncer};
use crate::core::types::PushResult;

/// Options for a push.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Commit message; generated from the plan when empty.
    pub message: Option<String>,
    /// Compute the plan without writing anything.
    pub dry_run: bool,
    /// Skip the optimistic remote-head check.
    pub force: bool,
}

impl Syncer {
    /// Encrypt changed tracked files into the cache, commit, and upload.
    ///
    /// Protocol:
    ///
    /// 1. Ensure the cache exists (local, rebuilt from remote, or empty)
    /// 2. Unless `--force`, snapshot the remote head `H0`
    /// 3. Classify each tracked path (added / updated / deleted /
    ///    unchanged) against the decrypted cache, encrypting changes
    ///    into the working tree
    /// 4. Nothing classified -> [`SyncError::NothingToCommit`]
    /// 5. Stage, then re-read the remote head; if it moved since `H0`,
    ///    fail with [`SyncError::RemoteChanged`] *before* committing, so
    ///    no orphan commit is created
    /// 6. Commit, then upload blobs and overwrite remote `HEAD`
    pub async fn push(&mut self, opts: PushOptions) -> Result<PushResult, SyncError> {
        self.ensure_cache_initialized().await?;

        let initial_remote_head = if opts.force {
            None
        } else {
            // Absent or unreadable remote means a fresh repository.
            self.cache.get_remote_head().await.ok()
        };

        let files = self.discovery().tracked_files()?;
        let mut result = PushResult::default();

        for file in &files {
            if !self.discovery().file_exists(file) {
                // Locally deleted: drop from the cache if present,
                // otherwise there is nothing to do.
                if self.cache.read_encrypted(file).is_ok() {
                    if !opts.dry_run {
                        self.cache.remove_encrypted(file)?;
                    }
                    result.files_deleted += 1;
                }
                continue;
            }

            let plain = self.discovery().read_file(file)?;

            match self.cache.read_encrypted(file) {
                Ok(existing) => {
                    let cached_plain = self.encrypter().decrypt(&existing)?;
                    if cached_plain == plain {
                        continue;
                    }
                    result.files_updated += 1;
                }
                Err(_) => result.files_added += 1,
            }

            if opts.dry_run {
                continue;
            }

            let encrypted = self.encrypter().encrypt(&plain)?;
            self.cache.write_encrypted(file, &encrypted)?;
        }

        if result.files_added == 0 && result.files_updated == 0 && result.files_deleted == 0 {
            return Err(SyncError::NothingToCommit);
        }

        if opts.dry_run {
            return Ok(result);
        }

        self.cache.stage_all()?;

        // Optimistic lock: verify the remote did not advance while we
        // staged. Checking before the commit keeps the cache free of
        // orphan commits when we lose the race.
        if !opts.force {
            if let Ok(current) = self.cache.get_remote_head().await {
                if initial_remote_head.as_deref() != Some(current.as_str()) {
                    return Err(SyncError::RemoteChanged {
                        expected: describe_head(initial_remote_head.as_deref()),
                        actual: describe_head(Some(&current)),
                    });
                }
            }
        }

        let message = match &opts.message {
            Some(m) if !m.is_empty() => m.clone(),
            _ => generate_commit_message(&result),
        };
        result.commit_hash = self.cache.commit(&message)?;

        self.cache.sync_to_storage().await?;

        Ok(result)
    }
}

/// Build the default commit message from the plan counts.
fn generate_commit_message(result: &PushResult) -> String {
    let mut parts = Vec::new();
    if result.files_added > 0 {
        parts.push(format!("{} added", result.files_added));
    }
    if result.files_updated > 0 {
        parts.push(format!("{} updated", result.files_updated));
    }
    if result.files_deleted > 0 {
        parts.push(format!("{} deleted", result.files_deleted));
    }

    if parts.is_empty() {
        "Update environment files".to_string()
    } else {
        format!("Update environment files: {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_message_includes_only_nonzero_counts() {
        let result = PushResult {
            files_added: 1,
            files_updated: 0,
            files_deleted: 2,
            ..PushResult::default()
        };
        assert_eq!(
            generate_commit_message(&result),
            "Update environment files: 1 added, 2 deleted"
        );

        let empty = PushResult::default();
        assert_eq!(generate_commit_message(&empty), "Update environment files");
    }
}
