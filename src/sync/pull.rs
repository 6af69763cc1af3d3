//! sync::pull
//!
//! The pull protocol.

use super::{ConflictAction, ConflictResolver, SyncError, Syncer};
use crate::core::types::{PullResult, TrackedPath};

/// Options for a pull.
#[derive(Default)]
pub struct PullOptions<'a> {
    /// Pin to a specific commit (hash or prefix); latest when empty.
    pub reference: Option<String>,
    /// Overwrite conflicting local files without asking.
    pub force: bool,
    /// Compute the plan without writing anything.
    pub dry_run: bool,
    /// Per-file conflict decision; aborting is the headless default.
    pub resolver: Option<ConflictResolver<'a>>,
}

impl std::fmt::Debug for PullOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullOptions")
            .field("reference", &self.reference)
            .field("force", &self.force)
            .field("dry_run", &self.dry_run)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

struct FileToWrite {
    file: TrackedPath,
    decrypted: Vec<u8>,
    is_new: bool,
}

impl Syncer {
    /// Download the remote cache and restore tracked plaintext files.
    ///
    /// Protocol:
    ///
    /// 1. Missing remote -> [`SyncError::RepoNotFound`]
    /// 2. Sync the cache working tree from storage; check out the
    ///    pinned ref if one was given
    /// 3. Classify each tracked path (new / unchanged / conflict)
    ///    against the decrypted cache
    /// 4. Run the conflict protocol: no resolver aborts with
    ///    [`SyncError::Conflict`]; a resolver decides per file
    /// 5. Write the surviving files (0600)
    ///
    /// A successful pull is idempotent: running it again classifies
    /// every file as unchanged.
    pub async fn pull(&mut self, opts: PullOptions<'_>) -> Result<PullResult, SyncError> {
        if !self.cache.exists_remote().await? {
            return Err(SyncError::RepoNotFound);
        }

        self.cache.sync_from_storage().await?;

        let mut result = PullResult::default();
        result.ref_name = match &opts.reference {
            Some(reference) if !reference.is_empty() => {
                self.cache.checkout(reference)?;
                reference.clone()
            }
            _ => self.cache.head()?,
        };

        // First pass: decide what would change.
        let mut to_write: Vec<FileToWrite> = Vec::new();
        for file in self.discovery().tracked_files()? {
            let encrypted = match self.cache.read_encrypted(&file) {
                Ok(blob) => blob,
                // Not in the cache: nothing to pull for this path.
                Err(_) => continue,
            };

            let decrypted = self.encrypter().decrypt(&encrypted)?;

            let local = self.discovery().read_file(&file).ok();
            match local {
                Some(existing) if existing == decrypted => {
                    result.files_skipped += 1;
                }
                Some(_) => {
                    result.files_with_conflicts.push(file.to_string());
                    to_write.push(FileToWrite {
                        file,
                        decrypted,
                        is_new: false,
                    });
                }
                None => to_write.push(FileToWrite {
                    file,
                    decrypted,
                    is_new: true,
                }),
            }
        }

        // Conflict protocol.
        if !result.files_with_conflicts.is_empty() && !opts.force && !opts.dry_run {
            let resolver = match opts.resolver {
                Some(r) => r,
                None => return Err(SyncError::Conflict(result.files_with_conflicts)),
            };

            // The conflicting entries are exactly the non-new writes.
            let mut skipped: Vec<String> = Vec::new();
            for ftw in to_write.iter().filter(|ftw| !ftw.is_new) {
                match resolver(&ftw.file) {
                    ConflictAction::Abort => return Err(SyncError::UserCancelled),
                    ConflictAction::Skip => skipped.push(ftw.file.to_string()),
                    ConflictAction::Overwrite => {}
                }
            }

            if !skipped.is_empty() {
                result.files_skipped_conflict = skipped.len();
                to_write.retain(|ftw| !skipped.contains(&ftw.file.to_string()));
            }
            result.files_with_conflicts.clear();
        }

        if opts.dry_run {
            for ftw in &to_write {
                if ftw.is_new {
                    result.files_created += 1;
                } else {
                    result.files_updated += 1;
                }
            }
            return Ok(result);
        }

        // Second pass: write.
        for ftw in &to_write {
            self.discovery().write_file(&ftw.file, &ftw.decrypted)?;
            if ftw.is_new {
                result.files_created += 1;
            } else {
                result.files_updated += 1;
            }
        }

        if opts.force {
            result.files_with_conflicts.clear();
        }

        Ok(result)
    }

    /// Fetch and decrypt a single tracked file, optionally at a pinned
    /// ref, without touching the project's files.
    pub async fn pull_file(
        &mut self,
        file: &TrackedPath,
        reference: &str,
    ) -> Result<Vec<u8>, SyncError> {
        self.cache.sync_from_storage().await?;

        let encrypted = if reference.is_empty() {
            self.cache.read_encrypted(file)?
        } else {
            self.cache.read_encrypted_at_ref(file, reference)?
        };

        Ok(self.encrypter().decrypt(&encrypted)?)
    }
}
