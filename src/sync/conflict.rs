//! sync::conflict
//!
//! Conflict resolution for pulls.

use crate::core::types::TrackedPath;

/// What to do with one conflicting file during a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Replace the local file with the pulled content.
    Overwrite,
    /// Leave the local file alone.
    Skip,
    /// Abort the whole pull.
    Abort,
}

/// Per-file conflict decision callback, supplied by the front-end.
///
/// The headless default is equivalent to returning
/// [`ConflictAction::Abort`] for every file.
pub type ConflictResolver<'a> = &'a dyn Fn(&TrackedPath) -> ConflictAction;
