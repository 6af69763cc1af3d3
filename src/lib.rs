//! envault - encrypted environment files, versioned and synced
//!
//! envault is a single-binary tool that mirrors a project's secret env
//! files into an encrypted, git-versioned cache and synchronizes that
//! cache with a cloud object-store bucket.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line layer (parses args, builds the stack,
//!   formats results, maps errors to exit codes)
//! - [`sync`] - Push/pull orchestration and optimistic concurrency
//! - [`cache`] - Per-project encrypted mirror (history + object store)
//! - [`history`] - Linear git-backed version store over a working tree
//! - [`store`] - Object-store abstraction, retry wrapper, GCS adapter
//! - [`crypto`] - Passphrase-based encryption and passphrase resolution
//! - [`project`] - Project identity and the tracked-file manifest
//! - [`core`] - Domain types, config, constants, path safety
//! - [`ui`] - Output formatting and interactive prompts
//!
//! # Correctness Invariants
//!
//! 1. Plaintext never reaches the cache working tree or the remote
//! 2. Within a push, the remote head is re-verified after staging and
//!    before the commit is created
//! 3. Every externally influenced path is traversal-checked before any
//!    filesystem use
//! 4. Reads of remote or decrypted bytes are capped at 2 MiB

pub mod cache;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod history;
pub mod project;
pub mod store;
pub mod sync;
pub mod ui;
