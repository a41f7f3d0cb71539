//! a24z: a repository-embedded knowledge store.
//!
//! **a24z captures durable engineering knowledge as structured notes and groups them through
//! codebase views — grid-shaped file maps whose cells associate code regions with
//! documentation overviews.** A lint engine enforces that documentation stays consistent with
//! source code over time.
//!
//! The store is colocated with each repository, rooted at that project's `.a24z` (or legacy
//! `.alexandria`) directory, and consumed both by this crate's CLI and by agents through a
//! tool-invocation protocol external to this crate.
//!
//! # Architecture
//!
//! Six cooperating components, leaves first:
//!
//! - [`core::path`] — repository-root discovery and lexical path containment
//! - [`core::layout`] — data-directory layout and atomic write-temp-then-rename I/O
//! - [`core::config`] — effective configuration, deep-merged over built-in defaults
//! - [`core::notes`] — note validation, persistence, indexed lookup, tag/type taxonomies
//! - [`core::views`] — codebase view persistence, validation, and markdown structure extraction
//! - [`lint`] — a fixed rule registry checking the store against the working tree
//!
//! # Design notes
//!
//! - Path containment is always computed lexically after normalization, never through
//!   `fs::canonicalize`, so a symlink swapped in between check and write can't smuggle a path
//!   outside the repository root.
//! - Validation failures ([`core::notes::ValidationError`], [`core::views::ValidationIssue`])
//!   are data returned to the caller, never raised through [`core::error::StoreError`].
//! - There is no process-global state: every operation takes an explicit repository root and,
//!   where relevant, an explicit configuration value.

pub mod core;
pub mod lint;
