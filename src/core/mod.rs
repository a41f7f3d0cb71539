//! Core modules of the a24z repository-embedded knowledge store.
//!
//! Each module here is one layer of the dependency order from §2 of the design: path safety
//! first, then the on-disk layout and atomic I/O it's built on, then configuration, then the
//! notes and views engines that read/write through that layout. `crate::lint` sits on top of
//! all of them, consulting notes and views together with the working tree.
//!
//! ## Module overview
//!
//! - **`path`**: repository-root discovery and lexical path containment (component C1)
//! - **`layout`**: data-directory layout and the write-temp-then-rename primitive (C2)
//! - **`config`**: effective configuration and the validation-messages overlay (C3)
//! - **`notes`**: note validation, persistence, indexed lookup, tag/type maintenance (C4)
//! - **`views`**: codebase view persistence, validation, and the markdown structure extractor (C5)
//! - **`migration`**: one-time folding of the legacy aggregate note file into the per-note tree
//! - **`vcs`**: the narrow history-lookup trait the lint engine's `stale-context` rule needs
//! - **`error`**: the single closed `StoreError` type every fallible operation here returns
//! - **`time`**, **`tokens`**, **`output`**: small shared helpers
//! - **`assets`**: embedded default documents written by `init`
//!
//! No module here holds process-global state: every operation is a function of an explicit
//! [`path::RepoRoot`] (and, where relevant, an explicit [`config::Configuration`]) passed in
//! by the caller.

pub mod assets;
pub mod config;
pub mod error;
pub mod layout;
pub mod migration;
pub mod notes;
pub mod output;
pub mod path;
pub mod time;
pub mod tokens;
pub mod vcs;
pub mod views;
