//! Error types for a24z store operations.
//!
//! This module defines the canonical error type used throughout the core crate.
//! All subsystems return `Result<T, StoreError>` for error handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// I/O failure category, carried alongside the offending path for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCategory {
    Read,
    Write,
    Rename,
    Mkdir,
    Remove,
}

impl std::fmt::Display for IoCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IoCategory::Read => "read",
            IoCategory::Write => "write",
            IoCategory::Rename => "rename",
            IoCategory::Mkdir => "mkdir",
            IoCategory::Remove => "remove",
        };
        write!(f, "{s}")
    }
}

/// Canonical error type for all a24z store operations.
///
/// Uses `thiserror` for automatic `Display`/`Error` trait implementations. Validation
/// failures are deliberately *not* folded into this enum - callers get those back as data;
/// see `notes::ValidationError` and `views::ValidationIssue`, which are never raised through
/// this type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The given directory does not resolve to a repository root.
    #[error("not a repository: {0}")]
    NotARepository(PathBuf),

    /// A path escapes the repository root.
    #[error("path escapes repository root: {0}")]
    PathEscapesRoot(PathBuf),

    /// Requested resource (note, view, tag, type) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error with category and offending path, per the closed taxonomy.
    #[error("{category} error at {path}: {cause}")]
    Io {
        category: IoCategory,
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    /// A store file could not be parsed as JSON (surfaced only for single-entity reads;
    /// aggregate reads swallow this and log instead).
    #[error("failed to parse {path}: {cause}")]
    Parse {
        path: PathBuf,
        #[source]
        cause: serde_json::Error,
    },

    /// Legacy-aggregate migration failed. Non-fatal to callers; logged by the migration
    /// module and the legacy file is left in place.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn io(category: IoCategory, path: impl Into<PathBuf>, cause: io::Error) -> Self {
        StoreError::Io {
            category,
            path: path.into(),
            cause,
        }
    }
}
