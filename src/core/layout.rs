//! Store layout and atomic file I/O (component C2).
//!
//! Maps logical entities (notes, views, tag/type descriptions, configuration) onto files
//! under the repo's data directory, and provides the write-temp-then-rename primitive every
//! write in this crate goes through.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};

use crate::core::error::{IoCategory, StoreError};
use crate::core::path::RepoRoot;

/// Primary data directory name.
pub const PRIMARY_DIR: &str = ".a24z";
/// Legacy fallback data directory name, used read-through when present and the primary is not.
pub const LEGACY_DIR: &str = ".alexandria";

pub const CONFIGURATION_FILE: &str = "configuration.json";
pub const NOTE_GUIDANCE_FILE: &str = "note-guidance.md";
pub const LEGACY_AGGREGATE_FILE: &str = "repository-notes.json";

/// Resolved data directory for a repository: which name is in effect, and its absolute path.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory for `repo`: primary name if it exists, else legacy name in
    /// read-through mode if *it* exists, else the primary name (so a first write creates it).
    pub fn resolve(repo: &RepoRoot) -> Self {
        let primary = repo.as_path().join(PRIMARY_DIR);
        if primary.exists() {
            return DataDir { root: primary };
        }
        let legacy = repo.as_path().join(LEGACY_DIR);
        if legacy.exists() {
            tracing::debug!(path = %legacy.display(), "using legacy data directory in read-through mode");
            return DataDir { root: legacy };
        }
        DataDir { root: primary }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.root.join("notes")
    }

    pub fn views_dir(&self) -> PathBuf {
        self.root.join("views")
    }

    pub fn tags_dir(&self) -> PathBuf {
        self.root.join("tags")
    }

    pub fn types_dir(&self) -> PathBuf {
        self.root.join("types")
    }

    pub fn configuration_file(&self) -> PathBuf {
        self.root.join(CONFIGURATION_FILE)
    }

    pub fn note_guidance_file(&self) -> PathBuf {
        self.root.join(NOTE_GUIDANCE_FILE)
    }

    pub fn legacy_aggregate_file(&self) -> PathBuf {
        self.root.join(LEGACY_AGGREGATE_FILE)
    }

    /// Path for a validation-messages overlay, tried in order (`.json` is canonical).
    pub fn validation_messages_candidates(&self) -> Vec<PathBuf> {
        vec![
            self.root.join("validation-messages.json"),
            self.root.join("validation-messages.jsonc"),
        ]
    }

    pub fn view_file(&self, id: &str) -> PathBuf {
        self.views_dir().join(format!("{id}.json"))
    }

    pub fn tag_file(&self, name: &str) -> PathBuf {
        self.tags_dir().join(format!("{name}.md"))
    }

    pub fn type_file(&self, name: &str) -> PathBuf {
        self.types_dir().join(format!("{name}.md"))
    }

    /// `notes/YYYY/MM/<id>.json` for a note created at `timestamp_ms`, UTC calendar fields.
    pub fn note_file(&self, id: &str, timestamp_ms: i64) -> PathBuf {
        let dt = chrono::DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
            .unwrap_or_else(Utc::now);
        self.notes_dir()
            .join(format!("{:04}", dt.year()))
            .join(format!("{:02}", dt.month()))
            .join(format!("{id}.json"))
    }
}

/// Write `contents` to `target` atomically: write to `target.tmp` in the same directory, then
/// rename onto `target`. Readers can never observe a partially-written file - the rename is
/// the linearization point.
pub fn atomic_write(target: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::io(IoCategory::Mkdir, parent, e))?;
    }
    let tmp_path = tmp_path_for(target);
    fs::write(&tmp_path, contents)
        .map_err(|e| StoreError::io(IoCategory::Write, &tmp_path, e))?;
    fs::rename(&tmp_path, target)
        .map_err(|e| StoreError::io(IoCategory::Rename, target, e))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn atomic_write_json<T: serde::Serialize>(target: &Path, value: &T) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(value).map_err(|e| {
        StoreError::Parse {
            path: target.to_path_buf(),
            cause: e,
        }
    })?;
    atomic_write(target, &payload)
}

fn tmp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{file_name}.tmp"))
}

/// Remove a file unconditionally (no error if already absent), then prune now-empty leaf
/// directories up to (but not including) `stop_at`.
pub fn remove_and_prune(path: &Path, stop_at: &Path) -> Result<bool, StoreError> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).map_err(|e| StoreError::io(IoCategory::Remove, path, e))?;

    let mut dir = path.parent();
    while let Some(d) = dir {
        if d == stop_at || !d.starts_with(stop_at) {
            break;
        }
        match fs::read_dir(d) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    break;
                }
            }
            Err(_) => break,
        }
        if fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
    Ok(true)
}

/// Recursively walk `dir` for files matching `extension`, skipping files that fail to exist.
/// Used by aggregate reads (`notes/**/*.json`, `views/*.json`).
pub fn walk_files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return out;
    }
    walk_files_with_extension_inner(dir, extension, &mut out);
    out.sort();
    out
}

fn walk_files_with_extension_inner(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_files_with_extension_inner(&path, extension, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            out.push(path);
        }
    }
}
