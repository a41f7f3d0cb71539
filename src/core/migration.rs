//! Legacy aggregate file migration (§4.2): folds a pre-existing `repository-notes.json` into
//! the per-note file tree, then retires the aggregate. Runs transparently on first read and is
//! idempotent - once the aggregate is gone, later calls are a no-op.

use std::fs;

use serde::Deserialize;
use serde_json::Value;

use crate::core::config;
use crate::core::error::{IoCategory, StoreError};
use crate::core::layout::{self, DataDir};
use crate::core::notes::Note;
use crate::core::time;

/// Shape of a note as it appeared in the legacy aggregate file. `directoryPath` (seen in some
/// older retrieval code paths) is read and discarded; it is not part of the persisted model.
#[derive(Debug, Deserialize)]
struct LegacyNote {
    id: String,
    note: String,
    anchors: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "type")]
    note_type: String,
    timestamp: i64,
    #[serde(default)]
    reviewed: bool,
    #[serde(default)]
    metadata: serde_json::Map<String, Value>,
    #[serde(rename = "guidanceToken", default)]
    guidance_token: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
}

impl From<LegacyNote> for Note {
    fn from(legacy: LegacyNote) -> Self {
        Note {
            id: legacy.id,
            note: legacy.note,
            anchors: legacy.anchors,
            tags: legacy.tags,
            note_type: legacy.note_type,
            timestamp: legacy.timestamp,
            reviewed: legacy.reviewed,
            metadata: legacy.metadata,
            guidance_token: legacy.guidance_token,
            confidence: legacy.confidence,
        }
    }
}

/// If a legacy aggregate file exists, migrate every note it contains to its dated per-note
/// file, then rename the aggregate to a timestamped backup (or unlink it, per `storage`
/// config). Already-present per-note files are left untouched, which is what makes repeat
/// invocation safe: the first run empties the aggregate's contents into the tree and retires
/// it, so a second run finds nothing left to do.
pub fn migrate_legacy_if_needed(data_dir: &DataDir) -> Result<(), StoreError> {
    let legacy_path = data_dir.legacy_aggregate_file();
    if !legacy_path.exists() {
        return Ok(());
    }

    let contents = fs::read_to_string(&legacy_path)
        .map_err(|e| StoreError::io(IoCategory::Read, &legacy_path, e))?;
    let legacy_notes: Vec<LegacyNote> = serde_json::from_str(&contents)
        .map_err(|e| StoreError::Migration(format!("failed to parse {}: {e}", legacy_path.display())))?;

    let mut migrated = 0usize;
    for legacy in legacy_notes {
        let note: Note = legacy.into();
        let target = data_dir.note_file(&note.id, note.timestamp);
        if !target.exists() {
            layout::atomic_write_json(&target, &note)?;
            migrated += 1;
        }
    }

    let cfg = config::read_effective(data_dir);
    if cfg.storage.backup_on_migration {
        let backup = legacy_path.with_file_name(format!(
            "repository-notes.{}.bak.json",
            time::now_epoch_ms()
        ));
        fs::rename(&legacy_path, &backup).map_err(|e| StoreError::io(IoCategory::Rename, &legacy_path, e))?;
    } else {
        fs::remove_file(&legacy_path).map_err(|e| StoreError::io(IoCategory::Remove, &legacy_path, e))?;
    }

    tracing::info!(count = migrated, path = %legacy_path.display(), "migrated legacy aggregate file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::path::RepoRoot;
    use tempfile::tempdir;

    fn data_dir(path: &std::path::Path) -> DataDir {
        DataDir::resolve(&RepoRoot::trust(path))
    }

    fn write_legacy_aggregate(dir: &std::path::Path) {
        fs::create_dir_all(dir.join(".a24z")).unwrap();
        fs::write(
            dir.join(".a24z/repository-notes.json"),
            r#"[{"id":"note-1700000000000-abc12345","note":"legacy","anchors":["src/a.ts"],"tags":[],"type":"explanation","timestamp":1700000000000,"reviewed":false,"metadata":{},"confidence":"high"}]"#,
        )
        .unwrap();
    }

    #[test]
    fn migrates_legacy_notes_into_per_note_tree() {
        let dir = tempdir().unwrap();
        write_legacy_aggregate(dir.path());
        let data = data_dir(dir.path());

        migrate_legacy_if_needed(&data).unwrap();

        let note_path = data.note_file("note-1700000000000-abc12345", 1700000000000);
        assert!(note_path.exists());
        assert!(!data.legacy_aggregate_file().exists());
    }

    #[test]
    fn migration_is_idempotent() {
        let dir = tempdir().unwrap();
        write_legacy_aggregate(dir.path());
        let data = data_dir(dir.path());

        migrate_legacy_if_needed(&data).unwrap();
        let note_path = data.note_file("note-1700000000000-abc12345", 1700000000000);
        let first_contents = fs::read_to_string(&note_path).unwrap();

        // Second call: aggregate is gone, so this is a no-op.
        migrate_legacy_if_needed(&data).unwrap();
        let second_contents = fs::read_to_string(&note_path).unwrap();
        assert_eq!(first_contents, second_contents);
    }

    #[test]
    fn no_aggregate_is_a_no_op() {
        let dir = tempdir().unwrap();
        let data = data_dir(dir.path());
        migrate_legacy_if_needed(&data).unwrap();
    }

    #[test]
    fn unlinks_instead_of_backing_up_when_configured() {
        let dir = tempdir().unwrap();
        write_legacy_aggregate(dir.path());
        let data = data_dir(dir.path());
        config::update(
            &data,
            config::ConfigurationUpdate {
                storage: Some(config::PartialStorage {
                    backup_on_migration: Some(false),
                    compression_enabled: None,
                }),
                ..Default::default()
            },
        )
        .unwrap();

        migrate_legacy_if_needed(&data).unwrap();

        let entries: Vec<_> = fs::read_dir(data.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(!entries.iter().any(|n| n.starts_with("repository-notes")));
    }
}
