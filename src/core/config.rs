//! Configuration registry (component C3): limits, storage flags, enforcement flags, and the
//! validation-message overlay, deep-merged from on-disk JSON over built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{IoCategory, StoreError};
use crate::core::layout::DataDir;

fn default_note_max_length() -> usize {
    10_000
}
fn default_max_tags_per_note() -> usize {
    10
}
fn default_max_anchors_per_note() -> usize {
    20
}
fn default_tag_description_max_length() -> usize {
    2_000
}
fn default_true() -> bool {
    true
}

/// Numeric caps enforced by the Notes Engine.
///
/// Every field carries its own `#[serde(default = ...)]` so a hand-edited `configuration.json`
/// that only sets one key (or omits the whole `limits` sub-record) still gets spec defaults for
/// everything else, rather than failing the whole parse. `extra` preserves unknown keys nested
/// inside `limits` verbatim across read-modify-write, mirroring `Configuration::extra` one level
/// down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Limits {
    #[serde(rename = "noteMaxLength", default = "default_note_max_length")]
    pub note_max_length: usize,
    #[serde(rename = "maxTagsPerNote", default = "default_max_tags_per_note")]
    pub max_tags_per_note: usize,
    #[serde(rename = "maxAnchorsPerNote", default = "default_max_anchors_per_note")]
    pub max_anchors_per_note: usize,
    #[serde(rename = "tagDescriptionMaxLength", default = "default_tag_description_max_length")]
    pub tag_description_max_length: usize,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            note_max_length: default_note_max_length(),
            max_tags_per_note: default_max_tags_per_note(),
            max_anchors_per_note: default_max_anchors_per_note(),
            tag_description_max_length: default_tag_description_max_length(),
            extra: BTreeMap::new(),
        }
    }
}

/// Flags governing migration/storage behavior. See [`Limits`] for the per-field default /
/// nested-`extra` rationale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Storage {
    #[serde(rename = "backupOnMigration", default = "default_true")]
    pub backup_on_migration: bool,
    #[serde(rename = "compressionEnabled", default)]
    pub compression_enabled: bool,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Storage {
    fn default() -> Self {
        Storage {
            backup_on_migration: true,
            compression_enabled: false,
            extra: BTreeMap::new(),
        }
    }
}

/// Whether the declared-tags taxonomy is closed to only explicitly declared entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TagsConfig {
    #[serde(rename = "enforceAllowedTags", default)]
    pub enforce_allowed_tags: bool,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Whether the declared-types taxonomy is closed to only explicitly declared entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TypesConfig {
    #[serde(rename = "enforceAllowedTypes", default)]
    pub enforce_allowed_types: bool,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A fully-populated, effective configuration record for a repository.
///
/// `extra` preserves unknown top-level keys verbatim across read-modify-write, per the
/// forward-compatibility requirement in §4.3; nested unknown keys (inside `limits`, `storage`,
/// `tags`, or `types`) are preserved the same way via each sub-record's own `extra`. Every field,
/// at every level, falls back to its spec default independently, so a partial on-disk record -
/// missing a whole sub-record or just one key inside one - never fails the parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub types: TypesConfig,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            limits: Limits::default(),
            storage: Storage::default(),
            tags: TagsConfig::default(),
            types: TypesConfig::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl Configuration {
    pub fn enforce_allowed_tags(&self) -> bool {
        self.tags.enforce_allowed_tags
    }

    pub fn enforce_allowed_types(&self) -> bool {
        self.types.enforce_allowed_types
    }
}

/// Sparse update applied over the current effective configuration. Every field is optional;
/// present fields are merged key-by-key (not whole-sub-record replace), so a caller can flip
/// a single enforcement flag without restating every limit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigurationUpdate {
    pub limits: Option<PartialLimits>,
    pub storage: Option<PartialStorage>,
    pub tags: Option<PartialTagsConfig>,
    pub types: Option<PartialTypesConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialLimits {
    #[serde(rename = "noteMaxLength")]
    pub note_max_length: Option<usize>,
    #[serde(rename = "maxTagsPerNote")]
    pub max_tags_per_note: Option<usize>,
    #[serde(rename = "maxAnchorsPerNote")]
    pub max_anchors_per_note: Option<usize>,
    #[serde(rename = "tagDescriptionMaxLength")]
    pub tag_description_max_length: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialStorage {
    #[serde(rename = "backupOnMigration")]
    pub backup_on_migration: Option<bool>,
    #[serde(rename = "compressionEnabled")]
    pub compression_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialTagsConfig {
    #[serde(rename = "enforceAllowedTags")]
    pub enforce_allowed_tags: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialTypesConfig {
    #[serde(rename = "enforceAllowedTypes")]
    pub enforce_allowed_types: Option<bool>,
}

/// Read the effective configuration for a repository's data directory: the on-disk JSON (if
/// present and parseable) deep-merged over built-in defaults. A missing or unparseable file
/// degrades to pure defaults rather than failing the caller.
pub fn read_effective(data_dir: &DataDir) -> Configuration {
    let path = data_dir.configuration_file();
    let on_disk = match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<Configuration>(&contents) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "configuration.json failed to parse, using defaults");
                None
            }
        },
        Err(_) => None,
    };
    on_disk.unwrap_or_default()
}

/// Apply a sparse update over the current effective configuration and persist atomically.
pub fn update(data_dir: &DataDir, patch: ConfigurationUpdate) -> Result<Configuration, StoreError> {
    let mut current = read_effective(data_dir);

    if let Some(limits) = patch.limits {
        if let Some(v) = limits.note_max_length {
            current.limits.note_max_length = v;
        }
        if let Some(v) = limits.max_tags_per_note {
            current.limits.max_tags_per_note = v;
        }
        if let Some(v) = limits.max_anchors_per_note {
            current.limits.max_anchors_per_note = v;
        }
        if let Some(v) = limits.tag_description_max_length {
            current.limits.tag_description_max_length = v;
        }
    }
    if let Some(storage) = patch.storage {
        if let Some(v) = storage.backup_on_migration {
            current.storage.backup_on_migration = v;
        }
        if let Some(v) = storage.compression_enabled {
            current.storage.compression_enabled = v;
        }
    }
    if let Some(tags) = patch.tags {
        if let Some(v) = tags.enforce_allowed_tags {
            current.tags.enforce_allowed_tags = v;
        }
    }
    if let Some(types) = patch.types {
        if let Some(v) = types.enforce_allowed_types {
            current.types.enforce_allowed_types = v;
        }
    }

    crate::core::layout::atomic_write_json(&data_dir.configuration_file(), &current)?;
    Ok(current)
}

/// Write the default configuration, used by `init`.
pub fn write_default(data_dir: &DataDir) -> Result<(), StoreError> {
    crate::core::layout::atomic_write_json(&data_dir.configuration_file(), &Configuration::default())
}

/// Closed set of validation-message keys, matching the closed `ValidationError` kind set.
pub const VALIDATION_MESSAGE_KEYS: &[&str] = &[
    "noteTooLong",
    "tooManyTags",
    "tooManyAnchors",
    "invalidTags",
    "invalidType",
    "anchorOutsideRepo",
    "missingAnchors",
];

/// Per-repo overlay remapping validation error codes to user-authored templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationMessages {
    #[serde(flatten)]
    pub templates: BTreeMap<String, String>,
}

impl ValidationMessages {
    pub fn template_for(&self, kind: &str) -> Option<&str> {
        self.templates.get(kind).map(|s| s.as_str())
    }
}

/// Best-effort load of the validation-messages overlay: absent file or parse failure both
/// yield `None`, never an error - this is an optional cosmetic layer, not load-bearing.
pub fn load_validation_messages(data_dir: &DataDir) -> Option<ValidationMessages> {
    for path in data_dir.validation_messages_candidates() {
        if let Ok(contents) = fs::read_to_string(&path) {
            match serde_json::from_str::<ValidationMessages>(&contents) {
                Ok(messages) => return Some(messages),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "validation-messages overlay failed to parse");
                    return None;
                }
            }
        }
    }
    None
}

/// Ensure the data directory itself exists (used by `init` and first-write paths).
pub fn ensure_data_dir(data_dir: &DataDir) -> Result<(), StoreError> {
    fs::create_dir_all(data_dir.root())
        .map_err(|e| StoreError::io(IoCategory::Mkdir, data_dir.root(), e))
}
