//! Notes Engine (component C4): validation, persistence, indexed lookup, and tag/type
//! taxonomy maintenance for notes.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::config::Configuration;
use crate::core::error::StoreError;
use crate::core::layout::{self, DataDir};
use crate::core::migration;
use crate::core::path::{self, RepoRoot};
use crate::core::time;
use crate::core::tokens;

/// A persisted unit of knowledge, as it appears on disk under `notes/YYYY/MM/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub note: String,
    pub anchors: Vec<String>,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub note_type: String,
    pub timestamp: i64,
    pub reviewed: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    #[serde(rename = "guidanceToken", skip_serializing_if = "Option::is_none")]
    pub guidance_token: Option<String>,
    /// Legacy field, accepted on read and never written. See open question in design notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

/// Caller-supplied fields for [`save_note`]. Anchors are pre-normalization; everything else
/// is taken as-is except `reviewed`, which defaults to `false`.
#[derive(Debug, Clone, Default)]
pub struct NoteInput {
    pub note: String,
    pub anchors: Vec<String>,
    pub tags: Vec<String>,
    pub note_type: String,
    pub reviewed: Option<bool>,
    pub metadata: serde_json::Map<String, Value>,
    pub guidance_token: Option<String>,
}

/// One failure of the §3 note invariants, carrying the structured payload the CLI and any
/// tool-invocation wrapper render diagnostics from.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "data")]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorKind {
    #[serde(rename = "missingAnchors")]
    MissingAnchors { actual: usize },
    #[serde(rename = "noteTooLong")]
    NoteTooLong {
        actual: usize,
        limit: usize,
        over_by: usize,
        percentage: f64,
    },
    #[serde(rename = "tooManyTags")]
    TooManyTags { actual: usize, limit: usize },
    #[serde(rename = "tooManyAnchors")]
    TooManyAnchors { actual: usize, limit: usize },
    #[serde(rename = "invalidTags")]
    InvalidTags {
        invalid_tags: Vec<String>,
        allowed_tags: Vec<String>,
    },
    #[serde(rename = "invalidType")]
    InvalidType {
        #[serde(rename = "type")]
        note_type: String,
        allowed_types: Vec<String>,
    },
    #[serde(rename = "anchorOutsideRepo")]
    AnchorOutsideRepo { anchor: String },
}

impl ValidationErrorKind {
    fn kind_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::MissingAnchors { .. } => "missingAnchors",
            ValidationErrorKind::NoteTooLong { .. } => "noteTooLong",
            ValidationErrorKind::TooManyTags { .. } => "tooManyTags",
            ValidationErrorKind::TooManyAnchors { .. } => "tooManyAnchors",
            ValidationErrorKind::InvalidTags { .. } => "invalidTags",
            ValidationErrorKind::InvalidType { .. } => "invalidType",
            ValidationErrorKind::AnchorOutsideRepo { .. } => "anchorOutsideRepo",
        }
    }

    /// Named substitutions available for this kind's template, per §7's fixed data shape.
    fn template_data(&self) -> Vec<(&'static str, String)> {
        match self {
            ValidationErrorKind::MissingAnchors { actual } => vec![("actual", actual.to_string())],
            ValidationErrorKind::NoteTooLong { actual, limit, over_by, percentage } => vec![
                ("actual", actual.to_string()),
                ("limit", limit.to_string()),
                ("overBy", over_by.to_string()),
                ("percentage", format!("{percentage:.1}")),
            ],
            ValidationErrorKind::TooManyTags { actual, limit } => {
                vec![("actual", actual.to_string()), ("limit", limit.to_string())]
            }
            ValidationErrorKind::TooManyAnchors { actual, limit } => {
                vec![("actual", actual.to_string()), ("limit", limit.to_string())]
            }
            ValidationErrorKind::InvalidTags { invalid_tags, allowed_tags } => vec![
                ("invalidTags", invalid_tags.join(", ")),
                ("allowedTags", allowed_tags.join(", ")),
            ],
            ValidationErrorKind::InvalidType { note_type, allowed_types } => vec![
                ("type", note_type.clone()),
                ("allowedTypes", allowed_types.join(", ")),
            ],
            ValidationErrorKind::AnchorOutsideRepo { anchor } => vec![("anchor", anchor.clone())],
        }
    }

    /// The default, untemplated human-readable message for this kind.
    fn default_message(&self) -> String {
        match self {
            ValidationErrorKind::MissingAnchors { .. } => "at least one anchor is required".to_string(),
            ValidationErrorKind::NoteTooLong { actual, limit, over_by, .. } => {
                format!("note content is {actual} characters, {over_by} over the {limit}-character limit")
            }
            ValidationErrorKind::TooManyTags { actual, limit } => {
                format!("{actual} tags exceeds the limit of {limit}")
            }
            ValidationErrorKind::TooManyAnchors { actual, limit } => {
                format!("{actual} anchors exceeds the limit of {limit}")
            }
            ValidationErrorKind::InvalidTags { invalid_tags, .. } => {
                format!("undeclared tags: {}", invalid_tags.join(", "))
            }
            ValidationErrorKind::InvalidType { note_type, .. } => {
                format!("'{note_type}' is not a declared type")
            }
            ValidationErrorKind::AnchorOutsideRepo { anchor } => {
                format!("anchor '{anchor}' resolves outside the repository root")
            }
        }
    }

    /// Render this kind's message: the repo's validation-messages overlay template for this
    /// kind (with `{name}` placeholders substituted per §7's fixed data shape) if one is
    /// configured, else [`Self::default_message`].
    pub fn render_message(&self, messages: Option<&crate::core::config::ValidationMessages>) -> String {
        let template = messages.and_then(|m| m.template_for(self.kind_str()));
        match template {
            Some(template) => {
                let mut rendered = template.to_string();
                for (key, value) in self.template_data() {
                    rendered = rendered.replace(&format!("{{{key}}}"), &value);
                }
                rendered
            }
            None => self.default_message(),
        }
    }
}

/// All invariant failures collected from a single `save_note` attempt. Never short-circuited:
/// every applicable check runs and contributes to this list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationError(pub Vec<ValidationErrorKind>);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.0.iter().map(|e| e.kind_str()).collect();
        write!(f, "note validation failed: {}", kinds.join(", "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum SaveNoteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Validate `input` against `cfg`, normalize its anchors against `root`/`caller_dir`, assign an
/// id and timestamp, and persist it atomically.
pub fn save_note(
    root: &RepoRoot,
    caller_dir: &Path,
    cfg: &Configuration,
    input: NoteInput,
) -> Result<Note, SaveNoteError> {
    let data_dir = DataDir::resolve(root);
    let mut errors = Vec::new();

    if input.anchors.is_empty() {
        errors.push(ValidationErrorKind::MissingAnchors { actual: 0 });
    }

    let content_len = input.note.chars().count();
    if content_len > cfg.limits.note_max_length {
        let over_by = content_len - cfg.limits.note_max_length;
        errors.push(ValidationErrorKind::NoteTooLong {
            actual: content_len,
            limit: cfg.limits.note_max_length,
            over_by,
            percentage: (content_len as f64 / cfg.limits.note_max_length as f64) * 100.0,
        });
    }

    if input.tags.len() > cfg.limits.max_tags_per_note {
        errors.push(ValidationErrorKind::TooManyTags {
            actual: input.tags.len(),
            limit: cfg.limits.max_tags_per_note,
        });
    }

    if input.anchors.len() > cfg.limits.max_anchors_per_note {
        errors.push(ValidationErrorKind::TooManyAnchors {
            actual: input.anchors.len(),
            limit: cfg.limits.max_anchors_per_note,
        });
    }

    let allowed_tags_set = effective_allowed_tags(cfg, &data_dir);
    if !allowed_tags_set.is_empty() {
        let invalid: Vec<String> = input
            .tags
            .iter()
            .filter(|t| !allowed_tags_set.contains(t))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            errors.push(ValidationErrorKind::InvalidTags {
                invalid_tags: invalid,
                allowed_tags: allowed_tags_set,
            });
        }
    }

    let allowed_types_set = effective_allowed_types(cfg, &data_dir);
    if !allowed_types_set.is_empty() && !allowed_types_set.contains(&input.note_type) {
        errors.push(ValidationErrorKind::InvalidType {
            note_type: input.note_type.clone(),
            allowed_types: allowed_types_set,
        });
    }

    let mut normalized_anchors = Vec::with_capacity(input.anchors.len());
    for anchor in &input.anchors {
        match path::normalize_anchor(root, caller_dir, anchor) {
            Ok(rel) => normalized_anchors.push(rel),
            Err(_) => errors.push(ValidationErrorKind::AnchorOutsideRepo {
                anchor: anchor.clone(),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(SaveNoteError::Validation(ValidationError(errors)));
    }

    let timestamp = time::now_epoch_ms();
    let id = format!("note-{timestamp}-{}", time::short_random_suffix());
    let note = Note {
        id,
        note: input.note,
        anchors: normalized_anchors,
        tags: input.tags,
        note_type: input.note_type,
        timestamp,
        reviewed: input.reviewed.unwrap_or(false),
        metadata: input.metadata,
        guidance_token: input.guidance_token,
        confidence: None,
    };

    let file_path = data_dir.note_file(&note.id, note.timestamp);
    layout::atomic_write_json(&file_path, &note)?;
    Ok(note)
}

/// Linear scan over every note file for one with a matching id.
pub fn get_note_by_id(root: &RepoRoot, id: &str) -> Result<Option<Note>, StoreError> {
    let data_dir = DataDir::resolve(root);
    ensure_migrated(&data_dir);
    Ok(read_all_notes(&data_dir).into_iter().find(|n| n.id == id))
}

/// Remove the on-disk file for `id`, if any, and prune emptied month/year directories.
pub fn delete_note_by_id(root: &RepoRoot, id: &str) -> Result<bool, StoreError> {
    let data_dir = DataDir::resolve(root);
    ensure_migrated(&data_dir);
    let notes_dir = data_dir.notes_dir();
    for file in layout::walk_files_with_extension(&notes_dir, "json") {
        if file.file_stem().and_then(|s| s.to_str()) == Some(id) {
            return layout::remove_and_prune(&file, &notes_dir);
        }
    }
    Ok(false)
}

/// One entry of a `getNotesForPath` result: the note plus how it related to the query path.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    pub note: Note,
    pub is_parent_directory: bool,
    pub path_distance: usize,
}

/// Anchor-vs-target relevance per §4.4: equal, ancestor, or descendant, all over `/`-joined
/// repo-relative strings (never OS path comparison, since anchors are always `/`-separated).
fn anchor_matches(anchor: &str, target: &str) -> bool {
    anchor == target
        || target.starts_with(&format!("{anchor}/"))
        || anchor.starts_with(&format!("{target}/"))
}

fn segment_count(rel: &str) -> usize {
    if rel.is_empty() {
        0
    } else {
        rel.split('/').count()
    }
}

/// All notes relevant to `target_path`, ordered by ascending `path_distance` then descending
/// timestamp then ascending id (a total order, so ties are deterministic).
pub fn get_notes_for_path(
    root: &RepoRoot,
    target_path: &Path,
    include_parents: bool,
) -> Result<Vec<NoteMatch>, StoreError> {
    let data_dir = DataDir::resolve(root);
    ensure_migrated(&data_dir);
    let target_rel = path::repo_relative(root, target_path)?;
    let target_segments = segment_count(&target_rel);

    let mut matches = Vec::new();
    for note in read_all_notes(&data_dir) {
        let anchor_matched = note.anchors.iter().any(|a| anchor_matches(a, &target_rel));
        if anchor_matched {
            matches.push(NoteMatch {
                note,
                is_parent_directory: false,
                path_distance: 0,
            });
        } else if include_parents {
            matches.push(NoteMatch {
                note,
                is_parent_directory: true,
                path_distance: target_segments,
            });
        }
    }

    matches.sort_by(|a, b| {
        a.path_distance
            .cmp(&b.path_distance)
            .then_with(|| b.note.timestamp.cmp(&a.note.timestamp))
            .then_with(|| a.note.id.cmp(&b.note.id))
    });
    Ok(matches)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    Count,
    Tokens,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub total_tokens: usize,
    pub tokens_kept: usize,
    pub items_dropped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitedNotes {
    pub notes: Vec<NoteMatch>,
    pub token_info: Option<TokenInfo>,
}

/// [`get_notes_for_path`] truncated either to a flat item count or to a token budget, per
/// §4.4's monotonic-at-least-one guarantee.
pub fn get_notes_for_path_with_limit(
    root: &RepoRoot,
    target_path: &Path,
    include_parents: bool,
    limit_type: LimitType,
    limit: usize,
) -> Result<LimitedNotes, StoreError> {
    let ordered = get_notes_for_path(root, target_path, include_parents)?;

    match limit_type {
        LimitType::Count => {
            let n = limit.max(1);
            Ok(LimitedNotes {
                notes: ordered.into_iter().take(n).collect(),
                token_info: None,
            })
        }
        LimitType::Tokens => {
            let token_counts: Vec<usize> = ordered
                .iter()
                .map(|m| tokens::count_tokens(&m.note.note))
                .collect();
            let total_tokens: usize = token_counts.iter().sum();

            let mut kept = 0usize;
            let mut cumulative = 0usize;
            for t in &token_counts {
                if cumulative + t <= limit {
                    cumulative += t;
                    kept += 1;
                } else {
                    break;
                }
            }
            if kept == 0 && !token_counts.is_empty() {
                kept = 1;
                cumulative = token_counts[0];
            }

            Ok(LimitedNotes {
                notes: ordered.into_iter().take(kept).collect(),
                token_info: Some(TokenInfo {
                    total_tokens,
                    tokens_kept: cumulative,
                    items_dropped: token_counts.len() - kept,
                }),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaleNoteReport {
    pub note: Note,
    pub stale_anchors: Vec<String>,
    pub valid_anchors: Vec<String>,
}

/// Notes with at least one anchor that no longer exists on disk.
pub fn check_stale_notes(root: &RepoRoot) -> Result<Vec<StaleNoteReport>, StoreError> {
    let data_dir = DataDir::resolve(root);
    ensure_migrated(&data_dir);

    let mut out = Vec::new();
    for note in read_all_notes(&data_dir) {
        let mut stale = Vec::new();
        let mut valid = Vec::new();
        for anchor in &note.anchors {
            if root.as_path().join(anchor).exists() {
                valid.push(anchor.clone());
            } else {
                stale.push(anchor.clone());
            }
        }
        if !stale.is_empty() {
            out.push(StaleNoteReport {
                note,
                stale_anchors: stale,
                valid_anchors: valid,
            });
        }
    }
    Ok(out)
}

pub fn save_tag_description(root: &RepoRoot, name: &str, description: &str) -> Result<(), StoreError> {
    let data_dir = DataDir::resolve(root);
    layout::atomic_write(&data_dir.tag_file(name), description.as_bytes())
}

pub fn save_type_description(root: &RepoRoot, name: &str, description: &str) -> Result<(), StoreError> {
    let data_dir = DataDir::resolve(root);
    layout::atomic_write(&data_dir.type_file(name), description.as_bytes())
}

/// Delete a tag's description file. When `sweep` is set, also rewrites every note that carries
/// this tag, removing it from their tag lists.
pub fn delete_tag_description(root: &RepoRoot, name: &str, sweep: bool) -> Result<bool, StoreError> {
    let data_dir = DataDir::resolve(root);
    let removed = layout::remove_and_prune(&data_dir.tag_file(name), &data_dir.tags_dir())?;
    if sweep {
        sweep_tag_from_notes(&data_dir, name)?;
    }
    Ok(removed)
}

pub fn delete_type_description(root: &RepoRoot, name: &str) -> Result<bool, StoreError> {
    let data_dir = DataDir::resolve(root);
    layout::remove_and_prune(&data_dir.type_file(name), &data_dir.types_dir())
}

fn sweep_tag_from_notes(data_dir: &DataDir, name: &str) -> Result<(), StoreError> {
    for file in layout::walk_files_with_extension(&data_dir.notes_dir(), "json") {
        let contents = match fs::read_to_string(&file) {
            Ok(c) => c,
            Err(_) => continue,
        };
        let mut note: Note = match serde_json::from_str(&contents) {
            Ok(n) => n,
            Err(_) => continue,
        };
        if note.tags.iter().any(|t| t == name) {
            note.tags.retain(|t| t != name);
            layout::atomic_write_json(&file, &note)?;
        }
    }
    Ok(())
}

fn list_description_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|entry| {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) == Some("md") {
                        path.file_stem().map(|s| s.to_string_lossy().into_owned())
                    } else {
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub fn declared_tags(data_dir: &DataDir) -> Vec<String> {
    list_description_names(&data_dir.tags_dir())
}

pub fn declared_types(data_dir: &DataDir) -> Vec<String> {
    list_description_names(&data_dir.types_dir())
}

/// Declared tags when enforcement is on, empty otherwise (§4.4 "allowed tags/types").
pub fn effective_allowed_tags(cfg: &Configuration, data_dir: &DataDir) -> Vec<String> {
    if cfg.enforce_allowed_tags() {
        declared_tags(data_dir)
    } else {
        Vec::new()
    }
}

pub fn effective_allowed_types(cfg: &Configuration, data_dir: &DataDir) -> Vec<String> {
    if cfg.enforce_allowed_types() {
        declared_types(data_dir)
    } else {
        Vec::new()
    }
}

fn read_all_notes(data_dir: &DataDir) -> Vec<Note> {
    layout::walk_files_with_extension(&data_dir.notes_dir(), "json")
        .into_iter()
        .filter_map(|path| match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Note>(&contents) {
                Ok(note) => Some(note),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable note file");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable note file");
                None
            }
        })
        .collect()
}

/// All notes paired with their backing file path, for callers (the lint engine) that need to
/// attribute diagnostics to a file.
pub fn read_all_notes_with_paths(root: &RepoRoot) -> Vec<(Note, std::path::PathBuf)> {
    let data_dir = DataDir::resolve(root);
    ensure_migrated(&data_dir);
    layout::walk_files_with_extension(&data_dir.notes_dir(), "json")
        .into_iter()
        .filter_map(|path| match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Note>(&contents) {
                Ok(note) => Some((note, path)),
                Err(_) => None,
            },
            Err(_) => None,
        })
        .collect()
}

fn ensure_migrated(data_dir: &DataDir) {
    if let Err(e) = migration::migrate_legacy_if_needed(data_dir) {
        tracing::warn!(error = %e, "legacy aggregate migration failed, leaving it in place");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Configuration;
    use std::fs;
    use tempfile::tempdir;

    fn repo() -> (tempfile::TempDir, RepoRoot) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "x").unwrap();
        (dir, RepoRoot::trust(dir.path()))
    }

    fn basic_input(anchors: Vec<&str>) -> NoteInput {
        NoteInput {
            note: "hello".to_string(),
            anchors: anchors.into_iter().map(String::from).collect(),
            tags: vec!["x".to_string()],
            note_type: "explanation".to_string(),
            reviewed: None,
            metadata: serde_json::Map::new(),
            guidance_token: None,
        }
    }

    #[test]
    fn save_and_get_round_trip() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        let note = save_note(&root, dir.path(), &cfg, basic_input(vec!["src/a.ts"])).unwrap();
        assert!(regex::Regex::new(r"^note-\d+-[a-z0-9]+$").unwrap().is_match(&note.id));

        let fetched = get_note_by_id(&root, &note.id).unwrap().unwrap();
        assert_eq!(fetched.note, "hello");
        assert_eq!(fetched.anchors, vec!["src/a.ts".to_string()]);
    }

    #[test]
    fn save_rejects_anchor_outside_repo() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        let err = save_note(&root, dir.path(), &cfg, basic_input(vec!["../../etc/passwd"])).unwrap_err();
        match err {
            SaveNoteError::Validation(ValidationError(kinds)) => {
                assert!(kinds
                    .iter()
                    .any(|k| matches!(k, ValidationErrorKind::AnchorOutsideRepo { anchor } if anchor == "../../etc/passwd")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        let notes_dir = dir.path().join(".a24z/notes");
        assert!(!notes_dir.exists() || layout::walk_files_with_extension(&notes_dir, "json").is_empty());
    }

    #[test]
    fn save_rejects_empty_anchors() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        let err = save_note(&root, dir.path(), &cfg, basic_input(vec![])).unwrap_err();
        match err {
            SaveNoteError::Validation(ValidationError(kinds)) => {
                assert!(kinds.iter().any(|k| matches!(k, ValidationErrorKind::MissingAnchors { actual: 0 })));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn note_too_long_reports_over_by() {
        let (dir, root) = repo();
        let mut cfg = Configuration::default();
        cfg.limits.note_max_length = 5;
        let mut input = basic_input(vec!["src/a.ts"]);
        input.note = "123456".to_string();
        let err = save_note(&root, dir.path(), &cfg, input).unwrap_err();
        match err {
            SaveNoteError::Validation(ValidationError(kinds)) => {
                assert!(kinds.iter().any(
                    |k| matches!(k, ValidationErrorKind::NoteTooLong { over_by: 1, .. })
                ));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn get_notes_for_path_distinguishes_anchor_and_parent_match() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        save_note(&root, dir.path(), &cfg, basic_input(vec!["src/a.ts"])).unwrap();

        let anchor_hit = get_notes_for_path(&root, &dir.path().join("src/a.ts"), true).unwrap();
        assert_eq!(anchor_hit.len(), 1);
        assert!(!anchor_hit[0].is_parent_directory);
        assert_eq!(anchor_hit[0].path_distance, 0);

        let parent_hit = get_notes_for_path(&root, &dir.path().join("src/b.ts"), true).unwrap();
        assert_eq!(parent_hit.len(), 1);
        assert!(parent_hit[0].is_parent_directory);
        assert_eq!(parent_hit[0].path_distance, 2);
    }

    #[test]
    fn get_notes_for_path_excludes_parent_matches_when_disabled() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        save_note(&root, dir.path(), &cfg, basic_input(vec!["src/a.ts"])).unwrap();
        let hits = get_notes_for_path(&root, &dir.path().join("src/b.ts"), false).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn token_limit_keeps_at_least_one_item() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        let long_note = "word ".repeat(200);
        let mut first = basic_input(vec!["src/a.ts"]);
        first.note = long_note.clone();
        save_note(&root, dir.path(), &cfg, first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let mut second = basic_input(vec!["src/a.ts"]);
        second.note = long_note;
        save_note(&root, dir.path(), &cfg, second).unwrap();

        let limited = get_notes_for_path_with_limit(
            &root,
            &dir.path().join("src/a.ts"),
            true,
            LimitType::Tokens,
            10,
        )
        .unwrap();
        assert_eq!(limited.notes.len(), 1);
        let info = limited.token_info.unwrap();
        assert_eq!(info.items_dropped, 1);
    }

    #[test]
    fn delete_note_by_id_removes_file_and_prunes_dirs() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        let note = save_note(&root, dir.path(), &cfg, basic_input(vec!["src/a.ts"])).unwrap();
        assert!(delete_note_by_id(&root, &note.id).unwrap());
        assert!(get_note_by_id(&root, &note.id).unwrap().is_none());
        assert!(!delete_note_by_id(&root, &note.id).unwrap());
    }

    #[test]
    fn check_stale_notes_flags_missing_anchor() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        save_note(&root, dir.path(), &cfg, basic_input(vec!["src/a.ts"])).unwrap();
        fs::remove_file(dir.path().join("src/a.ts")).unwrap();

        let stale = check_stale_notes(&root).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].stale_anchors, vec!["src/a.ts".to_string()]);
    }

    #[test]
    fn tag_enforcement_rejects_undeclared_tag() {
        let (dir, root) = repo();
        let mut cfg = Configuration::default();
        cfg.tags.enforce_allowed_tags = true;
        save_tag_description(&root, "approved", "An approved tag").unwrap();

        let mut input = basic_input(vec!["src/a.ts"]);
        input.tags = vec!["not-approved".to_string()];
        let err = save_note(&root, dir.path(), &cfg, input).unwrap_err();
        assert!(matches!(err, SaveNoteError::Validation(_)));
    }

    #[test]
    fn enforcement_with_empty_declared_set_behaves_like_enforcement_off() {
        let (dir, root) = repo();
        let mut cfg = Configuration::default();
        cfg.tags.enforce_allowed_tags = true;
        let note = save_note(&root, dir.path(), &cfg, basic_input(vec!["src/a.ts"])).unwrap();
        assert_eq!(note.tags, vec!["x".to_string()]);
    }

    #[test]
    fn render_message_uses_default_when_no_overlay() {
        let kind = ValidationErrorKind::NoteTooLong {
            actual: 6,
            limit: 5,
            over_by: 1,
            percentage: 120.0,
        };
        assert!(kind.render_message(None).contains("6 characters"));
    }

    #[test]
    fn render_message_substitutes_overlay_template() {
        use crate::core::config::ValidationMessages;
        let mut templates = std::collections::BTreeMap::new();
        templates.insert("noteTooLong".to_string(), "Too long: {actual}/{limit} (+{overBy})".to_string());
        let messages = ValidationMessages { templates };

        let kind = ValidationErrorKind::NoteTooLong {
            actual: 6,
            limit: 5,
            over_by: 1,
            percentage: 120.0,
        };
        assert_eq!(kind.render_message(Some(&messages)), "Too long: 6/5 (+1)");
    }

    #[test]
    fn delete_tag_sweep_removes_tag_from_notes() {
        let (dir, root) = repo();
        let cfg = Configuration::default();
        let note = save_note(&root, dir.path(), &cfg, basic_input(vec!["src/a.ts"])).unwrap();
        assert_eq!(note.tags, vec!["x".to_string()]);

        delete_tag_description(&root, "x", true).unwrap();
        let refreshed = get_note_by_id(&root, &note.id).unwrap().unwrap();
        assert!(refreshed.tags.is_empty());
    }
}
