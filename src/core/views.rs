//! Views Engine (component C5): grid-shaped codebase maps, their save/validate pipeline, and
//! the markdown structure extractor used by `from-doc` workflows.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::StoreError;
use crate::core::layout::{self, DataDir};
use crate::core::path::{self, RepoRoot};
use crate::core::time;

pub const DEFAULT_VIEW_ID: &str = "default";
const VIEW_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GenerationType {
    User,
    Machine,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewMetadata {
    #[serde(rename = "generationType")]
    pub generation_type: GenerationType,
    #[serde(rename = "labelPosition", skip_serializing_if = "Option::is_none")]
    pub label_position: Option<String>,
    #[serde(rename = "showLabels", skip_serializing_if = "Option::is_none")]
    pub show_labels: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    pub files: Vec<String>,
    pub coordinates: (i64, i64),
}

/// A view as persisted at `views/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct View {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub rows: i64,
    pub cols: i64,
    pub cells: BTreeMap<String, Cell>,
    #[serde(rename = "overviewPath", skip_serializing_if = "Option::is_none")]
    pub overview_path: Option<String>,
    pub timestamp: String,
    pub metadata: ViewMetadata,
}

/// Caller input to [`save_view_with_validation`]: everything needed to construct a [`View`]
/// except its derived id, version, and timestamp.
#[derive(Debug, Clone)]
pub struct NewView {
    pub name: String,
    pub description: String,
    pub rows: i64,
    pub cols: i64,
    pub cells: BTreeMap<String, Cell>,
    pub overview_path: Option<String>,
    pub overview_content: Option<String>,
    pub metadata: ViewMetadata,
    pub default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub validated_view: Option<View>,
    pub issues: Vec<ValidationIssue>,
    pub is_valid: bool,
}

/// Lowercase the name, collapse runs of non-alphanumerics to a single hyphen, trim hyphens.
pub fn slugify(name: &str) -> String {
    static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let lower = name.to_lowercase();
    NON_ALNUM.replace_all(&lower, "-").trim_matches('-').to_string()
}

/// Validate `input`, and on success persist it (and a `default`-id clone, if requested) and
/// write its overview file. Validation never short-circuits: every applicable check runs and
/// contributes an issue; only critical issues (empty id, shape out of range, a referenced path
/// escaping the repo root) reject the save.
pub fn save_view_with_validation(root: &RepoRoot, input: NewView) -> Result<ValidationResult, StoreError> {
    let id = slugify(&input.name);
    let (issues, normalized_overview) = validate_shape(root, &id, input.rows, input.cols, &input.cells, input.overview_path.as_deref());

    let is_valid = !issues.iter().any(|i| i.severity == IssueSeverity::Critical);
    if !is_valid {
        return Ok(ValidationResult {
            validated_view: None,
            issues,
            is_valid: false,
        });
    }

    let view = View {
        id: id.clone(),
        version: VIEW_SCHEMA_VERSION.to_string(),
        name: input.name,
        description: input.description,
        rows: input.rows,
        cols: input.cols,
        cells: input.cells,
        overview_path: normalized_overview.clone(),
        timestamp: time::now_iso8601(),
        metadata: input.metadata,
    };

    let data_dir = DataDir::resolve(root);
    layout::atomic_write_json(&data_dir.view_file(&view.id), &view)?;

    if input.default && view.id != DEFAULT_VIEW_ID {
        let mut default_clone = view.clone();
        default_clone.id = DEFAULT_VIEW_ID.to_string();
        layout::atomic_write_json(&data_dir.view_file(DEFAULT_VIEW_ID), &default_clone)?;
    }

    if let (Some(overview_rel), Some(content)) = (&normalized_overview, &input.overview_content) {
        let overview_abs = root.as_path().join(overview_rel);
        layout::atomic_write(&overview_abs, content.as_bytes())?;
    }

    Ok(ValidationResult {
        validated_view: Some(view),
        issues,
        is_valid: true,
    })
}

/// The structural/semantic checks shared by [`save_view_with_validation`] and [`revalidate`]:
/// shape, cell coordinates, cell file containment/existence, and overview containment. Returns
/// the collected issues plus the overview path normalized to repo-relative form, if valid.
fn validate_shape(
    root: &RepoRoot,
    id: &str,
    rows: i64,
    cols: i64,
    cells: &BTreeMap<String, Cell>,
    overview_path: Option<&str>,
) -> (Vec<ValidationIssue>, Option<String>) {
    let mut issues = Vec::new();

    if id.is_empty() {
        issues.push(critical("view name must contain at least one alphanumeric character"));
    }
    if rows <= 0 || cols <= 0 {
        issues.push(critical(format!("view shape must be positive, got rows={rows} cols={cols}")));
    }

    let mut seen_coordinates: Vec<(i64, i64)> = Vec::new();
    for (cell_id, cell) in cells {
        let (row, col) = cell.coordinates;
        if row < 0 || row >= rows || col < 0 || col >= cols {
            issues.push(critical(format!(
                "cell '{cell_id}' coordinates ({row}, {col}) are out of range for a {rows}x{cols} grid"
            )));
        } else if seen_coordinates.contains(&(row, col)) {
            issues.push(warning(format!(
                "cell '{cell_id}' shares coordinates ({row}, {col}) with another cell"
            )));
        } else {
            seen_coordinates.push((row, col));
        }

        for file in &cell.files {
            match path::repo_relative(root, Path::new(file)) {
                Ok(_) => {
                    if !root.as_path().join(file).exists() {
                        issues.push(warning(format!(
                            "cell '{cell_id}' references '{file}', which does not exist in the working tree"
                        )));
                    }
                }
                Err(_) => issues.push(critical(format!(
                    "cell '{cell_id}' references '{file}', which escapes the repository root"
                ))),
            }
        }
    }

    let mut normalized_overview = None;
    if let Some(overview) = overview_path {
        match path::repo_relative(root, Path::new(overview)) {
            Ok(rel) => normalized_overview = Some(rel),
            Err(_) => issues.push(critical(format!("overview path '{overview}' escapes the repository root"))),
        }
    }

    (issues, normalized_overview)
}

fn critical(message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        severity: IssueSeverity::Critical,
        message: message.into(),
    }
}

fn warning(message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        severity: IssueSeverity::Warning,
        message: message.into(),
    }
}

/// Re-run the save-time validation checks against an already-persisted view, without writing
/// anything. Used by the `validate-all` CLI command.
pub fn revalidate(root: &RepoRoot, view: &View) -> ValidationResult {
    let (issues, _) = validate_shape(root, &view.id, view.rows, view.cols, &view.cells, view.overview_path.as_deref());
    let is_valid = !issues.iter().any(|i| i.severity == IssueSeverity::Critical);
    ValidationResult {
        validated_view: if is_valid { Some(view.clone()) } else { None },
        issues,
        is_valid,
    }
}

pub fn get_view(root: &RepoRoot, id: &str) -> Result<Option<View>, StoreError> {
    let data_dir = DataDir::resolve(root);
    let path = data_dir.view_file(id);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| StoreError::io(crate::core::error::IoCategory::Read, &path, e))?;
    let view: View = serde_json::from_str(&contents).map_err(|e| StoreError::Parse { path, cause: e })?;
    Ok(Some(view))
}

/// All views under `views/*.json`; unparseable files are skipped with a logged warning.
pub fn list_views(root: &RepoRoot) -> Vec<View> {
    let data_dir = DataDir::resolve(root);
    layout::walk_files_with_extension(&data_dir.views_dir(), "json")
        .into_iter()
        .filter_map(|path| match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<View>(&contents) {
                Ok(view) => Some(view),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable view file");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable view file");
                None
            }
        })
        .collect()
}

pub fn delete_view(root: &RepoRoot, id: &str) -> Result<bool, StoreError> {
    let data_dir = DataDir::resolve(root);
    layout::remove_and_prune(&data_dir.view_file(id), &data_dir.views_dir())
}

/// The grid a markdown document implies, for `from-doc` workflows: one row per top-level (`##`)
/// section, column 0, cell files drawn from backtick code references and markdown links that
/// look like repo paths within that section's body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedStructure {
    pub rows: i64,
    pub cols: i64,
    pub cells: BTreeMap<String, Cell>,
}

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());
static CODE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(([^)]+)\)").unwrap());

fn looks_like_path(candidate: &str) -> bool {
    !candidate.starts_with("http://")
        && !candidate.starts_with("https://")
        && candidate.contains('.')
        && !candidate.contains(' ')
        && !candidate.contains('(')
}

pub fn extract_structure(markdown: &str) -> ExtractedStructure {
    struct Section {
        name: String,
        body: String,
    }

    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for line in markdown.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            if caps[1].len() == 2 {
                if let Some(section) = current.take() {
                    sections.push(section);
                }
                current = Some(Section {
                    name: caps[2].trim().to_string(),
                    body: String::new(),
                });
                continue;
            }
        }
        if let Some(section) = current.as_mut() {
            section.body.push_str(line);
            section.body.push('\n');
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }

    if sections.is_empty() {
        return ExtractedStructure {
            rows: 1,
            cols: 1,
            cells: BTreeMap::new(),
        };
    }

    let mut cells = BTreeMap::new();
    for (row, section) in sections.iter().enumerate() {
        let mut files: Vec<String> = Vec::new();
        for caps in CODE_SPAN_RE.captures_iter(&section.body) {
            let candidate = caps[1].trim();
            if looks_like_path(candidate) {
                files.push(candidate.to_string());
            }
        }
        for caps in MD_LINK_RE.captures_iter(&section.body) {
            let candidate = caps[1].trim();
            if looks_like_path(candidate) {
                files.push(candidate.to_string());
            }
        }
        files.sort();
        files.dedup();

        let cell_id = slugify(&section.name);
        let cell_id = if cell_id.is_empty() { format!("section-{row}") } else { cell_id };
        cells.insert(
            cell_id,
            Cell {
                files,
                coordinates: (row as i64, 0),
            },
        );
    }

    ExtractedStructure {
        rows: sections.len() as i64,
        cols: 1,
        cells,
    }
}
