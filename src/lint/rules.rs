//! The four built-in rules (§4.6): pure functions from a [`super::LintContext`] to a list of
//! [`super::Violation`]s. None of them mutate anything; `super::run` is what makes them safe to
//! fan out with rayon.

use std::collections::BTreeSet;
use std::path::Path;

use super::{LintContext, Severity, Violation};
use crate::core::path;

const ALLOWED_DOC_FOLDERS: &[&str] = &["docs", "documentation", "doc"];
const ROOT_EXEMPT_FILES: &[&str] = &["README.md", "LICENSE.md", "CHANGELOG.md", "CONTRIBUTING.md"];

fn violation(rule_id: &'static str, severity: Severity, message: String, file: Option<&Path>) -> Violation {
    Violation {
        rule_id,
        severity,
        message,
        file: file.map(|p| p.to_path_buf()),
        fixable: false,
    }
}

/// Every repo-relative path named by some view cell, every view's overview path, and every
/// note's anchors: the set of things this repository's knowledge store already "covers".
fn covered_paths(ctx: &LintContext) -> BTreeSet<String> {
    let mut covered = BTreeSet::new();
    for view in &ctx.views {
        for cell in view.cells.values() {
            covered.extend(cell.files.iter().cloned());
        }
        if let Some(overview) = &view.overview_path {
            covered.insert(overview.clone());
        }
    }
    for (note, _) in &ctx.notes {
        covered.extend(note.anchors.iter().cloned());
    }
    covered
}

/// Every markdown file in the working tree must be named by a view cell, a view overview, or a
/// note anchor.
pub fn require_view_association(ctx: &LintContext) -> Vec<Violation> {
    let covered = covered_paths(ctx);

    ctx.markdown_files
        .iter()
        .filter_map(|file| {
            let rel = path::repo_relative(&ctx.root, file).ok()?;
            if covered.contains(&rel) {
                None
            } else {
                Some(violation(
                    "require-view-association",
                    Severity::Error,
                    format!("'{rel}' is not referenced by any view or note"),
                    Some(file),
                ))
            }
        })
        .collect()
}

/// Every file named by a view cell or note anchor must exist in the working tree.
pub fn orphaned_references(ctx: &LintContext) -> Vec<Violation> {
    let mut out = Vec::new();

    for view in &ctx.views {
        for (cell_id, cell) in &view.cells {
            for file in &cell.files {
                if !ctx.working_tree_files.contains(file) {
                    out.push(violation(
                        "orphaned-references",
                        Severity::Error,
                        format!("view '{}' cell '{cell_id}' references missing file '{file}'", view.id),
                        None,
                    ));
                }
            }
        }
        if let Some(overview) = &view.overview_path {
            if !ctx.working_tree_files.contains(overview) {
                out.push(violation(
                    "orphaned-references",
                    Severity::Error,
                    format!("view '{}' overview '{overview}' does not exist", view.id),
                    None,
                ));
            }
        }
    }

    for (note, note_path) in &ctx.notes {
        for anchor in &note.anchors {
            if !ctx.working_tree_files.contains(anchor) {
                out.push(violation(
                    "orphaned-references",
                    Severity::Error,
                    format!("note '{}' anchors missing file '{anchor}'", note.id),
                    Some(note_path),
                ));
            }
        }
    }

    out
}

/// The freshest last-modification time among `paths`, or `None` if history is unavailable for
/// all of them (a silent degradation, not a violation in itself).
fn freshest(ctx: &LintContext, paths: impl Iterator<Item = String>) -> Option<i64> {
    paths
        .filter_map(|p| ctx.history.last_modified_ms(Path::new(&p)))
        .max()
}

fn format_gap(gap_ms: i64) -> String {
    let hours = gap_ms / (1000 * 60 * 60);
    if hours < 24 {
        if hours == 1 {
            "1 hour".to_string()
        } else {
            format!("{hours} hours")
        }
    } else {
        let days = hours / 24;
        if days == 1 {
            "1 day".to_string()
        } else {
            format!("{days} days")
        }
    }
}

/// An overview or note should not be older than the files it documents. Degrades silently (no
/// violation, not an error) wherever version-control history is unavailable for either side.
pub fn stale_context(ctx: &LintContext) -> Vec<Violation> {
    let mut out = Vec::new();

    for view in &ctx.views {
        let Some(overview) = &view.overview_path else { continue };
        let Some(overview_mtime) = ctx.history.last_modified_ms(Path::new(overview)) else { continue };
        let cell_files = view.cells.values().flat_map(|c| c.files.iter().cloned());
        let Some(newest_referenced) = freshest(ctx, cell_files) else { continue };

        if newest_referenced > overview_mtime {
            out.push(violation(
                "stale-context",
                Severity::Warning,
                format!(
                    "view '{}' overview is {} older than the files it documents",
                    view.id,
                    format_gap(newest_referenced - overview_mtime)
                ),
                Some(Path::new(overview)),
            ));
        }
    }

    for (note, note_path) in &ctx.notes {
        let Some(note_mtime) = ctx.history.last_modified_ms(note_path) else { continue };
        let Some(newest_anchor) = freshest(ctx, note.anchors.iter().cloned()) else { continue };

        if newest_anchor > note_mtime {
            out.push(violation(
                "stale-context",
                Severity::Warning,
                format!(
                    "note '{}' is {} older than the files it documents",
                    note.id,
                    format_gap(newest_anchor - note_mtime)
                ),
                Some(note_path),
            ));
        }
    }

    out
}

/// Markdown files should live in an allowed documentation folder, be one of the exempt root
/// files, or sit directly at the repo root.
pub fn document_organization(ctx: &LintContext) -> Vec<Violation> {
    ctx.markdown_files
        .iter()
        .filter_map(|file| {
            let rel = path::repo_relative(&ctx.root, file).ok()?;
            if is_well_organized(&rel) {
                None
            } else {
                Some(violation(
                    "document-organization",
                    Severity::Warning,
                    format!("'{rel}' is not under docs/documentation/doc or the repo root"),
                    Some(file),
                ))
            }
        })
        .collect()
}

fn is_well_organized(rel: &str) -> bool {
    let mut components = rel.split('/');
    let first = components.next().unwrap_or("");
    let is_root_file = components.next().is_none();

    if is_root_file {
        return ROOT_EXEMPT_FILES.contains(&rel) || rel.to_uppercase() == rel;
    }
    ALLOWED_DOC_FOLDERS.contains(&first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::DataDir;
    use crate::core::notes::{self, NoteInput};
    use crate::core::path::RepoRoot;
    use crate::core::views::{self, Cell, GenerationType, NewView, ViewMetadata};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn repo() -> (tempfile::TempDir, RepoRoot) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        (dir, RepoRoot::trust(dir.path()))
    }

    fn context(root: &RepoRoot) -> LintContext {
        super::super::build_context_for_test(root)
    }

    #[test]
    fn document_organization_flags_scattered_markdown() {
        let (dir, root) = repo();
        fs::create_dir_all(dir.path().join("random")).unwrap();
        fs::write(dir.path().join("random/notes.md"), "# x").unwrap();
        let ctx = context(&root);
        let violations = document_organization(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "document-organization");
    }

    #[test]
    fn document_organization_allows_docs_folder_and_readme() {
        let (dir, root) = repo();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/guide.md"), "# Guide").unwrap();
        fs::write(dir.path().join("README.md"), "# Readme").unwrap();
        let ctx = context(&root);
        assert!(document_organization(&ctx).is_empty());
    }

    #[test]
    fn orphaned_references_flags_missing_note_anchor() {
        let (dir, root) = repo();
        fs::write(dir.path().join("a.ts"), "x").unwrap();
        let cfg = crate::core::config::Configuration::default();
        notes::save_note(
            &root,
            dir.path(),
            &cfg,
            NoteInput {
                note: "n".to_string(),
                anchors: vec!["a.ts".to_string()],
                tags: vec![],
                note_type: "explanation".to_string(),
                reviewed: None,
                metadata: serde_json::Map::new(),
                guidance_token: None,
            },
        )
        .unwrap();
        fs::remove_file(dir.path().join("a.ts")).unwrap();

        let ctx = context(&root);
        let violations = orphaned_references(&ctx);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn require_view_association_flags_unreferenced_markdown() {
        let (dir, root) = repo();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/orphan.md"), "# Orphan").unwrap();
        let ctx = context(&root);
        let violations = require_view_association(&ctx);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn require_view_association_passes_for_view_referenced_file() {
        let (dir, root) = repo();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/guide.md"), "# Guide").unwrap();
        let mut cells = BTreeMap::new();
        cells.insert(
            "c1".to_string(),
            Cell {
                files: vec!["docs/guide.md".to_string()],
                coordinates: (0, 0),
            },
        );
        views::save_view_with_validation(
            &root,
            NewView {
                name: "Guide".to_string(),
                description: String::new(),
                rows: 1,
                cols: 1,
                cells,
                overview_path: None,
                overview_content: None,
                metadata: ViewMetadata {
                    generation_type: GenerationType::User,
                    label_position: None,
                    show_labels: None,
                },
                default: false,
            },
        )
        .unwrap();

        let ctx = context(&root);
        assert!(require_view_association(&ctx).is_empty());
    }

    #[test]
    fn data_dir_not_scanned_by_any_rule() {
        let (dir, root) = repo();
        let data = DataDir::resolve(&root);
        fs::create_dir_all(data.root()).unwrap();
        fs::write(data.note_guidance_file(), "internal").unwrap();
        let ctx = context(&root);
        assert!(ctx.markdown_files.is_empty());
    }
}
