use std::collections::BTreeMap;
use std::fs;

use a24z::core::config::Configuration;
use a24z::core::notes::{self, NoteInput};
use a24z::core::path::RepoRoot;
use a24z::core::views::{self, Cell, GenerationType, NewView, ViewMetadata};
use tempfile::tempdir;

fn repo() -> (tempfile::TempDir, RepoRoot) {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/a.ts"), "export const a = 1;").unwrap();
    (dir, RepoRoot::trust(dir.path()))
}

#[test]
fn save_then_get_note_by_id_round_trips() {
    let (dir, root) = repo();
    let cfg = Configuration::default();
    let saved = notes::save_note(
        &root,
        dir.path(),
        &cfg,
        NoteInput {
            note: "hello world".to_string(),
            anchors: vec!["src/a.ts".to_string()],
            tags: vec!["x".to_string()],
            note_type: "explanation".to_string(),
            reviewed: None,
            metadata: serde_json::Map::new(),
            guidance_token: None,
        },
    )
    .unwrap();

    assert!(regex::Regex::new(r"^note-\d+-[a-z0-9]+$").unwrap().is_match(&saved.id));
    let on_disk = dir.path().join(".a24z/notes");
    assert!(!notes::read_all_notes_with_paths(&root).is_empty());

    let fetched = notes::get_note_by_id(&root, &saved.id).unwrap().unwrap();
    assert_eq!(fetched, saved);
    assert!(on_disk.exists());
}

#[test]
fn note_with_anchor_outside_repo_is_never_written() {
    let (dir, root) = repo();
    let cfg = Configuration::default();
    let err = notes::save_note(
        &root,
        dir.path(),
        &cfg,
        NoteInput {
            note: "sneaky".to_string(),
            anchors: vec!["../../etc/passwd".to_string()],
            tags: vec![],
            note_type: "explanation".to_string(),
            reviewed: None,
            metadata: serde_json::Map::new(),
            guidance_token: None,
        },
    )
    .unwrap_err();

    assert!(matches!(err, notes::SaveNoteError::Validation(_)));
    assert!(notes::read_all_notes_with_paths(&root).is_empty());
}

#[test]
fn token_budgeted_lookup_keeps_at_least_one_note() {
    let (dir, root) = repo();
    let cfg = Configuration::default();
    let long_note = "word ".repeat(300);
    for _ in 0..2 {
        notes::save_note(
            &root,
            dir.path(),
            &cfg,
            NoteInput {
                note: long_note.clone(),
                anchors: vec!["src/a.ts".to_string()],
                tags: vec![],
                note_type: "explanation".to_string(),
                reviewed: None,
                metadata: serde_json::Map::new(),
                guidance_token: None,
            },
        )
        .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let limited = notes::get_notes_for_path_with_limit(
        &root,
        &dir.path().join("src/a.ts"),
        true,
        notes::LimitType::Tokens,
        5,
    )
    .unwrap();
    assert_eq!(limited.notes.len(), 1);
    assert_eq!(limited.token_info.unwrap().items_dropped, 1);
}

#[test]
fn save_view_then_list_then_revalidate_after_file_removed() {
    let (dir, root) = repo();
    let mut cells = BTreeMap::new();
    cells.insert(
        "main".to_string(),
        Cell {
            files: vec!["src/a.ts".to_string()],
            coordinates: (0, 0),
        },
    );
    let result = views::save_view_with_validation(
        &root,
        NewView {
            name: "Main".to_string(),
            description: "core module".to_string(),
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
    assert!(result.is_valid);
    let view = result.validated_view.unwrap();

    let listed = views::list_views(&root);
    assert_eq!(listed, vec![view.clone()]);
    assert!(views::revalidate(&root, &view).issues.is_empty());

    fs::remove_file(dir.path().join("src/a.ts")).unwrap();
    let revalidated = views::revalidate(&root, &view);
    assert!(revalidated.is_valid);
    assert_eq!(revalidated.issues.len(), 1);
}

#[test]
fn from_doc_structure_extraction_maps_sections_to_rows() {
    let markdown = "# Title\n\n## Setup\nSee `src/a.ts` for the entry point.\n\n## Usage\nNothing else here.\n";
    let extracted = views::extract_structure(markdown);
    assert_eq!(extracted.rows, 2);
    assert!(extracted.cells.contains_key("setup"));
    assert_eq!(extracted.cells["setup"].files, vec!["src/a.ts".to_string()]);
}

#[test]
fn tag_description_round_trips_through_declared_tags() {
    let (_dir, root) = repo();
    notes::save_tag_description(&root, "perf", "Performance-sensitive code").unwrap();
    let data_dir = a24z::core::layout::DataDir::resolve(&root);
    assert_eq!(notes::declared_tags(&data_dir), vec!["perf".to_string()]);

    notes::delete_tag_description(&root, "perf", false).unwrap();
    assert!(notes::declared_tags(&data_dir).is_empty());
}
