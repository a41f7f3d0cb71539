use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn run_a24z(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_a24z"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to execute a24z")
}

fn init_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    dir
}

#[test]
fn init_creates_data_directory_and_configuration() {
    let dir = init_repo();
    let out = run_a24z(dir.path(), &["init"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(dir.path().join(".a24z/configuration.json").exists());
    assert!(dir.path().join(".a24z/note-guidance.md").exists());
    assert!(dir.path().join(".a24z/types/decision.md").exists());
}

#[test]
fn note_save_then_list_round_trips_through_the_cli() {
    let dir = init_repo();
    fs::write(dir.path().join("a.ts"), "export const a = 1;").unwrap();
    assert!(run_a24z(dir.path(), &["init"]).status.success());

    let save = run_a24z(dir.path(), &["note", "save", "--note", "uses atomic rename", "--anchor", "a.ts"]);
    assert!(save.status.success(), "{}", String::from_utf8_lossy(&save.stderr));

    let list = run_a24z(dir.path(), &["note", "list", "--json"]);
    assert!(list.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&list.stdout).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
}

#[test]
fn lint_exits_nonzero_when_a_view_references_a_missing_file() {
    let dir = init_repo();
    assert!(run_a24z(dir.path(), &["init"]).status.success());
    fs::write(
        dir.path().join("overview.md"),
        "# Title\n\n## Core\nSee `gone.ts`.\n",
    )
    .unwrap();

    let from_doc = run_a24z(dir.path(), &["from-doc", "overview.md"]);
    assert!(from_doc.status.success(), "{}", String::from_utf8_lossy(&from_doc.stderr));

    let lint = run_a24z(dir.path(), &["lint", "--json"]);
    assert_eq!(lint.status.code(), Some(1));
    let parsed: serde_json::Value = serde_json::from_slice(&lint.stdout).unwrap();
    assert!(parsed.as_array().unwrap().iter().any(|v| v["rule_id"] == "orphaned-references"));
}

#[test]
fn lint_exits_nonzero_on_warnings_only_by_default_but_zero_under_errors_only() {
    let dir = init_repo();
    assert!(run_a24z(dir.path(), &["init"]).status.success());
    fs::write(dir.path().join("notes.md"), "stray notes").unwrap();

    let save = run_a24z(
        dir.path(),
        &["note", "save", "--note", "covers notes.md", "--anchor", "notes.md"],
    );
    assert!(save.status.success(), "{}", String::from_utf8_lossy(&save.stderr));

    let default_run = run_a24z(dir.path(), &["lint", "--json"]);
    let parsed: serde_json::Value = serde_json::from_slice(&default_run.stdout).unwrap();
    assert!(parsed
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v["rule_id"] == "document-organization" && v["severity"] == "warning"));
    assert_eq!(default_run.status.code(), Some(1));

    let errors_only_run = run_a24z(dir.path(), &["lint", "--json", "--errors-only"]);
    assert!(errors_only_run.status.success(), "{}", String::from_utf8_lossy(&errors_only_run.stderr));
}

#[test]
fn validate_all_reports_clean_store_as_exit_zero() {
    let dir = init_repo();
    assert!(run_a24z(dir.path(), &["init"]).status.success());
    let validate = run_a24z(dir.path(), &["validate-all"]);
    assert!(validate.status.success(), "{}", String::from_utf8_lossy(&validate.stderr));
}

#[test]
fn hooks_init_installs_a_managed_pre_commit_hook() {
    let dir = init_repo();
    fs::create_dir_all(dir.path().join(".git/hooks")).unwrap();
    assert!(run_a24z(dir.path(), &["init"]).status.success());

    let hooks = run_a24z(dir.path(), &["hooks", "--init"]);
    assert!(hooks.status.success(), "{}", String::from_utf8_lossy(&hooks.stderr));
    let hook_path = dir.path().join(".git/hooks/pre-commit");
    assert!(hook_path.exists());

    let check = run_a24z(dir.path(), &["hooks", "--check"]);
    assert!(check.status.success());
    assert!(String::from_utf8_lossy(&check.stdout).contains("installed"));
}
