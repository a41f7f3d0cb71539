//! `a24z` CLI: a thin dispatch layer over the library crate. Parses arguments, resolves a
//! repository root, calls into `a24z::core`/`a24z::lint`, and renders the result - validation
//! and lint results are data the core already produced, not something this layer interprets.

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;

use a24z::core::layout::{self, DataDir};
use a24z::core::notes::{self, LimitType, NoteInput};
use a24z::core::output;
use a24z::core::path::{self, RepoRoot};
use a24z::core::views::{self, GenerationType, NewView, ViewMetadata};
use a24z::core::{assets, config};
use a24z::lint;

use cli::{Cli, Command, NoteCommand, NoteCli, TagCli, TagCommand, TypeCli, TypeCommand};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let start_dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    match cli.command {
        Command::Init { force } => cmd_init(&start_dir, force),
        Command::List { json } => cmd_list(&start_dir, json),
        Command::FromDoc { file, name, description, default } => cmd_from_doc(&start_dir, &file, name, description, default),
        Command::ValidateAll { errors_only, issues_only, views } => cmd_validate_all(&start_dir, errors_only, issues_only, &views),
        Command::Lint { errors_only, json, quiet, enable, disable } => cmd_lint(&start_dir, errors_only, json, quiet, enable, disable),
        Command::Hooks { init, add, remove, check } => cmd_hooks(&start_dir, init, add, remove, check),
        Command::Note(note_cli) => cmd_note(&start_dir, note_cli),
        Command::Tag(tag_cli) => cmd_tag(&start_dir, tag_cli),
        Command::Type(type_cli) => cmd_type(&start_dir, type_cli),
    }
}

fn resolve_root(start_dir: &Path) -> Result<RepoRoot> {
    path::discover_root(start_dir).map_err(|e| anyhow!("{e}"))
}

// ===== init =====

fn cmd_init(start_dir: &Path, force: bool) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    let data_dir = DataDir::resolve(&root);
    config::ensure_data_dir(&data_dir)?;

    let config_path = data_dir.configuration_file();
    if !config_path.exists() || force {
        config::write_default(&data_dir)?;
        println!("{} wrote {}", "✓".green(), config_path.display());
    } else {
        println!("{} {} already exists (use --force to overwrite)", "•".yellow(), config_path.display());
    }

    let guidance_path = data_dir.note_guidance_file();
    if !guidance_path.exists() || force {
        layout::atomic_write(&guidance_path, assets::note_guidance().as_bytes())?;
        println!("{} wrote {}", "✓".green(), guidance_path.display());
    }

    for type_name in assets::DEFAULT_TYPES {
        let type_path = data_dir.type_file(type_name);
        if !type_path.exists() || force {
            let description = assets::default_type_description(type_name).unwrap_or_default();
            layout::atomic_write(&type_path, description.as_bytes())?;
        }
    }
    println!("{} seeded {} default types", "✓".green(), assets::DEFAULT_TYPES.len());

    println!("{} initialized a24z store at {}", "✓".green().bold(), data_dir.root().display());
    Ok(ExitCode::SUCCESS)
}

// ===== list =====

fn cmd_list(start_dir: &Path, json: bool) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    let mut all_views = views::list_views(&root);
    all_views.sort_by(|a, b| a.id.cmp(&b.id));

    if json {
        println!("{}", serde_json::to_string_pretty(&all_views)?);
        return Ok(ExitCode::SUCCESS);
    }

    if all_views.is_empty() {
        println!("{}", "no views saved yet".bright_black());
        return Ok(ExitCode::SUCCESS);
    }

    for view in &all_views {
        println!(
            "{}  {}x{}  {}",
            view.id.bold(),
            view.rows,
            view.cols,
            view.name.bright_black()
        );
    }
    Ok(ExitCode::SUCCESS)
}

// ===== from-doc =====

fn cmd_from_doc(start_dir: &Path, file: &Path, name: Option<String>, description: String, default: bool) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    let markdown = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let extracted = views::extract_structure(&markdown);

    let name = name.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "view".to_string())
    });

    let overview_path = path::repo_relative(&root, file).ok();

    let input = NewView {
        name,
        description,
        rows: extracted.rows,
        cols: extracted.cols,
        cells: extracted.cells,
        overview_path,
        overview_content: None,
        metadata: ViewMetadata {
            generation_type: GenerationType::Machine,
            label_position: None,
            show_labels: None,
        },
        default,
    };

    let result = views::save_view_with_validation(&root, input)?;
    print_view_issues(&result.issues);

    match &result.validated_view {
        Some(view) => {
            println!("{} saved view '{}'", "✓".green().bold(), view.id);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("{} view was not saved", "✗".red().bold());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_view_issues(issues: &[views::ValidationIssue]) {
    use a24z::core::views::IssueSeverity;
    for issue in issues {
        match issue.severity {
            IssueSeverity::Critical => println!("  {} {}", "✗".red(), issue.message),
            IssueSeverity::Warning => println!("  {} {}", "!".yellow(), issue.message),
        }
    }
}

// ===== validate-all =====

fn cmd_validate_all(start_dir: &Path, errors_only: bool, issues_only: bool, view_filter: &[String]) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    let mut all_views = views::list_views(&root);
    all_views.sort_by(|a, b| a.id.cmp(&b.id));

    let mut any_issue = false;
    let mut any_critical = false;

    for view in &all_views {
        if !view_filter.is_empty() && !view_filter.contains(&view.id) {
            continue;
        }
        let result = views::revalidate(&root, view);
        let issues: Vec<&views::ValidationIssue> = result
            .issues
            .iter()
            .filter(|i| !errors_only || i.severity == views::IssueSeverity::Critical)
            .collect();

        if !issues.is_empty() {
            any_issue = true;
        }
        if result.issues.iter().any(|i| i.severity == views::IssueSeverity::Critical) {
            any_critical = true;
        }

        if !issues_only {
            let label = if result.is_valid { "✓".green() } else { "✗".red() };
            println!("{label} {} ({} issue(s))", view.id.bold(), issues.len());
        }
        for issue in issues {
            match issue.severity {
                views::IssueSeverity::Critical => println!("  {} {}", "✗".red(), issue.message),
                views::IssueSeverity::Warning => println!("  {} {}", "!".yellow(), issue.message),
            }
        }
    }

    if !any_issue {
        println!("{}", "all views valid".green().bold());
    }

    Ok(if any_critical || (!errors_only && any_issue) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

// ===== lint =====

fn cmd_lint(start_dir: &Path, errors_only: bool, json: bool, quiet: bool, enable: Vec<String>, disable: Vec<String>) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    let options = lint::LintOptions {
        enabled_rules: if enable.is_empty() { None } else { Some(enable) },
        disabled_rules: disable,
    };
    let result = lint::run(&root, &options);

    let shown: Vec<&lint::Violation> = result
        .violations
        .iter()
        .filter(|v| !errors_only || v.severity == lint::Severity::Error)
        .collect();

    if json {
        #[derive(serde::Serialize)]
        struct JsonViolation<'a> {
            rule_id: &'a str,
            severity: &'a str,
            message: &'a str,
            file: Option<String>,
            fixable: bool,
        }
        let payload: Vec<JsonViolation> = shown
            .iter()
            .map(|v| JsonViolation {
                rule_id: v.rule_id,
                severity: severity_str(v.severity),
                message: &v.message,
                file: v.file.as_ref().map(|p| p.display().to_string()),
                fixable: v.fixable,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(exit_for_lint(&result, errors_only));
    }

    if !quiet {
        for violation in &shown {
            let badge = match violation.severity {
                lint::Severity::Error => "error".red().bold(),
                lint::Severity::Warning => "warn".yellow().bold(),
                lint::Severity::Info => "info".cyan().bold(),
            };
            let location = violation
                .file
                .as_ref()
                .map(|p| format!(" [{}]", p.display()))
                .unwrap_or_default();
            println!("{badge} {}{location}: {}", violation.rule_id, violation.message);
        }
    }

    println!(
        "{} {} error(s), {} warning(s), {} info, {} fixable",
        if result.error_count > 0 { "✗".red() } else { "✓".green() },
        result.error_count,
        result.warning_count,
        result.info_count,
        result.fixable_count
    );

    Ok(exit_for_lint(&result, errors_only))
}

fn exit_for_lint(result: &lint::LintResult, errors_only: bool) -> ExitCode {
    let failed = if errors_only {
        result.error_count > 0
    } else {
        !result.violations.is_empty()
    };
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn severity_str(severity: lint::Severity) -> &'static str {
    match severity {
        lint::Severity::Error => "error",
        lint::Severity::Warning => "warning",
        lint::Severity::Info => "info",
    }
}

// ===== hooks =====

const HOOK_MARKER: &str = "# managed-by: a24z hooks";

fn hook_script() -> String {
    format!(
        "#!/bin/sh\n{HOOK_MARKER}\nset -e\na24z validate-all --errors-only\na24z lint --errors-only\n"
    )
}

fn cmd_hooks(start_dir: &Path, init: bool, add: bool, remove: bool, check: bool) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    let hooks_dir = root.as_path().join(".git/hooks");
    let hook_path = hooks_dir.join("pre-commit");

    if check {
        let installed = hook_path.exists()
            && std::fs::read_to_string(&hook_path).map(|c| c.contains(HOOK_MARKER)).unwrap_or(false);
        println!(
            "{}",
            if installed { "hook installed".green().to_string() } else { "hook not installed".yellow().to_string() }
        );
        return Ok(ExitCode::SUCCESS);
    }

    if remove {
        if hook_path.exists() {
            let contents = std::fs::read_to_string(&hook_path).unwrap_or_default();
            if !contents.contains(HOOK_MARKER) {
                return Err(anyhow!("refusing to remove {}: not managed by a24z", hook_path.display()));
            }
            std::fs::remove_file(&hook_path).with_context(|| format!("failed to remove {}", hook_path.display()))?;
            println!("{} removed {}", "✓".green(), hook_path.display());
        } else {
            println!("{}", "no hook installed".bright_black());
        }
        return Ok(ExitCode::SUCCESS);
    }

    if init || add {
        if !hooks_dir.exists() {
            return Err(anyhow!("{} does not exist; is this a git repository?", hooks_dir.display()));
        }
        if add && hook_path.exists() {
            return Err(anyhow!("{} already exists (use --init to overwrite)", hook_path.display()));
        }
        if hook_path.exists() {
            let backup = hooks_dir.join("pre-commit.bak");
            std::fs::rename(&hook_path, &backup)?;
            println!("{} backed up existing hook to {}", "•".yellow(), backup.display());
        }
        layout::atomic_write(&hook_path, hook_script().as_bytes())?;
        set_executable(&hook_path)?;
        println!("{} installed {}", "✓".green().bold(), hook_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    Err(anyhow!("specify one of --init, --add, --remove, --check"))
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

// ===== note =====

fn cmd_note(start_dir: &Path, note_cli: NoteCli) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    let data_dir = DataDir::resolve(&root);
    let cfg = config::read_effective(&data_dir);

    match note_cli.command {
        NoteCommand::Save { note, anchors, tags, note_type, reviewed, guidance_token } => {
            let input = NoteInput {
                note,
                anchors,
                tags,
                note_type,
                reviewed: if reviewed { Some(true) } else { None },
                metadata: serde_json::Map::new(),
                guidance_token,
            };
            match notes::save_note(&root, start_dir, &cfg, input) {
                Ok(saved) => {
                    println!("{} saved {}", "✓".green().bold(), saved.id);
                    Ok(ExitCode::SUCCESS)
                }
                Err(notes::SaveNoteError::Validation(err)) => {
                    let messages = config::load_validation_messages(&data_dir);
                    println!("{} {err}", "✗".red().bold());
                    for kind in &err.0 {
                        println!("  {}", kind.render_message(messages.as_ref()));
                    }
                    Ok(ExitCode::FAILURE)
                }
                Err(notes::SaveNoteError::Store(err)) => Err(err.into()),
            }
        }
        NoteCommand::Get { id, json } => match notes::get_note_by_id(&root, &id)? {
            Some(note) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&note)?);
                } else {
                    println!("{}", note.note);
                    println!("{}", format!("anchors: {}", note.anchors.join(", ")).bright_black());
                }
                Ok(ExitCode::SUCCESS)
            }
            None => Err(anyhow!("no such note: {id}")),
        },
        NoteCommand::Delete { id } => {
            if notes::delete_note_by_id(&root, &id)? {
                println!("{} deleted {id}", "✓".green());
                Ok(ExitCode::SUCCESS)
            } else {
                Err(anyhow!("no such note: {id}"))
            }
        }
        NoteCommand::List { path, include_parents, limit, limit_tokens, json } => {
            let target = resolve_query_path(&root, start_dir, path);
            let limited = match (limit, limit_tokens) {
                (_, Some(tokens)) => notes::get_notes_for_path_with_limit(&root, &target, include_parents, LimitType::Tokens, tokens)?,
                (Some(count), None) => notes::get_notes_for_path_with_limit(&root, &target, include_parents, LimitType::Count, count)?,
                (None, None) => notes::LimitedNotes {
                    notes: notes::get_notes_for_path(&root, &target, include_parents)?,
                    token_info: None,
                },
            };
            if json {
                #[derive(serde::Serialize)]
                struct JsonMatch<'a> {
                    note: &'a a24z::core::notes::Note,
                    is_parent_directory: bool,
                    path_distance: usize,
                }
                let payload: Vec<JsonMatch> = limited
                    .notes
                    .iter()
                    .map(|m| JsonMatch {
                        note: &m.note,
                        is_parent_directory: m.is_parent_directory,
                        path_distance: m.path_distance,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for m in &limited.notes {
                    let tag = if m.is_parent_directory { "parent".bright_black() } else { "anchor".green() };
                    println!("{} [{tag}] {}", m.note.id.bold(), output::compact_line(&m.note.note, 120));
                }
                if let Some(info) = &limited.token_info {
                    println!(
                        "{}",
                        format!("{} tokens kept of {} total, {} item(s) dropped", info.tokens_kept, info.total_tokens, info.items_dropped)
                            .bright_black()
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        NoteCommand::Stale { json } => {
            let stale = notes::check_stale_notes(&root)?;
            if json {
                #[derive(serde::Serialize)]
                struct JsonStale<'a> {
                    id: &'a str,
                    stale_anchors: &'a [String],
                    valid_anchors: &'a [String],
                }
                let payload: Vec<JsonStale> = stale
                    .iter()
                    .map(|s| JsonStale {
                        id: &s.note.id,
                        stale_anchors: &s.stale_anchors,
                        valid_anchors: &s.valid_anchors,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if stale.is_empty() {
                println!("{}", "no stale notes".green());
            } else {
                for s in &stale {
                    println!("{} missing: {}", s.note.id.bold(), s.stale_anchors.join(", ").red());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_query_path(root: &RepoRoot, start_dir: &Path, path: Option<PathBuf>) -> PathBuf {
    match path {
        Some(p) if p.is_absolute() => p,
        Some(p) => start_dir.join(p),
        None => root.as_path().to_path_buf(),
    }
}

// ===== tag / type =====

fn cmd_tag(start_dir: &Path, tag_cli: TagCli) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    match tag_cli.command {
        TagCommand::Add { name, description } => {
            notes::save_tag_description(&root, &name, &description)?;
            println!("{} declared tag '{name}'", "✓".green());
            Ok(ExitCode::SUCCESS)
        }
        TagCommand::Remove { name, sweep } => {
            notes::delete_tag_description(&root, &name, sweep)?;
            println!("{} removed tag '{name}'", "✓".green());
            Ok(ExitCode::SUCCESS)
        }
        TagCommand::List => {
            let data_dir = DataDir::resolve(&root);
            for name in notes::declared_tags(&data_dir) {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cmd_type(start_dir: &Path, type_cli: TypeCli) -> Result<ExitCode> {
    let root = resolve_root(start_dir)?;
    match type_cli.command {
        TypeCommand::Add { name, description } => {
            notes::save_type_description(&root, &name, &description)?;
            println!("{} declared type '{name}'", "✓".green());
            Ok(ExitCode::SUCCESS)
        }
        TypeCommand::Remove { name } => {
            notes::delete_type_description(&root, &name)?;
            println!("{} removed type '{name}'", "✓".green());
            Ok(ExitCode::SUCCESS)
        }
        TypeCommand::List => {
            let data_dir = DataDir::resolve(&root);
            for name in notes::declared_types(&data_dir) {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
