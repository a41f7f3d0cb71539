//! Lint Engine (component C6): a fixed registry of rules that check the store against the
//! working tree, producing structured diagnostics.

pub mod rules;

use std::path::PathBuf;

use ignore::WalkBuilder;
use rustc_hash::FxHashSet;

use crate::core::config::Configuration;
use crate::core::layout::{self, LEGACY_DIR, PRIMARY_DIR};
use crate::core::notes::Note;
use crate::core::path::{self, RepoRoot};
use crate::core::views::View;
use crate::core::vcs::{self, HistoryProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single finding emitted by a rule's `check`.
#[derive(Debug, Clone)]
pub struct Violation {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub message: String,
    pub file: Option<PathBuf>,
    pub fixable: bool,
}

/// A named, tagged rule value. `check` never mutates anything it's handed.
pub struct Rule {
    pub id: &'static str,
    pub name: &'static str,
    pub default_severity: Severity,
    pub category: &'static str,
    pub description: &'static str,
    pub impact: &'static str,
    pub fixable: bool,
    pub enabled: bool,
    pub check: fn(&LintContext) -> Vec<Violation>,
}

/// Everything a rule is allowed to look at. Built once per `run`, never mutated.
pub struct LintContext {
    pub root: RepoRoot,
    pub views: Vec<View>,
    pub notes: Vec<(Note, PathBuf)>,
    pub markdown_files: Vec<PathBuf>,
    /// Repo-relative, forward-slashed path of every tracked file in the working tree (data
    /// directory excluded), for O(1) existence checks in `orphaned-references`.
    pub working_tree_files: FxHashSet<String>,
    pub config: Configuration,
    pub history: Box<dyn HistoryProvider>,
}

pub fn built_in_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "require-view-association",
            name: "Require View Association",
            default_severity: Severity::Error,
            category: "completeness",
            description: "Every markdown file in the working tree should be associated with a view or a note.",
            impact: "Documentation that isn't linked from any view or note is easy to lose track of.",
            fixable: false,
            enabled: true,
            check: rules::require_view_association,
        },
        Rule {
            id: "orphaned-references",
            name: "Orphaned References",
            default_severity: Severity::Error,
            category: "integrity",
            description: "Every file referenced by a view cell or a note anchor should exist.",
            impact: "A reference to a deleted or renamed file silently stops documenting anything.",
            fixable: false,
            enabled: true,
            check: rules::orphaned_references,
        },
        Rule {
            id: "stale-context",
            name: "Stale Context",
            default_severity: Severity::Warning,
            category: "freshness",
            description: "An overview or note should not predate changes to the files it documents.",
            impact: "Stale documentation misleads readers about the current state of the code.",
            fixable: false,
            enabled: true,
            check: rules::stale_context,
        },
        Rule {
            id: "document-organization",
            name: "Document Organization",
            default_severity: Severity::Warning,
            category: "organization",
            description: "Markdown files should live in an allowed documentation folder or the repo root.",
            impact: "Scattered documentation is harder for both humans and tooling to discover.",
            fixable: false,
            enabled: true,
            check: rules::document_organization,
        },
    ]
}

/// Per-invocation overrides layered onto the built-in registry's defaults.
#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    pub enabled_rules: Option<Vec<String>>,
    pub disabled_rules: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LintResult {
    pub violations: Vec<Violation>,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub fixable_count: usize,
}

/// Build the shared context once, then run every enabled rule over it in parallel (rules never
/// mutate state, so fan-out is safe) and collect violations into a single result.
pub fn run(root: &RepoRoot, options: &LintOptions) -> LintResult {
    let context = build_context(root);

    let rules: Vec<Rule> = built_in_rules()
        .into_iter()
        .filter(|rule| {
            if options.disabled_rules.iter().any(|id| id == rule.id) {
                return false;
            }
            match &options.enabled_rules {
                Some(allowed) => allowed.iter().any(|id| id == rule.id),
                None => rule.enabled,
            }
        })
        .collect();

    use rayon::prelude::*;
    let violations: Vec<Violation> = rules
        .par_iter()
        .flat_map(|rule| (rule.check)(&context))
        .collect();

    let mut result = LintResult {
        error_count: violations.iter().filter(|v| v.severity == Severity::Error).count(),
        warning_count: violations.iter().filter(|v| v.severity == Severity::Warning).count(),
        info_count: violations.iter().filter(|v| v.severity == Severity::Info).count(),
        fixable_count: violations.iter().filter(|v| v.fixable).count(),
        violations,
    };
    result.violations.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.rule_id.cmp(b.rule_id)));
    result
}

#[cfg(test)]
pub(crate) fn build_context_for_test(root: &RepoRoot) -> LintContext {
    build_context(root)
}

fn build_context(root: &RepoRoot) -> LintContext {
    let views = crate::core::views::list_views(root);
    let notes = crate::core::notes::read_all_notes_with_paths(root);
    let config = crate::core::config::read_effective(&layout::DataDir::resolve(root));
    let markdown_files = collect_markdown_files(root.as_path());
    let working_tree_files = collect_working_tree_files(root);
    let history = vcs::detect(root.as_path());

    LintContext {
        root: root.clone(),
        views,
        notes,
        markdown_files,
        working_tree_files,
        config,
        history,
    }
}

/// Gitignore-aware walk of every file in the working tree, converted to forward-slashed
/// repo-relative strings so membership checks never touch the filesystem again.
fn collect_working_tree_files(root: &RepoRoot) -> FxHashSet<String> {
    let mut files = FxHashSet::default();
    let walker = WalkBuilder::new(root.as_path())
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build();

    for entry in walker.flatten() {
        let p = entry.path();
        if !p.is_file() {
            continue;
        }
        if p.components().any(|c| {
            let name = c.as_os_str();
            name == PRIMARY_DIR || name == LEGACY_DIR
        }) {
            continue;
        }
        if let Ok(rel) = path::repo_relative(root, p) {
            files.insert(rel);
        }
    }
    files
}

/// Gitignore-aware walk of the working tree for `.md` files, explicitly excluding the data
/// directory (its own markdown, such as `note-guidance.md`, isn't subject to these rules).
fn collect_markdown_files(root: &std::path::Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        if path.components().any(|c| {
            let name = c.as_os_str();
            name == PRIMARY_DIR || name == LEGACY_DIR
        }) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    files.sort();
    files
}
