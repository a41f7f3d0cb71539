//! CLI struct definitions for the `a24z` command-line interface.
//!
//! All clap-derived types live here; dispatch logic lives in `main.rs`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    name = "a24z",
    version = env!("CARGO_PKG_VERSION"),
    about = "A repository-embedded knowledge store: notes, codebase views, and a consistency lint engine."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    /// Repository directory to operate on (defaults to the current directory).
    #[clap(long, global = true)]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and write a default configuration.
    Init {
        /// Overwrite an existing configuration.json with the defaults.
        #[clap(long)]
        force: bool,
    },
    /// Enumerate codebase views.
    List {
        /// Emit JSON instead of a formatted table.
        #[clap(long)]
        json: bool,
    },
    /// Derive a codebase view's grid from a markdown document's section structure.
    FromDoc {
        /// The markdown file to extract a structure from.
        file: PathBuf,
        /// Display name for the resulting view (defaults to the file's stem).
        #[clap(long)]
        name: Option<String>,
        /// Description for the resulting view.
        #[clap(long, default_value = "")]
        description: String,
        /// Also save a `default`-id clone of this view.
        #[clap(long)]
        default: bool,
    },
    /// Validate every saved view and report structural/semantic issues.
    ValidateAll {
        /// Only report critical (save-blocking) issues.
        #[clap(long)]
        errors_only: bool,
        /// Only print the issues, not a per-view summary line.
        #[clap(long)]
        issues_only: bool,
        /// Restrict validation to these view ids.
        #[clap(long = "views", num_args = 0..)]
        views: Vec<String>,
    },
    /// Run the lint engine over the store and working tree.
    Lint {
        /// Only report error-severity violations.
        #[clap(long)]
        errors_only: bool,
        /// Emit the result as JSON.
        #[clap(long)]
        json: bool,
        /// Suppress per-violation output; print only the summary line.
        #[clap(long)]
        quiet: bool,
        /// Run only these rule ids (default: every enabled built-in rule).
        #[clap(long = "enable", num_args = 0..)]
        enable: Vec<String>,
        /// Skip these rule ids even if otherwise enabled.
        #[clap(long = "disable", num_args = 0..)]
        disable: Vec<String>,
    },
    /// Manage the version-control pre-commit hook that runs `validate-all` and `lint`.
    Hooks {
        /// Install the hook, backing up any existing one.
        #[clap(long)]
        init: bool,
        /// Install the hook (alias for `--init`; fails if one already exists).
        #[clap(long)]
        add: bool,
        /// Remove a previously installed hook.
        #[clap(long)]
        remove: bool,
        /// Report whether a hook is currently installed, without changing anything.
        #[clap(long)]
        check: bool,
    },
    /// Create, inspect, and remove notes.
    Note(NoteCli),
    /// Manage tag descriptions in the declared-tags taxonomy.
    Tag(TagCli),
    /// Manage type descriptions in the declared-types taxonomy.
    Type(TypeCli),
}

#[derive(clap::Args, Debug)]
pub struct NoteCli {
    #[clap(subcommand)]
    pub command: NoteCommand,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Validate and persist a new note.
    Save {
        /// The note's body text.
        #[clap(long)]
        note: String,
        /// Repo-relative or absolute anchor paths (at least one required).
        #[clap(long = "anchor", required = true, num_args = 1..)]
        anchors: Vec<String>,
        /// Tags to attach.
        #[clap(long = "tag", num_args = 0..)]
        tags: Vec<String>,
        /// Note type (default taxonomy: decision, pattern, gotcha, explanation).
        #[clap(long = "type", default_value = "explanation")]
        note_type: String,
        /// Mark the note reviewed on creation.
        #[clap(long)]
        reviewed: bool,
        /// Opaque guidance token to persist verbatim alongside the note.
        #[clap(long)]
        guidance_token: Option<String>,
    },
    /// Fetch a note by id.
    Get {
        id: String,
        /// Emit JSON instead of the note body.
        #[clap(long)]
        json: bool,
    },
    /// Delete a note by id.
    Delete { id: String },
    /// List notes relevant to a path, newest-first within each relevance tier.
    List {
        /// Path to find relevant notes for (defaults to the repository root).
        path: Option<PathBuf>,
        /// Also include notes reached only through the path's ancestry.
        #[clap(long, default_value_t = true)]
        include_parents: bool,
        /// Cap the result to this many notes.
        #[clap(long)]
        limit: Option<usize>,
        /// Cap the result to this many tokens instead of a flat count.
        #[clap(long)]
        limit_tokens: Option<usize>,
        /// Emit JSON instead of a formatted list.
        #[clap(long)]
        json: bool,
    },
    /// List notes with at least one anchor that no longer exists on disk.
    Stale {
        #[clap(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct TagCli {
    #[clap(subcommand)]
    pub command: TagCommand,
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    /// Declare a tag by writing its description file.
    Add {
        name: String,
        #[clap(long, default_value = "")]
        description: String,
    },
    /// Remove a declared tag's description file.
    Remove {
        name: String,
        /// Also rewrite every note that carries this tag, removing it.
        #[clap(long)]
        sweep: bool,
    },
    /// List declared tag names.
    List,
}

#[derive(clap::Args, Debug)]
pub struct TypeCli {
    #[clap(subcommand)]
    pub command: TypeCommand,
}

#[derive(Subcommand, Debug)]
pub enum TypeCommand {
    /// Declare a type by writing its description file.
    Add {
        name: String,
        #[clap(long, default_value = "")]
        description: String,
    },
    /// Remove a declared type's description file.
    Remove { name: String },
    /// List declared type names.
    List,
}
