//! Version-control history access, abstracted behind a narrow trait so the core never hard-
//! depends on a particular VCS. The `stale-context` lint rule is the only consumer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

/// "Last modification timestamp for a path", the one capability the lint engine needs from
/// version-control metadata.
pub trait HistoryProvider: Send + Sync {
    /// Epoch-millisecond timestamp of the most recent commit touching `path`, or `None` if
    /// unavailable (no VCS, path untracked, command failure). Never errors: unavailability is
    /// a valid, silently-degraded answer.
    fn last_modified_ms(&self, path: &Path) -> Option<i64>;
}

/// Shells out to `git log -1 --format=%ct -- <path>`, caching results in-process since a lint
/// run may ask about the same path from more than one rule.
pub struct GitHistoryProvider {
    repo_root: PathBuf,
    cache: Mutex<HashMap<PathBuf, Option<i64>>>,
}

impl GitHistoryProvider {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        GitHistoryProvider {
            repo_root: repo_root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn query(&self, path: &Path) -> Option<i64> {
        let output = Command::new("git")
            .args(["log", "-1", "--format=%ct", "--", path.to_str()?])
            .current_dir(&self.repo_root)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let secs: i64 = stdout.trim().parse().ok()?;
        Some(secs * 1000)
    }
}

impl HistoryProvider for GitHistoryProvider {
    fn last_modified_ms(&self, path: &Path) -> Option<i64> {
        if let Some(cached) = self.cache.lock().unwrap().get(path) {
            return *cached;
        }
        let result = self.query(path);
        self.cache.lock().unwrap().insert(path.to_path_buf(), result);
        result
    }
}

/// Always returns `None`. Used when version-control metadata is unavailable, so
/// history-dependent rules degrade silently rather than erroring.
pub struct NullHistoryProvider;

impl HistoryProvider for NullHistoryProvider {
    fn last_modified_ms(&self, _path: &Path) -> Option<i64> {
        None
    }
}

/// Choose a `GitHistoryProvider` if `repo_root` has a `.git` directory, else the null provider.
pub fn detect(repo_root: &Path) -> Box<dyn HistoryProvider> {
    if repo_root.join(".git").is_dir() {
        Box::new(GitHistoryProvider::new(repo_root))
    } else {
        Box::new(NullHistoryProvider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_provider_always_none() {
        let provider = NullHistoryProvider;
        assert_eq!(provider.last_modified_ms(Path::new("anything.md")), None);
    }

    #[test]
    fn detect_falls_back_to_null_without_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let provider = detect(dir.path());
        assert_eq!(provider.last_modified_ms(Path::new("x.md")), None);
    }
}
