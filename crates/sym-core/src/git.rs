//! Git integration: collecting the changes to validate.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::change::{Change, ChangeStatus};
use crate::error::{Result, SymError};

/// Which delta to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// Working tree and index against `HEAD`.
    WorkingTree,
    /// Index only (`--cached`).
    Staged,
}

impl ChangeScope {
    fn diff_args(&self) -> &'static [&'static str] {
        match self {
            ChangeScope::WorkingTree => &["diff", "HEAD"],
            ChangeScope::Staged => &["diff", "--cached"],
        }
    }
}

fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| SymError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SymError::GitError(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Collect changed files and their diffs.
///
/// Lists files with `git diff --name-status`, then fetches each file's
/// diff. Files whose diff cannot be read are skipped. For renames and
/// copies the destination path is used.
pub fn collect_changes(repo_dir: &Path, scope: ChangeScope) -> Result<Vec<Change>> {
    let mut list_args = scope.diff_args().to_vec();
    list_args.push("--name-status");
    let listing = run_git(repo_dir, &list_args)?;

    let mut changes = Vec::new();
    for line in listing.lines() {
        let Some((status, file_path)) = parse_name_status(line) else {
            continue;
        };

        let mut diff_args = scope.diff_args().to_vec();
        diff_args.extend(["--", file_path]);
        let Ok(diff) = run_git(repo_dir, &diff_args) else {
            continue;
        };

        changes.push(Change::new(file_path, status, diff));
    }

    Ok(changes)
}

/// One `--name-status` line: status, tab, path (tab, new path for
/// renames and copies). Paths may contain spaces.
fn parse_name_status(line: &str) -> Option<(ChangeStatus, &str)> {
    let mut fields = line.split('\t');
    let letter = fields.next()?.trim();
    let path = fields.last()?;
    if letter.is_empty() || path.is_empty() {
        return None;
    }
    Some((ChangeStatus::from_git_letter(letter), path))
}

/// Top-level directory of the repository containing `dir`.
pub fn repo_root(dir: &Path) -> Result<PathBuf> {
    let out = run_git(dir, &["rev-parse", "--show-toplevel"])?;
    Ok(PathBuf::from(out.trim()))
}

/// The configured git user name, used to resolve the acting role.
pub fn current_user(dir: &Path) -> Result<String> {
    let name = run_git(dir, &["config", "user.name"])?.trim().to_string();
    if name.is_empty() {
        return Err(SymError::GitError("git user.name is not set".to_string()));
    }
    Ok(name)
}
