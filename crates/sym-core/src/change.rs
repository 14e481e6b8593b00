//! File changes under validation.

use serde::{Deserialize, Serialize};

/// Git status of a changed file relative to the validation baseline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
}

impl ChangeStatus {
    /// Map a `git diff --name-status` letter. Renames, copies and type
    /// changes are treated as modifications.
    pub fn from_git_letter(letter: &str) -> Self {
        match letter.chars().next() {
            Some('A') => ChangeStatus::Added,
            Some('D') => ChangeStatus::Deleted,
            _ => ChangeStatus::Modified,
        }
    }

    pub fn as_letter(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "A",
            ChangeStatus::Modified => "M",
            ChangeStatus::Deleted => "D",
        }
    }
}

/// One file's delta since the validation baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Change {
    pub file_path: String,
    pub status: ChangeStatus,
    /// Unified diff text (or raw content for non-diff inputs).
    #[serde(default)]
    pub diff: String,
}

impl Change {
    pub fn new(file_path: impl Into<String>, status: ChangeStatus, diff: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            status,
            diff: diff.into(),
        }
    }

    pub fn added(file_path: impl Into<String>, diff: impl Into<String>) -> Self {
        Self::new(file_path, ChangeStatus::Added, diff)
    }

    pub fn modified(file_path: impl Into<String>, diff: impl Into<String>) -> Self {
        Self::new(file_path, ChangeStatus::Modified, diff)
    }

    pub fn deleted(file_path: impl Into<String>) -> Self {
        Self::new(file_path, ChangeStatus::Deleted, "")
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ChangeStatus::Deleted
    }

    /// Lines worth showing to a semantic checker.
    ///
    /// Returns the `+` lines of a unified diff. When the text carries no
    /// diff markers at all it is passed through verbatim, so plain file
    /// content still validates. Empty for blank input.
    pub fn code_lines(&self) -> Vec<String> {
        let added = extract_added_lines(&self.diff);
        if added.is_empty() && !self.diff.trim().is_empty() {
            return self.diff.split('\n').map(str::to_string).collect();
        }
        added
    }
}

/// Extract the added lines (without the leading `+`) from a unified diff.
pub fn extract_added_lines(diff: &str) -> Vec<String> {
    diff.split('\n')
        .filter(|line| line.starts_with('+') && !line.starts_with("+++"))
        .map(|line| line[1..].to_string())
        .collect()
}
