//! File-extension based language detection.

use std::path::Path;

/// Language name for a file path, derived from its extension.
///
/// Returns `None` for unknown or missing extensions.
pub fn language_from_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?;
    let lang = match ext {
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "mts" | "cts" => "typescript",
        "jsx" => "jsx",
        "tsx" => "tsx",
        "go" => "go",
        "py" => "python",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" => "shell",
        _ => return None,
    };
    Some(lang)
}

/// Canonical language name for a selector entry, resolving common aliases.
pub fn canonical_language(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "js" => "javascript",
        "ts" => "typescript",
        "golang" => "go",
        "py" => "python",
        "c++" | "cxx" => "cpp",
        "rs" => "rust",
        "rb" => "ruby",
        "bash" | "sh" => "shell",
        other => other,
    };
    canonical.to_string()
}
