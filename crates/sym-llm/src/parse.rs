//! Extracting structured payloads from free-form model replies.
//!
//! Models wrap JSON in code fences or prefix it with prose ("I'll analyze
//! the code..."). These helpers find the payload without being strict about
//! the surroundings.

use std::sync::OnceLock;

use regex::Regex;

use crate::provider::ResponseFormat;

fn fenced_json() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)```").ok())
        .as_ref()
}

/// Narrow a reply to the requested format. Text passes through; JSON is
/// extracted when possible, otherwise the reply is returned unchanged.
pub fn parse_response(response: &str, format: ResponseFormat) -> String {
    match format {
        ResponseFormat::Text => response.to_string(),
        ResponseFormat::Json => extract_json(response).unwrap_or_else(|| response.to_string()),
    }
}

/// Find a valid JSON document in `response`.
///
/// Tries a fenced code block, then the first balanced `{...}` or `[...]`,
/// then the whole trimmed reply.
pub fn extract_json(response: &str) -> Option<String> {
    if let Some(caps) = fenced_json().and_then(|re| re.captures(response)) {
        let block = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if is_valid_json(block) {
            return Some(block.to_string());
        }
    }

    if let Some(candidate) = find_json_boundaries(response) {
        if is_valid_json(candidate) {
            return Some(candidate.to_string());
        }
    }

    let trimmed = response.trim();
    is_valid_json(trimmed).then(|| trimmed.to_string())
}

fn is_valid_json(text: &str) -> bool {
    !text.is_empty() && serde_json::from_str::<serde_json::Value>(text).is_ok()
}

/// The first `{` or `[` and its matching closer, skipping string contents.
fn find_json_boundaries(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &c) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        if in_string {
            match c {
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c == b'"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(&s[start..=i]);
            }
        }
    }
    None
}

/// Truncate to at most `max_chars` bytes on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
