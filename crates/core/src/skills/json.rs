//! Parsing helpers for model output.

use serde_json::Value;

use crate::error::JsonParseError;

/// Remove markdown code fences (```` ```json ```` and ```` ``` ````) anywhere in
/// the text, then trim.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json\n", "")
        .replace("```json", "")
        .replace("```\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse model output as JSON after stripping code fences.
pub fn parse_json(text: &str) -> Result<Value, JsonParseError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| JsonParseError {
        message: e.to_string(),
        preview: text.chars().take(100).collect(),
    })
}

/// Extract generated source code from the first fenced block
/// (```` ```jsx ... ``` ````), ignoring any prose before or after it. An
/// unclosed block runs to the end of the text. Text without a fence is
/// returned trimmed and otherwise untouched.
pub fn strip_code_block(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.trim().to_string();
    };
    let after = &text[open + 3..];
    // Drop the language tag line
    let Some(newline) = after.find('\n') else {
        let inline = after.trim_end();
        return inline.strip_suffix("```").unwrap_or(inline).trim().to_string();
    };
    let body = &after[newline + 1..];
    let end = if body.starts_with("```") {
        0
    } else {
        body.find("\n```").unwrap_or(body.len())
    };
    body[..end].trim().to_string()
}
