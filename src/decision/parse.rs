//! Pure post-processing of raw model output into typed decisions.
//!
//! Models asked for JSON often wrap it in prose or a fenced code block. The
//! parsers try, in order: the whole text, the first fenced block, then the
//! left-most balanced `{...}` object.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Raised when output cannot be turned into the requested shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParseFailure {
    pub message: String,
    /// The output that failed to parse
    pub raw: String,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raw: raw.into(),
        }
    }
}

/// Signature shared by every output parser.
pub type OutputParser<T> = fn(&str) -> Result<T, ParseFailure>;

/// Return the left-most balanced `{...}` span, ignoring braces inside JSON
/// strings.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Contents of the first fenced code block, without a `json` language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let mut parts = text.splitn(3, "```");
    parts.next()?;
    let block = parts.next()?;
    // An unterminated fence still yields the trailing text
    let block = block
        .strip_prefix("json")
        .or_else(|| block.strip_prefix("JSON"))
        .unwrap_or(block);
    Some(block.trim())
}

/// Parse model output as JSON.
pub fn parse_json_output(output: &str) -> Result<Value, ParseFailure> {
    let trimmed = output.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(block) {
            return Ok(value);
        }
    }

    if let Some(object) = find_json_object(trimmed) {
        return serde_json::from_str(object)
            .map_err(|e| ParseFailure::new(format!("Failed to parse output as JSON: {}", e), output));
    }

    Err(ParseFailure::new("Failed to parse output as JSON", output))
}

/// Parse model output into `T`.
pub fn parse_typed<T: DeserializeOwned>(output: &str) -> Result<T, ParseFailure> {
    let value = parse_json_output(output)?;
    serde_json::from_value(value).map_err(|e| {
        ParseFailure::new(
            format!("Output does not match the expected shape: {}", e),
            output,
        )
    })
}

/// Free text passes through trimmed; blank output is a failure.
pub fn parse_text(output: &str) -> Result<String, ParseFailure> {
    let text = output.trim();
    if text.is_empty() {
        return Err(ParseFailure::new("Model returned empty output", output));
    }
    Ok(text.to_string())
}
