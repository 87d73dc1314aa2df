//! JSON recovery from generative-model response text.
//!
//! Model responses are frequently JSON wrapped in prose or code fencing.
//! Fence syntax varies too much for fence stripping to be reliable, so
//! recovery slices on delimiters instead: whichever of `{` / `[` appears
//! first marks the opening of the candidate value, and the *last*
//! occurrence of the matching closer marks its end.

use serde_json::Value;
use thiserror::Error;

/// No JSON value could be recovered from a model response.
///
/// Carries the full response text so callers can log exactly what the
/// model produced; the display form shows a truncated preview only.
#[derive(Error, Debug)]
#[error("no JSON value recovered from model response: {}", text_preview(.raw))]
pub struct ExtractError {
    /// The unmodified response text.
    pub raw: String,
}

/// Recover a JSON value from an arbitrary model response.
///
/// Ordered attempts, stopping at the first success:
/// 1. Parse the entire text (the common case when the backend was told to
///    return raw JSON and complied).
/// 2. Slice from the earliest opening delimiter to the last matching
///    closer and parse that span.
///
/// Failures here are recoverable from the caller's perspective: the
/// response was malformed, not the pipeline.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    if let Some(span) = delimited_span(text) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Ok(value);
        }
    }

    Err(ExtractError {
        raw: text.to_string(),
    })
}

/// Candidate JSON span between the earliest opening delimiter and the
/// last occurrence of its matching closer, inclusive.
///
/// Whichever of `{` / `[` occurs first decides whether the target is an
/// object or an array. Returns `None` when no opening delimiter exists or
/// the closer precedes the opener. Text containing several independent
/// JSON fragments, or stray closers after the true value, can defeat this
/// heuristic; the resulting span simply fails to parse.
fn delimited_span(text: &str) -> Option<&str> {
    let first_brace = text.find('{');
    let first_bracket = text.find('[');

    let (start, closer) = match (first_brace, first_bracket) {
        (Some(brace), Some(bracket)) if brace < bracket => (brace, '}'),
        (Some(brace), None) => (brace, '}'),
        (_, Some(bracket)) => (bracket, ']'),
        (None, None) => return None,
    };

    let end = text.rfind(closer)?;
    if end < start {
        return None;
    }
    // Delimiters are single-byte ASCII, so byte slicing stays on char
    // boundaries.
    Some(&text[start..=end])
}

/// Flattened, truncated response preview for error display.
fn text_preview(raw: &str) -> String {
    const MAX_PREVIEW: usize = 160;
    let flat = raw.trim().replace(['\n', '\r'], " ");
    if flat.len() <= MAX_PREVIEW {
        return flat;
    }
    let mut end = MAX_PREVIEW;
    while !flat.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &flat[..end])
}
