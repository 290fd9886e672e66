//! Input normalization and sanitization.
//!
//! Identifiers coming from config files and channel metadata are compared
//! in normalized form, and inbound message bodies are reduced to a short,
//! printable preview before they are written to the session store.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Validation error types.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier was empty after trimming.
    #[error("Identifier is empty")]
    EmptyIdentifier,

    /// Disallowed characters in identifier.
    #[error("Disallowed characters in identifier: {0}")]
    DisallowedChars(String),
}

/// Size limits per input type.
pub mod limits {
    /// Maximum length (in characters) of a stored inbound body preview.
    pub const MAX_BODY_PREVIEW_CHARS: usize = 160;

    /// Maximum length of a channel/plugin/agent identifier.
    pub const MAX_IDENTIFIER_LENGTH: usize = 128;
}

/// Normalize an identifier for comparison: trimmed and ASCII-lowercased.
#[must_use]
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Validate a channel/plugin identifier.
///
/// Accepts ASCII alphanumerics plus `-`, `_` and `.`.
///
/// # Errors
///
/// Returns `ValidationError` if the identifier is empty, too long, or
/// contains other characters.
pub fn validate_identifier(raw: &str) -> Result<String, ValidationError> {
    let id = normalize_id(raw);
    if id.is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }
    if id.len() > limits::MAX_IDENTIFIER_LENGTH
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::DisallowedChars(id));
    }
    Ok(id)
}

/// Build a printable preview of a message body.
///
/// Control characters become spaces, whitespace runs collapse, the text is
/// NFKC-normalized and truncated to `max_chars` (an ellipsis marks the cut).
/// Returns `None` when nothing printable remains.
#[must_use]
pub fn sanitize_preview(body: &str, max_chars: usize) -> Option<String> {
    let normalized: String = body
        .nfkc()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    if collapsed.chars().count() <= max_chars {
        return Some(collapsed);
    }
    let mut preview: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    preview.push('…');
    Some(preview)
}
