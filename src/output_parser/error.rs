//! Error types for structured-output decoding.

use crate::schema::ValidationError;

/// Why a piece of text could not be turned into a schema-valid value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The sanitized text was empty or whitespace-only.
    #[error("empty LLM response")]
    EmptyResponse,

    /// The text is not valid YAML.
    #[error("could not decode YAML: {0}")]
    Decode(String),

    /// The text decoded but does not satisfy the schema.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A complete output that failed strict decoding or validation.
///
/// Carries the sanitized text so it can be handed to the fixer as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct MalformedOutput {
    pub error: ParseError,
    pub sanitized: String,
}

impl MalformedOutput {
    /// Human-readable description of the failure.
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
