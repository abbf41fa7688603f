use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::GenerationDiagnostics;
use crate::error::{Result, StreamError};

/// Which generation pass produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// The primary generation for the caller's input.
    Primary,
    /// The one-shot correction pass run after malformed output.
    Fixer,
}

/// The best decoding of the accumulated text against the partial schema at
/// one point in the stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialResult {
    /// Partially populated value; every present field is valid.
    pub value: Value,
    /// Length in bytes of the accumulated text this value was decoded from.
    pub raw_len: usize,
    pub pass: Pass,
}

/// The value validated against the full schema once a generation is done.
#[derive(Debug, Clone, Serialize)]
pub struct FinalResult {
    /// Schema-valid output.
    pub value: Value,
    /// Raw text of the pass that produced `value`.
    pub raw: String,
    /// Whether the fixer pass produced this result.
    pub fixed: bool,
    pub diagnostics: GenerationDiagnostics,
}

impl FinalResult {
    /// Deserialize the validated value into a typed output.
    ///
    /// ```ignore
    /// let result = generate(&ctx, &RecipeTemplate, &input, &NullHandler).await?;
    /// let recipe: RecipeOutput = result.parse_as()?;
    /// ```
    pub fn parse_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            let snippet = self.value.to_string();
            StreamError::Other(format!(
                "Failed to parse final result into target type: {}. Value (truncated): {}",
                e,
                crate::output_parser::error::truncate(&snippet, 200)
            ))
        })
    }
}

/// Broad cause of a failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider call or the stream itself failed.
    Upstream,
    /// The output could not be decoded or validated, even after fixing.
    MalformedOutput,
}

/// Diagnostic payload of a terminal error event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    /// Root cause. For a failed fixer pass this is the original
    /// malformed-output error, not the fixer's own.
    pub reason: String,
    /// What went wrong during the fixer pass, if it ran.
    pub fixer_reason: Option<String>,
    /// Text accumulated by the primary pass.
    pub raw: String,
}

impl GenerationFailure {
    /// Build the event payload for an error. `None` for cancellation, which
    /// is never surfaced as an event.
    pub(crate) fn from_error(err: &StreamError) -> Option<Self> {
        let failure = match err {
            StreamError::Cancelled => return None,
            StreamError::Upstream { reason, partial_raw } => Self {
                kind: FailureKind::Upstream,
                reason: reason.clone(),
                fixer_reason: None,
                raw: partial_raw.clone(),
            },
            StreamError::FixerFailed {
                original,
                fixer,
                raw,
            } => Self {
                kind: FailureKind::MalformedOutput,
                reason: original.clone(),
                fixer_reason: Some(fixer.clone()),
                raw: raw.clone(),
            },
            other => Self {
                kind: FailureKind::Upstream,
                reason: other.to_string(),
                fixer_reason: None,
                raw: String::new(),
            },
        };
        Some(failure)
    }
}
