use std::time::Duration;
use thiserror::Error;

/// Errors produced by a generation and its components.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Low-level HTTP transport failure (connection refused, reset, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider rejects the request before any chunk is streamed.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The chunk stream failed or dropped after it was opened.
    #[error("upstream stream failed: {reason}")]
    Upstream {
        /// Provider or transport error description.
        reason: String,
        /// Text accumulated before the failure.
        partial_raw: String,
    },

    /// The complete output did not validate and the fixer pass could not
    /// repair it.
    ///
    /// `original` is the root cause from the primary pass; `fixer` is what
    /// went wrong during the correction attempt.
    #[error("malformed output: {original} (fixer failed: {fixer})")]
    FixerFailed {
        original: String,
        fixer: String,
        raw: String,
    },

    /// The generation was cancelled via the cancellation flag or by dropping
    /// its consumer.
    #[error("generation was cancelled")]
    Cancelled,

    /// Invalid configuration detected at build time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Whether this error came from the LLM provider or the transport,
    /// as opposed to the content of the output.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            StreamError::Request(_) | StreamError::HttpError { .. } | StreamError::Upstream { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
