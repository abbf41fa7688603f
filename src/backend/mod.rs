//! Provider abstraction producing streams of text chunks.
//!
//! A [`Backend`] turns a normalized [`LlmRequest`] into a [`TextStream`]: an
//! async sequence of UTF-8 chunks of arbitrary size. Built-in implementations
//! are [`OpenAiBackend`] and the scripted [`MockBackend`].
//!
//! ```text
//! StreamSource ──► LlmRequest ──► open_with_backoff ──► Backend::stream() ──► TextStream
//!                                                              │
//!                                                  ┌───────────┴───────────┐
//!                                            OpenAiBackend            MockBackend
//!                                        /v1/chat/completions      scripted chunks
//!                                             SSE deltas
//! ```

pub mod backoff;
pub mod mock;
pub mod openai;
pub mod sse;

pub use backoff::BackoffConfig;
pub use mock::{MockBackend, MockResponse};
pub use openai::OpenAiBackend;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::Client;
use tracing::warn;

use crate::error::{Result, StreamError};

/// Chunks of generated text, in delivery order.
///
/// An `Err` item means the stream failed after it was opened; no further
/// items should be pulled.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Callback invoked before each retry with `(attempt, delay, reason)`.
pub type RetryCallback<'a> = Option<&'a mut (dyn FnMut(u32, Duration, &str) + Send)>;

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// Model identifier, e.g. `"gpt-4o-mini"`.
    pub model: String,
    /// System instructions, including the example output shape.
    pub system_prompt: String,
    /// The user message.
    pub prompt: String,
    pub temperature: f64,
    /// Generation length budget.
    pub max_tokens: u32,
}

/// Abstraction over LLM providers.
///
/// Implementations return once the provider has accepted the request;
/// failures before that point are `Err` from [`stream`](Backend::stream),
/// failures after it are `Err` items in the returned stream.
///
/// The trait is object-safe and used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open a streaming completion.
    async fn stream(&self, client: &Client, base_url: &str, request: &LlmRequest)
        -> Result<TextStream>;

    /// Name for logs and diagnostics.
    fn name(&self) -> &'static str;
}

/// Whether an error from opening a stream is worth retrying.
pub fn is_retryable(error: &StreamError, config: &BackoffConfig) -> bool {
    match error {
        StreamError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        StreamError::Request(e) => e.is_connect() || e.is_timeout(),
        _ => false,
    }
}

/// A stream that has been opened, with the retries it took.
pub struct Opened {
    pub stream: TextStream,
    pub retries: u32,
}

impl std::fmt::Debug for Opened {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opened")
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

/// Open a stream, retrying transient failures according to `config`.
///
/// Cancellation is checked before every attempt and after every delay; no
/// request is sent once `cancel` is set.
pub async fn open_with_backoff(
    backend: &dyn Backend,
    client: &Client,
    base_url: &str,
    request: &LlmRequest,
    config: &BackoffConfig,
    cancel: Option<&AtomicBool>,
    mut on_retry: RetryCallback<'_>,
) -> Result<Opened> {
    let cancelled = || cancel.is_some_and(|c| c.load(Ordering::Relaxed));
    let mut attempt = 0;

    loop {
        if cancelled() {
            return Err(StreamError::Cancelled);
        }

        let err = match backend.stream(client, base_url, request).await {
            Ok(stream) => {
                return Ok(Opened {
                    stream,
                    retries: attempt,
                })
            }
            Err(e) => e,
        };

        if attempt >= config.max_retries || !is_retryable(&err, config) {
            return Err(err);
        }

        let retry_after = match &err {
            StreamError::HttpError { retry_after, .. } => *retry_after,
            _ => None,
        };
        let delay = config.delay_with_hint(attempt, retry_after);
        attempt += 1;

        let reason = err.to_string();
        warn!(
            backend = backend.name(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            %reason,
            "retrying stream open"
        );
        if let Some(cb) = on_retry.as_mut() {
            cb(attempt, delay, &reason);
        }

        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request() -> LlmRequest {
        LlmRequest {
            model: "test".into(),
            system_prompt: "sys".into(),
            prompt: "user".into(),
            temperature: 0.7,
            max_tokens: 64,
        }
    }

    fn quick() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..BackoffConfig::standard()
        }
    }

    fn http(status: u16) -> StreamError {
        StreamError::HttpError {
            status,
            body: String::new(),
            retry_after: None,
        }
    }

    #[test]
    fn retryable_statuses() {
        let config = BackoffConfig::standard();
        assert!(is_retryable(&http(429), &config));
        assert!(is_retryable(&http(503), &config));
        assert!(!is_retryable(&http(400), &config));
        assert!(!is_retryable(&StreamError::Cancelled, &config));
        assert!(!is_retryable(
            &StreamError::Upstream {
                reason: "reset".into(),
                partial_raw: String::new()
            },
            &config
        ));
    }

    #[tokio::test]
    async fn retries_then_opens() {
        let mock = MockBackend::new(vec![
            MockResponse::http(503, "busy"),
            MockResponse::text("name: X"),
        ]);
        let mut seen = Vec::new();
        let mut on_retry = |attempt: u32, _d: Duration, reason: &str| {
            seen.push((attempt, reason.to_string()));
        };
        let opened = open_with_backoff(
            &mock,
            &Client::new(),
            "http://unused",
            &request(),
            &quick(),
            None,
            Some(&mut on_retry),
        )
        .await
        .unwrap();

        assert_eq!(opened.retries, 1);
        let chunks: Vec<_> = opened.stream.collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(seen, vec![(1, "HTTP 503: busy".to_string())]);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn non_retryable_fails_immediately() {
        let mock = MockBackend::new(vec![MockResponse::http(401, "bad key")]);
        let err = open_with_backoff(
            &mock,
            &Client::new(),
            "http://unused",
            &request(),
            &quick(),
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StreamError::HttpError { status: 401, .. }));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let mock = MockBackend::new(vec![MockResponse::http(500, "down")]);
        let config = BackoffConfig {
            max_retries: 2,
            ..quick()
        };
        let err = open_with_backoff(
            &mock,
            &Client::new(),
            "http://unused",
            &request(),
            &config,
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StreamError::HttpError { status: 500, .. }));
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn cancelled_before_first_attempt() {
        let mock = MockBackend::new(vec![MockResponse::text("x")]);
        let cancel = AtomicBool::new(true);
        let err = open_with_backoff(
            &mock,
            &Client::new(),
            "http://unused",
            &request(),
            &BackoffConfig::standard(),
            Some(&cancel),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StreamError::Cancelled));
        assert_eq!(mock.calls(), 0);
    }
}
