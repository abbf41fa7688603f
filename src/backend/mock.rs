//! Scripted backend for tests and demos.
//!
//! [`MockBackend`] replays [`MockResponse`]s in order, cycling when they run
//! out, and records every request it receives.
//!
//! ```
//! use kitchencraft_stream::backend::{MockBackend, MockResponse};
//!
//! let mock = MockBackend::new(vec![
//!     MockResponse::chunks(["name: Tomato Soup\n", "description: A warm classic\n"]),
//!     MockResponse::http(503, "busy"),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use super::{Backend, LlmRequest, TextStream};
use crate::error::{Result, StreamError};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream these chunks, then end normally.
    Chunks(Vec<String>),
    /// Stream these chunks, then fail with `reason`.
    FailAfter { chunks: Vec<String>, reason: String },
    /// Stream these chunks, then never end.
    Stall(Vec<String>),
    /// Reject the request before streaming.
    Http { status: u16, body: String },
}

impl MockResponse {
    /// The whole text as a single chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Chunks(vec![text.into()])
    }

    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    /// Split `text` into chunks of at most `size` characters.
    pub fn chunked(text: &str, size: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        Self::Chunks(
            chars
                .chunks(size.max(1))
                .map(|c| c.iter().collect())
                .collect(),
        )
    }

    pub fn fail_after<I, S>(chunks: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FailAfter {
            chunks: chunks.into_iter().map(Into::into).collect(),
            reason: reason.into(),
        }
    }

    pub fn stall<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stall(chunks.into_iter().map(Into::into).collect())
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }
}

/// A backend that replays scripted responses.
#[derive(Debug)]
pub struct MockBackend {
    responses: Vec<MockResponse>,
    index: AtomicUsize,
    chunk_delay: Option<Duration>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    /// Create a mock replaying `responses` in order.
    ///
    /// An empty script behaves like a provider returning zero chunks.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            index: AtomicUsize::new(0),
            chunk_delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always streams `text` as one chunk.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(vec![MockResponse::text(text)])
    }

    /// Sleep before each chunk, to make streaming visible in demos.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Number of `stream` calls so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_response(&self) -> MockResponse {
        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        if self.responses.is_empty() {
            return MockResponse::Chunks(Vec::new());
        }
        self.responses[idx % self.responses.len()].clone()
    }

    fn paced(&self, items: Vec<Result<String>>) -> TextStream {
        let delay = self.chunk_delay;
        let items = stream::iter(items);
        match delay {
            Some(d) => items
                .then(move |item| async move {
                    tokio::time::sleep(d).await;
                    item
                })
                .boxed(),
            None => items.boxed(),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn stream(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &LlmRequest,
    ) -> Result<TextStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.next_response() {
            MockResponse::Chunks(chunks) => Ok(self.paced(chunks.into_iter().map(Ok).collect())),
            MockResponse::FailAfter { chunks, reason } => {
                let mut items: Vec<Result<String>> = chunks.into_iter().map(Ok).collect();
                items.push(Err(StreamError::Upstream {
                    reason,
                    partial_raw: String::new(),
                }));
                Ok(self.paced(items))
            }
            MockResponse::Stall(chunks) => Ok(self
                .paced(chunks.into_iter().map(Ok).collect())
                .chain(stream::pending())
                .boxed()),
            MockResponse::Http { status, body } => Err(StreamError::HttpError {
                status,
                body,
                retry_after: None,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
