//! Token stream consumption with progressive partial decoding.
//!
//! [`TokenConsumer`] owns the append-only accumulator for one pass. After
//! every chunk it sanitizes and decodes the *entire* accumulated text
//! against the deep-partial schema, so each progress event reflects the
//! whole output so far rather than the latest chunk. A failed decode keeps
//! the previous partial value.
//!
//! [`consume`] drives a consumer from an async chunk stream, honoring a
//! cancellation flag between chunks.

use futures::{Stream, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

use crate::error::{Result, StreamError};
use crate::output_parser::{parse_partial, sanitize};
use crate::schema::Schema;
use crate::types::{Pass, PartialResult};

/// Accumulates streamed text and tracks the latest valid partial value.
///
/// # Example
///
/// ```
/// use kitchencraft_stream::consumer::TokenConsumer;
/// use kitchencraft_stream::schema::{Field, Schema};
/// use kitchencraft_stream::types::Pass;
///
/// let schema = Schema::object([
///     Field::required("name", Schema::String),
///     Field::required("description", Schema::String),
/// ]);
/// let mut consumer = TokenConsumer::new(&schema, Pass::Primary);
///
/// let p = consumer.push("name: Tomato Soup\n").unwrap();
/// assert_eq!(p.value["name"], "Tomato Soup");
///
/// // Half a key does not decode; the previous value is kept.
/// assert!(consumer.push("descr").is_none());
/// assert_eq!(consumer.latest().unwrap()["name"], "Tomato Soup");
/// ```
#[derive(Debug)]
pub struct TokenConsumer {
    partial: Schema,
    pass: Pass,
    buffer: String,
    latest: Option<Value>,
    chunks: usize,
    attempts: usize,
    hits: usize,
}

impl TokenConsumer {
    /// Create a consumer decoding against the deep-partial form of `schema`.
    pub fn new(schema: &Schema, pass: Pass) -> Self {
        Self {
            partial: schema.deep_partial(),
            pass,
            buffer: String::new(),
            latest: None,
            chunks: 0,
            attempts: 0,
            hits: 0,
        }
    }

    /// Append a chunk and re-decode the whole accumulator.
    ///
    /// Returns the new partial result when the accumulated text decodes
    /// against the partial schema. Empty chunks are counted but not decoded.
    pub fn push(&mut self, chunk: &str) -> Option<PartialResult> {
        self.chunks += 1;
        if chunk.is_empty() {
            return None;
        }
        self.buffer.push_str(chunk);
        self.attempts += 1;

        let sanitized = sanitize(&self.buffer);
        let value = parse_partial(&sanitized, &self.partial)?;
        self.hits += 1;
        self.latest = Some(value.clone());
        Some(PartialResult {
            value,
            raw_len: self.buffer.len(),
            pass: self.pass,
        })
    }

    /// The latest valid partial value, if any chunk has decoded yet.
    pub fn latest(&self) -> Option<&Value> {
        self.latest.as_ref()
    }

    /// Everything received so far.
    pub fn raw(&self) -> &str {
        &self.buffer
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    /// Number of chunks received, including empty ones.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Number of partial decode attempts.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Number of partial decode attempts that produced a value.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Consume the accumulator, returning the raw text.
    pub fn into_raw(self) -> String {
        self.buffer
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|c| c.load(Ordering::Relaxed))
}

/// Pull every chunk from `stream` into `consumer`, reporting progress.
///
/// Returns `Ok(())` when the stream ends normally. A stream item error is
/// returned as [`StreamError::Upstream`] carrying the text accumulated so
/// far. When `cancel` is set the loop stops before pulling another chunk,
/// before decoding one and before reporting progress, and returns
/// [`StreamError::Cancelled`].
pub async fn consume<S>(
    mut stream: S,
    consumer: &mut TokenConsumer,
    cancel: Option<&AtomicBool>,
    on_progress: &mut (dyn FnMut(PartialResult) + Send),
) -> Result<()>
where
    S: Stream<Item = Result<String>> + Unpin + Send,
{
    loop {
        if is_cancelled(cancel) {
            debug!(
                pass = ?consumer.pass(),
                raw_len = consumer.raw().len(),
                "stream consumption cancelled"
            );
            return Err(StreamError::Cancelled);
        }

        match stream.next().await {
            None => {
                debug!(
                    pass = ?consumer.pass(),
                    chunks = consumer.chunks(),
                    raw_len = consumer.raw().len(),
                    "stream ended"
                );
                return Ok(());
            }
            Some(Ok(chunk)) => {
                trace!(len = chunk.len(), "chunk received");
                if is_cancelled(cancel) {
                    return Err(StreamError::Cancelled);
                }
                if let Some(partial) = consumer.push(&chunk) {
                    if is_cancelled(cancel) {
                        return Err(StreamError::Cancelled);
                    }
                    on_progress(partial);
                }
            }
            Some(Err(StreamError::Cancelled)) => return Err(StreamError::Cancelled),
            Some(Err(e)) => {
                let reason = match e {
                    StreamError::Upstream { reason, .. } => reason,
                    other => other.to_string(),
                };
                return Err(StreamError::Upstream {
                    reason,
                    partial_raw: consumer.raw().to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use futures::stream;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn soup_schema() -> Schema {
        Schema::object([
            Field::required("name", Schema::String),
            Field::required("description", Schema::String),
        ])
    }

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<String>> + Unpin + Send {
        stream::iter(parts.iter().map(|p| Ok(p.to_string())).collect::<Vec<_>>())
    }

    #[test]
    fn push_reports_each_valid_prefix() {
        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        let p1 = consumer.push("name: Tomato Soup\n").unwrap();
        assert_eq!(p1.value, json!({"name": "Tomato Soup"}));
        assert_eq!(p1.raw_len, 18);

        let p2 = consumer.push("description: A warm classic\n").unwrap();
        assert_eq!(
            p2.value,
            json!({"name": "Tomato Soup", "description": "A warm classic"})
        );
        assert_eq!(consumer.hits(), 2);
    }

    #[test]
    fn failed_decode_keeps_previous_partial() {
        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        consumer.push("name: Soup\n");
        assert!(consumer.push("desc").is_none());
        assert_eq!(consumer.latest(), Some(&json!({"name": "Soup"})));
        assert_eq!(consumer.raw(), "name: Soup\ndesc");
        assert_eq!(consumer.attempts(), 2);
        assert_eq!(consumer.hits(), 1);
    }

    #[test]
    fn empty_chunk_is_counted_not_decoded() {
        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        assert!(consumer.push("").is_none());
        assert_eq!(consumer.chunks(), 1);
        assert_eq!(consumer.attempts(), 0);
    }

    #[test]
    fn fenced_stream_decodes_while_open() {
        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Fixer);
        assert!(consumer.push("```yaml\n").is_none());
        let p = consumer.push("name: X\n").unwrap();
        assert_eq!(p.value, json!({"name": "X"}));
        assert_eq!(p.pass, Pass::Fixer);
        let p = consumer.push("```").unwrap();
        assert_eq!(p.value, json!({"name": "X"}));
    }

    #[tokio::test]
    async fn consume_accumulates_in_order() {
        let text = "name: Tomato Soup\ndescription: A warm classic\n";
        let parts: Vec<String> = text.chars().map(|c| c.to_string()).collect();
        let stream = stream::iter(parts.into_iter().map(Ok).collect::<Vec<_>>());

        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        let mut lens = Vec::new();
        consume(stream, &mut consumer, None, &mut |p| lens.push(p.raw_len))
            .await
            .unwrap();

        assert_eq!(consumer.raw(), text);
        assert!(!lens.is_empty());
        assert!(lens.windows(2).all(|w| w[0] < w[1]));
        assert!(lens.iter().all(|&l| text.is_char_boundary(l)));
    }

    #[tokio::test]
    async fn consume_mid_stream_error_is_upstream() {
        let stream = stream::iter(vec![
            Ok("name: X\n".to_string()),
            Err(StreamError::Other("connection reset".into())),
            Ok("description: never seen\n".to_string()),
        ]);
        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        let err = consume(stream, &mut consumer, None, &mut |_| {})
            .await
            .unwrap_err();
        match err {
            StreamError::Upstream {
                reason,
                partial_raw,
            } => {
                assert_eq!(reason, "connection reset");
                assert_eq!(partial_raw, "name: X\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn consume_stops_pulling_when_cancelled() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let stream = chunks(&["name: a\n", "description: b\n"]).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let cancel = AtomicBool::new(true);
        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        let mut events = 0;
        let err = consume(stream, &mut consumer, Some(&cancel), &mut |_| events += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::Cancelled));
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn chunk_delivered_after_cancel_is_not_decoded() {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let stream = chunks(&["name: a\n", "description: b\n"]).inspect(move |item| {
            if matches!(item, Ok(c) if c.starts_with("description")) {
                flag.store(true, Ordering::SeqCst);
            }
        });

        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        let mut events = 0;
        let err = consume(stream, &mut consumer, Some(cancel.as_ref()), &mut |_| events += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::Cancelled));
        assert_eq!(events, 1);
        assert_eq!(consumer.attempts(), 1);
        assert_eq!(consumer.raw(), "name: a\n");
    }

    #[tokio::test]
    async fn consume_empty_stream() {
        let mut consumer = TokenConsumer::new(&soup_schema(), Pass::Primary);
        consume(chunks(&[]), &mut consumer, None, &mut |_| {})
            .await
            .unwrap();
        assert_eq!(consumer.raw(), "");
        assert!(consumer.latest().is_none());
    }
}
