//! Server-sent events decoding for OpenAI-compatible chat streams.
//!
//! [`SseDecoder`] buffers raw bytes across network chunk boundaries and turns
//! complete `data:` lines into [`SseEvent`]s. [`sse_text_stream`] wraps a byte
//! stream into a [`TextStream`] of content deltas.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream::{self, StreamExt};
use futures::Stream;
use serde_json::Value;

use super::TextStream;
use crate::error::StreamError;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A non-empty `choices[0].delta.content` fragment.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
    /// An `error` payload sent by the provider mid-stream.
    Error(String),
}

/// Line-buffered SSE decoder.
///
/// Bytes are buffered until a newline arrives, so multi-byte characters and
/// JSON payloads split across network reads decode correctly.
///
/// ```
/// use kitchencraft_stream::backend::sse::{SseDecoder, SseEvent};
///
/// let mut decoder = SseDecoder::new();
/// let chunk = b"data: {\"choices\":[{\"delta\":{\"content\":\"name\"}}]}\n\n";
/// let mut events = decoder.decode(chunk);
/// events.extend(decoder.decode(b"data: [DONE]\n\n"));
/// assert_eq!(events, vec![SseEvent::Delta("name".into()), SseEvent::Done]);
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning events for every complete line.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever remains after the byte stream ends.
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        String::from_utf8_lossy(&rest)
            .lines()
            .filter_map(parse_line)
            .collect()
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    let data = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))?
        .trim();

    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    let payload: Value = serde_json::from_str(data).ok()?;
    if let Some(err) = payload.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Some(SseEvent::Error(message));
    }

    payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| SseEvent::Delta(s.to_string()))
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<crate::error::Result<String>>,
    finished: bool,
}

impl<S> SseState<S> {
    fn absorb(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Delta(text) => self.pending.push_back(Ok(text)),
                SseEvent::Done => {
                    self.finished = true;
                    return;
                }
                SseEvent::Error(reason) => {
                    self.pending.push_back(Err(StreamError::Upstream {
                        reason,
                        partial_raw: String::new(),
                    }));
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Turn an SSE byte stream into a stream of content deltas.
///
/// The stream ends at `[DONE]` or when the bytes run out. A transport error
/// or a provider `error` payload is yielded as a single `Err` item, after
/// which the stream ends.
pub fn sse_text_stream<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<StreamError> + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.decode(chunk.as_ref());
                    st.absorb(events);
                }
                Some(Err(e)) => {
                    st.pending.push_back(Err(e.into()));
                    st.finished = true;
                }
                None => {
                    let events = st.decoder.flush();
                    st.absorb(events);
                    st.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn keep_alives_and_role_deltas_are_skipped() {
        let mut decoder = SseDecoder::new();
        let input = concat!(
            "\n: ping\nevent: message\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n"
        );
        assert!(decoder.decode(input.as_bytes()).is_empty());
    }

    #[test]
    fn payload_split_mid_line() {
        let mut decoder = SseDecoder::new();
        let line = delta("Tomato");
        let (a, b) = line.split_at(15);
        assert!(decoder.decode(a.as_bytes()).is_empty());
        assert_eq!(decoder.decode(b.as_bytes()), vec![SseEvent::Delta("Tomato".into())]);
    }

    #[test]
    fn multibyte_char_split_across_reads() {
        let mut decoder = SseDecoder::new();
        let line = delta("crème");
        let bytes = line.as_bytes();
        let split = line.find('è').unwrap() + 1;
        assert!(decoder.decode(&bytes[..split]).is_empty());
        assert_eq!(decoder.decode(&bytes[split..]), vec![SseEvent::Delta("crème".into())]);
    }

    #[test]
    fn error_payload() {
        let mut decoder = SseDecoder::new();
        let events = decoder.decode(b"data: {\"error\":{\"message\":\"overloaded\"}}\n");
        assert_eq!(events, vec![SseEvent::Error("overloaded".into())]);
    }

    #[test]
    fn flush_decodes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.decode(b"data: [DONE]").is_empty());
        assert_eq!(decoder.flush(), vec![SseEvent::Done]);
    }

    #[tokio::test]
    async fn text_stream_stops_at_done() {
        let body = format!(
            "{}{}data: [DONE]\n\n{}",
            delta("name: "),
            delta("Soup"),
            delta("ignored")
        );
        let bytes = stream::iter(vec![Ok::<_, StreamError>(body.into_bytes())]);
        let chunks: Vec<String> = sse_text_stream(bytes)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["name: ".to_string(), "Soup".to_string()]);
    }

    #[tokio::test]
    async fn text_stream_surfaces_provider_error() {
        let body = format!(
            "{}data: {{\"error\":{{\"message\":\"context length exceeded\"}}}}\n\n",
            delta("name: X")
        );
        let bytes = stream::iter(vec![Ok::<_, StreamError>(body.into_bytes())]);
        let items: Vec<_> = sse_text_stream(bytes).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "name: X");
        match &items[1] {
            Err(StreamError::Upstream { reason, .. }) => {
                assert_eq!(reason, "context length exceeded")
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_stream_transport_error_ends_stream() {
        let bytes = stream::iter(vec![
            Ok(delta("a").into_bytes()),
            Err(StreamError::Other("reset".into())),
            Ok(delta("b").into_bytes()),
        ]);
        let items: Vec<_> = sse_text_stream(bytes).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }
}
