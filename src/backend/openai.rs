//! Streaming backend for OpenAI-compatible chat completion APIs.
//!
//! Endpoint: `{base_url}/v1/chat/completions` with `"stream": true`.
//! Chunks are the `choices[0].delta.content` fragments of the SSE response.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::sse::sse_text_stream;
use super::{Backend, LlmRequest, TextStream};
use crate::error::{Result, StreamError};

/// Backend for OpenAI and compatible providers (vLLM, llama.cpp server,
/// LM Studio, Groq, Together, Ollama's `/v1/`).
///
/// ```
/// use kitchencraft_stream::backend::OpenAiBackend;
///
/// let backend = OpenAiBackend::new().with_api_key("sk-...");
/// assert!(backend.has_api_key());
/// ```
#[derive(Clone, Default)]
pub struct OpenAiBackend {
    api_key: Option<String>,
    organization: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked = self.api_key.as_ref().map(|k| {
            if k.chars().count() > 6 {
                format!("{}***", k.chars().take(6).collect::<String>())
            } else {
                "***".to_string()
            }
        });
        f.debug_struct("OpenAiBackend")
            .field("api_key", &masked)
            .field("organization", &self.organization)
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `Authorization: Bearer {key}`.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Send `OpenAI-Organization: {org}`.
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_body(request: &LlmRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(json!({"role": "system", "content": request.system_prompt}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": true,
        })
    }

    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        if let Some(org) = &self.organization {
            req = req.header("OpenAI-Organization", org.as_str());
        }
        req
    }
}

/// Parse a `Retry-After` header given in seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn stream(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<TextStream> {
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);
        debug!(
            %url,
            model = %request.model,
            max_tokens = request.max_tokens,
            "opening completion stream"
        );

        let resp = self.build_http_request(client, &url, &body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let text = resp.text().await.unwrap_or_default();
            return Err(StreamError::HttpError {
                status: status.as_u16(),
                body: text,
                retry_after,
            });
        }

        Ok(sse_text_stream(resp.bytes_stream()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn request() -> LlmRequest {
        LlmRequest {
            model: "gpt-4o-mini".into(),
            system_prompt: "Return YAML only.".into(),
            prompt: "Tomato soup for two".into(),
            temperature: 0.5,
            max_tokens: 2048,
        }
    }

    #[test]
    fn body_is_streaming_chat() {
        let body = OpenAiBackend::build_body(&request());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["temperature"], 0.5);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "Tomato soup for two");
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let mut req = request();
        req.system_prompt.clear();
        let body = OpenAiBackend::build_body(&req);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn auth_headers() {
        let backend = OpenAiBackend::new()
            .with_api_key("sk-test123")
            .with_organization("org-abc");
        let req = backend
            .build_http_request(&Client::new(), COMPLETIONS_URL, &json!({}))
            .build()
            .unwrap();
        assert_eq!(&req.headers()["Authorization"], "Bearer sk-test123");
        assert_eq!(&req.headers()["OpenAI-Organization"], "org-abc");

        let anonymous = OpenAiBackend::new()
            .build_http_request(&Client::new(), COMPLETIONS_URL, &json!({}))
            .build()
            .unwrap();
        assert!(anonymous.headers().get("Authorization").is_none());
    }

    #[test]
    fn debug_masks_key() {
        let debug = format!("{:?}", OpenAiBackend::new().with_api_key("sk-1234567890abcdef"));
        assert!(!debug.contains("1234567890abcdef"));
        assert!(debug.contains("sk-123***"));
    }

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after(" 12 "), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2026 07:28:00 GMT"), None);
    }
}
