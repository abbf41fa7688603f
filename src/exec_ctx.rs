//! Execution context shared by generations.
//!
//! [`ExecCtx`] carries the HTTP client, provider backend, base URL, model
//! settings, retry policy and cancellation flag. Build it once and share it;
//! every generation reads it immutably.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::backend::{Backend, BackoffConfig, OpenAiBackend};
use crate::config::{EnvSettings, LlmConfig, DEFAULT_BASE_URL};
use crate::error::{Result, StreamError};

/// Shared configuration for generations.
///
/// ```
/// use kitchencraft_stream::ExecCtx;
///
/// let ctx = ExecCtx::builder("https://api.openai.com/v1")
///     .openai_with_key("sk-...")
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// assert_eq!(ctx.base_url, "https://api.openai.com");
/// ```
pub struct ExecCtx {
    /// HTTP client (cheap to clone).
    pub client: Client,
    /// Provider base URL without the API path.
    pub base_url: String,
    /// Provider backend. Default: [`OpenAiBackend`] without a key.
    pub backend: Arc<dyn Backend>,
    /// Retry policy for opening streams. Default: [`BackoffConfig::none()`].
    pub backoff: BackoffConfig,
    pub llm: LlmConfig,
    /// Checked between chunks and before every provider call.
    pub cancellation: Option<Arc<AtomicBool>>,
    /// Surface the fixer pass's progress events.
    pub fixer_progress: bool,
}

impl ExecCtx {
    pub fn builder(base_url: impl Into<String>) -> ExecCtxBuilder {
        ExecCtxBuilder {
            client: None,
            base_url: base_url.into(),
            backend: None,
            backoff: None,
            llm: LlmConfig::default(),
            cancellation: None,
            fixer_progress: false,
            connect_timeout: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Return [`StreamError::Cancelled`] if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        Ok(())
    }

    pub fn cancel_flag(&self) -> Option<&AtomicBool> {
        self.cancellation.as_deref()
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("backoff", &self.backoff)
            .field("llm", &self.llm)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("fixer_progress", &self.fixer_progress)
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    client: Option<Client>,
    base_url: String,
    backend: Option<Arc<dyn Backend>>,
    backoff: Option<BackoffConfig>,
    llm: LlmConfig,
    cancellation: Option<Arc<AtomicBool>>,
    fixer_progress: bool,
    connect_timeout: Option<Duration>,
}

impl ExecCtxBuilder {
    /// Start from `.env` and the process environment.
    ///
    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `KITCHENCRAFT_MODEL` and
    /// `KITCHENCRAFT_TEMPERATURE`. Unset values keep their defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_settings(&EnvSettings::load()?))
    }

    /// Start from already-loaded settings.
    pub fn from_settings(env: &EnvSettings) -> Self {
        let base_url = env.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let backend = match &env.api_key {
            Some(key) => OpenAiBackend::new().with_api_key(key),
            None => OpenAiBackend::new(),
        };
        let mut builder = ExecCtx::builder(base_url).backend(Arc::new(backend));
        builder.llm = env.apply(builder.llm);
        builder
    }

    /// Use a custom HTTP client. Its own timeouts apply.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use [`OpenAiBackend`] with bearer authentication.
    pub fn openai_with_key(mut self, api_key: impl Into<String>) -> Self {
        self.backend = Some(Arc::new(OpenAiBackend::new().with_api_key(api_key)));
        self
    }

    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    pub fn llm(mut self, config: LlmConfig) -> Self {
        self.llm = config;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.llm.temperature = temperature;
        self
    }

    /// Override every template's default token budget.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.llm.max_tokens = Some(tokens);
        self
    }

    pub fn cancellation(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancellation = cancel;
        self
    }

    /// Emit progress events from the fixer pass, tagged
    /// [`Pass::Fixer`](crate::types::Pass::Fixer). Default: off.
    pub fn fixer_progress(mut self, enabled: bool) -> Self {
        self.fixer_progress = enabled;
        self
    }

    /// Connect timeout for the default client. Default: 10 seconds.
    ///
    /// There is no total request timeout; long generations are bounded by
    /// cancellation instead.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ExecCtx> {
        self.llm.validate()?;

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(Duration::from_secs(10)))
                .build()?,
        };

        let ctx = ExecCtx {
            client,
            base_url: normalize_base_url(&self.base_url),
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(OpenAiBackend::new())),
            backoff: self.backoff.unwrap_or_else(BackoffConfig::none),
            llm: self.llm,
            cancellation: self.cancellation,
            fixer_progress: self.fixer_progress,
        };
        debug!(
            base_url = %ctx.base_url,
            backend = ctx.backend.name(),
            model = %ctx.llm.model,
            "execution context built"
        );
        Ok(ctx)
    }
}

/// Strip API path suffixes so backends can append their own.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    for suffix in ["/v1/chat/completions", "/v1/chat", "/v1"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}
