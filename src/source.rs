//! Prompt templates and the adapter that turns them into chunk streams.
//!
//! A [`PromptTemplate`] describes one use case: the output schema, an example
//! of the structured text the model should produce, and how to build the
//! system and user messages from a typed input. [`StreamSource`] binds a
//! template to an [`ExecCtx`] and opens provider streams for it.

use tracing::{debug, info};

use crate::backend::{open_with_backoff, LlmRequest, Opened};
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::schema::Schema;

/// One structured-output use case.
///
/// The model is shown [`example`](Self::example) rather than the schema
/// itself, so the example must validate against [`schema`](Self::schema).
pub trait PromptTemplate: Send + Sync {
    /// Caller-supplied fields for one generation.
    type Input: Send + Sync;

    /// Name used in logs.
    fn name(&self) -> &str;

    /// The schema the final output must satisfy.
    fn schema(&self) -> &Schema;

    /// An example of the expected output text.
    fn example(&self) -> &str;

    /// Instructions plus the example shape.
    fn system_message(&self, input: &Self::Input) -> String;

    /// The templated request built from `input`.
    fn user_message(&self, input: &Self::Input) -> String;

    /// Generation length budget.
    fn default_tokens(&self, input: &Self::Input) -> u32;
}

/// Opens streams for a template against a context.
pub struct StreamSource<'a, T: PromptTemplate> {
    ctx: &'a ExecCtx,
    template: &'a T,
}

impl<'a, T: PromptTemplate> StreamSource<'a, T> {
    pub fn new(ctx: &'a ExecCtx, template: &'a T) -> Self {
        Self { ctx, template }
    }

    /// Build the provider request for `input`.
    pub fn request(&self, input: &T::Input) -> LlmRequest {
        let llm = &self.ctx.llm;
        LlmRequest {
            model: llm.model.clone(),
            system_prompt: self.template.system_message(input),
            prompt: self.template.user_message(input),
            temperature: llm.temperature,
            max_tokens: llm.tokens_for(self.template.default_tokens(input)),
        }
    }

    /// Open a chunk stream for `input`, retrying transient failures.
    pub async fn open(&self, input: &T::Input) -> Result<Opened> {
        self.ctx.check_cancelled()?;
        let request = self.request(input);
        info!(
            template = self.template.name(),
            backend = self.ctx.backend.name(),
            model = %request.model,
            max_tokens = request.max_tokens,
            "opening stream"
        );

        let opened = open_with_backoff(
            self.ctx.backend.as_ref(),
            &self.ctx.client,
            &self.ctx.base_url,
            &request,
            &self.ctx.backoff,
            self.ctx.cancel_flag(),
            None,
        )
        .await?;

        debug!(template = self.template.name(), retries = opened.retries, "stream opened");
        Ok(opened)
    }
}
