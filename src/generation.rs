//! Orchestration of one structured generation.
//!
//! A generation streams the primary pass, validates the complete output and,
//! if validation fails, runs the fixer exactly once:
//!
//! ```text
//! Idle ─► Streaming ─► Validating ─► Done
//!             │             │
//!             ▼             ▼
//!           Failed       Fixing ─► Revalidating ─► Done
//!                           │             │
//!                           ▼             ▼
//!                         Failed        Failed
//! ```
//!
//! Every generation emits `Start`, then `Progress` events in chunk order,
//! then exactly one `Complete` or `Error`. Cancellation is the exception:
//! it stops the generation without a terminal event and returns
//! [`StreamError::Cancelled`].

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::backend::TextStream;
use crate::consumer::{consume, TokenConsumer};
use crate::diagnostics::GenerationDiagnostics;
use crate::error::{Result, StreamError};
use crate::events::{EventHandler, StreamEvent};
use crate::exec_ctx::ExecCtx;
use crate::fixer::{Fixer, FixerInput};
use crate::output_parser::finalize;
use crate::source::{PromptTemplate, StreamSource};
use crate::types::{FinalResult, GenerationFailure, Pass, PartialResult};

/// Where a generation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Streaming,
    Validating,
    Fixing,
    Revalidating,
    Done,
    Failed,
}

impl Phase {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Streaming)
                | (Streaming, Validating)
                | (Streaming, Failed)
                | (Validating, Done)
                | (Validating, Fixing)
                | (Fixing, Revalidating)
                | (Fixing, Failed)
                | (Revalidating, Done)
                | (Revalidating, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// Mutable state of one generation.
#[derive(Debug)]
struct Run {
    phase: Phase,
    diagnostics: GenerationDiagnostics,
}

impl Run {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            diagnostics: GenerationDiagnostics::default(),
        }
    }

    fn advance(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition(next) {
            return Err(StreamError::Other(format!(
                "invalid phase transition {:?} -> {:?}",
                self.phase, next
            )));
        }
        debug!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
        Ok(())
    }

    /// Record a failure. Cancellation leaves the phase untouched.
    fn fail(&mut self, err: StreamError) -> StreamError {
        if !matches!(err, StreamError::Cancelled) && self.phase.can_transition(Phase::Failed) {
            self.phase = Phase::Failed;
        }
        err
    }
}

/// Run a generation for `input`, reporting events to `handler`.
///
/// Returns the same outcome the terminal event carries.
///
/// ```no_run
/// use kitchencraft_stream::events::Callbacks;
/// use kitchencraft_stream::templates::{RecipeInput, RecipeOutput, RecipeTemplate};
/// use kitchencraft_stream::{generate, ExecCtxBuilder};
///
/// # async fn run() -> kitchencraft_stream::Result<()> {
/// let ctx = ExecCtxBuilder::from_env()?.build()?;
/// let callbacks = Callbacks::new().on_progress(|p| println!("{}", p.value));
/// let input = RecipeInput::new("tomato soup");
/// let result = generate(&ctx, &RecipeTemplate, &input, &callbacks).await?;
/// let recipe: RecipeOutput = result.parse_as()?;
/// # Ok(())
/// # }
/// ```
pub async fn generate<T: PromptTemplate>(
    ctx: &ExecCtx,
    template: &T,
    input: &T::Input,
    handler: &dyn EventHandler,
) -> Result<FinalResult> {
    run_with_events(ctx, template, input, None, handler).await
}

/// Like [`generate`], but the primary pass reads an already opened stream.
///
/// The context is still used for the fixer pass.
pub async fn generate_from_stream<T: PromptTemplate>(
    ctx: &ExecCtx,
    template: &T,
    input: &T::Input,
    stream: TextStream,
    handler: &dyn EventHandler,
) -> Result<FinalResult> {
    run_with_events(ctx, template, input, Some(stream), handler).await
}

/// Run a generation on a background task and return its events as a stream.
///
/// The stream ends after the terminal event. Dropping it cancels the
/// generation: the task stops pulling chunks and never starts a fixer call.
/// Must be called from within a tokio runtime.
pub fn generate_events<T>(
    ctx: Arc<ExecCtx>,
    template: Arc<T>,
    input: T::Input,
) -> BoxStream<'static, StreamEvent>
where
    T: PromptTemplate + 'static,
    T::Input: 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = ChannelHandler { tx: tx.clone() };

    tokio::spawn(async move {
        let generation = generate(&ctx, template.as_ref(), &input, &handler);
        tokio::select! {
            _ = generation => {}
            _ = tx.closed() => {
                debug!(template = template.name(), "event stream dropped, generation abandoned");
            }
        }
    });

    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|event| (event, rx)) }).boxed()
}

struct ChannelHandler {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl EventHandler for ChannelHandler {
    fn on_event(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }
}

async fn run_with_events<T: PromptTemplate>(
    ctx: &ExecCtx,
    template: &T,
    input: &T::Input,
    primary: Option<TextStream>,
    handler: &dyn EventHandler,
) -> Result<FinalResult> {
    let span = info_span!("generation", template = template.name(), backend = ctx.backend.name());
    async move {
        handler.on_event(StreamEvent::Start);

        let mut run = Run::new();
        let outcome = drive(ctx, template, input, primary, handler, &mut run).await;

        match &outcome {
            Ok(result) => {
                info!(
                    fixed = result.fixed,
                    chunks = result.diagnostics.chunks,
                    partial_hit_rate = result.diagnostics.partial_hit_rate(),
                    "generation complete"
                );
                handler.on_event(StreamEvent::Complete(result.clone()));
            }
            Err(err) => match GenerationFailure::from_error(err) {
                Some(failure) => {
                    warn!(
                        kind = ?failure.kind,
                        reason = %failure.reason,
                        phase = ?run.phase,
                        "generation failed"
                    );
                    handler.on_event(StreamEvent::Error(failure));
                }
                None => debug!("generation cancelled"),
            },
        }
        outcome
    }
    .instrument(span)
    .await
}

async fn drive<T: PromptTemplate>(
    ctx: &ExecCtx,
    template: &T,
    input: &T::Input,
    primary: Option<TextStream>,
    handler: &dyn EventHandler,
    run: &mut Run,
) -> Result<FinalResult> {
    run.advance(Phase::Streaming)?;
    let primary_pass = stream_pass(
        ctx,
        template,
        input,
        primary,
        Pass::Primary,
        Some(handler),
        &mut run.diagnostics,
    );
    let raw = match primary_pass.await {
        Ok(raw) => raw,
        Err(e) => return Err(run.fail(e)),
    };

    run.advance(Phase::Validating)?;
    let malformed = match finalize(&raw, template.schema()) {
        Ok(value) => {
            run.advance(Phase::Done)?;
            return Ok(FinalResult {
                value,
                raw,
                fixed: false,
                diagnostics: run.diagnostics.clone(),
            });
        }
        Err(malformed) => malformed,
    };

    let original = malformed.reason();
    warn!(reason = %original, raw_len = raw.len(), "output failed validation, running fixer");
    run.advance(Phase::Fixing)?;
    ctx.check_cancelled()?;
    run.diagnostics.fixer_invoked = true;

    let fixer = Fixer::for_template(template, input);
    let fixer_input = FixerInput {
        raw: malformed.sanitized,
        error: original.clone(),
    };
    let progress = ctx.fixer_progress.then_some(handler);
    let fixer_pass = stream_pass(
        ctx,
        &fixer,
        &fixer_input,
        None,
        Pass::Fixer,
        progress,
        &mut run.diagnostics,
    );
    let fixed_raw = match fixer_pass.await {
        Ok(text) => text,
        Err(StreamError::Cancelled) => return Err(StreamError::Cancelled),
        Err(e) => {
            return Err(run.fail(StreamError::FixerFailed {
                original,
                fixer: e.to_string(),
                raw,
            }))
        }
    };

    run.advance(Phase::Revalidating)?;
    match finalize(&fixed_raw, template.schema()) {
        Ok(value) => {
            run.advance(Phase::Done)?;
            Ok(FinalResult {
                value,
                raw: fixed_raw,
                fixed: true,
                diagnostics: run.diagnostics.clone(),
            })
        }
        Err(still_malformed) => Err(run.fail(StreamError::FixerFailed {
            original,
            fixer: still_malformed.reason(),
            raw,
        })),
    }
}

/// Open (unless given) and consume one pass, returning its raw text.
async fn stream_pass<T: PromptTemplate>(
    ctx: &ExecCtx,
    template: &T,
    input: &T::Input,
    preopened: Option<TextStream>,
    pass: Pass,
    handler: Option<&dyn EventHandler>,
    diagnostics: &mut GenerationDiagnostics,
) -> Result<String> {
    let stream = match preopened {
        Some(stream) => stream,
        None => {
            let opened = StreamSource::new(ctx, template).open(input).await?;
            diagnostics.transport_retries += opened.retries;
            opened.stream
        }
    };

    let mut consumer = TokenConsumer::new(template.schema(), pass);
    let mut on_progress = |partial: PartialResult| {
        if let Some(h) = handler {
            h.on_event(StreamEvent::Progress(partial));
        }
    };
    let outcome = consume(stream, &mut consumer, ctx.cancel_flag(), &mut on_progress).await;

    diagnostics.chunks += consumer.chunks();
    diagnostics.partial_attempts += consumer.attempts();
    diagnostics.partial_hits += consumer.hits();
    if pass == Pass::Primary {
        diagnostics.primary_raw_len = consumer.raw().len();
    }
    outcome?;

    debug!(
        ?pass,
        chunks = consumer.chunks(),
        hits = consumer.hits(),
        raw_len = consumer.raw().len(),
        "pass finished"
    );
    Ok(consumer.into_raw())
}
