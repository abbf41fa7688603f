//! Generation events and the handlers that receive them.
//!
//! A generation emits `Start` once, zero or more `Progress` events, and
//! exactly one terminal `Complete` or `Error`. Handlers are called
//! synchronously and in order from the task driving the generation.
//! Implement [`EventHandler`] directly, wrap a closure in [`FnEventHandler`],
//! or register per-kind hooks on [`Callbacks`].

use crate::types::{FinalResult, GenerationFailure, PartialResult};

/// Events emitted during a generation.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The generation has started; emitted before the first chunk is pulled.
    Start,
    /// A new best partial decoding of the accumulated text.
    Progress(PartialResult),
    /// Terminal: the output validated against the full schema.
    Complete(FinalResult),
    /// Terminal: the generation failed.
    Error(GenerationFailure),
}

impl StreamEvent {
    /// Whether this event ends the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete(_) | StreamEvent::Error(_))
    }
}

/// Handler for generation events.
///
/// # Example
///
/// ```
/// use kitchencraft_stream::events::{EventHandler, StreamEvent};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: StreamEvent) {
///         match event {
///             StreamEvent::Progress(p) => println!("partial: {}", p.value),
///             StreamEvent::Complete(r) => println!("done: {}", r.value),
///             StreamEvent::Error(e) => println!("failed: {}", e.reason),
///             StreamEvent::Start => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called for each event, in emission order.
    fn on_event(&self, event: StreamEvent);
}

/// An [`EventHandler`] backed by a closure.
///
/// ```
/// use kitchencraft_stream::events::{FnEventHandler, StreamEvent};
///
/// let handler = FnEventHandler(|event: StreamEvent| {
///     if let StreamEvent::Progress(p) = event {
///         println!("{}", p.value);
///     }
/// });
/// ```
pub struct FnEventHandler<F: Fn(StreamEvent) + Send + Sync>(pub F);

impl<F: Fn(StreamEvent) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: StreamEvent) {
        (self.0)(event);
    }
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl EventHandler for NullHandler {
    fn on_event(&self, _event: StreamEvent) {}
}

type Hook<T> = Box<dyn Fn(T) + Send + Sync>;

/// Per-kind hooks: `on_start`, `on_progress`, `on_complete`, `on_error`.
///
/// Unset hooks are skipped.
///
/// ```
/// use kitchencraft_stream::events::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_progress(|p| println!("partial: {}", p.value))
///     .on_complete(|r| println!("done: {}", r.value))
///     .on_error(|e| eprintln!("failed: {}", e.reason));
/// ```
#[derive(Default)]
pub struct Callbacks {
    start: Option<Hook<()>>,
    progress: Option<Hook<PartialResult>>,
    complete: Option<Hook<FinalResult>>,
    error: Option<Hook<GenerationFailure>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn(()) + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(PartialResult) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(FinalResult) + Send + Sync + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(GenerationFailure) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl EventHandler for Callbacks {
    fn on_event(&self, event: StreamEvent) {
        match event {
            StreamEvent::Start => {
                if let Some(f) = &self.start {
                    f(());
                }
            }
            StreamEvent::Progress(p) => {
                if let Some(f) = &self.progress {
                    f(p);
                }
            }
            StreamEvent::Complete(r) => {
                if let Some(f) = &self.complete {
                    f(r);
                }
            }
            StreamEvent::Error(e) => {
                if let Some(f) = &self.error {
                    f(e);
                }
            }
        }
    }
}
