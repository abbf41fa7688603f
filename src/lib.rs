//! # KitchenCraft Stream
//!
//! The streaming structured-output core of KitchenCraft: LLM text arrives as
//! an async stream of chunks, is progressively decoded as YAML against a
//! relaxed "deep partial" schema so callers can render results while they
//! generate, is validated strictly at the end, and is repaired at most once
//! by a secondary fixer pass when the model gets the shape wrong.
//!
//! ## Core Concepts
//!
//! - **[`Schema`]**: declarative output shape with mechanical
//!   [`deep_partial`](Schema::deep_partial) relaxation.
//! - **[`output_parser`]**: [`sanitize`](output_parser::sanitize),
//!   [`parse_partial`](output_parser::parse_partial) and
//!   [`finalize`](output_parser::finalize) for messy model text.
//! - **[`TokenConsumer`]**: append-only accumulator that re-decodes the
//!   whole text after every chunk.
//! - **[`PromptTemplate`]**: a single use case with its schema, example, messages and
//!   token budget. See [`templates`] for the KitchenCraft ones.
//! - **[`ExecCtx`]**: shared client, backend, model settings, retry policy
//!   and cancellation.
//! - **[`generate`]** / **[`generate_events`]**: run a generation and
//!   observe `Start`, `Progress` and exactly one `Complete` or `Error`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kitchencraft_stream::events::Callbacks;
//! use kitchencraft_stream::templates::{RecipeInput, RecipeOutput, RecipeTemplate};
//! use kitchencraft_stream::{generate, ExecCtxBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = ExecCtxBuilder::from_env()?.build()?;
//!
//!     let callbacks = Callbacks::new()
//!         .on_progress(|p| println!("so far: {}", p.value))
//!         .on_error(|e| eprintln!("failed: {}", e.reason));
//!
//!     let input = RecipeInput::new("a cozy tomato soup");
//!     let result = generate(&ctx, &RecipeTemplate, &input, &callbacks).await?;
//!     let recipe: RecipeOutput = result.parse_as()?;
//!     println!("{} serves {}", recipe.name, recipe.recipe_yield);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod consumer;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod fixer;
pub mod generation;
pub mod output_parser;
pub mod prompt;
pub mod schema;
pub mod source;
pub mod templates;
pub mod types;

pub use backend::{
    Backend, BackoffConfig, LlmRequest, MockBackend, MockResponse, OpenAiBackend, TextStream,
};
pub use config::LlmConfig;
pub use consumer::TokenConsumer;
pub use diagnostics::GenerationDiagnostics;
pub use error::{Result, StreamError};
pub use events::{Callbacks, EventHandler, FnEventHandler, NullHandler, StreamEvent};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use fixer::{Fixer, FixerInput};
pub use generation::{generate, generate_events, generate_from_stream, Phase};
pub use schema::{Field, Schema};
pub use source::{PromptTemplate, StreamSource};
pub use types::{FailureKind, FinalResult, GenerationFailure, Pass, PartialResult};
