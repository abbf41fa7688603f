//! # Structured Output Parser
//!
//! Turns raw, possibly incomplete LLM text into schema-valid values.
//!
//! | Function | Use Case |
//! |----------|----------|
//! | [`sanitize`] | Normalize fences, prose, reasoning blocks and YAML quirks |
//! | [`parse_partial`] | Best-effort decode of in-flight text against a partial schema |
//! | [`finalize`] | Strict decode of complete text against the full schema |
//! | [`strip_think_tags`] | Remove `<think>` blocks from text |

pub mod error;
pub mod sanitize;
pub mod yaml;

pub use error::{MalformedOutput, ParseError};
pub use sanitize::{sanitize, strip_think_tags};
pub use yaml::{decode, finalize, parse_partial};
