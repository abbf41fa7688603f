//! One-shot correction pass for malformed output.
//!
//! [`Fixer`] is a [`PromptTemplate`] like any use case, so its pass runs
//! through the same stream, consume and finalize cycle. Its system prompt is
//! fixed apart from the embedded example of the primary template; its user
//! message carries the bad text and the validation error.

use crate::prompt::render;
use crate::schema::Schema;
use crate::source::PromptTemplate;

const SYSTEM_PROMPT: &str = "\
You repair structured text produced by another assistant.
Return only the corrected structured text, strictly matching the shape of the example below.
Do not add any prose, explanations or markdown code fences.
Keep every value from the original that fits the shape; fill required fields that are missing.

Example:
{example}";

const USER_PROMPT: &str = "\
The following text failed validation.

Text:
{raw}

Error:
{error}";

/// What the fixer is asked to correct.
#[derive(Debug, Clone, PartialEq)]
pub struct FixerInput {
    /// The sanitized text that failed validation.
    pub raw: String,
    /// The decode or validation error.
    pub error: String,
}

/// Correction template bound to a primary template's schema and example.
#[derive(Debug, Clone)]
pub struct Fixer<'a> {
    schema: &'a Schema,
    example: &'a str,
    max_tokens: u32,
}

impl<'a> Fixer<'a> {
    pub fn new(schema: &'a Schema, example: &'a str, max_tokens: u32) -> Self {
        Self {
            schema,
            example,
            max_tokens,
        }
    }

    /// A fixer for `template`, with the same token budget the primary pass had.
    pub fn for_template<T: PromptTemplate>(template: &'a T, input: &T::Input) -> Self {
        Self::new(template.schema(), template.example(), template.default_tokens(input))
    }
}

impl PromptTemplate for Fixer<'_> {
    type Input = FixerInput;

    fn name(&self) -> &str {
        "fixer"
    }

    fn schema(&self) -> &Schema {
        self.schema
    }

    fn example(&self) -> &str {
        self.example
    }

    fn system_message(&self, _input: &FixerInput) -> String {
        render(SYSTEM_PROMPT, &[("example", self.example)])
    }

    fn user_message(&self, input: &FixerInput) -> String {
        render(USER_PROMPT, &[("raw", input.raw.as_str()), ("error", input.error.as_str())])
    }

    fn default_tokens(&self, _input: &FixerInput) -> u32 {
        self.max_tokens
    }
}
