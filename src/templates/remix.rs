//! Variations on an existing recipe.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::RecipeSummary;
use crate::schema::{Field, Schema};
use crate::source::PromptTemplate;

const EXAMPLE: &str = "\
ideas:
  - name: Roasted Red Pepper Tomato Soup
    description: Swap half the tomatoes for roasted red peppers for a sweeter, smoky bowl.
  - name: Creamy Tomato Orzo
    description: Simmer orzo directly in the soup to turn it into a one-pot dinner.
  - name: Spicy Tomato Coconut Soup
    description: Replace the stock with coconut milk and add red curry paste.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemixIdea {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemixSuggestionsOutput {
    pub ideas: Vec<RemixIdea>,
}

/// Suggests remixes of a recipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemixSuggestionsTemplate;

impl PromptTemplate for RemixSuggestionsTemplate {
    type Input = RecipeSummary;

    fn name(&self) -> &str {
        "remix-suggestions"
    }

    fn schema(&self) -> &Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let idea = Schema::object([
                Field::required("name", Schema::String),
                Field::required("description", Schema::String),
            ]);
            Schema::object([Field::required("ideas", Schema::array(idea))])
        })
    }

    fn example(&self) -> &str {
        EXAMPLE
    }

    fn system_message(&self, _input: &RecipeSummary) -> String {
        super::system_message(
            "Suggest 3 to 6 remixes of the recipe. Each remix changes one clear thing (an ingredient, a technique, or a cuisine) and gets a short name and a one-sentence description.",
            EXAMPLE,
        )
    }

    fn user_message(&self, input: &RecipeSummary) -> String {
        input.describe()
    }

    fn default_tokens(&self, _input: &RecipeSummary) -> u32 {
        768
    }
}
