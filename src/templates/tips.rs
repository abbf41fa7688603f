//! Cooking tips for an existing recipe.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::RecipeSummary;
use crate::schema::{Field, Schema};
use crate::source::PromptTemplate;

const EXAMPLE: &str = "\
tips:
  - Salt the tomatoes while the onions soften to draw out their juices.
  - Stir in a splash of cream off the heat for a silkier texture.
  - The soup keeps for 4 days in the fridge and tastes better on day two.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipsOutput {
    pub tips: Vec<String>,
}

/// Practical tips for cooking a given recipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct TipsTemplate;

impl PromptTemplate for TipsTemplate {
    type Input = RecipeSummary;

    fn name(&self) -> &str {
        "tips"
    }

    fn schema(&self) -> &Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::object([Field::required("tips", Schema::array(Schema::String))])
        })
    }

    fn example(&self) -> &str {
        EXAMPLE
    }

    fn system_message(&self, _input: &RecipeSummary) -> String {
        super::system_message(
            "Give 3 to 5 concise, specific tips that help a home cook succeed with the recipe: technique, substitutions, make-ahead or storage.",
            EXAMPLE,
        )
    }

    fn user_message(&self, input: &RecipeSummary) -> String {
        input.describe()
    }

    fn default_tokens(&self, _input: &RecipeSummary) -> u32 {
        512
    }
}
