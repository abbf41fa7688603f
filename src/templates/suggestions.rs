//! Short suggestion lists: tags and ingredients.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::prompt::comma_list;
use crate::schema::{Field, Schema};
use crate::source::PromptTemplate;

const TAG_EXAMPLE: &str = "\
tags:
  - weeknight
  - one-pot
  - vegetarian
  - under 30 minutes";

const INGREDIENT_EXAMPLE: &str = "\
ingredients:
  - chickpeas
  - smoked paprika
  - baby spinach
  - lemon";

/// A partially written request and the items already chosen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionsInput {
    pub prompt: String,
    /// Items the cook already picked; suggestions should not repeat them.
    pub selected: Vec<String>,
}

impl SuggestionsInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            selected: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSuggestionsOutput {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSuggestionsOutput {
    pub ingredients: Vec<String>,
}

fn list_schema(key: &'static str, cell: &'static OnceLock<Schema>) -> &'static Schema {
    cell.get_or_init(|| Schema::object([Field::required(key, Schema::array(Schema::String))]))
}

fn suggestion_request(kind: &str, input: &SuggestionsInput) -> String {
    format!(
        "Request: {}\nAlready selected {}: {}",
        input.prompt.trim(),
        kind,
        comma_list(&input.selected, "none")
    )
}

/// Suggests short tags for a recipe request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagSuggestionsTemplate;

impl PromptTemplate for TagSuggestionsTemplate {
    type Input = SuggestionsInput;

    fn name(&self) -> &str {
        "tag-suggestions"
    }

    fn schema(&self) -> &Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        list_schema("tags", &SCHEMA)
    }

    fn example(&self) -> &str {
        TAG_EXAMPLE
    }

    fn system_message(&self, _input: &SuggestionsInput) -> String {
        super::system_message(
            "Suggest up to 6 short tags (cuisine, technique, diet, occasion or time) that would refine the request. Do not repeat tags already selected.",
            TAG_EXAMPLE,
        )
    }

    fn user_message(&self, input: &SuggestionsInput) -> String {
        suggestion_request("tags", input)
    }

    fn default_tokens(&self, _input: &SuggestionsInput) -> u32 {
        256
    }
}

/// Suggests ingredients that fit a recipe request.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngredientSuggestionsTemplate;

impl PromptTemplate for IngredientSuggestionsTemplate {
    type Input = SuggestionsInput;

    fn name(&self) -> &str {
        "ingredient-suggestions"
    }

    fn schema(&self) -> &Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        list_schema("ingredients", &SCHEMA)
    }

    fn example(&self) -> &str {
        INGREDIENT_EXAMPLE
    }

    fn system_message(&self, _input: &SuggestionsInput) -> String {
        super::system_message(
            "Suggest up to 6 ingredients that would work well with the request. Use plain ingredient names without quantities. Do not repeat ingredients already selected.",
            INGREDIENT_EXAMPLE,
        )
    }

    fn user_message(&self, input: &SuggestionsInput) -> String {
        suggestion_request("ingredients", input)
    }

    fn default_tokens(&self, _input: &SuggestionsInput) -> u32 {
        256
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output_parser::finalize;

    #[test]
    fn examples_satisfy_schemas() {
        let tags = finalize(TAG_EXAMPLE, TagSuggestionsTemplate.schema()).unwrap();
        let parsed: TagSuggestionsOutput = serde_json::from_value(tags).unwrap();
        assert_eq!(parsed.tags.len(), 4);

        let ingredients =
            finalize(INGREDIENT_EXAMPLE, IngredientSuggestionsTemplate.schema()).unwrap();
        let parsed: IngredientSuggestionsOutput = serde_json::from_value(ingredients).unwrap();
        assert_eq!(parsed.ingredients[0], "chickpeas");
    }

    #[test]
    fn schemas_are_distinct() {
        assert_ne!(TagSuggestionsTemplate.schema(), IngredientSuggestionsTemplate.schema());
    }

    #[test]
    fn user_message_mentions_selection() {
        let input = SuggestionsInput {
            selected: vec!["soup".into()],
            ..SuggestionsInput::new("tomato")
        };
        assert_eq!(
            TagSuggestionsTemplate.user_message(&input),
            "Request: tomato\nAlready selected tags: soup"
        );
        assert_eq!(
            IngredientSuggestionsTemplate.user_message(&SuggestionsInput::new("tomato")),
            "Request: tomato\nAlready selected ingredients: none"
        );
    }

    #[test]
    fn default_budgets() {
        let input = SuggestionsInput::default();
        assert_eq!(TagSuggestionsTemplate.default_tokens(&input), 256);
        assert_eq!(IngredientSuggestionsTemplate.default_tokens(&input), 256);
    }
}
