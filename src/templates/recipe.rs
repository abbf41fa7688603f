//! Full recipe generation.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::prompt::comma_list;
use crate::schema::{Field, Schema};
use crate::source::PromptTemplate;

const EXAMPLE: &str = "\
name: Tomato Soup
description: A warm, classic soup made with ripe tomatoes and fresh basil.
yield: 4 servings
prepTime: 10 minutes
cookTime: 30 minutes
totalTime: 40 minutes
tags:
  - soup
  - vegetarian
ingredients:
  - 2 lbs ripe tomatoes, chopped
  - 1 yellow onion, diced
  - 2 cloves garlic, minced
  - 2 cups vegetable stock
  - 1/4 cup fresh basil
instructions:
  - Heat olive oil in a large pot over medium heat.
  - Add the onion and garlic and cook until soft, about 5 minutes.
  - Add the tomatoes and stock, then simmer for 20 minutes.
  - Blend until smooth and stir in the basil.";

/// What the cook asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeInput {
    /// Free-form request, e.g. "something cozy with tomatoes".
    pub prompt: String,
    pub servings: Option<u32>,
    pub dietary: Vec<String>,
    pub equipment: Vec<String>,
    /// Ingredients already on hand.
    pub pantry: Vec<String>,
}

impl RecipeInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// A generated recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeOutput {
    pub name: String,
    pub description: String,
    #[serde(rename = "yield")]
    pub recipe_yield: String,
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub cook_time: Option<String>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::object([
            Field::required("name", Schema::String),
            Field::required("description", Schema::String),
            Field::required("yield", Schema::String),
            Field::optional("prepTime", Schema::String),
            Field::optional("cookTime", Schema::String),
            Field::optional("totalTime", Schema::String),
            Field::optional("tags", Schema::array(Schema::String)),
            Field::required("ingredients", Schema::array(Schema::String)),
            Field::required("instructions", Schema::array(Schema::String)),
        ])
    })
}

/// Generates a complete recipe from a free-form request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecipeTemplate;

impl PromptTemplate for RecipeTemplate {
    type Input = RecipeInput;

    fn name(&self) -> &str {
        "recipe"
    }

    fn schema(&self) -> &Schema {
        schema()
    }

    fn example(&self) -> &str {
        EXAMPLE
    }

    fn system_message(&self, _input: &RecipeInput) -> String {
        super::system_message(
            "Write one complete, practical recipe for the request. List each ingredient with its quantity, and give instructions as short ordered steps.",
            EXAMPLE,
        )
    }

    fn user_message(&self, input: &RecipeInput) -> String {
        let mut lines = vec![format!("Request: {}", input.prompt.trim())];
        if let Some(servings) = input.servings {
            lines.push(format!("Servings: {}", servings));
        }
        if !input.dietary.is_empty() {
            lines.push(format!("Dietary needs: {}", comma_list(&input.dietary, "")));
        }
        if !input.equipment.is_empty() {
            lines.push(format!("Available equipment: {}", comma_list(&input.equipment, "")));
        }
        if !input.pantry.is_empty() {
            lines.push(format!("Ingredients on hand: {}", comma_list(&input.pantry, "")));
        }
        lines.join("\n")
    }

    fn default_tokens(&self, _input: &RecipeInput) -> u32 {
        2048
    }
}
