//! KitchenCraft use cases.
//!
//! | Template | Output | Default tokens |
//! |----------|--------|----------------|
//! | [`RecipeTemplate`] | [`RecipeOutput`] | 2048 |
//! | [`TagSuggestionsTemplate`] | [`TagSuggestionsOutput`] | 256 |
//! | [`IngredientSuggestionsTemplate`] | [`IngredientSuggestionsOutput`] | 256 |
//! | [`TipsTemplate`] | [`TipsOutput`] | 512 |
//! | [`RemixSuggestionsTemplate`] | [`RemixSuggestionsOutput`] | 768 |

pub mod recipe;
pub mod remix;
pub mod suggestions;
pub mod tips;

pub use recipe::{RecipeInput, RecipeOutput, RecipeTemplate};
pub use remix::{RemixIdea, RemixSuggestionsOutput, RemixSuggestionsTemplate};
pub use suggestions::{
    IngredientSuggestionsOutput, IngredientSuggestionsTemplate, SuggestionsInput,
    TagSuggestionsOutput, TagSuggestionsTemplate,
};
pub use tips::{TipsOutput, TipsTemplate};

use crate::prompt::{bullet_list, render};

const SYSTEM_TEMPLATE: &str = "\
You are KitchenCraft, an assistant for home cooks.
{task}

Respond with YAML only, in exactly this shape:

{example}

Do not wrap the YAML in markdown fences and do not add any text before or after it.";

/// System message shared by every use case.
pub(crate) fn system_message(task: &str, example: &str) -> String {
    render(SYSTEM_TEMPLATE, &[("task", task), ("example", example)])
}

/// The parts of a recipe other use cases are built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeSummary {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

impl RecipeSummary {
    /// Render as a prompt section.
    pub fn describe(&self) -> String {
        let mut out = format!("Recipe: {}\n", self.name);
        if !self.description.is_empty() {
            out.push_str(&format!("{}\n", self.description));
        }
        if !self.ingredients.is_empty() {
            out.push_str(&format!("\nIngredients:\n{}\n", bullet_list(&self.ingredients)));
        }
        if !self.instructions.is_empty() {
            out.push_str(&format!("\nInstructions:\n{}\n", bullet_list(&self.instructions)));
        }
        out.trim_end().to_string()
    }
}

impl From<&RecipeOutput> for RecipeSummary {
    fn from(recipe: &RecipeOutput) -> Self {
        Self {
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_sections() {
        let summary = RecipeSummary {
            name: "Tomato Soup".into(),
            description: String::new(),
            ingredients: vec!["tomatoes".into()],
            instructions: Vec::new(),
        };
        assert_eq!(summary.describe(), "Recipe: Tomato Soup\n\nIngredients:\n- tomatoes");
    }

    #[test]
    fn system_message_embeds_example() {
        let msg = system_message("Suggest tags.", "tags:\n  - quick");
        assert!(msg.starts_with("You are KitchenCraft"));
        assert!(msg.contains("Suggest tags.\n\nRespond with YAML only"));
        assert!(msg.contains("\n\ntags:\n  - quick\n\n"));
    }
}
