//! Example: streaming a recipe from an OpenAI-compatible endpoint.
//!
//! Reads `OPENAI_API_KEY` (and optional overrides) from the environment or
//! a `.env` file.
//!
//! Run with: `cargo run --example streaming_recipe -- "something with leeks"`

use std::sync::Arc;

use futures::StreamExt;
use kitchencraft_stream::templates::{RecipeInput, RecipeOutput, RecipeTemplate};
use kitchencraft_stream::{generate_events, BackoffConfig, ExecCtxBuilder, StreamEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a quick weeknight pasta".to_string());

    let ctx = ExecCtxBuilder::from_env()?
        .backoff(BackoffConfig::interactive())
        .build()?;

    let mut input = RecipeInput::new(prompt);
    input.servings = Some(2);

    let mut events = generate_events(Arc::new(ctx), Arc::new(RecipeTemplate), input);
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Start => println!("generating..."),
            StreamEvent::Progress(partial) => {
                let name = partial.value.get("name").and_then(|v| v.as_str());
                let count = partial
                    .value
                    .get("ingredients")
                    .and_then(|v| v.as_array())
                    .map_or(0, |a| a.len());
                println!("{:?}: {} ingredients", name, count);
            }
            StreamEvent::Complete(result) => {
                let recipe: RecipeOutput = result.parse_as()?;
                println!("\n# {}\n{}\n", recipe.name, recipe.description);
                for (i, step) in recipe.instructions.iter().enumerate() {
                    println!("{}. {}", i + 1, step);
                }
                if result.fixed {
                    println!("\n(repaired by the fixer pass)");
                }
            }
            StreamEvent::Error(failure) => {
                eprintln!("generation failed: {}", failure.reason);
                if let Some(fixer) = failure.fixer_reason {
                    eprintln!("fixer: {}", fixer);
                }
            }
        }
    }

    Ok(())
}
