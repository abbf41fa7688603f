//! Example: streaming a recipe from MockBackend without a live LLM.
//!
//! Run with: `cargo run --example mock_recipe`

use std::sync::Arc;
use std::time::Duration;

use kitchencraft_stream::events::Callbacks;
use kitchencraft_stream::templates::{
    RecipeInput, RecipeOutput, RecipeSummary, RecipeTemplate, TipsOutput, TipsTemplate,
};
use kitchencraft_stream::{
    generate, ExecCtx, MockBackend, MockResponse, NullHandler, PromptTemplate,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Replay the template's own example in small chunks, like a real model would
    let canned = MockResponse::chunked(RecipeTemplate.example(), 24);
    let tips = MockResponse::text(TipsTemplate.example());
    let mock = MockBackend::new(vec![canned, tips]).with_chunk_delay(Duration::from_millis(15));

    let ctx = ExecCtx::builder("http://unused")
        .backend(Arc::new(mock))
        .build()?;

    let callbacks = Callbacks::new()
        .on_start(|_| println!("started"))
        .on_progress(|p| {
            let name = p.value.get("name").and_then(|v| v.as_str()).unwrap_or("...");
            let steps = p
                .value
                .get("instructions")
                .and_then(|v| v.as_array())
                .map_or(0, |a| a.len());
            println!("[{:>4} bytes] {} ({} steps so far)", p.raw_len, name, steps);
        })
        .on_error(|e| eprintln!("failed: {}", e.reason));

    let input = RecipeInput::new("a cozy tomato soup");
    let result = generate(&ctx, &RecipeTemplate, &input, &callbacks).await?;

    let recipe: RecipeOutput = result.parse_as()?;
    println!("\n{} ({})", recipe.name, recipe.recipe_yield);
    for ingredient in &recipe.ingredients {
        println!("  - {}", ingredient);
    }
    println!(
        "chunks: {}, partial hit rate: {:.0}%",
        result.diagnostics.chunks,
        result.diagnostics.partial_hit_rate() * 100.0
    );

    // Feed the finished recipe into a follow-up template
    let summary = RecipeSummary::from(&recipe);
    let tips: TipsOutput = generate(&ctx, &TipsTemplate, &summary, &NullHandler)
        .await?
        .parse_as()?;
    println!("\nTips:");
    for tip in &tips.tips {
        println!("  * {}", tip);
    }

    Ok(())
}
