use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chef::{ImagePayload, RecipeResult};
use chef_client::kitchen::{
    FakeGateway, GatewayConfig, IllustrationPolicy, LogProgress, ModelGateway, OpenAiGateway,
    PipelineOptions, RecipeOrchestrator,
};
use clap::Parser;

/// Invent a recipe from two food photos
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Photo of the first ingredient (jpg or png)
    image1: PathBuf,
    /// Photo of the second ingredient (jpg or png)
    image2: PathBuf,
    /// Print the result as JSON instead of text
    #[arg(long)]
    json: bool,
    /// Keep the recipe even if an illustration cannot be generated
    #[arg(long)]
    best_effort: bool,
    /// Give up on any single model call after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
    /// OpenAI-compatible API base URL
    #[arg(long)]
    api_base: Option<String>,
    /// Use canned replies instead of calling a model provider
    #[arg(long)]
    fake: bool,
}

async fn read_image(path: &PathBuf) -> Result<ImagePayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Reading {}", path.display()))?;
    ImagePayload::from_bytes(bytes).with_context(|| format!("Loading {}", path.display()))
}

fn print_recipe(result: &RecipeResult) {
    let recipe = &result.recipe;
    println!("{} + {}", result.foods[0], result.foods[1]);
    println!();
    println!("## {}", recipe.name);
    println!("{}", recipe.description);
    println!();
    println!("### Ingredients");
    for ingredient in &recipe.ingredients {
        println!("- {}", ingredient);
    }
    println!();
    println!("### Instructions");
    for (i, step) in recipe.instructions.iter().enumerate() {
        println!("{}. {}", i + 1, step);
    }
    println!();
    for image in result.images() {
        println!("{}: {}", image.caption(), image.url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let image1 = read_image(&args.image1).await?;
    let image2 = read_image(&args.image2).await?;

    let gateway: Arc<dyn ModelGateway> = if args.fake {
        Arc::new(FakeGateway::demo())
    } else {
        let config = GatewayConfig {
            api_base: args.api_base,
            ..Default::default()
        };
        Arc::new(OpenAiGateway::from_env(config)?)
    };
    let chef = RecipeOrchestrator::new(gateway).with_options(PipelineOptions {
        call_timeout: Duration::from_secs(args.timeout_secs),
        illustrations: if args.best_effort {
            IllustrationPolicy::BestEffort
        } else {
            IllustrationPolicy::Required
        },
    });

    let result = chef
        .create_recipe_with_progress(image1, image2, &LogProgress)
        .await
        .context("Creating recipe")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_recipe(&result);
    }
    Ok(())
}
