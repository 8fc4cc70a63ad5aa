use std::sync::Arc;
use std::time::Duration;

use chef::{IllustrationStyle, ImagePayload, PipelineState, Stage};
use chef_client::kitchen::fake::{GatewayCall, Scripted};
use chef_client::kitchen::{FakeGateway, IllustrationPolicy, PipelineOptions, RecipeOrchestrator};
use chef_client::{ClassificationFailure, PipelineError};
use serde_json::json;

fn photo() -> ImagePayload {
    ImagePayload::from_bytes(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec()).unwrap()
}

fn crumble() -> serde_json::Value {
    json!({
        "name": "Spiced Orchard Crumble",
        "description": "Soft baked fruit under a buttery, fragrant topping.",
        "ingredients": ["4 apples", "1 cinnamon stick", "100 g butter"],
        "instructions": ["Slice the fruit.", "Grate the spice over it.", "Bake for 40 minutes."]
    })
}

fn apple_and_cinnamon() -> FakeGateway {
    FakeGateway::new()
        .with_label("apple")
        .with_label("cinnamon stick")
        .with_recipe(crumble())
        .with_image("https://images.example.com/photo.png")
        .with_image("https://images.example.com/drawing.png")
}

fn prompts(calls: &[GatewayCall]) -> (Vec<String>, Vec<String>) {
    let mut text = vec![];
    let mut images = vec![];
    for call in calls {
        match call {
            GatewayCall::StructuredText { prompt } => text.push(prompt.clone()),
            GatewayCall::Image { prompt, .. } => images.push(prompt.clone()),
            GatewayCall::Classify { .. } => {}
        }
    }
    (text, images)
}

#[tokio::test]
async fn apple_and_cinnamon_become_a_recipe() {
    let gateway = Arc::new(apple_and_cinnamon());
    let chef = RecipeOrchestrator::new(gateway.clone());

    let result = chef.create_recipe(photo(), photo()).await.unwrap();

    assert_eq!(result.foods[0].as_str(), "apple");
    assert_eq!(result.foods[1].as_str(), "cinnamon stick");
    assert!(!result.recipe.name.is_empty());
    assert!(!result.recipe.description.is_empty());
    assert!(!result.recipe.ingredients.is_empty());
    assert!(!result.recipe.instructions.is_empty());
    assert!(result.is_complete());
    let images: Vec<_> = result.images().collect();
    assert_eq!(images.len(), 2);
    assert_ne!(images[0].url, images[1].url);
    assert_eq!(images[0].style, IllustrationStyle::Photographic);
    assert_eq!(images[1].style, IllustrationStyle::Illustrated);

    let calls = gateway.calls().await;
    assert!(matches!(calls[0], GatewayCall::Classify { .. }));
    assert!(matches!(calls[1], GatewayCall::Classify { .. }));
    assert!(matches!(calls[2], GatewayCall::StructuredText { .. }));
    assert!(matches!(calls[3], GatewayCall::Image { count: 1, .. }));
    assert!(matches!(calls[4], GatewayCall::Image { count: 1, .. }));

    let (text, images) = prompts(&calls);
    assert!(text[0].contains("apple"));
    assert!(text[0].contains("cinnamon stick"));
    for prompt in images {
        assert!(prompt.contains("Spiced Orchard Crumble"));
        assert!(prompt.contains("Soft baked fruit under a buttery, fragrant topping."));
        assert!(!prompt.contains("apple"));
        assert!(!prompt.contains("cinnamon stick"));
    }
}

#[tokio::test]
async fn classify_prompt_asks_for_just_the_name() {
    let gateway = Arc::new(apple_and_cinnamon());
    RecipeOrchestrator::new(gateway.clone())
        .create_recipe(photo(), photo())
        .await
        .unwrap();
    match &gateway.calls().await[0] {
        GatewayCall::Classify { prompt, image_bytes } => {
            assert_eq!(prompt, "What food is this? Give just the name:");
            assert_eq!(*image_bytes, photo().len());
        }
        other => panic!("unexpected first call {:?}", other),
    }
}

#[tokio::test]
async fn missing_ingredients_fails_recipe_generation() {
    let mut recipe = crumble();
    recipe.as_object_mut().unwrap().remove("ingredients");
    let gateway = Arc::new(
        FakeGateway::new()
            .with_label("apple")
            .with_label("cinnamon stick")
            .with_recipe(recipe),
    );

    let err = RecipeOrchestrator::new(gateway.clone())
        .create_recipe(photo(), photo())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::ComposingRecipe);
    assert!(err.is_schema_mismatch());
    let (_, images) = prompts(&gateway.calls().await);
    assert!(images.is_empty());
}

#[tokio::test]
async fn failed_classification_stops_everything() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_label("apple")
            .script_label(Scripted::Fail("quota exceeded".into()))
            .with_recipe(crumble()),
    );

    let err = RecipeOrchestrator::new(gateway.clone())
        .create_recipe(photo(), photo())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Classifying);
    assert!(matches!(
        err,
        PipelineError::Classification {
            image: 2,
            source: ClassificationFailure::Gateway(_)
        }
    ));
    let (text, images) = prompts(&gateway.calls().await);
    assert!(text.is_empty());
    assert!(images.is_empty());
}

#[tokio::test]
async fn blank_label_is_a_classification_error() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_label("  \n ")
            .with_label("cinnamon stick"),
    );

    let err = RecipeOrchestrator::new(gateway.clone())
        .create_recipe(photo(), photo())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Classification {
            image: 1,
            source: ClassificationFailure::Label(_)
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_second_classification_times_out() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_label("apple")
            .script_label(Scripted::Hang)
            .with_recipe(crumble()),
    );
    let chef = RecipeOrchestrator::new(gateway.clone()).with_options(PipelineOptions {
        call_timeout: Duration::from_secs(30),
        ..Default::default()
    });

    let err = chef.create_recipe(photo(), photo()).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Timeout {
            stage: Stage::Classifying,
            after
        } if after == Duration::from_secs(30)
    ));
    let (text, _) = prompts(&gateway.calls().await);
    assert!(text.is_empty());
}

#[tokio::test]
async fn image_failure_is_fatal_by_default() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_label("apple")
            .with_label("cinnamon stick")
            .with_recipe(crumble())
            .with_image("https://images.example.com/photo.png")
            .script_image(Scripted::Fail("content policy".into())),
    );

    let err = RecipeOrchestrator::new(gateway)
        .create_recipe(photo(), photo())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::ImageGeneration {
            style: IllustrationStyle::Illustrated,
            ..
        }
    ));
    assert_eq!(err.stage(), Stage::Illustrating);
}

#[tokio::test]
async fn empty_image_list_is_an_error() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_label("apple")
            .with_label("cinnamon stick")
            .with_recipe(crumble())
            .script_image(Scripted::Reply(vec![]))
            .with_image("https://images.example.com/drawing.png"),
    );

    let err = RecipeOrchestrator::new(gateway)
        .create_recipe(photo(), photo())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::ImageGeneration {
            style: IllustrationStyle::Photographic,
            ..
        }
    ));
}

#[tokio::test]
async fn best_effort_keeps_the_recipe_without_failed_images() {
    let gateway = Arc::new(
        FakeGateway::new()
            .with_label("apple")
            .with_label("cinnamon stick")
            .with_recipe(crumble())
            .with_image("https://images.example.com/photo.png")
            .script_image(Scripted::Fail("content policy".into())),
    );
    let chef = RecipeOrchestrator::new(gateway).with_options(PipelineOptions {
        illustrations: IllustrationPolicy::BestEffort,
        ..Default::default()
    });

    let result = chef.create_recipe(photo(), photo()).await.unwrap();

    assert_eq!(result.recipe.name, "Spiced Orchard Crumble");
    assert!(result.photo.is_some());
    assert!(result.drawing.is_none());
    assert!(!result.is_complete());
}

#[tokio::test]
async fn progress_follows_the_stages() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    RecipeOrchestrator::new(Arc::new(apple_and_cinnamon()))
        .create_recipe_with_progress(photo(), photo(), &tx)
        .await
        .unwrap();
    drop(tx);

    let mut states = vec![];
    while let Some(state) = rx.recv().await {
        states.push(state);
    }
    assert_eq!(
        states,
        vec![
            PipelineState::Running(Stage::Classifying),
            PipelineState::Running(Stage::ComposingRecipe),
            PipelineState::Running(Stage::Illustrating),
            PipelineState::Done,
        ]
    );
}

#[tokio::test]
async fn progress_reports_the_failed_stage() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let gateway = FakeGateway::new().script_label(Scripted::Fail("offline".into()));
    let _ = RecipeOrchestrator::new(Arc::new(gateway))
        .create_recipe_with_progress(photo(), photo(), &tx)
        .await;
    drop(tx);

    let mut states = vec![];
    while let Some(state) = rx.recv().await {
        states.push(state);
    }
    assert_eq!(
        states,
        vec![
            PipelineState::Running(Stage::Classifying),
            PipelineState::Failed(Stage::Classifying),
        ]
    );
}
