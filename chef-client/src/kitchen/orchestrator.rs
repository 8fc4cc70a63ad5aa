use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chef::{
    FoodLabel, GeneratedImageRef, IllustrationStyle, ImagePayload, Recipe, RecipeResult, Stage,
};
use serde::{Deserialize, Serialize};

use super::gateway::{GatewayError, ImageSize, ModelGateway};
use super::progress::{ProgressSink, StateTracker};
use super::prompts;
use crate::errors::PipelineError;

/// What to do when one of the two illustrations cannot be generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllustrationPolicy {
    /// Any image failure fails the whole request.
    #[default]
    Required,
    /// Return the recipe anyway, without the image that failed.
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound for each individual call to the gateway
    pub call_timeout: Duration,
    pub illustrations: IllustrationPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            illustrations: IllustrationPolicy::Required,
        }
    }
}

/// Turns two food photos into a recipe with pictures.
///
/// Stages run strictly in order: identify both foods, write the recipe, then
/// draw it. The two calls inside the first and last stage are independent
/// and run concurrently. Nothing is retried; the first failure ends the run.
#[derive(Debug, Clone)]
pub struct RecipeOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    options: PipelineOptions,
}

impl RecipeOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub async fn create_recipe(
        &self,
        image1: ImagePayload,
        image2: ImagePayload,
    ) -> Result<RecipeResult, PipelineError> {
        self.create_recipe_with_progress(image1, image2, &()).await
    }

    /// Same as [`Self::create_recipe`], reporting each state change to `progress`.
    #[tracing::instrument(name = "create_recipe", skip_all)]
    pub async fn create_recipe_with_progress(
        &self,
        image1: ImagePayload,
        image2: ImagePayload,
        progress: &dyn ProgressSink,
    ) -> Result<RecipeResult, PipelineError> {
        let mut tracker = StateTracker::new(progress);
        let result = self.run(&image1, &image2, &mut tracker).await;
        match &result {
            Ok(_) => tracker.finish(),
            Err(err) => {
                tracing::warn!(stage = %err.stage(), "Recipe pipeline failed: {}", err);
                tracker.fail(err.stage());
            }
        }
        tracing::debug!(state = ?tracker.state(), "Recipe pipeline finished");
        result
    }

    async fn run(
        &self,
        image1: &ImagePayload,
        image2: &ImagePayload,
        tracker: &mut StateTracker<'_>,
    ) -> Result<RecipeResult, PipelineError> {
        tracker.enter(Stage::Classifying);
        tracing::info!(
            image1 = image1.len(),
            image2 = image2.len(),
            "Analyzing ingredients"
        );
        let (food1, food2) = tokio::try_join!(self.classify(1, image1), self.classify(2, image2))?;

        tracker.enter(Stage::ComposingRecipe);
        let recipe = self.compose(&food1, &food2).await?;

        tracker.enter(Stage::Illustrating);
        tracing::info!(recipe = %recipe.name, "Creating visuals");
        let photo = self.illustrate(&recipe, IllustrationStyle::Photographic);
        let drawing = self.illustrate(&recipe, IllustrationStyle::Illustrated);
        let (photo, drawing) = match self.options.illustrations {
            IllustrationPolicy::Required => {
                let (photo, drawing) = tokio::try_join!(photo, drawing)?;
                (Some(photo), Some(drawing))
            }
            IllustrationPolicy::BestEffort => {
                let (photo, drawing) = tokio::join!(photo, drawing);
                (skip_failed(photo), skip_failed(drawing))
            }
        };

        Ok(RecipeResult {
            foods: [food1, food2],
            recipe,
            photo,
            drawing,
        })
    }

    async fn classify(&self, image: u8, payload: &ImagePayload) -> Result<FoodLabel, PipelineError> {
        let reply = self
            .bounded(
                Stage::Classifying,
                self.gateway.classify_image(payload, prompts::identify_food()),
            )
            .await?
            .map_err(|err| PipelineError::Classification {
                image,
                source: err.into(),
            })?;
        let label = FoodLabel::parse(&reply).map_err(|err| PipelineError::Classification {
            image,
            source: err.into(),
        })?;
        tracing::info!(image, %label, "Identified food");
        Ok(label)
    }

    async fn compose(&self, food1: &FoodLabel, food2: &FoodLabel) -> Result<Recipe, PipelineError> {
        tracing::info!(%food1, %food2, "Crafting recipe");
        let prompt = prompts::compose_recipe(food1, food2);
        tracing::debug!("Prompt: {}", prompt);
        let schema_hint = Recipe::schema_hint();
        let reply = self
            .bounded(
                Stage::ComposingRecipe,
                self.gateway.generate_structured_text(&prompt, &schema_hint),
            )
            .await?
            .map_err(|source| PipelineError::RecipeGeneration { source })?;
        let recipe = Recipe::from_json(reply).map_err(|err| PipelineError::RecipeGeneration {
            source: err.into(),
        })?;
        tracing::info!(
            recipe = %recipe.name,
            ingredients = recipe.ingredients.len(),
            steps = recipe.instructions.len(),
            "Recipe composed"
        );
        Ok(recipe)
    }

    async fn illustrate(
        &self,
        recipe: &Recipe,
        style: IllustrationStyle,
    ) -> Result<GeneratedImageRef, PipelineError> {
        let prompt = prompts::illustration(style, &recipe.name, &recipe.description);
        tracing::debug!(%style, "Prompt: {}", prompt);
        let urls = self
            .bounded(
                Stage::Illustrating,
                self.gateway.generate_image(&prompt, ImageSize::S1024, 1),
            )
            .await?
            .map_err(|source| PipelineError::ImageGeneration { style, source })?;
        let url = urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty())
            .ok_or(PipelineError::ImageGeneration {
                style,
                source: GatewayError::EmptyResponse,
            })?;
        Ok(GeneratedImageRef { style, url })
    }

    /// Run one gateway call under the configured timeout.
    async fn bounded<T>(
        &self,
        stage: Stage,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<Result<T, GatewayError>, PipelineError> {
        let after = self.options.call_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| PipelineError::Timeout { stage, after })
    }
}

fn skip_failed(image: Result<GeneratedImageRef, PipelineError>) -> Option<GeneratedImageRef> {
    match image {
        Ok(image) => Some(image),
        Err(err) => {
            tracing::warn!("Continuing without an image: {}", err);
            None
        }
    }
}
