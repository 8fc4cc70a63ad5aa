use std::time::Duration;

use chef::{IllustrationStyle, LabelError, Stage};

use crate::kitchen::gateway::GatewayError;

#[derive(thiserror::Error, Debug)]
pub enum ClassificationFailure {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

/// A failed run of the pipeline. Each variant belongs to exactly one stage.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Could not identify the food in image {image}: {source}")]
    Classification {
        image: u8,
        #[source]
        source: ClassificationFailure,
    },
    #[error("Could not generate a recipe: {source}")]
    RecipeGeneration {
        #[source]
        source: GatewayError,
    },
    #[error("Could not generate the {style} image: {source}")]
    ImageGeneration {
        style: IllustrationStyle,
        #[source]
        source: GatewayError,
    },
    #[error("The model provider did not answer within {after:?} while {}", .stage.activity())]
    Timeout { stage: Stage, after: Duration },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Classification { .. } => Stage::Classifying,
            PipelineError::RecipeGeneration { .. } => Stage::ComposingRecipe,
            PipelineError::ImageGeneration { .. } => Stage::Illustrating,
            PipelineError::Timeout { stage, .. } => *stage,
        }
    }

    /// Whether the model's structured reply failed to decode into a recipe
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            PipelineError::RecipeGeneration {
                source: GatewayError::SchemaMismatch(_)
            }
        )
    }

    /// Message for people rather than logs.
    pub fn user_message(&self) -> String {
        format!(
            "An error occurred while {}. Please try again.",
            self.stage().activity()
        )
    }
}
