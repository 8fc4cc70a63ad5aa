//! Types shared between the recipe pipeline and the web front end.
pub mod basic_models;
pub mod recipe;
pub mod stage;

pub use basic_models::{
    FoodLabel, GeneratedImageRef, IllustrationStyle, ImageKind, ImagePayload, LabelError,
    RecipeResult, UnsupportedImage,
};
pub use recipe::{Recipe, SchemaMismatch};
pub use stage::{PipelineState, Stage};
