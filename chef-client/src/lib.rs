//! Turns two food photos into a recipe, using remote vision, text and image models.
pub mod errors;
pub mod kitchen;

pub use errors::{ClassificationFailure, PipelineError};
