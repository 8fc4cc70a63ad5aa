use async_trait::async_trait;
use chef::{ImagePayload, SchemaMismatch};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Why a call to the model provider did not produce a usable reply.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("Request to the model provider failed: {0}")]
    Request(String),
    #[error("Model provider returned an error: {0}")]
    Api(String),
    #[error("Model provider returned an empty response")]
    EmptyResponse,
    #[error("Model reply is not JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),
    #[error("Could not prepare the image for upload: {0}")]
    Image(String),
    #[error("Model gateway is not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ImageSize {
    #[strum(serialize = "256x256")]
    #[serde(rename = "256x256")]
    S256,
    #[strum(serialize = "512x512")]
    #[serde(rename = "512x512")]
    S512,
    #[default]
    #[strum(serialize = "1024x1024")]
    #[serde(rename = "1024x1024")]
    S1024,
}

/// The three things the pipeline needs from a model provider.
///
/// Implementations hold no per-request state, so one gateway can serve
/// every request the server handles.
#[async_trait]
pub trait ModelGateway: Send + Sync + fmt::Debug {
    /// Ask a vision model about an image; returns its raw text reply.
    async fn classify_image(&self, image: &ImagePayload, prompt: &str)
        -> Result<String, GatewayError>;

    /// Ask for a JSON object shaped like `schema_hint`.
    async fn generate_structured_text(
        &self,
        prompt: &str,
        schema_hint: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError>;

    /// Generate `count` images and return where they are hosted.
    async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
        count: u8,
    ) -> Result<Vec<String>, GatewayError>;
}
