//! Scripted model gateway for tests and offline demos.
//!
//! Replies are queued per operation and handed out in order. Every call is
//! recorded so tests can check which prompts were sent, and which were not.

use std::collections::VecDeque;

use async_trait::async_trait;
use chef::ImagePayload;
use serde_json::json;
use tokio::sync::Mutex;

use super::gateway::{GatewayError, ImageSize, ModelGateway};

/// One queued reply.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Reply(T),
    Fail(String),
    /// Never answer; for exercising timeouts.
    Hang,
}

/// A call the fake received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Classify { prompt: String, image_bytes: usize },
    StructuredText { prompt: String },
    Image { prompt: String, size: ImageSize, count: u8 },
}

#[derive(Debug, Default)]
pub struct FakeGateway {
    labels: Mutex<VecDeque<Scripted<String>>>,
    recipes: Mutex<VecDeque<Scripted<serde_json::Value>>>,
    images: Mutex<VecDeque<Scripted<Vec<String>>>>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that gets through the whole pipeline once: apple and
    /// cinnamon stick become a cobbler with two pictures.
    pub fn demo() -> Self {
        Self::new()
            .with_label("Apple")
            .with_label("Cinnamon stick")
            .with_recipe(json!({
                "name": "Spiced Orchard Cobbler",
                "description": "Tender baked fruit under a buttery, fragrant crumble",
                "ingredients": [
                    "4 tart baking apples, sliced",
                    "1 cinnamon stick, finely grated",
                    "100 g cold butter",
                    "120 g flour",
                    "80 g brown sugar"
                ],
                "instructions": [
                    "Heat the oven to 190C.",
                    "Toss the fruit with half the sugar and the grated spice.",
                    "Rub the butter into the flour and remaining sugar.",
                    "Scatter the crumble over the fruit and bake for 40 minutes."
                ]
            }))
            .with_image("https://images.example.com/cobbler-photo.png")
            .with_image("https://images.example.com/cobbler-drawing.png")
    }

    pub fn with_label(self, reply: &str) -> Self {
        self.script_label(Scripted::Reply(reply.to_string()))
    }

    pub fn script_label(mut self, reply: Scripted<String>) -> Self {
        self.labels.get_mut().push_back(reply);
        self
    }

    pub fn with_recipe(self, reply: serde_json::Value) -> Self {
        self.script_recipe(Scripted::Reply(reply))
    }

    pub fn script_recipe(mut self, reply: Scripted<serde_json::Value>) -> Self {
        self.recipes.get_mut().push_back(reply);
        self
    }

    pub fn with_image(self, url: &str) -> Self {
        self.script_image(Scripted::Reply(vec![url.to_string()]))
    }

    pub fn script_image(mut self, reply: Scripted<Vec<String>>) -> Self {
        self.images.get_mut().push_back(reply);
        self
    }

    /// Every call received so far.
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: GatewayCall) {
        self.calls.lock().await.push(call);
    }
}

async fn next_reply<T>(queue: &Mutex<VecDeque<Scripted<T>>>, what: &str) -> Result<T, GatewayError> {
    let next = queue.lock().await.pop_front();
    match next {
        Some(Scripted::Reply(reply)) => Ok(reply),
        Some(Scripted::Fail(message)) => Err(GatewayError::Api(message)),
        Some(Scripted::Hang) => std::future::pending().await,
        None => Err(GatewayError::Api(format!("No scripted {} reply left", what))),
    }
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn classify_image(
        &self,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<String, GatewayError> {
        self.record(GatewayCall::Classify {
            prompt: prompt.to_string(),
            image_bytes: image.len(),
        })
        .await;
        next_reply(&self.labels, "label").await
    }

    async fn generate_structured_text(
        &self,
        prompt: &str,
        _schema_hint: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.record(GatewayCall::StructuredText {
            prompt: prompt.to_string(),
        })
        .await;
        next_reply(&self.recipes, "recipe").await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
        count: u8,
    ) -> Result<Vec<String>, GatewayError> {
        self.record(GatewayCall::Image {
            prompt: prompt.to_string(),
            size,
            count,
        })
        .await;
        next_reply(&self.images, "image").await
    }
}
