use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionResponseFormat, ChatCompletionResponseFormatType,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateImageRequestArgs,
        Image, ImageDetail, ImageModel, ImageUrlArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use chef::ImagePayload;
use serde::{Deserialize, Serialize};

use super::gateway::{GatewayError, ImageSize, ModelGateway};
use super::vision::image_data_url;

/// Which OpenAI endpoint and models to use.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Leave unset for api.openai.com
    pub api_base: Option<String>,
    pub vision_model: String,
    pub text_model: String,
    pub image_model: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            vision_model: "gpt-4o-mini".to_string(),
            text_model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-2".to_string(),
        }
    }
}

impl From<OpenAIError> for GatewayError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(err) => GatewayError::Request(err.to_string()),
            OpenAIError::ApiError(err) => GatewayError::Api(err.message),
            OpenAIError::JSONDeserialize(err) => {
                GatewayError::Api(format!("Unexpected response: {}", err))
            }
            OpenAIError::InvalidArgument(message) => GatewayError::Request(message),
            other => GatewayError::Request(other.to_string()),
        }
    }
}

impl From<ImageSize> for async_openai::types::ImageSize {
    fn from(size: ImageSize) -> Self {
        match size {
            ImageSize::S256 => async_openai::types::ImageSize::S256x256,
            ImageSize::S512 => async_openai::types::ImageSize::S512x512,
            ImageSize::S1024 => async_openai::types::ImageSize::S1024x1024,
        }
    }
}

/// Model gateway backed by the OpenAI API.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    config: GatewayConfig,
}

impl std::fmt::Debug for OpenAiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpenAiGateway {
    pub fn new(api_key: &str, config: GatewayConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(api_base) = &config.api_base {
            openai_config = openai_config.with_api_base(api_base);
        }
        Self {
            client: Client::with_config(openai_config),
            config,
        }
    }

    /// Build a gateway using `OPENAI_API_KEY` from the environment or `.env`.
    pub fn from_env(config: GatewayConfig) -> Result<Self, GatewayError> {
        let api_key = dotenvy::var("OPENAI_API_KEY").map_err(|_| {
            GatewayError::NotConfigured("Could not find OPENAI_API_KEY in the environment.".into())
        })?;
        Ok(Self::new(&api_key, config))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn image_model(&self) -> ImageModel {
        match self.config.image_model.as_str() {
            "dall-e-2" => ImageModel::DallE2,
            "dall-e-3" => ImageModel::DallE3,
            other => ImageModel::Other(other.to_string()),
        }
    }

    /// Send a chat request and return the text of the first choice.
    async fn first_reply(&self, request: CreateChatCompletionRequest) -> Result<String, GatewayError> {
        self.client
            .chat()
            .create(request)
            .await?
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GatewayError::EmptyResponse)
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn classify_image(
        &self,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<String, GatewayError> {
        let img_data_url = image_data_url(image)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.vision_model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(vec![
                    ChatCompletionRequestMessageContentPartTextArgs::default()
                        .text(prompt)
                        .build()?
                        .into(),
                    ChatCompletionRequestMessageContentPartImageArgs::default()
                        .image_url(
                            ImageUrlArgs::default()
                                .url(img_data_url)
                                .detail(ImageDetail::Low)
                                .build()?,
                        )
                        .build()?
                        .into(),
                ])
                .build()?
                .into()])
            .build()?;
        tracing::debug!(model = %self.config.vision_model, bytes = image.len(), "Classifying image");
        self.first_reply(request).await
    }

    async fn generate_structured_text(
        &self,
        prompt: &str,
        schema_hint: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        // JSON mode requires the word JSON in the prompt, the hint provides it
        let hint = serde_json::to_string_pretty(schema_hint).map_err(GatewayError::InvalidJson)?;
        let full_prompt = format!("{}\nReturn as JSON:\n{}", prompt, hint);
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.text_model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(full_prompt)
                .build()?
                .into()])
            .response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
            .build()?;
        tracing::debug!(model = %self.config.text_model, "Requesting structured text");
        let text = self.first_reply(request).await?;
        serde_json::from_str(&text).map_err(GatewayError::InvalidJson)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
        count: u8,
    ) -> Result<Vec<String>, GatewayError> {
        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(self.image_model())
            .n(count)
            .size(async_openai::types::ImageSize::from(size))
            .response_format(ResponseFormat::Url)
            .build()?;
        tracing::debug!(model = %self.config.image_model, %size, count, "Generating image");
        let response = self.client.images().create(request).await?;
        let urls: Vec<String> = response
            .data
            .iter()
            .filter_map(|image| match image.as_ref() {
                Image::Url { url, .. } => Some(url.clone()),
                Image::B64Json { .. } => None,
            })
            .collect();
        if urls.is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(urls)
    }
}
