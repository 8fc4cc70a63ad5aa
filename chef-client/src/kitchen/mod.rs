pub mod fake;
pub mod gateway;
pub mod openai;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod vision;

pub use fake::FakeGateway;
pub use gateway::{GatewayError, ImageSize, ModelGateway};
pub use openai::{GatewayConfig, OpenAiGateway};
pub use orchestrator::{IllustrationPolicy, PipelineOptions, RecipeOrchestrator};
pub use progress::{LogProgress, ProgressSink};
