use std::time::Duration;

use chef_client::kitchen::{GatewayConfig, IllustrationPolicy, PipelineOptions};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn load(yml_path: &str) -> anyhow::Result<Self> {
        let yml = std::fs::read_to_string(yml_path)?;
        let config = serde_yaml::from_str(&yml)?;
        Ok(config)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub tls: Option<TLSConfig>,
    /// Whole request limit; two photos plus form overhead
    pub max_upload_bytes: usize,
    pub log_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:3000".to_string(),
            tls: None,
            max_upload_bytes: 2 * chef::basic_models::MAX_IMAGE_BYTES + (1 << 20),
            log_dir: "logs".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TLSConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub call_timeout_secs: u64,
    pub illustrations: IllustrationPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 60,
            illustrations: IllustrationPolicy::Required,
        }
    }
}

impl PipelineConfig {
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            illustrations: self.illustrations,
        }
    }
}
