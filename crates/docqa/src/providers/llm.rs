//! LLM provider trait for generating answers

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::Result;

/// Sampling and resource parameters for one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub num_predict: u32,
    /// Context window in tokens
    pub num_ctx: u32,
    /// GPU layers hint
    pub num_gpu: Option<u32>,
    /// How long the backend keeps the model loaded
    pub keep_alive: String,
    /// Upper bound on one generation
    pub timeout_secs: u64,
}

impl GenerationParams {
    /// Parameters from configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            num_predict: config.num_predict,
            num_ctx: config.num_ctx,
            num_gpu: config.num_gpu,
            keep_alive: config.keep_alive.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// Trait for LLM-based answer generation
///
/// The model is passed on every call so switching models never requires a
/// new provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete `prompt` with `model`
    async fn generate(&self, model: &str, params: &GenerationParams, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Models installed in the backend, if it can list them
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Provider name for logging
    fn name(&self) -> &str;
}
