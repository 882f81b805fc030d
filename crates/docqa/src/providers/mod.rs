//! Provider abstractions for embeddings and language models
//!
//! Trait-based so the pipeline can run against a local Ollama daemon, an
//! in-process ONNX model, or an offline hashing embedder.

pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod ollama;

#[cfg(feature = "onnx")]
pub mod onnx;

use std::sync::Arc;

pub use embedding::{dot, l2_normalize, EmbeddingProvider};
pub use hashing::HashingEmbedder;
pub use llm::{GenerationParams, LlmProvider};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::{Error, Result};

/// Build the embedding provider selected by `[embeddings] backend`
pub async fn create_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embeddings.backend {
        EmbeddingBackend::Ollama => Ok(Arc::new(OllamaEmbedder::new(&config.llm, &config.embeddings)?)),
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.embeddings.dimensions))),
        #[cfg(feature = "onnx")]
        EmbeddingBackend::Onnx => Ok(Arc::new(OnnxEmbedder::new(&config.embeddings).await?)),
        #[cfg(not(feature = "onnx"))]
        EmbeddingBackend::Onnx => Err(Error::Config(
            "embeddings.backend = \"onnx\" requires building with the `onnx` feature".to_string(),
        )),
    }
}

/// Build the Ollama language-model provider
pub fn create_llm(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(Arc::new(OllamaLlm::new(&config.llm)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_hashing_embedder() {
        let mut config = RagConfig::default();
        config.embeddings.backend = EmbeddingBackend::Hashing;
        config.embeddings.dimensions = 96;
        let embedder = create_embedder(&config).await.unwrap();
        assert_eq!(embedder.name(), "hashing");
        assert_eq!(embedder.dimensions(), 96);
    }

    #[cfg(not(feature = "onnx"))]
    #[tokio::test]
    async fn test_onnx_requires_feature() {
        let mut config = RagConfig::default();
        config.embeddings.backend = EmbeddingBackend::Onnx;
        assert!(matches!(create_embedder(&config).await, Err(Error::Config(_))));
    }
}
