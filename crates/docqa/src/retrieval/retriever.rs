//! Question to top-K chunks

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

use super::index::{ScoredChunk, VectorIndex};

/// Embeds questions with the same provider that built the index
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            embedder,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Up to `top_k` chunks most similar to the question, best first
    pub async fn retrieve(&self, question: &str, index: &VectorIndex) -> Result<Vec<ScoredChunk>> {
        if !index.is_ready() {
            return Err(Error::IndexNotReady);
        }

        let query = self.embedder.embed(question).await?;
        let results = index.search(&query, self.top_k)?;

        for (rank, hit) in results.iter().enumerate() {
            tracing::debug!(
                "#{} score={:.3} [{}] {}",
                rank + 1,
                hit.score,
                hit.chunk.format_citation(),
                hit.chunk.preview(80)
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::types::Chunk;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_retrieve_limits_to_top_k() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(HashingEmbedder::new(128));
        let mut index = VectorIndex::for_embedder(dir.path(), embedder.as_ref(), 16);
        let chunks: Vec<Chunk> = (0..10)
            .map(|i| Chunk::new(format!("section {} of the handbook", i), "handbook.md", None))
            .collect();
        index.build(chunks, embedder.as_ref()).await.unwrap();

        let retriever = Retriever::new(embedder, 6);
        let results = retriever.retrieve("handbook section", &index).await.unwrap();
        assert_eq!(results.len(), 6);
    }

    #[tokio::test]
    async fn test_retrieve_requires_ready_index() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(HashingEmbedder::new(32));
        let index = VectorIndex::for_embedder(dir.path(), embedder.as_ref(), 16);
        let retriever = Retriever::new(embedder, 6);
        assert!(matches!(
            retriever.retrieve("anything", &index).await,
            Err(Error::IndexNotReady)
        ));
    }
}
