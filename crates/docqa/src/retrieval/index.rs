//! Flat exact-cosine vector index over chunks

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::providers::{dot, EmbeddingProvider};
use crate::types::Chunk;

use super::store::{EmbeddingBinding, IndexStore};

/// A chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity (dot product of unit vectors)
    pub score: f32,
}

/// In-memory vector records with a persisted copy
///
/// Records are only ever replaced wholesale: `build` swaps in a complete new
/// set after every chunk has been embedded, and `clear` drops everything.
#[derive(Debug)]
pub struct VectorIndex {
    store: IndexStore,
    binding: EmbeddingBinding,
    batch_size: usize,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
    ready: bool,
}

impl VectorIndex {
    /// Create an empty index bound to an embedding space
    pub fn new(store: IndexStore, binding: EmbeddingBinding, batch_size: usize) -> Self {
        Self {
            store,
            binding,
            batch_size: batch_size.max(1),
            vectors: Vec::new(),
            chunks: Vec::new(),
            ready: false,
        }
    }

    /// Create an empty index for the embedder's space, persisted under `dir`
    pub fn for_embedder(dir: impl AsRef<Path>, embedder: &dyn EmbeddingProvider, batch_size: usize) -> Self {
        let binding = EmbeddingBinding {
            provider: embedder.name().to_string(),
            model: embedder.model().to_string(),
            dimensions: embedder.dimensions(),
        };
        Self::new(IndexStore::new(dir.as_ref()), binding, batch_size)
    }

    /// True after a successful build or load
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn binding(&self) -> &EmbeddingBinding {
        &self.binding
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Indexed chunks in insertion order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Embed `chunks` and replace the current records. Persisting afterwards
    /// is best-effort. On any error the previous records are untouched.
    pub async fn build(&mut self, chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<usize> {
        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }
        if embedder.dimensions() != self.binding.dimensions {
            return Err(Error::vector_index(format!(
                "Embedder produces {} dimensions, index expects {}",
                embedder.dimensions(),
                self.binding.dimensions
            )));
        }

        let start = std::time::Instant::now();
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = embedder.embed_batch(&texts).await?;
            if embedded.len() != batch.len() {
                return Err(Error::vector_index(format!(
                    "Embedder returned {} vectors for {} chunks",
                    embedded.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != self.binding.dimensions) {
                return Err(Error::vector_index(format!(
                    "Embedding has {} dimensions, expected {}",
                    bad.len(),
                    self.binding.dimensions
                )));
            }
            vectors.extend(embedded);
        }

        self.vectors = vectors;
        self.chunks = chunks;
        self.ready = true;

        tracing::info!(
            "Indexed {} chunks with {} in {:?}",
            self.chunks.len(),
            self.binding,
            start.elapsed()
        );

        if let Err(e) = self.store.save(&self.binding, &self.vectors, &self.chunks) {
            tracing::warn!("Index built but not persisted: {}", e);
        }

        Ok(self.chunks.len())
    }

    /// Replace the in-memory records from disk. Any problem with the
    /// persisted copy is logged and leaves the index as it was.
    pub fn load(&mut self) -> bool {
        if !self.store.exists() {
            tracing::debug!("No persisted index at {}", self.store.dir().display());
            return false;
        }

        match self.store.load(&self.binding) {
            Ok(persisted) => {
                tracing::info!(
                    "Loaded {} chunks from {} (built {})",
                    persisted.manifest.count,
                    self.store.dir().display(),
                    persisted.manifest.created_at
                );
                self.vectors = persisted.vectors;
                self.chunks = persisted.chunks;
                self.ready = true;
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring persisted index at {}: {}",
                    self.store.dir().display(),
                    e
                );
                false
            }
        }
    }

    /// Exact scan, best match first; equal scores keep insertion order
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if !self.ready {
            return Err(Error::IndexNotReady);
        }
        if query.len() != self.binding.dimensions {
            return Err(Error::vector_index(format!(
                "Query has {} dimensions, index has {}",
                query.len(),
                self.binding.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }

    /// Drop all records and delete the persisted copy
    pub fn clear(&mut self) {
        self.vectors.clear();
        self.chunks.clear();
        self.ready = false;
        if let Err(e) = self.store.remove() {
            tracing::warn!("{}", e);
        }
    }
}
