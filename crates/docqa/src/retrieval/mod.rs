//! Vector index, its persisted form, and question retrieval

pub mod index;
pub mod retriever;
pub mod store;

pub use index::{ScoredChunk, VectorIndex};
pub use retriever::Retriever;
pub use store::{EmbeddingBinding, IndexManifest, IndexStore, FORMAT_VERSION};
