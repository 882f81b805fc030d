//! Error types for the document Q&A pipeline

use thiserror::Error;

use crate::orchestrator::SessionState;

/// Result type alias for docqa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// `Extraction` and `Persistence` are absorbed inside the pipeline (converted
/// to placeholder units or logged); every other variant reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single file could not be turned into text
    #[error("Failed to extract '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// The ingestion batch produced no chunks
    #[error("No content to index: the batch produced zero chunks")]
    EmptyInput,

    /// Search attempted before any index was built or loaded
    #[error("Vector index is not ready: build or load an index first")]
    IndexNotReady,

    /// Operation attempted in the wrong session state
    #[error("Session is not ready (current state: {state})")]
    NotReady { state: SessionState },

    /// Model switch attempted without an index
    #[error("No documents processed: ingest files before switching models")]
    NoIndex,

    /// Language model backend failure
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Language model did not answer in time
    #[error("Generation timed out after {secs}s")]
    GenerationTimeout { secs: u64 },

    /// Index could not be written to or read from disk
    #[error("Index persistence error: {0}")]
    Persistence(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// True for failures the user should see as a failed answer
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::GenerationTimeout { .. })
    }
}
