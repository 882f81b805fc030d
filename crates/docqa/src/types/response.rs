//! Response, transcript, and ingestion report types

use serde::{Deserialize, Serialize};

use super::document::Chunk;

/// A cited source passage, as handed to the front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Chunk text
    pub content: String,
    /// Original upload filename
    pub source_name: String,
    /// Page number (if applicable)
    pub page: Option<u32>,
}

impl From<&Chunk> for SourceDocument {
    fn from(chunk: &Chunk) -> Self {
        Self {
            content: chunk.content.clone(),
            source_name: chunk.source_name.clone(),
            page: chunk.page,
        }
    }
}

/// Answer to a question with the chunks it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// Generated answer
    pub answer: String,
    /// Retrieved chunks, best match first
    pub source_documents: Vec<SourceDocument>,
    /// Model that produced the answer
    pub model: String,
    /// Wall-clock time for retrieval plus generation
    pub elapsed_ms: u64,
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the session transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// Cited chunks (assistant turns only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Chunk>,
}

impl ConversationTurn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// Create an assistant turn with its sources
    pub fn assistant(content: impl Into<String>, sources: Vec<Chunk>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }
}

/// How a single file fared during normalization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FileStatus {
    /// Text was extracted
    Extracted,
    /// No extractor for this content; a placeholder unit was indexed
    Placeholder(String),
    /// Extraction failed; a placeholder unit was indexed
    Failed(String),
}

impl FileStatus {
    /// True when real text was extracted
    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted)
    }
}

/// Per-file ingestion outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Original upload filename
    pub name: String,
    /// Declared extension
    pub extension: String,
    /// Extraction outcome
    #[serde(flatten)]
    pub status: FileStatus,
    /// Document units produced
    pub units: usize,
    /// Chunks produced
    pub chunks: usize,
}

/// Outcome of one ingestion batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// One entry per uploaded file, in upload order
    pub files: Vec<FileReport>,
    /// Chunks indexed across the batch
    pub total_chunks: usize,
    /// Wall-clock time for the whole batch
    pub elapsed_ms: u64,
}

impl IngestReport {
    /// Files whose text was extracted
    pub fn extracted(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.status.is_extracted())
    }

    /// Files that fell back to a placeholder or failed
    pub fn degraded(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.status.is_extracted())
    }
}

/// Progress notification emitted while a batch is ingested
#[derive(Debug, Clone, PartialEq)]
pub enum IngestProgress {
    /// A file finished normalization and chunking
    FileDone {
        name: String,
        index: usize,
        total: usize,
        percent: f32,
    },
    /// Embedding and index construction started
    Indexing { chunks: usize },
    /// The index is live
    Complete { chunks: usize },
}
