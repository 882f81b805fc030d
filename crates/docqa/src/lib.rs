//! docqa: local document question answering with cited sources
//!
//! Uploaded files (PDF, Word, RTF, spreadsheets, CSV, JSON, XML, text and
//! images) are normalized to text, split into overlapping chunks, embedded
//! into a persisted flat vector index, and answered from by a local Ollama
//! model. Nothing leaves the machine.

pub mod catalog;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod orchestrator;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use orchestrator::{ConversationOrchestrator, SessionState, SessionStatus};
pub use types::{
    document::{Chunk, DocumentUnit, FileType, UploadedFile},
    response::{AnswerResponse, ConversationTurn, FileReport, FileStatus, IngestProgress, IngestReport, SourceDocument},
};
