//! Session façade: ingestion, question answering, model switching, reset

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::GenerationEngine;
use crate::ingestion::IngestPipeline;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::{Retriever, VectorIndex};
use crate::types::{
    AnswerResponse, ConversationTurn, IngestProgress, IngestReport, SourceDocument, UploadedFile,
};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No index
    Empty,
    /// A batch is being normalized, chunked and indexed
    Ingesting,
    /// Index live, questions accepted
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Ingesting => "ingesting",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Snapshot of a session for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub model: String,
    pub processed_files: Vec<String>,
    pub chunk_count: usize,
    pub message_count: usize,
}

/// One user session over one set of uploaded documents
pub struct ConversationOrchestrator {
    config: RagConfig,
    pipeline: IngestPipeline,
    index: VectorIndex,
    retriever: Retriever,
    engine: GenerationEngine,
    state: SessionState,
    turns: Vec<ConversationTurn>,
    processed_files: Vec<String>,
}

impl ConversationOrchestrator {
    /// Create a session. A previously persisted index for the same embedder
    /// is picked up, in which case the session starts `Ready`.
    pub fn new(config: RagConfig, embedder: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        config.validate()?;

        let mut index = VectorIndex::for_embedder(
            &config.index.directory,
            embedder.as_ref(),
            config.embeddings.batch_size,
        );
        let state = if index.load() {
            SessionState::Ready
        } else {
            SessionState::Empty
        };
        let processed_files = source_names(&index);

        tracing::info!(
            "Session started: state={}, embedder={}, model={}",
            state,
            index.binding(),
            config.llm.model
        );

        Ok(Self {
            pipeline: IngestPipeline::from_config(&config),
            retriever: Retriever::new(embedder, config.retrieval.top_k),
            engine: GenerationEngine::new(llm, &config.llm),
            index,
            state,
            turns: Vec::new(),
            processed_files,
            config,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn engine(&self) -> &GenerationEngine {
        &self.engine
    }

    /// Transcript, oldest first
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Names of the files behind the live index
    pub fn processed_files(&self) -> &[String] {
        &self.processed_files
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            model: self.engine.model().to_string(),
            processed_files: self.processed_files.clone(),
            chunk_count: self.index.len(),
            message_count: self.turns.len(),
        }
    }

    /// Ingest a batch, replacing any existing index
    pub async fn ingest(&mut self, files: Vec<UploadedFile>) -> Result<IngestReport> {
        self.ingest_with_progress(files, |_| {}).await
    }

    /// Ingest a batch, reporting progress through `on_progress`.
    ///
    /// On failure, or if the future is dropped before completion, the
    /// previous state and index are left as they were.
    pub async fn ingest_with_progress<F>(&mut self, files: Vec<UploadedFile>, mut on_progress: F) -> Result<IngestReport>
    where
        F: FnMut(IngestProgress),
    {
        let guard = IngestGuard::enter(&mut self.state);
        let start = Instant::now();
        tracing::info!("Ingesting {} file(s)", files.len());

        let batch = self.pipeline.process_files(files, &mut on_progress).await;
        let total_chunks = batch.chunks.len();
        if total_chunks == 0 {
            tracing::warn!("Batch produced no chunks; keeping previous index");
            return Err(Error::EmptyInput);
        }

        on_progress(IngestProgress::Indexing { chunks: total_chunks });
        if let Err(e) = self.index.build(batch.chunks, self.retriever.embedder().as_ref()).await {
            tracing::warn!("Index build failed: {}", e);
            return Err(e);
        }

        self.processed_files = batch.reports.iter().map(|r| r.name.clone()).collect();
        self.engine.reset_memory();
        guard.complete(SessionState::Ready);
        on_progress(IngestProgress::Complete { chunks: total_chunks });

        let report = IngestReport {
            files: batch.reports,
            total_chunks,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Ingestion complete: {} file(s), {} chunk(s) in {}ms",
            report.files.len(),
            total_chunks,
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Answer a question from the indexed documents
    pub async fn ask(&mut self, question: &str) -> Result<AnswerResponse> {
        if self.state != SessionState::Ready {
            return Err(Error::NotReady { state: self.state });
        }

        let start = Instant::now();
        let retrieved = self.retriever.retrieve(question, &self.index).await?;
        let chunks: Vec<_> = retrieved.into_iter().map(|hit| hit.chunk).collect();

        let answer = self.engine.generate(question, &chunks).await?;

        let source_documents = chunks.iter().map(SourceDocument::from).collect();
        self.turns.push(ConversationTurn::user(question));
        self.turns.push(ConversationTurn::assistant(answer.clone(), chunks));

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!("Answered in {}ms with {}", elapsed_ms, self.engine.model());

        Ok(AnswerResponse {
            answer,
            source_documents,
            model: self.engine.model().to_string(),
            elapsed_ms,
        })
    }

    /// Swap the generation model; the index and transcript are kept
    pub fn switch_model(&mut self, model: &str) -> Result<()> {
        self.engine.switch_model(model, &self.index)
    }

    /// Drop the transcript, memory, index (including its disk copy) and file list
    pub fn reset(&mut self) {
        self.turns.clear();
        self.engine.reset_memory();
        self.index.clear();
        self.processed_files.clear();
        self.state = SessionState::Empty;
        tracing::info!("Session reset");
    }
}

/// Holds a session in `Ingesting` and puts the prior state back on drop
/// unless the batch completed.
struct IngestGuard<'a> {
    state: &'a mut SessionState,
    prior: SessionState,
    completed: bool,
}

impl<'a> IngestGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        let prior = *state;
        *state = SessionState::Ingesting;
        Self {
            state,
            prior,
            completed: false,
        }
    }

    fn complete(mut self, next: SessionState) {
        *self.state = next;
        self.completed = true;
    }
}

impl Drop for IngestGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.state = self.prior;
        }
    }
}

/// Distinct source names in insertion order
fn source_names(index: &VectorIndex) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for chunk in index.chunks() {
        if !names.contains(&chunk.source_name) {
            names.push(chunk.source_name.clone());
        }
    }
    names
}
