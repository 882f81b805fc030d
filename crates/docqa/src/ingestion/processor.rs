//! Ingestion pipeline: normalize each upload, then chunk it

use crate::config::RagConfig;
use crate::types::{Chunk, FileReport, FileStatus, IngestProgress, UploadedFile};

use super::chunker::TextChunker;
use super::parser::{NormalizedFile, Normalizer};

/// Chunks and per-file reports for one batch, in upload order
#[derive(Debug, Clone, Default)]
pub struct ProcessedBatch {
    pub reports: Vec<FileReport>,
    pub chunks: Vec<Chunk>,
}

/// Main ingestion pipeline
#[derive(Debug, Clone, Default)]
pub struct IngestPipeline {
    normalizer: Normalizer,
    chunker: TextChunker,
}

impl IngestPipeline {
    /// Create a pipeline from explicit parts
    pub fn new(normalizer: Normalizer, chunker: TextChunker) -> Self {
        Self { normalizer, chunker }
    }

    /// Create a pipeline from configuration
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(
            Normalizer::new(config.extraction.clone()),
            TextChunker::from_config(&config.chunking),
        )
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Normalize and chunk one file (blocking)
    pub fn process_file(&self, file: &UploadedFile) -> (FileReport, Vec<Chunk>) {
        let normalized = self.normalizer.normalize(file);
        self.chunk_normalized(file, normalized)
    }

    fn chunk_normalized(&self, file: &UploadedFile, normalized: NormalizedFile) -> (FileReport, Vec<Chunk>) {
        let mut chunks = self.chunker.split_units(&normalized.units);
        for chunk in &mut chunks {
            chunk.source_name = file.name.clone();
        }

        let report = FileReport {
            name: file.name.clone(),
            extension: file.extension.clone(),
            status: normalized.status,
            units: normalized.units.len(),
            chunks: chunks.len(),
        };
        (report, chunks)
    }

    /// Process a batch. Extraction runs on the blocking pool one file at a
    /// time; `on_progress` is called after each file.
    pub async fn process_files<F>(&self, files: Vec<UploadedFile>, mut on_progress: F) -> ProcessedBatch
    where
        F: FnMut(IngestProgress),
    {
        let total = files.len();
        let mut batch = ProcessedBatch::default();

        for (index, file) in files.into_iter().enumerate() {
            let name = file.name.clone();
            let pipeline = self.clone();

            let (report, chunks) = match tokio::task::spawn_blocking(move || pipeline.process_file(&file)).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("Extraction worker for {} failed: {}", name, e);
                    let placeholder = UploadedFile::new(name.clone(), Vec::new());
                    let normalized = Normalizer::failed(&placeholder, format!("extraction worker failed: {}", e));
                    self.chunk_normalized(&placeholder, normalized)
                }
            };

            match &report.status {
                FileStatus::Extracted => {
                    tracing::info!("[{}] {} unit(s) -> {} chunk(s)", report.name, report.units, report.chunks)
                }
                FileStatus::Placeholder(reason) | FileStatus::Failed(reason) => {
                    tracing::warn!("[{}] indexed as placeholder: {}", report.name, reason)
                }
            }

            batch.reports.push(report);
            batch.chunks.extend(chunks);

            on_progress(IngestProgress::FileDone {
                name,
                index: index + 1,
                total,
                percent: (index + 1) as f32 / total as f32 * 100.0,
            });
        }

        batch
    }
}
