//! Shared fixtures: an offline session and a scripted language model

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa::config::{EmbeddingBackend, RagConfig};
use docqa::providers::{GenerationParams, HashingEmbedder, LlmProvider};
use docqa::{ConversationOrchestrator, Error, Result};

pub const DIMENSIONS: usize = 256;

/// Language model double that records prompts.
///
/// Queued replies are returned first; afterwards it answers with the
/// context block of the prompt it was given.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_reply(&self, reply: Result<String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// `(model, prompt)` pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.calls().last().map(|(_, p)| p.clone()).unwrap_or_default()
    }
}

fn context_of(prompt: &str) -> &str {
    let start = prompt
        .find("Context from documents:\n")
        .map_or(0, |i| i + "Context from documents:\n".len());
    let rest = &prompt[start..];
    let end = rest
        .find("\n\nConversation so far:")
        .or_else(|| rest.find("\n\nQuestion:"))
        .unwrap_or(rest.len());
    &rest[..end]
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, model: &str, _params: &GenerationParams, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push((model.to_string(), prompt.to_string()));
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        Ok(format!("From the documents: {}", context_of(prompt)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn offline_config(index_dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.backend = EmbeddingBackend::Hashing;
    config.embeddings.dimensions = DIMENSIONS;
    config.index.directory = index_dir.to_path_buf();
    config.extraction.enable_ocr = false;
    config.extraction.use_pandoc = false;
    config
}

pub fn session(index_dir: &Path, llm: Arc<ScriptedLlm>) -> ConversationOrchestrator {
    ConversationOrchestrator::new(
        offline_config(index_dir),
        Arc::new(HashingEmbedder::new(DIMENSIONS)),
        llm,
    )
    .unwrap()
}

pub fn backend_down() -> Error {
    Error::generation("connection refused")
}
