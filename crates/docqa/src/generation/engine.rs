//! Generation engine: model binding, bounded generation, short-term memory

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::providers::{GenerationParams, LlmProvider};
use crate::retrieval::VectorIndex;
use crate::types::Chunk;

use super::prompt::{Exchange, PromptBuilder};

/// Reasoning models (qwen3, deepseek-r1) prefix answers with a thinking block
fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("Invalid regex"))
}

/// Remove `<think>...</think>` sections and surrounding whitespace
pub fn strip_reasoning(answer: &str) -> String {
    think_block().replace_all(answer, "").trim().to_string()
}

/// Wraps a language model behind a swappable model binding
pub struct GenerationEngine {
    llm: Arc<dyn LlmProvider>,
    config: LlmConfig,
    model: String,
    params: GenerationParams,
    memory: Vec<Exchange>,
    last_prompt: Option<String>,
}

impl GenerationEngine {
    /// Create an engine bound to `config.model`
    pub fn new(llm: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            params: GenerationParams::from_config(config),
            config: config.clone(),
            memory: Vec::new(),
            last_prompt: None,
        }
    }

    /// Active model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Remembered exchanges, oldest first
    pub fn memory(&self) -> &[Exchange] {
        &self.memory
    }

    /// The prompt sent on the most recent `generate` call
    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Answer `question` from `chunks` and the remembered exchanges.
    ///
    /// Memory is only updated when the model answers.
    pub async fn generate(&mut self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let prompt = PromptBuilder::build_rag_prompt(question, chunks, &self.memory);
        self.last_prompt = Some(prompt.clone());

        tracing::debug!(
            "Prompt for {}: {} chars, {} chunks, {} remembered exchanges",
            self.model,
            prompt.chars().count(),
            chunks.len(),
            self.memory.len()
        );

        let start = std::time::Instant::now();
        let secs = self.params.timeout_secs;
        let raw = match tokio::time::timeout(
            self.params.timeout(),
            self.llm.generate(&self.model, &self.params, &prompt),
        )
        .await
        {
            Err(_) => return Err(Error::GenerationTimeout { secs }),
            Ok(Err(e)) if e.is_generation_failure() => return Err(e),
            Ok(Err(e)) => return Err(Error::generation(e.to_string())),
            Ok(Ok(text)) => text,
        };

        let answer = strip_reasoning(&raw);
        tracing::info!(
            "{} answered in {:?} ({} chars)",
            self.model,
            start.elapsed(),
            answer.chars().count()
        );

        self.memory.push(Exchange {
            question: question.to_string(),
            answer: answer.clone(),
        });
        let keep = self.config.history_exchanges;
        if self.memory.len() > keep {
            let excess = self.memory.len() - keep;
            self.memory.drain(..excess);
        }

        Ok(answer)
    }

    /// Rebind to another model. Parameters are re-created from configuration
    /// and memory is cleared; the index is only checked, never modified.
    pub fn switch_model(&mut self, model: &str, index: &VectorIndex) -> Result<()> {
        if !index.is_ready() {
            return Err(Error::NoIndex);
        }
        let model = model.trim();
        if model.is_empty() {
            return Err(Error::Config("model identifier must not be empty".to_string()));
        }

        tracing::info!("Switching model {} -> {}", self.model, model);
        self.model = model.to_string();
        self.params = GenerationParams::from_config(&self.config);
        self.reset_memory();
        Ok(())
    }

    /// Forget all remembered exchanges
    pub fn reset_memory(&mut self) {
        self.memory.clear();
        self.last_prompt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Answers with a fixed text and records every call
    struct EchoLlm {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl EchoLlm {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for EchoLlm {
        async fn generate(&self, model: &str, _params: &GenerationParams, prompt: &str) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((model.to_string(), prompt.to_string()));
            Ok(format!("<think>pondering</think>\nanswer {}", calls.len()))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmProvider for SlowLlm {
        async fn generate(&self, _model: &str, _params: &GenerationParams, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn generate(&self, _model: &str, _params: &GenerationParams, _prompt: &str) -> Result<String> {
            Err(Error::generation("model not found"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    async fn ready_index(dir: &TempDir) -> VectorIndex {
        let embedder = HashingEmbedder::new(32);
        let mut index = VectorIndex::for_embedder(dir.path(), &embedder, 8);
        index
            .build(vec![Chunk::new("some text", "a.txt", None)], &embedder)
            .await
            .unwrap();
        index
    }

    #[test]
    fn test_strip_reasoning() {
        assert_eq!(strip_reasoning("<think>\nhmm\n</think>\n\nParis"), "Paris");
        assert_eq!(strip_reasoning("  plain  "), "plain");
    }

    #[tokio::test]
    async fn test_generate_records_memory() {
        let llm = EchoLlm::new();
        let mut engine = GenerationEngine::new(llm.clone(), &LlmConfig::default());
        let chunks = vec![Chunk::new("ctx", "a.txt", None)];

        assert_eq!(engine.generate("first?", &chunks).await.unwrap(), "answer 1");
        engine.generate("second?", &chunks).await.unwrap();

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].0, "qwen2.5:7b");
        assert!(!calls[0].1.contains("Conversation so far"));
        assert!(calls[1].1.contains("User: first?\nAssistant: answer 1"));
        assert_eq!(engine.memory().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_is_bounded() {
        let config = LlmConfig {
            history_exchanges: 2,
            ..LlmConfig::default()
        };
        let mut engine = GenerationEngine::new(EchoLlm::new(), &config);
        for i in 0..4 {
            engine.generate(&format!("q{}", i), &[]).await.unwrap();
        }
        let questions: Vec<&str> = engine.memory().iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q3"]);
    }

    #[tokio::test]
    async fn test_timeout() {
        let config = LlmConfig {
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let mut engine = GenerationEngine::new(Arc::new(SlowLlm), &config);
        let result = engine.generate("q", &[]).await;
        assert!(matches!(result, Err(Error::GenerationTimeout { secs: 1 })));
        assert!(engine.memory().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_memory() {
        let mut engine = GenerationEngine::new(Arc::new(FailingLlm), &LlmConfig::default());
        assert!(matches!(engine.generate("q", &[]).await, Err(Error::Generation(_))));
        assert!(engine.memory().is_empty());
    }

    #[tokio::test]
    async fn test_switch_model_requires_index() {
        let dir = TempDir::new().unwrap();
        let embedder = HashingEmbedder::new(32);
        let index = VectorIndex::for_embedder(dir.path(), &embedder, 8);
        let mut engine = GenerationEngine::new(EchoLlm::new(), &LlmConfig::default());
        assert!(matches!(engine.switch_model("llama3.2:latest", &index), Err(Error::NoIndex)));
        assert_eq!(engine.model(), "qwen2.5:7b");
    }

    #[tokio::test]
    async fn test_switch_model_clears_memory() {
        let dir = TempDir::new().unwrap();
        let index = ready_index(&dir).await;
        let llm = EchoLlm::new();
        let mut engine = GenerationEngine::new(llm.clone(), &LlmConfig::default());

        engine.generate("before switch", &[]).await.unwrap();
        engine.switch_model("llama3.2:latest", &index).unwrap();
        assert!(engine.memory().is_empty());

        engine.generate("after switch", &[]).await.unwrap();
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[1].0, "llama3.2:latest");
        assert!(!calls[1].1.contains("before switch"));
        assert!(index.is_ready());
    }
}
