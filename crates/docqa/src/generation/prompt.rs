//! Prompt template for grounded answers

use crate::types::Chunk;

/// One question/answer pair kept in short-term memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

const HEADER: &str = "You are answering questions based on provided document context. \
Use ALL the context below to give a complete answer.";

const INSTRUCTIONS: &str = "Instructions:
- Read through ALL the context carefully
- If listing items (like questions), list ALL of them that appear in the context
- If information is incomplete, say so
- Answer based ONLY on the context above";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Chunk contents in retrieval order, separated by blank lines.
    /// Near-duplicates are kept.
    pub fn build_context(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| c.content.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Earlier exchanges, oldest first
    pub fn build_history(history: &[Exchange]) -> String {
        history
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.question.trim(), e.answer.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full RAG prompt
    pub fn build_rag_prompt(question: &str, chunks: &[Chunk], history: &[Exchange]) -> String {
        let mut prompt = format!(
            "{header}\n\nContext from documents:\n{context}\n\n",
            header = HEADER,
            context = Self::build_context(chunks)
        );

        if !history.is_empty() {
            prompt.push_str("Conversation so far:\n");
            prompt.push_str(&Self::build_history(history));
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!(
            "Question: {question}\n\n{instructions}\n\nAnswer:",
            question = question,
            instructions = INSTRUCTIONS
        ));
        prompt
    }
}
