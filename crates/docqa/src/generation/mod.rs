//! Answer generation: prompt assembly and the swappable model engine

pub mod engine;
pub mod prompt;

pub use engine::{strip_reasoning, GenerationEngine};
pub use prompt::{Exchange, PromptBuilder};
