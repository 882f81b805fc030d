//! Recursive character chunking with overlap
//!
//! Text is split on the first separator of the priority list that occurs in
//! it, keeping each separator attached to the start of the piece that follows.
//! Pieces shorter than the chunk size are merged greedily; a piece that alone
//! reaches the chunk size is split again with the remaining separators. When a
//! chunk is emitted, up to `chunk_overlap` trailing characters are carried into
//! the next one. All lengths are counted in characters.

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, DocumentUnit};

/// Separators in priority order; the empty string splits between characters
pub const DEFAULT_SEPARATORS: [&str; 6] = ["\n\n\n", "\n\n", "\n", ". ", " ", ""];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters carried over between adjacent chunks
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a new chunker. The overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every unit, carrying its source name and page onto each chunk
    pub fn split_units(&self, units: &[DocumentUnit]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for unit in units {
            let pieces = self.split_text(&unit.text);
            tracing::debug!(
                "[{}] page {:?}: {} chars -> {} chunk(s)",
                unit.source_name,
                unit.page,
                char_len(&unit.text),
                pieces.len()
            );
            chunks.extend(
                pieces
                    .into_iter()
                    .map(|content| Chunk::new(content, unit.source_name.clone(), unit.page)),
            );
        }
        chunks
    }

    /// Split text into trimmed, non-empty chunks of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    final_chunks.push(trimmed.to_string());
                }
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }
        final_chunks
    }

    /// Greedily combine pieces into chunks, keeping a tail of up to
    /// `chunk_overlap` characters as the start of the next chunk
    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size && !current.is_empty() {
                if let Some(doc) = join_trimmed(&current) {
                    docs.push(doc);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            current.push_back((piece, len));
            total += len;
        }

        if let Some(doc) = join_trimmed(&current) {
            docs.push(doc);
        }
        docs
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Split on `separator`, attaching each occurrence to the start of the
/// following piece. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_trimmed(pieces: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(s, _)| *s).collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
