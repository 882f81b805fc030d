//! Document ingestion: multi-format extraction and chunking

pub mod chunker;
pub mod external;
mod parser;
mod processor;
mod rtf;

pub use chunker::{TextChunker, DEFAULT_SEPARATORS};
pub use external::ExternalTools;
pub use parser::{abandoned_workers, FileParser, NormalizedFile, Normalizer};
pub use processor::{IngestPipeline, ProcessedBatch};
pub use rtf::rtf_to_text;
