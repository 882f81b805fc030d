//! Core data types

pub mod document;
pub mod response;

pub use document::{extension_of, Chunk, DocumentUnit, FileType, UploadedFile};
pub use response::{
    AnswerResponse, ConversationTurn, FileReport, FileStatus, IngestProgress, IngestReport, Role,
    SourceDocument,
};
