//! Upload, document unit, and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};

/// Extraction strategy selected from a file extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text read verbatim (txt, md, yaml)
    Text,
    /// PDF document
    Pdf,
    /// Microsoft Word document
    Docx,
    /// Rich Text Format
    Rtf,
    /// Comma-separated values
    Csv,
    /// Excel / OpenDocument spreadsheet
    Spreadsheet,
    /// JSON data
    Json,
    /// XML data
    Xml,
    /// Image (OCR when available)
    Image,
    /// Anything else
    Unsupported,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" | "md" | "markdown" | "yaml" | "yml" => Self::Text,
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Docx,
            "rtf" => Self::Rtf,
            "csv" => Self::Csv,
            "xlsx" | "xls" | "ods" => Self::Spreadsheet,
            "json" => Self::Json,
            "xml" => Self::Xml,
            "png" | "jpg" | "jpeg" | "bmp" | "tiff" | "tif" | "gif" => Self::Image,
            _ => Self::Unsupported,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Pdf => "PDF",
            Self::Docx => "Word Document",
            Self::Rtf => "Rich Text Format",
            Self::Csv => "CSV",
            Self::Spreadsheet => "Spreadsheet",
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Image => "Image",
            Self::Unsupported => "Unsupported",
        }
    }
}

/// Lowercase extension of a filename, without the dot
pub fn extension_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// A file handed over by the front-end
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename as uploaded by the user
    pub name: String,
    /// Declared extension (lowercase, no dot)
    pub extension: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Create an upload, taking the extension from the filename
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let extension = extension_of(&name);
        Self {
            name,
            extension,
            bytes: bytes.into(),
        }
    }

    /// Create an upload with an explicitly declared extension
    pub fn with_extension(
        name: impl Into<String>,
        extension: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into().trim_start_matches('.').to_lowercase(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self::new(name, bytes))
    }

    /// Extraction strategy for the declared extension
    pub fn file_type(&self) -> FileType {
        FileType::from_extension(&self.extension)
    }
}

/// One logical piece of extracted content (a page, a sheet, a row, a file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUnit {
    /// Extracted text
    pub text: String,
    /// Original upload filename
    pub source_name: String,
    /// Page, sheet, or row number (1-indexed)
    pub page: Option<u32>,
}

impl DocumentUnit {
    /// Create a unit without page information
    pub fn new(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            page: None,
        }
    }

    /// Create a unit for a numbered page
    pub fn paged(text: impl Into<String>, source_name: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            page: Some(page),
        }
    }
}

/// A bounded slice of a document unit, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub content: String,
    /// Original upload filename
    pub source_name: String,
    /// Page number inherited from the unit
    pub page: Option<u32>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: impl Into<String>, source_name: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            content: content.into(),
            source_name: source_name.into(),
            page,
        }
    }

    /// Content length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        match self.page {
            Some(page) => format!("{}, Page {}", self.source_name, page),
            None => self.source_name.clone(),
        }
    }

    /// Single-line preview for logs
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .content
            .chars()
            .take(max_chars)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        if self.content.chars().count() > max_chars {
            format!("{}...", flat)
        } else {
            flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension(".yml"), FileType::Text);
        assert_eq!(FileType::from_extension("ods"), FileType::Spreadsheet);
        assert_eq!(FileType::from_extension("jpeg"), FileType::Image);
        assert_eq!(FileType::from_extension("exe"), FileType::Unsupported);
        assert_eq!(FileType::from_extension(""), FileType::Unsupported);
    }

    #[test]
    fn test_upload_extension_from_name() {
        let file = UploadedFile::new("Report.Final.DOCX", b"x".to_vec());
        assert_eq!(file.extension, "docx");
        assert_eq!(file.file_type(), FileType::Docx);

        let bare = UploadedFile::new("README", b"x".to_vec());
        assert_eq!(bare.extension, "");
        assert_eq!(bare.file_type(), FileType::Unsupported);
    }

    #[test]
    fn test_declared_extension_wins_over_name() {
        let file = UploadedFile::with_extension("upload-7f3a.tmp", ".CSV", b"a,b\n1,2\n".to_vec());
        assert_eq!(file.name, "upload-7f3a.tmp");
        assert_eq!(file.extension, "csv");
        assert_eq!(file.file_type(), FileType::Csv);
    }

    #[test]
    fn test_citation_format() {
        assert_eq!(Chunk::new("x", "a.pdf", Some(3)).format_citation(), "a.pdf, Page 3");
        assert_eq!(Chunk::new("x", "notes.txt", None).format_citation(), "notes.txt");
    }

    #[test]
    fn test_preview_flattens_newlines() {
        let chunk = Chunk::new("line one\nline two", "a.txt", None);
        assert_eq!(chunk.preview(8), "line one...");
        assert_eq!(chunk.preview(100), "line one line two");
    }
}
