//! Local command-line converters (pandoc, tesseract) for formats without a Rust parser
//!
//! Both tools read from disk, so the upload is written to a scoped
//! `NamedTempFile`. The temp file is removed when it drops, whichever way the
//! conversion exits.

use std::io::Write;
use std::process::Command;
use std::sync::OnceLock;

use tempfile::NamedTempFile;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

fn tool_responds(program: &str) -> bool {
    let available = Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    tracing::debug!("{} available: {}", program, available);
    available
}

/// Runner for external conversion tools
#[derive(Debug, Clone)]
pub struct ExternalTools {
    config: ExtractionConfig,
}

impl ExternalTools {
    /// Create a runner from extraction settings
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Check if pandoc is available. Probed once per process.
    pub fn has_pandoc() -> bool {
        static PANDOC: OnceLock<bool> = OnceLock::new();
        *PANDOC.get_or_init(|| tool_responds("pandoc"))
    }

    /// Check if tesseract OCR is available. Probed once per process.
    pub fn has_tesseract() -> bool {
        static TESSERACT: OnceLock<bool> = OnceLock::new();
        *TESSERACT.get_or_init(|| tool_responds("tesseract"))
    }

    /// Whether RTF should go through pandoc
    pub fn pandoc_enabled(&self) -> bool {
        self.config.use_pandoc && Self::has_pandoc()
    }

    /// Whether images should go through tesseract
    pub fn ocr_enabled(&self) -> bool {
        self.config.enable_ocr && Self::has_tesseract()
    }

    /// Convert a document to plain text with pandoc
    pub fn convert_with_pandoc(&self, filename: &str, input_format: &str, data: &[u8]) -> Result<String> {
        let temp = write_scoped_temp(filename, input_format, data)?;
        let path = temp.path().to_string_lossy().to_string();

        let output = Command::new("pandoc")
            .args(["-f", input_format, "-t", "plain", "--wrap=none", path.as_str()])
            .output()
            .map_err(|e| Error::extraction(filename, format!("pandoc failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::extraction(filename, format!("pandoc error: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        if text.trim().is_empty() {
            return Err(Error::extraction(filename, "pandoc produced no output"));
        }

        tracing::debug!("[{}] pandoc extracted {} chars", filename, text.len());
        Ok(text)
    }

    /// Extract text from an image with tesseract
    pub fn ocr_image(&self, filename: &str, extension: &str, data: &[u8]) -> Result<String> {
        let temp = write_scoped_temp(filename, extension, data)?;
        let path = temp.path().to_string_lossy().to_string();

        let output = Command::new("tesseract")
            .args([path.as_str(), "stdout", "-l", self.config.ocr_language.as_str()])
            .output()
            .map_err(|e| Error::extraction(filename, format!("tesseract failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::extraction(filename, format!("tesseract error: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        tracing::info!("[{}] OCR extracted {} characters", filename, text.len());
        Ok(text)
    }
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

/// Write bytes to a temp file that is deleted on drop
fn write_scoped_temp(filename: &str, extension: &str, data: &[u8]) -> Result<NamedTempFile> {
    let suffix = format!(".{}", extension);
    let mut temp = tempfile::Builder::new()
        .prefix("docqa-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| Error::extraction(filename, format!("Failed to create temp file: {}", e)))?;

    temp.write_all(data)
        .and_then(|_| temp.flush())
        .map_err(|e| Error::extraction(filename, format!("Failed to write temp file: {}", e)))?;

    Ok(temp)
}
