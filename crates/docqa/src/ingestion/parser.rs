//! Multi-format file parser and the normalizer that never fails a batch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use calamine::Reader;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::{DocumentUnit, FileStatus, FileType, UploadedFile};

use super::external::ExternalTools;
use super::rtf::rtf_to_text;

/// pdf-extract can spin on broken font programs
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Worker threads still running after their deadline passed
static ABANDONED_WORKERS: AtomicUsize = AtomicUsize::new(0);

/// Number of extraction workers abandoned so far in this process
pub fn abandoned_workers() -> usize {
    ABANDONED_WORKERS.load(Ordering::Relaxed)
}

/// Run `job` on a worker thread and wait at most `timeout` for it.
///
/// std threads cannot be cancelled: on timeout the worker is detached and
/// keeps its CPU and memory until `job` returns on its own. Each such
/// worker is counted in [`abandoned_workers`].
fn run_with_deadline<T, F>(job: F, timeout: Duration) -> std::result::Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, String> + Send + 'static,
{
    use std::sync::mpsc;
    use std::thread;

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let _ = tx.send(job());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            let _ = handle.join();
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            let abandoned = ABANDONED_WORKERS.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                "Worker still running after {:?}; detached ({} abandoned so far)",
                timeout,
                abandoned
            );
            Err(format!("timed out after {}s", timeout.as_secs_f32()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err("extraction thread crashed".to_string()),
    }
}

/// Replace typographic characters PDF fonts commonly emit with plain equivalents
fn cleanup_pdf_text(text: &str) -> String {
    let text = text
        .replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    text.lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Multi-format file parser
#[derive(Debug, Clone, Default)]
pub struct FileParser {
    tools: ExternalTools,
}

impl FileParser {
    /// Create a parser using the given extraction settings
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            tools: ExternalTools::new(config),
        }
    }

    /// External tool runner used for RTF and images
    pub fn tools(&self) -> &ExternalTools {
        &self.tools
    }

    /// Extract document units from an upload according to its declared extension
    pub fn parse(&self, file: &UploadedFile) -> Result<Vec<DocumentUnit>> {
        let name = file.name.as_str();
        let data = file.bytes.as_slice();

        match file.file_type() {
            FileType::Text => Ok(Self::parse_text(name, data)),
            FileType::Pdf => Self::parse_pdf(name, data),
            FileType::Docx => Self::parse_docx(name, data),
            FileType::Rtf => self.parse_rtf(name, data),
            FileType::Csv => Self::parse_csv(name, data),
            FileType::Spreadsheet => Self::parse_spreadsheet(name, data),
            FileType::Json => Self::parse_json(name, data),
            FileType::Xml => Self::parse_xml(name, data),
            FileType::Image => self.parse_image(name, &file.extension, data),
            FileType::Unsupported => Err(Error::extraction(
                name,
                format!("no extractor for extension '{}'", file.extension),
            )),
        }
    }

    /// Parse plain text, markdown, or YAML
    fn parse_text(name: &str, data: &[u8]) -> Vec<DocumentUnit> {
        let content = String::from_utf8_lossy(data);
        let content = content.trim_start_matches('\u{FEFF}');
        vec![DocumentUnit::new(content, name)]
    }

    /// Parse a PDF into one unit per page
    fn parse_pdf(name: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        let pages = match Self::extract_pdf_pages_with_timeout(data) {
            Ok(pages) if pages.iter().any(|p| !p.trim().is_empty()) => pages,
            Ok(_) => {
                tracing::warn!("[{}] pdf-extract found no text, trying lopdf", name);
                Self::extract_pdf_pages_fallback(name, data)?
            }
            Err(reason) => {
                tracing::warn!("[{}] pdf-extract failed: {}, trying lopdf", name, reason);
                Self::extract_pdf_pages_fallback(name, data)?
            }
        };

        let units: Vec<DocumentUnit> = pages
            .iter()
            .enumerate()
            .filter_map(|(i, page)| {
                let text = cleanup_pdf_text(page);
                (!text.is_empty()).then(|| DocumentUnit::paged(text, name, i as u32 + 1))
            })
            .collect();

        if units.is_empty() {
            return Err(Error::extraction(
                name,
                "PDF has no extractable text (image-based or encrypted)",
            ));
        }

        tracing::debug!("[{}] extracted {} of {} PDF pages", name, units.len(), pages.len());
        Ok(units)
    }

    /// Run pdf-extract on a worker thread so a hang or panic cannot take the batch down
    fn extract_pdf_pages_with_timeout(data: &[u8]) -> std::result::Result<Vec<String>, String> {
        let data_vec = data.to_vec();
        run_with_deadline(
            move || pdf_extract::extract_text_from_mem_by_pages(&data_vec).map_err(|e| e.to_string()),
            PDF_EXTRACT_TIMEOUT,
        )
    }

    /// Per-page text through lopdf's content-stream decoder
    fn extract_pdf_pages_fallback(name: &str, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(name, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::debug!("[{}] no text for page {}: {}", name, page_number, e);
                    pages.push(String::new());
                }
            }
        }
        Ok(pages)
    }

    /// Parse a Word document: paragraphs in order, table rows as `cell | cell`
    fn parse_docx(name: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::extraction(name, format!("Failed to read Word document: {}", e)))?;

        let mut content = String::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    content.push_str(&paragraph_text(p));
                    content.push('\n');
                }
                docx_rs::DocumentChild::Table(table) => {
                    content.push_str(&table_text(table));
                }
                _ => {}
            }
        }

        Ok(vec![DocumentUnit::new(content.trim(), name)])
    }

    /// Parse RTF through pandoc, falling back to the built-in stripper
    fn parse_rtf(&self, name: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        if self.tools.pandoc_enabled() {
            match self.tools.convert_with_pandoc(name, "rtf", data) {
                Ok(text) => return Ok(vec![DocumentUnit::new(text.trim(), name)]),
                Err(e) => tracing::warn!("{}, using built-in RTF reader", e),
            }
        }

        let source = String::from_utf8_lossy(data);
        let text = rtf_to_text(&source)
            .ok_or_else(|| Error::extraction(name, "not an RTF document"))?;
        Ok(vec![DocumentUnit::new(text, name)])
    }

    /// Parse CSV into one unit per data row of `header: value` lines
    fn parse_csv(name: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::extraction(name, format!("Invalid CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut units = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record =
                result.map_err(|e| Error::extraction(name, format!("Invalid CSV row {}: {}", row + 1, e)))?;

            let lines: Vec<String> = record
                .iter()
                .enumerate()
                .map(|(col, value)| match headers.get(col) {
                    Some(header) if !header.is_empty() => format!("{}: {}", header, value.trim()),
                    _ => value.trim().to_string(),
                })
                .collect();
            units.push(DocumentUnit::paged(lines.join("\n"), name, row as u32 + 1));
        }

        if units.is_empty() && !headers.is_empty() {
            units.push(DocumentUnit::new(headers.join(", "), name));
        }
        Ok(units)
    }

    /// Parse xlsx/xls/ods into one unit per non-empty sheet
    fn parse_spreadsheet(name: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        let cursor = std::io::Cursor::new(data);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::extraction(name, format!("Failed to open spreadsheet: {}", e)))?;

        let mut units = Vec::new();
        for (index, sheet_name) in workbook.sheet_names().to_vec().into_iter().enumerate() {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!("[{}] skipping sheet '{}': {}", name, sheet_name, e);
                    continue;
                }
            };

            let mut sheet_content = String::new();
            for row in range.rows() {
                let row_text: Vec<String> = row.iter().map(cell_text).collect();
                if !row_text.iter().all(|s| s.is_empty()) {
                    sheet_content.push_str(&row_text.join(" | "));
                    sheet_content.push('\n');
                }
            }

            if !sheet_content.is_empty() {
                units.push(DocumentUnit::paged(
                    format!("Sheet: {}\n{}", sheet_name, sheet_content.trim_end()),
                    name,
                    index as u32 + 1,
                ));
            }
        }

        Ok(units)
    }

    /// Parse JSON and re-emit it pretty-printed
    fn parse_json(name: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        let value: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| Error::extraction(name, format!("Invalid JSON: {}", e)))?;
        let pretty = serde_json::to_string_pretty(&value)
            .map_err(|e| Error::extraction(name, e.to_string()))?;
        Ok(vec![DocumentUnit::new(pretty, name)])
    }

    /// Parse XML, keeping text and CDATA nodes one per line
    fn parse_xml(name: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(true);

        let mut parts: Vec<String> = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::extraction(name, format!("Invalid XML text: {}", e)))?;
                    if !text.trim().is_empty() {
                        parts.push(text.trim().to_string());
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).trim().to_string();
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::extraction(
                        name,
                        format!("Invalid XML at byte {}: {}", reader.buffer_position(), e),
                    ))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(vec![DocumentUnit::new(parts.join("\n"), name)])
    }

    /// OCR an image with tesseract
    fn parse_image(&self, name: &str, extension: &str, data: &[u8]) -> Result<Vec<DocumentUnit>> {
        if !self.tools.ocr_enabled() {
            return Err(Error::extraction(name, "OCR unavailable"));
        }
        let text = self.tools.ocr_image(name, extension, data)?;
        Ok(vec![DocumentUnit::new(text.trim(), name)])
    }
}

/// Text of a paragraph's runs
fn paragraph_text(p: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                match child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    docx_rs::RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// Rows of a table, cells joined with ` | `
fn table_text(table: &docx_rs::Table) -> String {
    let mut text = String::new();
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|docx_rs::TableRowChild::TableCell(cell)| {
                cell.children
                    .iter()
                    .filter_map(|content| match content {
                        docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim()
                    .to_string()
            })
            .collect();
        if cells.iter().any(|c| !c.is_empty()) {
            text.push_str(&cells.join(" | "));
            text.push('\n');
        }
    }
    text
}

/// Display form of a spreadsheet cell
fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.trim().to_string(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(dt) => dt.to_string(),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Result of normalizing one upload
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    /// At least one unit, all named after the upload
    pub units: Vec<DocumentUnit>,
    /// Extraction outcome
    pub status: FileStatus,
}

/// Turns any upload into document units, substituting placeholders for
/// content that cannot be extracted
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    parser: FileParser,
}

impl Normalizer {
    /// Create a normalizer from extraction settings
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            parser: FileParser::new(config),
        }
    }

    /// Normalize one upload. Never fails.
    pub fn normalize(&self, file: &UploadedFile) -> NormalizedFile {
        let file_type = file.file_type();

        let outcome = match file_type {
            FileType::Unsupported => {
                let ext = if file.extension.is_empty() { "none" } else { file.extension.as_str() };
                return Self::placeholder(
                    file,
                    format!("[Unsupported: {}]", ext),
                    FileStatus::Placeholder(format!("no extractor for extension '{}'", ext)),
                );
            }
            FileType::Image if !self.parser.tools().ocr_enabled() => {
                return Self::placeholder(
                    file,
                    format!("[Image: {}]", file.name),
                    FileStatus::Placeholder("OCR unavailable".to_string()),
                );
            }
            _ => self.parser.parse(file),
        };

        match outcome {
            Ok(units) => {
                let mut units: Vec<DocumentUnit> =
                    units.into_iter().filter(|u| !u.text.trim().is_empty()).collect();

                if units.is_empty() {
                    tracing::warn!("[{}] no text content extracted", file.name);
                    let (text, reason) = if file_type == FileType::Image {
                        (format!("[Image: {}]", file.name), "no text recognized")
                    } else {
                        (format!("[Empty: {}]", file.name), "no text content")
                    };
                    return Self::placeholder(file, text, FileStatus::Placeholder(reason.to_string()));
                }

                for unit in &mut units {
                    unit.source_name = file.name.clone();
                }
                tracing::debug!(
                    "[{}] {} extracted into {} unit(s)",
                    file.name,
                    file_type.display_name(),
                    units.len()
                );
                NormalizedFile {
                    units,
                    status: FileStatus::Extracted,
                }
            }
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {}", file.name, e);
                let reason = match e {
                    Error::Extraction { message, .. } => message,
                    other => other.to_string(),
                };
                Self::failed(file, reason)
            }
        }
    }

    /// Placeholder for a file whose extraction could not complete
    pub fn failed(file: &UploadedFile, reason: impl Into<String>) -> NormalizedFile {
        Self::placeholder(file, format!("[Error: {}]", file.name), FileStatus::Failed(reason.into()))
    }

    fn placeholder(file: &UploadedFile, text: String, status: FileStatus) -> NormalizedFile {
        NormalizedFile {
            units: vec![DocumentUnit::new(text, file.name.clone())],
            status,
        }
    }
}
