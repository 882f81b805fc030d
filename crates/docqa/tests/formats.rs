//! Normalization of every supported format, and placeholders for the rest

use docqa::config::ExtractionConfig;
use docqa::ingestion::{Normalizer, TextChunker};
use docqa::{FileStatus, UploadedFile};

fn normalizer() -> Normalizer {
    Normalizer::new(ExtractionConfig {
        enable_ocr: false,
        ocr_language: "eng".to_string(),
        use_pandoc: false,
    })
}

/// Single-page PDF with one line of Helvetica text
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    let mut offsets = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    use docx_rs::{Docx, Paragraph, Run};

    let mut docx = Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
    }
    let mut cursor = std::io::Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).unwrap();
    cursor.into_inner()
}

/// One-sheet workbook with inline string cells
fn minimal_xlsx(sheet: &str, rows: &[&[&str]]) -> Vec<u8> {
    use std::io::Write;

    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, value) in row.iter().enumerate() {
            let cell = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            if value.parse::<f64>().is_ok() {
                sheet_rows.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell, value));
            } else {
                sheet_rows.push_str(&format!("<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>", cell, value));
            }
        }
        sheet_rows.push_str("</row>");
    }

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
                sheet
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                sheet_rows
            ),
        ),
    ];

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (path, body) in parts {
            zip.start_file(path, zip::write::SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn assert_extracted(file: UploadedFile, needle: &str) {
    let normalized = normalizer().normalize(&file);
    assert_eq!(normalized.status, FileStatus::Extracted, "{} was not extracted", file.name);
    assert!(!normalized.units.is_empty());
    for unit in &normalized.units {
        assert_eq!(unit.source_name, file.name);
    }
    let text: String = normalized.units.iter().map(|u| u.text.as_str()).collect::<Vec<_>>().join("\n");
    assert!(text.contains(needle), "{}: {:?} not in {:?}", file.name, needle, text);
}

fn assert_single_placeholder(file: UploadedFile, expected_text: &str) {
    let normalized = normalizer().normalize(&file);
    assert!(!normalized.status.is_extracted(), "{} should be a placeholder", file.name);
    assert_eq!(normalized.units.len(), 1);
    assert_eq!(normalized.units[0].text, expected_text);
    assert_eq!(normalized.units[0].source_name, file.name);
}

#[test]
fn plain_text_family() {
    assert_extracted(UploadedFile::new("notes.txt", "plain notes"), "plain notes");
    assert_extracted(UploadedFile::new("README.md", "# Title\nmarkdown body"), "markdown body");
    assert_extracted(UploadedFile::new("deploy.yaml", "replicas: 3\n"), "replicas: 3");
}

#[test]
fn pdf_text_is_extracted_with_page() {
    let file = UploadedFile::new("report.pdf", minimal_pdf("quarterly revenue grew"));
    let normalized = normalizer().normalize(&file);
    assert_eq!(normalized.status, FileStatus::Extracted);
    assert_eq!(normalized.units[0].source_name, "report.pdf");
    assert_eq!(normalized.units[0].page, Some(1));
    assert!(normalized.units[0].text.contains("quarterly revenue grew"));
}

#[test]
fn docx_paragraphs_are_extracted() {
    let file = UploadedFile::new("memo.docx", minimal_docx(&["First paragraph", "Second paragraph"]));
    assert_extracted(file, "Second paragraph");
}

#[test]
fn xlsx_sheet_becomes_one_paged_unit() {
    let data = minimal_xlsx("Sheet1", &[&["name", "score"], &["Ada", "36.5"]]);
    let normalized = normalizer().normalize(&UploadedFile::new("scores.xlsx", data));

    assert_eq!(normalized.status, FileStatus::Extracted);
    assert_eq!(normalized.units.len(), 1);
    assert_eq!(normalized.units[0].text, "Sheet: Sheet1\nname | score\nAda | 36.5");
    assert_eq!(normalized.units[0].page, Some(1));
    assert_eq!(normalized.units[0].source_name, "scores.xlsx");
}

#[test]
fn declared_extension_selects_the_parser() {
    let file = UploadedFile::with_extension("export", "csv", "name,age\nAda,36\n");
    let normalized = normalizer().normalize(&file);
    assert_eq!(normalized.status, FileStatus::Extracted);
    assert_eq!(normalized.units[0].source_name, "export");
    assert!(normalized.units[0].text.contains("name: Ada"));
}

#[test]
fn structured_formats() {
    assert_extracted(UploadedFile::new("people.csv", "name,age\nAda,36\n"), "name: Ada");
    assert_extracted(UploadedFile::new("settings.json", r#"{"mode":"fast"}"#), "\"mode\": \"fast\"");
    assert_extracted(UploadedFile::new("feed.xml", "<feed><title>Release notes</title></feed>"), "Release notes");
    assert_extracted(UploadedFile::new("letter.rtf", r"{\rtf1\ansi Dear reader\par}"), "Dear reader");
}

#[test]
fn unsupported_and_corrupt_inputs_become_one_placeholder() {
    assert_single_placeholder(UploadedFile::new("slides.pptx", vec![1, 2, 3]), "[Unsupported: pptx]");
    assert_single_placeholder(UploadedFile::new("Makefile", "all:"), "[Unsupported: none]");
    assert_single_placeholder(UploadedFile::new("photo.png", vec![0x89, b'P', b'N', b'G']), "[Image: photo.png]");
    assert_single_placeholder(UploadedFile::new("broken.pdf", b"%PDF-1.4 garbage".to_vec()), "[Error: broken.pdf]");
    assert_single_placeholder(UploadedFile::new("broken.docx", b"not a zip".to_vec()), "[Error: broken.docx]");
    assert_single_placeholder(UploadedFile::new("broken.xlsx", b"not a zip".to_vec()), "[Error: broken.xlsx]");
    assert_single_placeholder(UploadedFile::new("broken.json", "{\"open\": "), "[Error: broken.json]");
    assert_single_placeholder(UploadedFile::new("blank.txt", "  \n\n "), "[Empty: blank.txt]");
}

#[test]
fn chunking_a_normalized_document_is_deterministic_and_bounded() {
    let body = (0..200)
        .map(|i| format!("Sentence number {} talks about topic {}.", i, i % 9))
        .collect::<Vec<_>>()
        .join(" ");
    let normalized = normalizer().normalize(&UploadedFile::new("long.txt", body));
    let chunker = TextChunker::new(300, 60);

    let first = chunker.split_units(&normalized.units);
    let second = chunker.split_units(&normalized.units);
    assert_eq!(first, second);
    assert!(first.len() > 1);
    assert!(first.iter().all(|c| c.char_len() <= 300));
    assert!(first.iter().all(|c| c.source_name == "long.txt"));
}
