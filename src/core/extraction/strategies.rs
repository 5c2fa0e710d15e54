// Extraction strategies: one pure `bytes -> text` conversion per supported
// format. No strategy performs network I/O - content is already fetched by
// the time one of these runs, and a parse failure always surfaces as
// `CorruptDocument` rather than empty text.

use std::io::Cursor;

use calamine::{Reader, Xlsx};

use super::extraction_service::{ExtractionError, StructuredDocument};
use super::format::DocumentKind;

/// Convert a fetched byte buffer into text according to the resolved format.
///
/// For `GoogleDoc` this handles the export path (the buffer is the
/// `text/plain` export); the structured path bypasses byte buffers entirely
/// and goes through [`flatten_structured`].
pub fn extract(kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::PlainText | DocumentKind::GoogleDoc => decode_utf8(kind, bytes),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Xlsx => extract_xlsx(bytes),
    }
}

/// Concatenate every text run of every paragraph, in document order.
/// Nothing is inserted between paragraphs beyond what the runs themselves
/// contain (the Docs API terminates paragraphs with a newline run).
pub fn flatten_structured(doc: &StructuredDocument) -> String {
    let mut out = String::new();
    for paragraph in &doc.paragraphs {
        for run in &paragraph.runs {
            out.push_str(run);
        }
    }
    out
}

fn corrupt(kind: DocumentKind, reason: impl ToString) -> ExtractionError {
    ExtractionError::CorruptDocument {
        kind: kind.tag(),
        reason: reason.to_string(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| corrupt(DocumentKind::Pdf, e))
}

fn decode_utf8(kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractionError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| corrupt(kind, e))
}

/// Paragraph text only; runs are concatenated within a paragraph and
/// paragraphs joined with newlines. Formatting, tables and headers are
/// discarded.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| corrupt(DocumentKind::Docx, e))?;

    let mut paragraphs: Vec<String> = Vec::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(para) = child {
            let mut line = String::new();
            for para_child in &para.children {
                if let docx_rs::ParagraphChild::Run(run) = para_child {
                    for run_child in &run.children {
                        if let docx_rs::RunChild::Text(text) = run_child {
                            line.push_str(&text.text);
                        }
                    }
                }
            }
            paragraphs.push(line);
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Render each sheet as comma-separated rows under a banner line naming the
/// sheet, in the order the workbook lists its sheets. Sheets are separated
/// by a blank line.
fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut workbook =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| corrupt(DocumentKind::Xlsx, e))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut blocks: Vec<String> = Vec::new();

    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| corrupt(DocumentKind::Xlsx, e))?;

        let mut lines = vec![format!("--- Sheet: {} ---", name)];
        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| quote_csv_cell(&cell.to_string()))
                .collect();
            lines.push(cells.join(","));
        }
        blocks.push(lines.join("\n"));
    }

    Ok(blocks.join("\n\n"))
}

/// CSV-standard quoting: quote a cell that contains a comma, a quote or a
/// line break, doubling any embedded quotes. Everything else passes through.
fn quote_csv_cell(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
