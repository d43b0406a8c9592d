//! Plain-text extraction from PDF content streams.

use std::path::Path;

use lopdf::Document;

use super::error::{PdfError, Result};

/// Extract the concatenated text of every page. No page markers are inserted.
///
/// Pages that carry no text contribute nothing. When lopdf cannot decode the document as a
/// whole, pages are retried one at a time and undecodable ones are skipped; the call only
/// fails if no page could be decoded at all.
pub fn extract_text_from_bytes(pdf_bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(pdf_bytes)?;
    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();

    if page_numbers.is_empty() {
        return Ok(String::new());
    }

    match document.extract_text(&page_numbers) {
        Ok(text) => Ok(text),
        Err(whole_err) => {
            tracing::debug!("Whole-document text extraction failed ({}), retrying per page", whole_err);

            let mut text = String::new();
            let mut decoded_any = false;
            for number in &page_numbers {
                match document.extract_text(&[*number]) {
                    Ok(page_text) => {
                        decoded_any = true;
                        text.push_str(&page_text);
                    }
                    Err(e) => tracing::warn!(page = number, "Skipping page without decodable text: {}", e),
                }
            }

            if decoded_any {
                Ok(text)
            } else {
                Err(PdfError::TextExtractionFailed(whole_err.to_string()))
            }
        }
    }
}

/// Extract text from a PDF file on disk. See [`extract_text_from_bytes`].
pub fn extract_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PdfError::IOError(format!("{}: {}", path.display(), e)))?;
    extract_text_from_bytes(&bytes)
}
