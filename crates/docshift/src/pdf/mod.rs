//! PDF primitives: merge, page-range split and text extraction.
//!
//! Everything here is synchronous and CPU-bound. Async callers should run these
//! functions on `tokio::task::spawn_blocking`.

pub mod error;
mod assemble;
pub mod merge;
pub mod split;
pub mod text;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::PdfError;
pub use merge::{merge_documents, merge_pdfs};
pub use split::{PageRange, SplitOutput, split_document, split_pdf_range};
pub use text::{extract_text, extract_text_from_bytes};

use lopdf::Document;

/// Number of pages in a PDF held in memory.
pub fn page_count(pdf_bytes: &[u8]) -> error::Result<usize> {
    let document = Document::load_mem(pdf_bytes)?;
    Ok(document.get_pages().len())
}
