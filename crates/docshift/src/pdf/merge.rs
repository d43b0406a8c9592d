//! Concatenate the pages of several PDFs into one document.

use std::path::Path;

use lopdf::Document;

use super::assemble::PageAssembler;
use super::error::{PdfError, Result};

/// Merge in-memory PDFs, appending every page of each source in input order.
///
/// # Errors
///
/// - `PdfError::EmptyInput` when `sources` is empty
/// - `PdfError::InvalidPdf` when a source cannot be parsed (the message names its 1-based position)
/// - `PdfError::NoPages` when none of the sources contain pages
pub fn merge_documents<B: AsRef<[u8]>>(sources: &[B]) -> Result<Vec<u8>> {
    if sources.is_empty() {
        return Err(PdfError::EmptyInput);
    }

    let mut assembler = PageAssembler::new();

    for (index, source) in sources.iter().enumerate() {
        let document = Document::load_mem(source.as_ref())
            .map_err(|e| PdfError::InvalidPdf(format!("document {}: {}", index + 1, e)))?;
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        assembler.append(document, &page_numbers)?;
    }

    tracing::debug!(
        sources = sources.len(),
        pages = assembler.page_count(),
        "Merged PDF documents"
    );

    assembler.finish()
}

/// Merge PDF files from disk. See [`merge_documents`].
pub fn merge_pdfs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<u8>> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| PdfError::IOError(format!("{}: {}", path.as_ref().display(), e)))?;
        sources.push(bytes);
    }
    merge_documents(&sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{build_pdf, page_labels};

    #[test]
    fn test_merge_empty_input() {
        let sources: Vec<Vec<u8>> = Vec::new();
        assert_eq!(merge_documents(&sources), Err(PdfError::EmptyInput));
    }

    #[test]
    fn test_merge_keeps_input_order() {
        let first = build_pdf(&["a1", "a2"]);
        let second = build_pdf(&["b1", "b2", "b3"]);

        let merged = merge_documents(&[first, second]).unwrap();
        let document = Document::load_mem(&merged).unwrap();

        assert_eq!(document.get_pages().len(), 5);
        assert_eq!(page_labels(&document), vec!["a1", "a2", "b1", "b2", "b3"]);
    }

    #[test]
    fn test_merge_single_document() {
        let only = build_pdf(&["solo"]);
        let merged = merge_documents(&[only]).unwrap();
        let document = Document::load_mem(&merged).unwrap();
        assert_eq!(document.get_pages().len(), 1);
    }

    #[test]
    fn test_merge_rejects_garbage() {
        let good = build_pdf(&["ok"]);
        let bad = b"definitely not a pdf".to_vec();

        let err = merge_documents(&[good, bad]).unwrap_err();
        match err {
            PdfError::InvalidPdf(msg) => assert!(msg.starts_with("document 2")),
            other => panic!("Expected InvalidPdf, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_pdfs_missing_file() {
        let err = merge_pdfs(&["/nonexistent/a.pdf", "/nonexistent/b.pdf"]).unwrap_err();
        assert!(matches!(err, PdfError::IOError(_)));
    }
}
