//! Extract an inclusive, 1-based page range into a new document.

use std::ops::RangeInclusive;
use std::path::Path;

use lopdf::Document;
use serde::Serialize;

use super::assemble::PageAssembler;
use super::error::{PdfError, Result};

/// A non-empty, 1-based inclusive page range that fits inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub from: u32,
    pub to: u32,
}

impl PageRange {
    /// Clamp a requested range to `[1, page_count]`.
    ///
    /// Fails with `PdfError::InvalidPageRange` when the clamped start lies after the clamped end.
    pub fn clamp(from: i64, to: i64, page_count: u32) -> Result<Self> {
        let start = from.max(1);
        let end = to.min(i64::from(page_count));

        if start > end {
            return Err(PdfError::InvalidPageRange { from, to });
        }

        Ok(Self {
            from: start as u32,
            to: end as u32,
        })
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.from..=self.to
    }

    pub fn page_count(&self) -> usize {
        (self.to - self.from + 1) as usize
    }
}

/// Result of a split: the new document and the range that was actually used.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub bytes: Vec<u8>,
    pub range: PageRange,
}

impl SplitOutput {
    /// Conventional download name, e.g. `split-2-4.pdf`.
    pub fn file_name(&self) -> String {
        format!("split-{}-{}.pdf", self.range.from, self.range.to)
    }
}

/// Copy pages `from..=to` (1-based, clamped) of an in-memory PDF into a new document.
pub fn split_document(pdf_bytes: &[u8], from: i64, to: i64) -> Result<SplitOutput> {
    let document = Document::load_mem(pdf_bytes)?;
    let total = document.get_pages().len() as u32;
    if total == 0 {
        return Err(PdfError::NoPages);
    }

    let range = PageRange::clamp(from, to, total)?;
    let page_numbers: Vec<u32> = range.pages().collect();

    let mut assembler = PageAssembler::new();
    assembler.append(document, &page_numbers)?;
    let bytes = assembler.finish()?;

    tracing::debug!(from = range.from, to = range.to, total, "Split PDF page range");

    Ok(SplitOutput { bytes, range })
}

/// Split a PDF file from disk. See [`split_document`].
pub fn split_pdf_range(path: impl AsRef<Path>, from: i64, to: i64) -> Result<SplitOutput> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PdfError::IOError(format!("{}: {}", path.display(), e)))?;
    split_document(&bytes, from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{build_pdf, page_labels};

    #[test]
    fn test_clamp_within_bounds() {
        let range = PageRange::clamp(2, 4, 5).unwrap();
        assert_eq!(range, PageRange { from: 2, to: 4 });
        assert_eq!(range.page_count(), 3);
    }

    #[test]
    fn test_clamp_limits_both_ends() {
        let range = PageRange::clamp(-3, 99, 5).unwrap();
        assert_eq!(range, PageRange { from: 1, to: 5 });
    }

    #[test]
    fn test_clamp_rejects_inverted_range() {
        assert_eq!(
            PageRange::clamp(4, 2, 5),
            Err(PdfError::InvalidPageRange { from: 4, to: 2 })
        );
    }

    #[test]
    fn test_clamp_rejects_range_past_end() {
        assert!(PageRange::clamp(7, 9, 5).is_err());
    }

    #[test]
    fn test_split_middle_pages() {
        let source = build_pdf(&["p1", "p2", "p3", "p4", "p5"]);
        let output = split_document(&source, 2, 4).unwrap();

        let document = Document::load_mem(&output.bytes).unwrap();
        assert_eq!(document.get_pages().len(), 3);
        assert_eq!(page_labels(&document), vec!["p2", "p3", "p4"]);
        assert_eq!(output.file_name(), "split-2-4.pdf");
    }

    #[test]
    fn test_split_every_valid_range_has_expected_length() {
        let source = build_pdf(&["p1", "p2", "p3", "p4"]);
        for from in 1..=4_i64 {
            for to in from..=4_i64 {
                let output = split_document(&source, from, to).unwrap();
                let document = Document::load_mem(&output.bytes).unwrap();
                assert_eq!(document.get_pages().len() as i64, to - from + 1);
            }
        }
    }

    #[test]
    fn test_split_clamped_range_reports_effective_pages() {
        let source = build_pdf(&["p1", "p2", "p3"]);
        let output = split_document(&source, 0, 10).unwrap();
        assert_eq!(output.range, PageRange { from: 1, to: 3 });
        assert_eq!(output.file_name(), "split-1-3.pdf");
    }

    #[test]
    fn test_split_invalid_range() {
        let source = build_pdf(&["p1", "p2"]);
        let err = split_document(&source, 3, 1).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_split_garbage_input() {
        let err = split_document(b"%PDF-garbage", 1, 1).unwrap_err();
        assert!(matches!(err, PdfError::InvalidPdf(_) | PdfError::IOError(_)));
    }
}
