use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfError {
    InvalidPdf(String),
    /// Requested range is empty after clamping to the document's pages.
    InvalidPageRange {
        from: i64,
        to: i64,
    },
    NoPages,
    EmptyInput,
    SaveFailed(String),
    TextExtractionFailed(String),
    IOError(String),
}

impl PdfError {
    /// Errors caused by the request rather than the document or the host.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PdfError::InvalidPageRange { .. } | PdfError::EmptyInput)
    }
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::InvalidPdf(msg) => write!(f, "Invalid PDF: {}", msg),
            PdfError::InvalidPageRange { from, to } => {
                write!(f, "Invalid page range: {}-{}", from, to)
            }
            PdfError::NoPages => write!(f, "PDF has no pages"),
            PdfError::EmptyInput => write!(f, "No PDF documents were provided"),
            PdfError::SaveFailed(msg) => write!(f, "Failed to write PDF: {}", msg),
            PdfError::TextExtractionFailed(msg) => write!(f, "Text extraction failed: {}", msg),
            PdfError::IOError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for PdfError {}

// NOTE: No From<std::io::Error> impl - IO errors must bubble up unchanged per error handling policy

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(io_err) => PdfError::IOError(io_err.to_string()),
            _ => PdfError::InvalidPdf(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
