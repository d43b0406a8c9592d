//! MIME constants and upload validation.
//!
//! Uploads are judged on three signals: the file name extension, the declared multipart
//! content type, and the leading bytes of the content.

use super::naming::extension_of;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ODT_MIME_TYPE: &str = "application/vnd.oasis.opendocument.text";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain; charset=utf-8";
pub const ZIP_MIME_TYPE: &str = "application/zip";
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Declared type with parameters stripped and lowercased, `None` when absent or blank.
fn essence(content_type: Option<&str>) -> Option<String> {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty())
}

/// Missing and generic declared types carry no information and are tolerated.
fn declared_type_allows(content_type: Option<&str>, expected: &str) -> bool {
    match essence(content_type) {
        None => true,
        Some(ct) => ct == expected || ct == OCTET_STREAM_MIME_TYPE,
    }
}

fn has_extension(file_name: &str, expected: &str) -> bool {
    extension_of(file_name).is_some_and(|ext| ext == expected)
}

/// Whether an upload is a PDF: `.pdf` extension, a compatible declared type and the `%PDF-` header.
///
/// ```rust
/// use docshift::core::mime::is_pdf_upload;
///
/// assert!(is_pdf_upload("scan.pdf", Some("application/pdf"), b"%PDF-1.7\n"));
/// assert!(!is_pdf_upload("scan.pdf", Some("image/png"), b"%PDF-1.7\n"));
/// ```
pub fn is_pdf_upload(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> bool {
    has_extension(file_name, "pdf") && declared_type_allows(content_type, PDF_MIME_TYPE) && bytes.starts_with(PDF_MAGIC)
}

/// Whether an upload is a DOCX: `.docx` extension, a compatible declared type and a zip container.
pub fn is_docx_upload(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> bool {
    has_extension(file_name, "docx")
        && declared_type_allows(content_type, DOCX_MIME_TYPE)
        && bytes.starts_with(ZIP_MAGIC)
}

/// Whether an upload is an image, by declared `image/*` type or by sniffing its content.
pub fn is_image_upload(content_type: Option<&str>, bytes: &[u8]) -> bool {
    if essence(content_type).is_some_and(|ct| ct.starts_with("image/")) {
        return true;
    }
    infer::is_image(bytes)
}

/// MIME type sniffed from content, falling back to `application/octet-stream`.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    infer::get(bytes).map(|kind| kind.mime_type()).unwrap_or(OCTET_STREAM_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_pdf_upload_accepted() {
        assert!(is_pdf_upload("doc.pdf", Some("application/pdf"), b"%PDF-1.4 rest"));
        assert!(is_pdf_upload("DOC.PDF", Some("Application/PDF"), b"%PDF-1.4"));
    }

    #[test]
    fn test_pdf_upload_tolerates_generic_type() {
        assert!(is_pdf_upload("doc.pdf", None, b"%PDF-1.4"));
        assert!(is_pdf_upload("doc.pdf", Some("application/octet-stream"), b"%PDF-1.4"));
    }

    #[test]
    fn test_pdf_upload_rejections() {
        assert!(!is_pdf_upload("doc.txt", Some("application/pdf"), b"%PDF-1.4"));
        assert!(!is_pdf_upload("doc.pdf", Some("text/plain"), b"%PDF-1.4"));
        assert!(!is_pdf_upload("doc.pdf", Some("application/pdf"), b"hello world"));
        assert!(!is_pdf_upload("doc.pdf", Some("application/pdf"), b""));
        assert!(!is_pdf_upload("pdf", Some("application/pdf"), b"%PDF-1.4"));
    }

    #[test]
    fn test_docx_upload() {
        assert!(is_docx_upload("letter.docx", Some(DOCX_MIME_TYPE), b"PK\x03\x04rest"));
        assert!(is_docx_upload("letter.docx", None, b"PK\x03\x04rest"));
        assert!(!is_docx_upload("letter.doc", Some(DOCX_MIME_TYPE), b"PK\x03\x04rest"));
        assert!(!is_docx_upload("letter.docx", Some(DOCX_MIME_TYPE), b"%PDF-1.4"));
    }

    #[test]
    fn test_image_upload() {
        assert!(is_image_upload(Some("image/png"), b""));
        assert!(is_image_upload(None, PNG_HEADER));
        assert!(is_image_upload(Some("application/octet-stream"), PNG_HEADER));
        assert!(!is_image_upload(Some("text/plain"), b"plain text"));
    }

    #[test]
    fn test_sniff_mime_type() {
        assert_eq!(sniff_mime_type(PNG_HEADER), "image/png");
        assert_eq!(sniff_mime_type(b"%PDF-1.4"), "application/pdf");
        assert_eq!(sniff_mime_type(b"???"), OCTET_STREAM_MIME_TYPE);
    }
}
