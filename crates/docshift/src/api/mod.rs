//! REST API server for docshift.
//!
//! An axum HTTP surface over the library operations. Uploads are multipart form data, results
//! come back as a single file or a zip archive.
//!
//! # Endpoints
//!
//! Mounted under `server.base_path` (`/api` by default):
//!
//! - `POST /merge` - merge 2 or more PDFs (`files`)
//! - `POST /split?from=&to=` - extract a page range (`file`)
//! - `POST /pdf-to-txt` - extract text (`file`)
//! - `POST /pdf-to-docx` - convert through the office suite (`file`)
//! - `POST /docx-to-pdf` - convert through the office suite (`file`)
//! - `POST /ocr` - recognise text in images (`files`), always a zip
//! - `GET /health`, `GET /info`
//!
//! Single-document endpoints accept `?format=raw|zip`.
//!
//! # Examples
//!
//! ```no_run
//! use docshift::api::serve;
//!
//! #[tokio::main]
//! async fn main() -> docshift::Result<()> {
//!     serve("127.0.0.1", 3333).await
//! }
//! ```
//!
//! # cURL Examples
//!
//! ```bash
//! curl -F "files=@a.pdf" -F "files=@b.pdf" http://localhost:3333/api/merge -o merged.pdf
//! curl -F "file=@doc.pdf" "http://localhost:3333/api/split?from=2&to=4" -o part.pdf
//! curl -F "file=@doc.pdf" "http://localhost:3333/api/pdf-to-txt?format=zip" -o output.zip
//! curl -F "file=@scan.pdf" http://localhost:3333/api/pdf-to-docx -o scan.docx
//! curl -F "files=@page1.png" -F "files=@page2.png" http://localhost:3333/api/ocr -o ocr-results.zip
//! ```

mod error;
mod handlers;
mod server;
mod types;

pub use error::ApiError;
pub use server::{
    CORS_ORIGINS_ENV, create_app, create_router, create_router_with_limits, serve, serve_default, serve_with_config,
};
pub use types::{ApiSizeLimits, ApiState, ErrorResponse, FormatQuery, HealthResponse, InfoResponse, SplitQuery};
