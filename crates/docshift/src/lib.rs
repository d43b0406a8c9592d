//! docshift - document conversion service
//!
//! docshift merges, splits and extracts text from PDFs, recognises text in images, and converts
//! between PDF and DOCX by driving a headless office suite. Every operation is available as a
//! library call and, behind the default `api` feature, as an HTTP endpoint.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docshift::{ServiceConfig, conversion::Converter};
//!
//! # async fn example() -> docshift::Result<()> {
//! let config = ServiceConfig::default();
//! let converter = Converter::new(&config);
//!
//! let converted = converter.pdf_to_docx("report.pdf", config.temp_dir.as_path()).await?;
//! println!("DOCX written to {}", converted.path().display());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): configuration loading, MIME checks, file naming
//! - **Upload** (`upload`): staging of uploaded files with guaranteed cleanup
//! - **PDF** (`pdf`): merge, page-range split and text extraction on top of `lopdf`
//! - **OCR** (`ocr`): Tesseract command-line adapter
//! - **Conversion** (`conversion`): PDF↔DOCX orchestration with ordered fallback strategies
//! - **Package** (`package`): raw or zipped response artifacts
//! - **API** (`api`): axum HTTP surface

#![deny(unsafe_code)]

pub mod conversion;
pub mod core;
pub mod error;
pub mod ocr;
pub mod package;
pub mod pdf;
pub mod upload;

#[cfg(feature = "api")]
pub mod api;

pub use core::config::{LimitsConfig, OcrConfig, OfficeConfig, OutputConfig, ServerConfig, ServiceConfig};
pub use error::{DocshiftError, Result};
pub use package::{Artifact, PackageFormat};
pub use upload::{UploadDescriptor, UploadStage};
