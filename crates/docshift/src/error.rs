//! Error types for docshift.
//!
//! Every fallible operation in the crate returns [`DocshiftError`]. The enum follows a simple policy:
//!
//! **System errors bubble up unchanged:**
//! - `DocshiftError::Io` (from `std::io::Error`) - file system and permission errors.
//!
//! **Application errors carry context:**
//! - `Validation` - bad uploads, wrong extensions, unusable parameters
//! - `Pdf` - corrupt documents, invalid page ranges
//! - `Ocr` - recognition engine failures
//! - `Conversion` - office conversion exhausted every strategy
//! - `MissingDependency` - an external tool is not installed or not executable
//!
//! # Example
//!
//! ```rust
//! use docshift::{DocshiftError, Result};
//!
//! fn require_pdf(name: &str) -> Result<()> {
//!     if !name.to_ascii_lowercase().ends_with(".pdf") {
//!         return Err(DocshiftError::validation(format!("Expected a PDF, got '{}'", name)));
//!     }
//!     Ok(())
//! }
//! ```
use thiserror::Error;

use crate::conversion::StrategyFailure;

/// Result type alias using `DocshiftError`.
pub type Result<T> = std::result::Result<T, DocshiftError>;

/// Main error type for all docshift operations.
#[derive(Debug, Error)]
pub enum DocshiftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("PDF error: {message}")]
    Pdf {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Packaging error: {message}")]
    Packaging {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Every conversion strategy failed. `attempts` keeps them in the order they ran.
    #[error("Conversion failed: {message}")]
    Conversion {
        message: String,
        attempts: Vec<StrategyFailure>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for DocshiftError {
    fn from(err: serde_json::Error) -> Self {
        DocshiftError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<crate::pdf::error::PdfError> for DocshiftError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        DocshiftError::Pdf {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<zip::result::ZipError> for DocshiftError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io_err) => DocshiftError::Io(io_err),
            other => DocshiftError::Packaging {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl DocshiftError {
    error_constructor!(validation, Validation);
    error_constructor!(pdf, Pdf);
    error_constructor!(ocr, Ocr);
    error_constructor!(packaging, Packaging);
    error_constructor!(serialization, Serialization);

    /// Build a `Conversion` error from the attempts of an exhausted strategy chain.
    ///
    /// The summary leads with the last attempt, then lists the earlier ones in run order.
    pub fn conversion(attempts: Vec<StrategyFailure>) -> Self {
        let message = match attempts.split_last() {
            None => "no conversion strategy was attempted".to_string(),
            Some((last, earlier)) => {
                let mut message = format!("All converters failed.\nLast error:\n{}", last);
                if !earlier.is_empty() {
                    message.push_str("\nEarlier attempts:");
                    for attempt in earlier {
                        message.push_str(&format!("\n- {}", attempt));
                    }
                }
                message
            }
        };

        Self::Conversion { message, attempts }
    }

    /// Whether this error was caused by the caller rather than by the service.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Pdf { source, .. } => source
                .as_ref()
                .and_then(|s| s.downcast_ref::<crate::pdf::error::PdfError>())
                .is_some_and(|e| e.is_client_error()),
            _ => false,
        }
    }
}
