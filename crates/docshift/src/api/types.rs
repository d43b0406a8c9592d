//! API request and response types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::conversion::Converter;
use crate::core::config::LimitsConfig;
use crate::ocr::TesseractOcr;
use crate::{DocshiftError, PackageFormat, ServiceConfig};

/// API server size limit configuration.
///
/// `max_request_body_bytes` bounds the whole request and is enforced by the router layers.
/// `max_file_bytes` bounds each uploaded file and is checked while reading the multipart body;
/// a larger file is answered with 413.
///
/// # Examples
///
/// ```
/// use docshift::api::ApiSizeLimits;
///
/// // 100 MB per request, 50 MB per file
/// let limits = ApiSizeLimits::from_mb(100, 50);
/// assert_eq!(limits.max_file_bytes, 50 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiSizeLimits {
    /// Maximum size of the entire request body in bytes.
    pub max_request_body_bytes: usize,

    /// Maximum size of a single uploaded file in bytes.
    pub max_file_bytes: usize,

    /// Maximum number of files accepted by multi-file endpoints.
    pub max_files: usize,
}

impl Default for ApiSizeLimits {
    fn default() -> Self {
        Self::from_limits(&LimitsConfig::default())
    }
}

impl ApiSizeLimits {
    pub fn new(max_request_body_bytes: usize, max_file_bytes: usize, max_files: usize) -> Self {
        Self {
            max_request_body_bytes,
            max_file_bytes,
            max_files,
        }
    }

    /// Size limits from MB values, keeping the default file count.
    pub fn from_mb(max_request_body_mb: usize, max_file_mb: usize) -> Self {
        Self {
            max_request_body_bytes: max_request_body_mb * 1024 * 1024,
            max_file_bytes: max_file_mb * 1024 * 1024,
            max_files: LimitsConfig::default().max_files,
        }
    }

    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self {
            max_request_body_bytes: limits.max_request_body_bytes,
            max_file_bytes: limits.max_file_bytes,
            max_files: limits.max_files,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server information response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub version: String,
    /// Whether `soffice --version` succeeded
    pub office_available: bool,
    pub office_binary: String,
    /// Whether `tesseract --version` succeeded
    pub ocr_available: bool,
    pub ocr_binary: String,
    pub max_file_bytes: usize,
    pub max_files: usize,
    pub default_format: PackageFormat,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Short summary
    pub error: String,
    /// Diagnostic text, e.g. the output captured from a failed conversion
    pub details: Option<String>,
}

/// Query accepted by every endpoint that returns a single document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

/// Query accepted by `POST /split`.
///
/// Values stay strings so that missing, empty and malformed numbers can be told apart.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SplitQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub format: Option<String>,
}

/// API server state, shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<ServiceConfig>,
    pub converter: Arc<Converter>,
    pub ocr: Arc<TesseractOcr>,
    pub limits: ApiSizeLimits,
}

impl ApiState {
    pub fn new(config: ServiceConfig, limits: ApiSizeLimits) -> Self {
        Self {
            converter: Arc::new(Converter::new(&config)),
            ocr: Arc::new(TesseractOcr::new(&config.ocr)),
            config: Arc::new(config),
            limits,
        }
    }

    /// Requested package format, or the configured default when the query has none.
    pub fn package_format(&self, requested: Option<&str>) -> Result<PackageFormat, DocshiftError> {
        match requested.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.parse(),
            None => Ok(self.config.output.default_format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limits_follow_config() {
        let limits = ApiSizeLimits::default();
        assert_eq!(limits.max_request_body_bytes, 100 * 1024 * 1024);
        assert_eq!(limits.max_file_bytes, 50 * 1024 * 1024);
        assert_eq!(limits.max_files, 10);
    }

    #[test]
    fn test_package_format_defaults_to_config() {
        let mut config = ServiceConfig::default();
        config.output.default_format = PackageFormat::Zip;
        let state = ApiState::new(config, ApiSizeLimits::default());

        assert_eq!(state.package_format(None).unwrap(), PackageFormat::Zip);
        assert_eq!(state.package_format(Some("")).unwrap(), PackageFormat::Zip);
        assert_eq!(state.package_format(Some("raw")).unwrap(), PackageFormat::Raw);
        assert!(state.package_format(Some("rar")).is_err());
    }

    #[test]
    fn test_error_response_serializes_null_details() {
        let body = ErrorResponse {
            error: "Upload a PDF file".to_string(),
            details: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Upload a PDF file", "details": null}));
    }
}
