//! Response packaging: one raw file, or several files in a zip archive.

use std::fmt;
use std::io::{Cursor, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::core::mime::ZIP_MIME_TYPE;
use crate::{DocshiftError, Result};

/// How results are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    /// A single artifact as-is
    #[default]
    Raw,
    /// Every artifact inside a zip archive
    Zip,
}

impl FromStr for PackageFormat {
    type Err = DocshiftError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "zip" => Ok(Self::Zip),
            other => Err(DocshiftError::validation(format!(
                "Unknown output format '{}', expected 'raw' or 'zip'",
                other
            ))),
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Zip => write!(f, "zip"),
        }
    }
}

/// One named output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type: content_type.into(),
        }
    }
}

/// Package `artifacts` for delivery.
///
/// Exactly one artifact with [`PackageFormat::Raw`] is returned unchanged. Anything else becomes
/// a deflated zip named `archive_name`, entries in input order.
///
/// # Errors
///
/// `DocshiftError::Packaging` when there is nothing to package or the archive cannot be written
/// (for example on duplicate entry names).
pub fn package(artifacts: Vec<Artifact>, format: PackageFormat, archive_name: &str) -> Result<Artifact> {
    if artifacts.is_empty() {
        return Err(DocshiftError::packaging("Nothing to package"));
    }

    if format == PackageFormat::Raw && artifacts.len() == 1 {
        return artifacts
            .into_iter()
            .next()
            .ok_or_else(|| DocshiftError::packaging("Nothing to package"));
    }

    let bytes = zip_artifacts(&artifacts)?;
    tracing::debug!(entries = artifacts.len(), size = bytes.len(), archive = archive_name, "Built zip archive");

    Ok(Artifact::new(archive_name, bytes, ZIP_MIME_TYPE))
}

fn zip_artifacts(artifacts: &[Artifact]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for artifact in artifacts {
        zip.start_file(artifact.name.as_str(), options)?;
        zip.write_all(&artifact.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// `Content-Disposition` header value for downloading `file_name`.
///
/// Non-ASCII names also get an RFC 5987 `filename*` parameter.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if file_name.is_ascii() {
        return format!("attachment; filename=\"{}\"", ascii);
    }

    let encoded = urlencoding::encode(file_name);
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", ascii, encoded)
}
