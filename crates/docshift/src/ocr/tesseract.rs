//! Tesseract command-line adapter.
//!
//! Each image is recognised by its own `tesseract <image> stdout -l <lang> --psm <mode>` run.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::core::config::OcrConfig;
use crate::core::naming::safe_base_name;
use crate::core::process::{ProcessError, run_captured};
use crate::upload::UploadDescriptor;
use crate::{DocshiftError, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

fn tesseract_install_message() -> String {
    "Tesseract is required for OCR. \
Install: macOS: 'brew install tesseract', \
Linux: 'apt install tesseract-ocr', \
Windows: 'winget install UB-Mannheim.TesseractOCR'. \
If it is installed in a custom location, set DOCSHIFT_TESSERACT_PATH to the executable."
        .to_string()
}

/// Recognised text for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrOutput {
    /// Output file name, `<safe base name>.txt`
    pub name: String,
    pub text: String,
}

/// Runs the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
    psm: u8,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            language: config.language.clone(),
            psm: config.psm,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Check the binary runs, returning the first line of `tesseract --version`.
    pub async fn probe(&self) -> Result<String> {
        let output = run_captured(&self.binary, ["--version"], PROBE_TIMEOUT)
            .await
            .map_err(|e| self.missing_dependency(e))?;

        if !output.success {
            return Err(DocshiftError::MissingDependency(format!(
                "Tesseract executable '{}' responded with a failure when checking '--version': {}",
                self.binary.display(),
                output.diagnostics().trim()
            )));
        }

        // Older releases print the version banner on stderr.
        let banner = if output.stdout.trim().is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        Ok(banner.lines().next().unwrap_or_default().trim().to_string())
    }

    pub async fn is_available(&self) -> bool {
        self.probe().await.is_ok()
    }

    /// Recognise the text in one image. An image without text yields an empty string.
    pub async fn recognize(&self, image: &Path) -> Result<String> {
        let psm = self.psm.to_string();
        let args = [
            image.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&self.language),
            OsStr::new("--psm"),
            OsStr::new(&psm),
        ];
        tracing::debug!(binary = %self.binary.display(), image = %image.display(), "Running tesseract");

        let output = run_captured(&self.binary, args, self.timeout)
            .await
            .map_err(|e| match e {
                ProcessError::NotFound(_) => self.missing_dependency(e),
                other => DocshiftError::ocr_with_source(format!("tesseract failed on {}", image.display()), other),
            })?;

        if !output.success {
            return Err(DocshiftError::ocr(format!(
                "tesseract failed on {} (exit code {:?}): {}",
                image.display(),
                output.code,
                output.diagnostics().trim()
            )));
        }

        let text = output.stdout.trim_end_matches(|c: char| c.is_whitespace() || c == '\u{c}');
        if text.trim().is_empty() {
            Ok(String::new())
        } else {
            Ok(text.to_string())
        }
    }

    /// Recognise every upload in order, one image at a time.
    ///
    /// The first failure aborts the batch; remaining images are not processed.
    pub async fn recognize_batch(&self, uploads: &[UploadDescriptor]) -> Result<Vec<OcrOutput>> {
        let mut outputs = Vec::with_capacity(uploads.len());
        let mut taken: HashSet<String> = HashSet::new();

        for (index, upload) in uploads.iter().enumerate() {
            let text = self.recognize(&upload.staged_path).await.map_err(|e| {
                tracing::warn!(
                    image = %upload.original_name,
                    remaining = uploads.len() - index - 1,
                    "OCR batch aborted: {}",
                    e
                );
                e
            })?;

            let name = unique_output_name(&safe_base_name(&upload.original_name), &mut taken);

            outputs.push(OcrOutput { name, text });
        }

        tracing::info!(images = outputs.len(), "OCR batch complete");
        Ok(outputs)
    }

    fn missing_dependency(&self, err: ProcessError) -> DocshiftError {
        DocshiftError::MissingDependency(format!(
            "Tesseract executable '{}' could not be executed: {}. {}",
            self.binary.display(),
            err,
            tesseract_install_message()
        ))
    }
}

/// `<base>.txt`, or the first free `<base>-N.txt` (N from 2) when that name is already taken.
fn unique_output_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = format!("{}.txt", base);
    let mut suffix = 2;
    while taken.contains(&name) {
        name = format!("{}-{}.txt", base, suffix);
        suffix += 1;
    }
    taken.insert(name.clone());
    name
}
