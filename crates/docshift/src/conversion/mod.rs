//! PDF↔DOCX conversion through a headless office suite.
//!
//! A [`Converter`] owns an ordered list of [`ConversionStrategy`] values and tries them one by
//! one inside a fresh [`ConversionRun`] until one produces an output:
//!
//! 1. `writer-pdf-import`: PDF → DOCX with Writer's PDF import filter
//! 2. `via-odt`: PDF → ODT → DOCX
//! 3. `word-automation`: Microsoft Word over COM (Windows only, optional)
//!
//! The soffice strategies are skipped when `soffice --version` fails; the Word fallback is
//! still tried. When nothing succeeds, every attempt (including the failed probe) is reported
//! in a single [`DocshiftError::Conversion`].
//!
//! # Example
//!
//! ```rust,no_run
//! use docshift::{ServiceConfig, conversion::Converter};
//!
//! # async fn example() -> docshift::Result<()> {
//! let config = ServiceConfig::default();
//! let converter = Converter::new(&config);
//!
//! let docx = converter.pdf_to_docx("scan.pdf", "/tmp/pdf-tools").await?;
//! let bytes = docx.read().await?;
//! println!("{} ({} bytes)", docx.file_name(), bytes.len());
//! # Ok(())
//! # }
//! ```

mod run;
pub mod soffice;
pub mod strategies;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::fs;

use crate::core::config::{OfficeConfig, ServiceConfig};
use crate::core::mime::{DOCX_MIME_TYPE, PDF_MIME_TYPE};
use crate::core::naming::{extension_of, safe_base_name};
use crate::core::process::CapturedOutput;
use crate::{DocshiftError, Result};

pub use run::{ConversionRun, file_url};
pub use soffice::SofficeRunner;
pub use strategies::{ConversionStrategy, SofficeExport, ViaOdt, WordAutomation, WriterPdfImport};

/// Name recorded for a failed soffice availability probe.
pub const PROBE_STEP: &str = "office-probe";

/// Direction of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionKind {
    PdfToDocx,
    DocxToPdf,
}

impl ConversionKind {
    pub fn input_ext(&self) -> &'static str {
        match self {
            Self::PdfToDocx => "pdf",
            Self::DocxToPdf => "docx",
        }
    }

    pub fn output_ext(&self) -> &'static str {
        match self {
            Self::PdfToDocx => "docx",
            Self::DocxToPdf => "pdf",
        }
    }

    pub fn output_content_type(&self) -> &'static str {
        match self {
            Self::PdfToDocx => DOCX_MIME_TYPE,
            Self::DocxToPdf => PDF_MIME_TYPE,
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.input_ext().to_ascii_uppercase(), self.output_ext().to_ascii_uppercase())
    }
}

/// Why one strategy (or the availability probe) did not produce an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub message: String,
    /// Captured standard output of the last process the strategy ran, if any
    pub stdout: String,
    /// Captured standard error of the last process the strategy ran, if any
    pub stderr: String,
}

impl StrategyFailure {
    pub fn new(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            message: message.into(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Attach the captured output of the process that failed.
    pub fn with_output(mut self, output: &CapturedOutput) -> Self {
        self.stdout = output.stdout.clone();
        self.stderr = output.stderr.clone();
        self
    }
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.strategy, self.message)?;
        if !self.stdout.trim().is_empty() {
            write!(f, "\nStdout:\n{}", self.stdout.trim_end())?;
        }
        if !self.stderr.trim().is_empty() {
            write!(f, "\nStderr:\n{}", self.stderr.trim_end())?;
        }
        Ok(())
    }
}

/// A converted file at `<out_root>/out-<run id>/<safe base name>.<ext>`.
///
/// The output directory is removed when this value is dropped unless [`ConvertedDocument::keep`]
/// was called.
#[derive(Debug)]
pub struct ConvertedDocument {
    path: PathBuf,
    file_name: String,
    content_type: &'static str,
    dir: PathBuf,
    keep: bool,
}

impl ConvertedDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download name, e.g. `report.docx`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }

    /// Keep the file on disk after this value is dropped and return its path.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for ConvertedDocument {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.dir.display(), "Failed to remove conversion output: {}", e);
        }
    }
}

/// Runs ordered conversion strategies.
pub struct Converter {
    runner: Arc<SofficeRunner>,
    word_automation: bool,
    timeout: Duration,
}

impl Converter {
    pub fn new(config: &ServiceConfig) -> Self {
        Self::from_office_config(&config.office)
    }

    pub fn from_office_config(config: &OfficeConfig) -> Self {
        Self {
            runner: Arc::new(SofficeRunner::new(config)),
            word_automation: config.enable_word_automation,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn runner(&self) -> &SofficeRunner {
        &self.runner
    }

    /// Whether soffice answers its availability probe.
    pub async fn office_available(&self) -> bool {
        self.runner.probe().await.is_ok()
    }

    /// The strategies tried for `kind`, in order.
    pub fn strategies(&self, kind: ConversionKind) -> Vec<Box<dyn ConversionStrategy>> {
        let mut strategies: Vec<Box<dyn ConversionStrategy>> = match kind {
            ConversionKind::PdfToDocx => vec![
                Box::new(WriterPdfImport::new(self.runner.clone())),
                Box::new(ViaOdt::new(self.runner.clone())),
            ],
            ConversionKind::DocxToPdf => vec![Box::new(SofficeExport::new(self.runner.clone()))],
        };

        if cfg!(windows) && self.word_automation {
            strategies.push(Box::new(WordAutomation::new(kind, self.timeout)));
        }

        strategies
    }

    /// Convert a PDF into a DOCX under `out_root`.
    pub async fn pdf_to_docx(&self, input: impl AsRef<Path>, out_root: impl AsRef<Path>) -> Result<ConvertedDocument> {
        let strategies = self.strategies(ConversionKind::PdfToDocx);
        self.convert_with(ConversionKind::PdfToDocx, input.as_ref(), out_root.as_ref(), &strategies)
            .await
    }

    /// Convert a DOCX into a PDF under `out_root`.
    pub async fn docx_to_pdf(&self, input: impl AsRef<Path>, out_root: impl AsRef<Path>) -> Result<ConvertedDocument> {
        let strategies = self.strategies(ConversionKind::DocxToPdf);
        self.convert_with(ConversionKind::DocxToPdf, input.as_ref(), out_root.as_ref(), &strategies)
            .await
    }

    /// Run `strategies` in order until one succeeds.
    ///
    /// # Errors
    ///
    /// - `DocshiftError::Validation` when `input` does not have the extension `kind` expects
    /// - `DocshiftError::Io` when the run directory cannot be prepared
    /// - `DocshiftError::Conversion` with every failed attempt when no strategy succeeds
    pub async fn convert_with(
        &self,
        kind: ConversionKind,
        input: &Path,
        out_root: &Path,
        strategies: &[Box<dyn ConversionStrategy>],
    ) -> Result<ConvertedDocument> {
        let input_name = input.to_string_lossy();
        let ext = extension_of(&input_name);
        if ext.as_deref() != Some(kind.input_ext()) {
            return Err(DocshiftError::validation(format!(
                "Invalid input: expected a {}, got \"{}\"",
                kind.input_ext().to_ascii_uppercase(),
                ext.map(|e| format!(".{}", e)).unwrap_or_else(|| "unknown".to_string())
            )));
        }

        fs::create_dir_all(out_root).await?;
        let run = ConversionRun::create(out_root, input, kind.input_ext()).await?;
        tracing::info!(run = %run.id(), kind = %kind, input = %input.display(), "Starting conversion");

        let mut attempts = Vec::new();

        let office_available = if strategies.iter().any(|s| s.requires_office_tool()) {
            match self.runner.probe().await {
                Ok(version) => {
                    tracing::debug!(run = %run.id(), version = %version, "soffice available");
                    true
                }
                Err(e) => {
                    tracing::warn!(run = %run.id(), "soffice unavailable: {}", e);
                    attempts.push(StrategyFailure::new(PROBE_STEP, e.to_string()));
                    false
                }
            }
        } else {
            false
        };

        for strategy in strategies {
            if strategy.requires_office_tool() && !office_available {
                tracing::debug!(run = %run.id(), strategy = strategy.name(), "Skipping, soffice unavailable");
                continue;
            }

            match strategy.attempt(&run).await {
                Ok(produced) => {
                    tracing::info!(run = %run.id(), strategy = strategy.name(), "Conversion succeeded");
                    return self.finalize(kind, input, out_root, &run, &produced).await;
                }
                Err(failure) => {
                    tracing::warn!(run = %run.id(), strategy = strategy.name(), "Strategy failed: {}", failure.message);
                    attempts.push(failure);
                }
            }
        }

        tracing::warn!(run = %run.id(), attempts = attempts.len(), "All conversion strategies failed");
        Err(DocshiftError::conversion(attempts))
    }

    /// Move the produced file to its stable location outside the run directory.
    async fn finalize(
        &self,
        kind: ConversionKind,
        input: &Path,
        out_root: &Path,
        run: &ConversionRun,
        produced: &Path,
    ) -> Result<ConvertedDocument> {
        let dir = out_root.join(format!("out-{}", run.id()));
        fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", safe_base_name(&input.to_string_lossy()), kind.output_ext());
        let path = dir.join(&file_name);

        let document = ConvertedDocument {
            path,
            file_name,
            content_type: kind.output_content_type(),
            dir,
            keep: false,
        };

        match fs::remove_file(&document.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if fs::rename(produced, &document.path).await.is_err() {
            fs::copy(produced, &document.path).await?;
        }

        Ok(document)
    }
}
