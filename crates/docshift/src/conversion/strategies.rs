//! Conversion strategies, tried in order by [`super::Converter`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::process::CapturedOutput;

use super::run::ConversionRun;
use super::soffice::SofficeRunner;
use super::{ConversionKind, StrategyFailure};

const DOCX_FILTER: &str = "docx:MS Word 2007 XML";
const ODT_FILTER: &str = "odt:writer8";
const PDF_EXPORT_FILTER: &str = "pdf:writer_pdf_Export";
const PDF_IMPORT_FILTER: &str = "writer_pdf_import";

/// One way of turning the run's input into the requested output.
#[async_trait]
pub trait ConversionStrategy: Send + Sync {
    /// Short identifier used in logs and failure reports.
    fn name(&self) -> &str;

    /// Whether this strategy needs a working soffice. Such strategies are skipped when the
    /// availability probe fails.
    fn requires_office_tool(&self) -> bool {
        true
    }

    /// Produce the output inside the run's work directory and return its path.
    async fn attempt(&self, run: &ConversionRun) -> Result<PathBuf, StrategyFailure>;
}

/// One soffice step: convert `input` and claim the produced `ext` file as `work/<name>`.
async fn soffice_step(
    strategy: &str,
    runner: &SofficeRunner,
    run: &ConversionRun,
    input: &std::path::Path,
    convert_to: &str,
    infilter: Option<&str>,
    claim_as: &str,
) -> Result<PathBuf, StrategyFailure> {
    let ext = convert_to.split(':').next().unwrap_or(convert_to);

    run.discard_outputs(ext, input)
        .await
        .map_err(|e| StrategyFailure::new(strategy, format!("could not clear stale {} output: {}", ext, e)))?;

    let output: CapturedOutput = runner
        .convert(run, input, convert_to, infilter)
        .await
        .map_err(|e| StrategyFailure::new(strategy, e.to_string()))?;

    if !output.success {
        return Err(StrategyFailure::new(
            strategy,
            format!(
                "soffice exited with code {:?}: {}",
                output.code,
                output.diagnostics().trim()
            ),
        )
        .with_output(&output));
    }

    match run.claim_output(ext, claim_as).await {
        Ok(Some(path)) => Ok(path),
        Ok(None) => Err(StrategyFailure::new(strategy, format!("produced no {}", ext.to_ascii_uppercase()))
            .with_output(&output)),
        Err(e) => Err(StrategyFailure::new(strategy, format!("could not collect {} output: {}", ext, e))
            .with_output(&output)),
    }
}

/// PDF to DOCX in one pass, forcing Writer's PDF import filter.
pub struct WriterPdfImport {
    runner: Arc<SofficeRunner>,
}

impl WriterPdfImport {
    pub fn new(runner: Arc<SofficeRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ConversionStrategy for WriterPdfImport {
    fn name(&self) -> &str {
        "writer-pdf-import"
    }

    async fn attempt(&self, run: &ConversionRun) -> Result<PathBuf, StrategyFailure> {
        soffice_step(
            self.name(),
            &self.runner,
            run,
            run.input(),
            DOCX_FILTER,
            Some(PDF_IMPORT_FILTER),
            "out.docx",
        )
        .await
    }
}

/// PDF to ODT with the import filter, then ODT to DOCX. Each step checks its own output.
pub struct ViaOdt {
    runner: Arc<SofficeRunner>,
}

impl ViaOdt {
    pub fn new(runner: Arc<SofficeRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ConversionStrategy for ViaOdt {
    fn name(&self) -> &str {
        "via-odt"
    }

    async fn attempt(&self, run: &ConversionRun) -> Result<PathBuf, StrategyFailure> {
        let odt = soffice_step(
            self.name(),
            &self.runner,
            run,
            run.input(),
            ODT_FILTER,
            Some(PDF_IMPORT_FILTER),
            "mid.odt",
        )
        .await?;

        soffice_step(self.name(), &self.runner, run, &odt, DOCX_FILTER, None, "out.docx").await
    }
}

/// DOCX to PDF through Writer's PDF export.
pub struct SofficeExport {
    runner: Arc<SofficeRunner>,
}

impl SofficeExport {
    pub fn new(runner: Arc<SofficeRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ConversionStrategy for SofficeExport {
    fn name(&self) -> &str {
        "soffice-export"
    }

    async fn attempt(&self, run: &ConversionRun) -> Result<PathBuf, StrategyFailure> {
        soffice_step(
            self.name(),
            &self.runner,
            run,
            run.input(),
            PDF_EXPORT_FILTER,
            None,
            "out.pdf",
        )
        .await
    }
}

/// Drives Microsoft Word through COM from PowerShell: open the input read-only, `SaveAs2` in
/// the target format, close, quit. Windows only; elsewhere every attempt fails.
pub struct WordAutomation {
    kind: ConversionKind,
    timeout: std::time::Duration,
}

/// `WdSaveFormat` values.
const WD_FORMAT_XML_DOCUMENT: u8 = 12;
const WD_FORMAT_PDF: u8 = 17;

impl WordAutomation {
    pub fn new(kind: ConversionKind, timeout: std::time::Duration) -> Self {
        Self { kind, timeout }
    }

    fn save_format(&self) -> u8 {
        match self.kind {
            ConversionKind::PdfToDocx => WD_FORMAT_XML_DOCUMENT,
            ConversionKind::DocxToPdf => WD_FORMAT_PDF,
        }
    }

    /// PowerShell script converting `input` into `output`.
    pub fn script(&self, input: &std::path::Path, output: &std::path::Path) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'\n\
$word = New-Object -ComObject Word.Application\n\
$word.Visible = $false\n\
$word.DisplayAlerts = 0\n\
try {{\n\
  $doc = $word.Documents.Open({input}, $false, $true)\n\
  try {{ $doc.SaveAs2({output}, {format}) }} finally {{ $doc.Close($false) }}\n\
}} finally {{\n\
  $word.Quit()\n\
}}\n",
            input = powershell_quote(&input.to_string_lossy()),
            output = powershell_quote(&output.to_string_lossy()),
            format = self.save_format(),
        )
    }
}

/// Single-quoted PowerShell literal.
fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl ConversionStrategy for WordAutomation {
    fn name(&self) -> &str {
        "word-automation"
    }

    fn requires_office_tool(&self) -> bool {
        false
    }

    async fn attempt(&self, run: &ConversionRun) -> Result<PathBuf, StrategyFailure> {
        if !cfg!(windows) {
            return Err(StrategyFailure::new(
                self.name(),
                "Microsoft Word automation is only available on Windows",
            ));
        }

        let output_path = run.work_dir().join(format!("out.{}", self.kind.output_ext()));
        let script = self.script(run.input(), &output_path);

        let output = crate::core::process::run_captured(
            std::path::Path::new("powershell.exe"),
            ["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-Command", script.as_str()],
            self.timeout,
        )
        .await
        .map_err(|e| StrategyFailure::new(self.name(), e.to_string()))?;

        if !output.success {
            return Err(StrategyFailure::new(
                self.name(),
                format!("Word automation failed: {}", output.diagnostics().trim()),
            )
            .with_output(&output));
        }

        match tokio::fs::metadata(&output_path).await {
            Ok(metadata) if metadata.len() > 0 => Ok(output_path),
            _ => Err(StrategyFailure::new(
                self.name(),
                format!("Word produced no {}", self.kind.output_ext().to_ascii_uppercase()),
            )
            .with_output(&output)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_strategy_names() {
        let runner = Arc::new(SofficeRunner::new(&crate::core::config::OfficeConfig::default()));
        assert_eq!(WriterPdfImport::new(runner.clone()).name(), "writer-pdf-import");
        assert_eq!(ViaOdt::new(runner.clone()).name(), "via-odt");
        assert_eq!(SofficeExport::new(runner).name(), "soffice-export");

        let word = WordAutomation::new(ConversionKind::PdfToDocx, std::time::Duration::from_secs(1));
        assert_eq!(word.name(), "word-automation");
        assert!(!word.requires_office_tool());
    }

    #[test]
    fn test_word_script_formats() {
        let to_docx = WordAutomation::new(ConversionKind::PdfToDocx, std::time::Duration::from_secs(1));
        let script = to_docx.script(Path::new("C:\\runs\\input.pdf"), Path::new("C:\\runs\\out.docx"));
        assert!(script.contains("Documents.Open('C:\\runs\\input.pdf', $false, $true)"));
        assert!(script.contains("SaveAs2('C:\\runs\\out.docx', 12)"));
        assert!(script.contains("$doc.Close($false)"));
        assert!(script.contains("$word.Quit()"));

        let to_pdf = WordAutomation::new(ConversionKind::DocxToPdf, std::time::Duration::from_secs(1));
        let script = to_pdf.script(Path::new("in.docx"), Path::new("out.pdf"));
        assert!(script.contains("SaveAs2('out.pdf', 17)"));
    }

    #[test]
    fn test_powershell_quote_escapes() {
        assert_eq!(powershell_quote("O'Brien.pdf"), "'O''Brien.pdf'");
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_word_automation_unavailable_off_windows() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("a.pdf");
        std::fs::write(&source, b"%PDF-1.4").unwrap();
        let run = ConversionRun::create(root.path(), &source, "pdf").await.unwrap();

        let word = WordAutomation::new(ConversionKind::PdfToDocx, std::time::Duration::from_secs(1));
        let failure = word.attempt(&run).await.unwrap_err();
        assert_eq!(failure.strategy, "word-automation");
        assert!(failure.message.contains("only available on Windows"));
    }
}
