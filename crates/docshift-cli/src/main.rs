//! docshift - document conversion CLI
//!
//! Usage:
//!   docshift serve [-H host] [-p port]        Start the API server
//!   docshift merge -o OUT IN IN...            Merge PDFs in order
//!   docshift split --from N --to M IN         Extract a page range
//!   docshift text IN [-o OUT]                 Extract text from a PDF
//!   docshift pdf-to-docx IN [-o DIR]          Convert through LibreOffice
//!   docshift docx-to-pdf IN [-o DIR]          Convert through LibreOffice
//!   docshift ocr IMAGE... [-o DIR]            Recognise text in images

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docshift::conversion::Converter;
use docshift::ocr::TesseractOcr;
use docshift::pdf::{extract_text, merge_pdfs, split_pdf_range};
use docshift::{ServiceConfig, UploadDescriptor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docshift", version, about = "Merge, split, convert and OCR documents")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to a discovered docshift.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    #[cfg(feature = "api")]
    Serve {
        /// Address to bind to (overrides [server] host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Merge PDFs into one document, pages in argument order
    Merge {
        /// Output PDF
        #[arg(short, long)]
        output: PathBuf,

        /// Input PDFs
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
    },

    /// Extract an inclusive, 1-based page range
    Split {
        input: PathBuf,

        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        from: i64,

        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        to: i64,

        /// Output PDF (default: split-<from>-<to>.pdf in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract the text of a PDF
    Text {
        input: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a PDF to DOCX
    PdfToDocx {
        input: PathBuf,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a DOCX to PDF
    DocxToPdf {
        input: PathBuf,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recognise text in images with Tesseract
    Ocr {
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Directory for the .txt results (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long, conflicts_with = "output")]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("Input file not found: {}", path.display());
    }
    Ok(())
}

/// Directory a converted file is written to when `-o` is not given.
fn default_output_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        #[cfg(feature = "api")]
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            docshift::api::serve_with_config(host, port, config)
                .await
                .context("API server failed")?;
        }

        Commands::Merge { output, inputs } => {
            for input in &inputs {
                ensure_exists(input)?;
            }
            let merged = tokio::task::spawn_blocking(move || merge_pdfs(&inputs))
                .await?
                .context("Failed to merge PDFs")?;
            tokio::fs::write(&output, &merged)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(output = %output.display(), size = merged.len(), "Merged PDFs");
        }

        Commands::Split {
            input,
            from,
            to,
            output,
        } => {
            ensure_exists(&input)?;
            let split = tokio::task::spawn_blocking(move || split_pdf_range(&input, from, to))
                .await?
                .context("Failed to split PDF")?;
            let output = output.unwrap_or_else(|| PathBuf::from(split.file_name()));
            tokio::fs::write(&output, &split.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(
                output = %output.display(),
                from = split.range.from,
                to = split.range.to,
                "Split PDF"
            );
        }

        Commands::Text { input, output } => {
            ensure_exists(&input)?;
            let text = tokio::task::spawn_blocking(move || extract_text(&input))
                .await?
                .context("Failed to extract text")?;
            match output {
                Some(path) => tokio::fs::write(&path, text.as_bytes())
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", text),
            }
        }

        Commands::PdfToDocx { input, output } => {
            let written = convert(&config, &input, output, Direction::ToDocx).await?;
            println!("{}", written.display());
        }

        Commands::DocxToPdf { input, output } => {
            let written = convert(&config, &input, output, Direction::ToPdf).await?;
            println!("{}", written.display());
        }

        Commands::Ocr { images, output, json } => {
            let mut uploads = Vec::with_capacity(images.len());
            for image in &images {
                ensure_exists(image)?;
                uploads.push(UploadDescriptor::from_path(image)?);
            }

            let ocr = TesseractOcr::new(&config.ocr);
            let results = ocr.recognize_batch(&uploads).await.context("OCR failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if let Some(dir) = output {
                tokio::fs::create_dir_all(&dir)
                    .await
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                for result in &results {
                    let path = dir.join(&result.name);
                    tokio::fs::write(&path, result.text.as_bytes())
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{}", path.display());
                }
            } else {
                for result in &results {
                    println!("==> {} <==\n{}", result.name, result.text);
                }
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum Direction {
    ToDocx,
    ToPdf,
}

/// Run one office conversion and copy the result into `output` (or next to the input).
async fn convert(config: &ServiceConfig, input: &Path, output: Option<PathBuf>, direction: Direction) -> Result<PathBuf> {
    ensure_exists(input)?;
    let out_dir = output.unwrap_or_else(|| default_output_dir(input));
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let converter = Converter::new(config);
    let converted = match direction {
        Direction::ToDocx => converter.pdf_to_docx(input, &config.temp_dir).await,
        Direction::ToPdf => converter.docx_to_pdf(input, &config.temp_dir).await,
    }
    .context("Conversion failed")?;

    let target = out_dir.join(converted.file_name());
    tokio::fs::copy(converted.path(), &target)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(target)
}
