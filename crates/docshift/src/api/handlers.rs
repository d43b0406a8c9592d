//! API request handlers.

use std::path::PathBuf;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::conversion::ConversionKind;
use crate::core::mime::{PDF_MIME_TYPE, PLAIN_TEXT_MIME_TYPE, is_docx_upload, is_image_upload, is_pdf_upload};
use crate::core::naming::safe_base_name;
use crate::package::{Artifact, PackageFormat, content_disposition, package};
use crate::pdf::{extract_text, merge_pdfs, split_pdf_range};
use crate::{DocshiftError, UploadDescriptor, UploadStage};

use super::{
    error::ApiError,
    types::{ApiSizeLimits, ApiState, FormatQuery, HealthResponse, InfoResponse, SplitQuery},
};

/// One file field read from a multipart body.
struct ReceivedFile {
    file_name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

/// Read every file sent under one of `fields`, in order. Other fields are skipped.
async fn receive_files(
    multipart: &mut Multipart,
    fields: &[&str],
    limits: &ApiSizeLimits,
) -> Result<Vec<ReceivedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();
        if !fields.contains(&field_name.as_str()) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let bytes = field.bytes().await?;

        if bytes.len() > limits.max_file_bytes {
            return Err(ApiError::payload_too_large(format!(
                "File '{}' is {} bytes, over the {} byte upload limit",
                file_name,
                bytes.len(),
                limits.max_file_bytes
            )));
        }

        files.push(ReceivedFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Ok(files)
}

fn ensure_pdfs(files: &[ReceivedFile]) -> Result<(), ApiError> {
    if files
        .iter()
        .all(|f| is_pdf_upload(&f.file_name, f.content_type.as_deref(), &f.bytes))
    {
        Ok(())
    } else {
        Err(ApiError::bad_request("Only PDF files are allowed"))
    }
}

/// The single `file` upload of a one-document endpoint.
fn single_file(files: Vec<ReceivedFile>, missing: &str) -> Result<ReceivedFile, ApiError> {
    let mut files = files.into_iter();
    let file = files.next().ok_or_else(|| ApiError::bad_request(missing))?;
    if files.next().is_some() {
        return Err(ApiError::bad_request("Upload exactly one file"));
    }
    Ok(file)
}

/// Stage `files` under the configured uploads directory. Dropping the stage removes them.
async fn stage_files(state: &ApiState, files: &[ReceivedFile]) -> Result<UploadStage, ApiError> {
    let mut stage = UploadStage::new(state.config.uploads_dir())
        .await
        .map_err(ApiError::internal)?;
    for file in files {
        stage
            .stage(&file.file_name, file.content_type.as_deref(), &file.bytes)
            .await
            .map_err(ApiError::internal)?;
    }
    Ok(stage)
}

fn first_upload(stage: &UploadStage) -> Result<&UploadDescriptor, ApiError> {
    stage
        .uploads()
        .first()
        .ok_or_else(|| ApiError::internal(DocshiftError::Other("No staged upload".to_string())))
}

/// Run a synchronous PDF operation off the async runtime.
async fn run_blocking<T, F>(op: F) -> crate::Result<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        let _guard = span.entered();
        op()
    })
    .await
    .map_err(|e| DocshiftError::Other(format!("PDF task failed: {}", e)))?
}

fn artifact_response(artifact: Artifact) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&artifact.name)),
        ],
        artifact.bytes,
    )
        .into_response()
}

fn respond(artifact: Artifact, format: PackageFormat, archive_name: &str) -> Result<Response, ApiError> {
    let packaged = package(vec![artifact], format, archive_name).map_err(ApiError::internal)?;
    Ok(artifact_response(packaged))
}

/// `from`/`to` query value: missing or blank means page 1.
fn page_param(name: &str, value: Option<&str>) -> Result<i64, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(1),
        Some(v) => v.parse::<i64>().map_err(|_| {
            ApiError::bad_request(format!("Query parameter '{}' must be an integer, got '{}'", name, v))
        }),
    }
}

/// Merge endpoint handler.
///
/// POST /merge
///
/// Multipart field `files`: between 2 and `max_files` PDFs, merged in upload order into
/// `merged.pdf`.
pub async fn merge_handler(
    State(state): State<ApiState>,
    Query(query): Query<FormatQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let format = state
        .package_format(query.format.as_deref())
        .map_err(ApiError::validation)?;
    let files = receive_files(&mut multipart, &["files"], &state.limits).await?;

    if files.len() < 2 {
        return Err(ApiError::bad_request("Upload at least 2 PDFs"));
    }
    if files.len() > state.limits.max_files {
        return Err(ApiError::bad_request(format!(
            "Upload at most {} PDFs",
            state.limits.max_files
        )));
    }
    ensure_pdfs(&files)?;

    let stage = stage_files(&state, &files).await?;
    let paths: Vec<PathBuf> = stage.uploads().iter().map(|u| u.staged_path.clone()).collect();
    let count = paths.len();

    let merged = run_blocking(move || Ok(merge_pdfs(&paths)?))
        .await
        .map_err(|e| ApiError::operation_failed("Merge failed", e))?;
    tracing::info!(files = count, size = merged.len(), "Merged PDFs");

    respond(Artifact::new("merged.pdf", merged, PDF_MIME_TYPE), format, "merged.zip")
}

/// Split endpoint handler.
///
/// POST /split?from=&to=
///
/// Multipart field `file`: one PDF. The range is 1-based and inclusive, missing bounds default
/// to 1, and it is clamped to the document before use; the output is named after the clamped
/// range.
pub async fn split_handler(
    State(state): State<ApiState>,
    Query(query): Query<SplitQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let format = state
        .package_format(query.format.as_deref())
        .map_err(ApiError::validation)?;
    let from = page_param("from", query.from.as_deref())?;
    let to = page_param("to", query.to.as_deref())?;

    let files = receive_files(&mut multipart, &["file"], &state.limits).await?;
    let file = single_file(files, "Upload a PDF file")?;
    ensure_pdfs(std::slice::from_ref(&file))?;

    let stage = stage_files(&state, std::slice::from_ref(&file)).await?;
    let path = first_upload(&stage)?.staged_path.clone();

    let output = run_blocking(move || Ok(split_pdf_range(&path, from, to)?))
        .await
        .map_err(|e| ApiError::operation_failed("Split failed", e))?;
    tracing::info!(from = output.range.from, to = output.range.to, "Split PDF");

    let name = output.file_name();
    let archive_name = format!("split-{}-{}.zip", output.range.from, output.range.to);
    respond(Artifact::new(name, output.bytes, PDF_MIME_TYPE), format, &archive_name)
}

/// Text extraction endpoint handler.
///
/// POST /pdf-to-txt
pub async fn pdf_to_txt_handler(
    State(state): State<ApiState>,
    Query(query): Query<FormatQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let format = state
        .package_format(query.format.as_deref())
        .map_err(ApiError::validation)?;
    let files = receive_files(&mut multipart, &["file"], &state.limits).await?;
    let file = single_file(files, "Upload a PDF file")?;
    ensure_pdfs(std::slice::from_ref(&file))?;

    let stage = stage_files(&state, std::slice::from_ref(&file)).await?;
    let path = first_upload(&stage)?.staged_path.clone();

    let text = run_blocking(move || Ok(extract_text(&path)?))
        .await
        .map_err(|e| ApiError::operation_failed("Text extraction failed", e))?;

    respond(
        Artifact::new("output.txt", text.into_bytes(), PLAIN_TEXT_MIME_TYPE),
        format,
        "output.zip",
    )
}

/// PDF to DOCX endpoint handler.
///
/// POST /pdf-to-docx
///
/// Fails with 500 and every conversion attempt in `details` when no strategy succeeds.
pub async fn pdf_to_docx_handler(
    State(state): State<ApiState>,
    Query(query): Query<FormatQuery>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    convert_upload(state, query, multipart, ConversionKind::PdfToDocx).await
}

/// DOCX to PDF endpoint handler.
///
/// POST /docx-to-pdf
pub async fn docx_to_pdf_handler(
    State(state): State<ApiState>,
    Query(query): Query<FormatQuery>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    convert_upload(state, query, multipart, ConversionKind::DocxToPdf).await
}

async fn convert_upload(
    state: ApiState,
    query: FormatQuery,
    mut multipart: Multipart,
    kind: ConversionKind,
) -> Result<Response, ApiError> {
    let format = state
        .package_format(query.format.as_deref())
        .map_err(ApiError::validation)?;
    let input_label = kind.input_ext().to_ascii_uppercase();

    let files = receive_files(&mut multipart, &["file"], &state.limits).await?;
    let file = single_file(files, &format!("Upload a {} file", input_label))?;

    let accepted = match kind {
        ConversionKind::PdfToDocx => is_pdf_upload(&file.file_name, file.content_type.as_deref(), &file.bytes),
        ConversionKind::DocxToPdf => is_docx_upload(&file.file_name, file.content_type.as_deref(), &file.bytes),
    };
    if !accepted {
        return Err(ApiError::bad_request(format!("Only {} files are allowed", input_label)));
    }

    let stage = stage_files(&state, std::slice::from_ref(&file)).await?;
    let upload = first_upload(&stage)?;

    let out_root = state.config.temp_dir.as_path();
    let converted = match kind {
        ConversionKind::PdfToDocx => state.converter.pdf_to_docx(&upload.staged_path, out_root).await,
        ConversionKind::DocxToPdf => state.converter.docx_to_pdf(&upload.staged_path, out_root).await,
    }
    .map_err(|e| ApiError::operation_failed(format!("{} failed", kind), e))?;

    let bytes = converted.read().await.map_err(ApiError::internal)?;
    let base = safe_base_name(&upload.original_name);
    let name = format!("{}.{}", base, kind.output_ext());

    respond(
        Artifact::new(name, bytes, converted.content_type()),
        format,
        &format!("{}.zip", base),
    )
}

/// OCR endpoint handler.
///
/// POST /ocr
///
/// Multipart fields `files` or `file`: one or more images. Always answers with
/// `ocr-results.zip` holding one `.txt` per image. The first recognition failure aborts the batch.
pub async fn ocr_handler(State(state): State<ApiState>, mut multipart: Multipart) -> Result<Response, ApiError> {
    let files = receive_files(&mut multipart, &["files", "file"], &state.limits).await?;

    if files.is_empty() {
        return Err(ApiError::bad_request("Upload at least one image"));
    }
    if files.len() > state.limits.max_files {
        return Err(ApiError::bad_request(format!(
            "Upload at most {} images",
            state.limits.max_files
        )));
    }
    if !files
        .iter()
        .all(|f| is_image_upload(f.content_type.as_deref(), &f.bytes))
    {
        return Err(ApiError::bad_request("Only image files are allowed"));
    }

    let stage = stage_files(&state, &files).await?;
    let outputs = state
        .ocr
        .recognize_batch(stage.uploads())
        .await
        .map_err(|e| ApiError::operation_failed("OCR failed", e))?;

    let artifacts = outputs
        .into_iter()
        .map(|output| Artifact::new(output.name, output.text.into_bytes(), PLAIN_TEXT_MIME_TYPE))
        .collect();
    let packaged = package(artifacts, PackageFormat::Zip, "ocr-results.zip").map_err(ApiError::internal)?;

    Ok(artifact_response(packaged))
}

/// Root banner.
///
/// GET /
pub async fn root_handler() -> &'static str {
    "PDF Tools API"
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Server info endpoint handler.
///
/// GET /info
pub async fn info_handler(State(state): State<ApiState>) -> Json<InfoResponse> {
    let (office_available, ocr_available) = tokio::join!(state.converter.office_available(), state.ocr.is_available());

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        office_available,
        office_binary: state.converter.runner().binary().display().to_string(),
        ocr_available,
        ocr_binary: state.ocr.binary().display().to_string(),
        max_file_bytes: state.limits.max_file_bytes,
        max_files: state.limits.max_files,
        default_format: state.config.output.default_format,
    })
}
