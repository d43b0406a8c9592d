//! API server setup and configuration.

use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{DocshiftError, Result, ServiceConfig};

use super::{
    handlers::{
        docx_to_pdf_handler, health_handler, info_handler, merge_handler, ocr_handler, pdf_to_docx_handler,
        pdf_to_txt_handler, root_handler, split_handler,
    },
    types::{ApiSizeLimits, ApiState},
};

/// Environment variable holding a comma-separated list of allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "DOCSHIFT_CORS_ORIGINS";

fn cors_layer_from(origins: Option<String>) -> CorsLayer {
    // The default allows all origins for development convenience
    let Some(origins_str) = origins else {
        tracing::warn!(
            "CORS configured to allow all origins (default). For production, set {} to a \
             comma-separated list of allowed origins (e.g., 'https://app.example.com')",
            CORS_ORIGINS_ENV
        );
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    };

    let origins: Vec<_> = origins_str
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "{} set but empty/invalid - falling back to permissive CORS",
            CORS_ORIGINS_ENV
        );
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    tracing::info!("CORS configured with {} explicit allowed origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the operation router with limits taken from `config.limits`.
///
/// Routes are relative (`/merge`, `/split`, ...); [`create_app`] mounts them under
/// `server.base_path`. Public so the router can be embedded elsewhere.
///
/// # Examples
///
/// ```no_run
/// use docshift::{ServiceConfig, api::create_router};
///
/// let router = create_router(ServiceConfig::default());
/// let app = axum::Router::new().nest("/pdf", router);
/// ```
pub fn create_router(config: ServiceConfig) -> Router {
    let limits = ApiSizeLimits::from_limits(&config.limits);
    create_router_with_limits(config, limits)
}

/// Create the operation router with explicit size limits.
pub fn create_router_with_limits(config: ServiceConfig, limits: ApiSizeLimits) -> Router {
    let state = ApiState::new(config, limits);
    let cors_layer = cors_layer_from(std::env::var(CORS_ORIGINS_ENV).ok());

    Router::new()
        .route("/merge", post(merge_handler))
        .route("/split", post(split_handler))
        .route("/pdf-to-txt", post(pdf_to_txt_handler))
        .route("/pdf-to-docx", post(pdf_to_docx_handler))
        .route("/docx-to-pdf", post(docx_to_pdf_handler))
        .route("/ocr", post(ocr_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .layer(DefaultBodyLimit::max(limits.max_request_body_bytes))
        .layer(RequestBodyLimitLayer::new(limits.max_request_body_bytes))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Normalised mount point: leading slash, no trailing slash, `None` for the root.
fn mount_path(base_path: &str) -> Option<String> {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Full application: the `/` banner and `/health` at the root, operations under
/// `server.base_path`.
pub fn create_app(config: ServiceConfig) -> Router {
    let mount = mount_path(&config.server.base_path);
    let api = create_router(config);

    match mount {
        Some(path) => Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .nest(&path, api),
        None => api.route("/", get(root_handler)),
    }
}

/// Start the API server with config discovery and environment overrides.
///
/// Searches for `docshift.toml` in the current and parent directories; defaults otherwise.
/// `host` and `port` win over the configured listener.
///
/// # Environment Variables
///
/// ```bash
/// export DOCSHIFT_TMP_DIR=/var/tmp/pdf-tools
/// export DOCSHIFT_SOFFICE_PATH=/opt/libreoffice/program/soffice
/// export DOCSHIFT_MAX_UPLOAD_SIZE_MB=50
/// export DOCSHIFT_CORS_ORIGINS="https://app.example.com"
/// ```
pub async fn serve(host: impl AsRef<str>, port: u16) -> Result<()> {
    let config = ServiceConfig::load(None)?;
    serve_with_config(host, port, config).await
}

/// Start the API server with explicit config.
///
/// # Examples
///
/// ```no_run
/// use docshift::{ServiceConfig, api::serve_with_config};
///
/// #[tokio::main]
/// async fn main() -> docshift::Result<()> {
///     let config = ServiceConfig::from_toml_file("docshift.toml")?;
///     serve_with_config("0.0.0.0", 3333, config).await
/// }
/// ```
pub async fn serve_with_config(host: impl AsRef<str>, port: u16, config: ServiceConfig) -> Result<()> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| DocshiftError::validation(format!("Invalid host address: {}", e)))?;

    let addr = SocketAddr::new(ip, port);
    tracing::info!(
        temp_dir = %config.temp_dir.display(),
        base_path = %config.server.base_path,
        max_file_bytes = config.limits.max_file_bytes,
        "Upload limit: {} MB per file",
        config.limits.max_file_bytes / (1024 * 1024)
    );
    let app = create_app(config);

    tracing::info!("Starting docshift API server on http://{}:{}", ip, port);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(DocshiftError::Io)?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DocshiftError::Other(e.to_string()))?;

    Ok(())
}

/// Start the API server on the configured host and port.
pub async fn serve_default() -> Result<()> {
    let config = ServiceConfig::load(None)?;
    let host = config.server.host.clone();
    let port = config.server.port;
    serve_with_config(host, port, config).await
}
