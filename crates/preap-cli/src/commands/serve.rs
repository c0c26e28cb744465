//! Serve command - HTTP API for uploading and processing invoices.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Args;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use preap_analyzer::DocumentAnalyzer;
use preap_core::models::config::ServerConfig;
use preap_core::pdf::has_pdf_header;
use preap_core::{PreapEnvelope, Provenance, Stamper, SystemStamper};

use super::config::load_config;
use crate::pipeline::{Analyzer, InvoiceProcessor};

const SERVICE_NAME: &str = "Invoice Processing API";
const MIB: usize = 1024 * 1024;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (default from config)
    #[arg(long)]
    addr: Option<String>,

    /// Directory for uploaded files (default from config)
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Use a recorded analysis result instead of the live service
    #[arg(long, value_name = "ANALYSIS_JSON")]
    replay: Option<PathBuf>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.server.upload_dir = upload_dir;
    }

    let analyzer = Analyzer::from_config(&config, args.replay.as_deref())?;
    tokio::fs::create_dir_all(&config.server.upload_dir).await?;

    let state = AppState::new(InvoiceProcessor::new(analyzer), &config.server);
    let app = router(state).layer(cors_layer(&config.server.allowed_origins)?);

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    info!("-- Starting {} on {}", SERVICE_NAME, config.server.addr);
    eprintln!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared state for request handlers.
pub struct AppState<A, S = SystemStamper> {
    processor: InvoiceProcessor<A, S>,
    upload_dir: PathBuf,
    max_upload_bytes: usize,
}

impl<A, S> AppState<A, S> {
    pub fn new(processor: InvoiceProcessor<A, S>, server: &ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            processor,
            upload_dir: server.upload_dir.clone(),
            max_upload_bytes: server.max_upload_bytes,
        })
    }
}

/// Build the API routes.
pub fn router<A, S>(state: Arc<AppState<A, S>>) -> Router
where
    A: DocumentAnalyzer + 'static,
    S: Stamper + 'static,
{
    // Leave headroom above the upload limit so oversized files reach the
    // handler and get a readable error.
    let body_limit = state.max_upload_bytes.saturating_add(MIB);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/upload-invoice", post(upload_invoice::<A, S>))
        .route("/pdf/{file_id}", get(get_pdf::<A, S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// CORS restricted to `origins`, with credentials.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Error body: `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    data: PreapEnvelope,
    message: &'static str,
    filename: String,
    file_id: Uuid,
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": format!("{SERVICE_NAME} is running") }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

struct Upload {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        return Ok(Upload {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }
    Err(ApiError::bad_request("No file uploaded"))
}

/// Declared as a PDF by content type or extension, or carrying the PDF header.
fn is_pdf(upload: &Upload) -> bool {
    upload.content_type.as_deref() == Some("application/pdf")
        || upload.filename.to_lowercase().ends_with(".pdf")
        || has_pdf_header(&upload.data)
}

fn size_limit_label(max: usize) -> String {
    if max >= MIB && max % MIB == 0 {
        format!("{}MB", max / MIB)
    } else {
        format!("{max} bytes")
    }
}

async fn upload_invoice<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    A: DocumentAnalyzer + 'static,
    S: Stamper + 'static,
{
    let upload = read_upload(&mut multipart).await?;

    if !is_pdf(&upload) {
        return Err(ApiError::bad_request("Only PDF files are allowed"));
    }
    if upload.data.len() > state.max_upload_bytes {
        return Err(ApiError::bad_request(format!(
            "File size exceeds {} limit",
            size_limit_label(state.max_upload_bytes)
        )));
    }

    // Only the final path component of the client's name is kept.
    let original_filename = Path::new(&upload.filename)
        .file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload.pdf")
        .to_string();
    let file_id = Uuid::new_v4();
    let saved_filename = format!("{file_id}_{original_filename}");
    let saved_path = state.upload_dir.join(&saved_filename);
    let file_size = upload.data.len();

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Server error: {e}")))?;
    tokio::fs::write(&saved_path, &upload.data)
        .await
        .map_err(|e| ApiError::internal(format!("Server error: {e}")))?;
    info!(file_id = %file_id, bytes = file_size, "saved upload {}", saved_filename);

    let mut provenance = Provenance::new();
    provenance.insert("file_path".into(), saved_path.display().to_string());
    provenance.insert("file_name".into(), original_filename.clone());
    provenance.insert("file_size".into(), file_size.to_string());
    provenance.insert("file_id".into(), file_id.to_string());
    provenance.insert("original_filename".into(), original_filename.clone());
    provenance.insert("saved_filename".into(), saved_filename);

    match state.processor.process_bytes(upload.data, provenance).await {
        Ok(envelope) => Ok(Json(UploadResponse {
            success: true,
            data: envelope,
            message: "Invoice processed successfully",
            filename: original_filename,
            file_id,
        })),
        Err(e) => {
            error!(file_id = %file_id, "processing failed: {e:#}");
            if let Err(cleanup) = tokio::fs::remove_file(&saved_path).await {
                warn!("Failed to remove {}: {}", saved_path.display(), cleanup);
            }
            Err(ApiError::internal(format!("{e:#}")))
        }
    }
}

async fn get_pdf<A, S>(
    State(state): State<Arc<AppState<A, S>>>,
    UrlPath(file_id): UrlPath<String>,
) -> Result<Response, ApiError>
where
    A: DocumentAnalyzer + 'static,
    S: Stamper + 'static,
{
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, "PDF file not found");

    let file_id = Uuid::parse_str(&file_id).map_err(|_| not_found())?;
    let prefix = format!("{file_id}_");

    let mut entries = match tokio::fs::read_dir(&state.upload_dir).await {
        Ok(entries) => entries,
        Err(_) => return Err(not_found()),
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ApiError::internal(format!("Error retrieving PDF: {e}")))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(original) = name.strip_prefix(&prefix) else {
            continue;
        };

        let data = tokio::fs::read(entry.path())
            .await
            .map_err(|e| ApiError::internal(format!("Error retrieving PDF: {e}")))?;
        let disposition = format!("attachment; filename=\"{}\"", original.replace('"', ""));
        return Ok((
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            data,
        )
            .into_response());
    }

    Err(not_found())
}
