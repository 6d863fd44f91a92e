//! marksight REST API server
//!
//! Upload boundary for the extraction core: accepts a marksheet file
//! (png/jpg/jpeg/pdf) via multipart form, stores it under the upload
//! directory, runs the blocking pipeline on a worker thread, and
//! renders the result as JSON (`/api/extract`) or a human-facing page
//! (`/upload`). The raw OCR corpus is shown on the page rendering only
//! and never included in the JSON response.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use core_pipeline::{DocumentKind, Extraction, ExtractionResult, PipelineConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Parser)]
#[command(name = "marksight-server")]
#[command(about = "Marksheet extraction REST API")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: String,

    /// Directory for uploaded files
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,
}

struct AppState {
    config: PipelineConfig,
    upload_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    std::fs::create_dir_all(&args.upload_dir)?;

    let state = Arc::new(AppState {
        config: PipelineConfig::from_env(),
        upload_dir: args.upload_dir,
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/upload", post(upload_page))
        .route("/api/extract", post(api_extract))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Server listening on {}", args.listen);
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn index() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html><head><title>marksight</title></head><body>
<h1>Marksheet extraction</h1>
<form action="/upload" method="post" enctype="multipart/form-data">
  <input type="file" name="marksheet" accept=".png,.jpg,.jpeg,.pdf">
  <button type="submit">Extract</button>
</form>
</body></html>"#,
    )
}

enum ApiError {
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(flatten)]
    result: ExtractionResult,
}

async fn api_extract(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse>, ApiError> {
    let extraction = process_upload(&state, multipart).await?;
    Ok(Json(ApiResponse {
        success: true,
        result: extraction.result,
    }))
}

async fn upload_page(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Html<String>, ApiError> {
    let extraction = process_upload(&state, multipart).await?;
    Ok(Html(render_result_page(&extraction)))
}

/// Receive the multipart upload, persist it, and run the pipeline on a
/// blocking worker thread.
async fn process_upload(
    state: &Arc<AppState>,
    mut multipart: Multipart,
) -> Result<Extraction, ApiError> {
    let mut stored: Option<(PathBuf, DocumentKind)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("marksheet") {
            continue;
        }
        let filename = field
            .file_name()
            .map(sanitize_filename)
            .ok_or_else(|| ApiError::BadRequest("no selected file".to_string()))?;

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();
        let kind = DocumentKind::from_extension(&extension)
            .ok_or_else(|| ApiError::BadRequest("file type not allowed".to_string()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        // uuid prefix keeps concurrent uploads from clobbering each other.
        let path = state
            .upload_dir
            .join(format!("{}_{filename}", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to store upload: {e}")))?;
        stored = Some((path, kind));
        break;
    }

    let (path, kind) = stored.ok_or_else(|| ApiError::BadRequest("no file part".to_string()))?;

    let config = state.config.clone();
    tokio::task::spawn_blocking(move || {
        core_pipeline::pipeline::extract_from_document(&path, kind, &config)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("extraction task panicked: {e}")))?
    .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Keep only filename characters that are safe to write to disk.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn render_result_page(extraction: &Extraction) -> String {
    let fields = match &extraction.result {
        ExtractionResult::College { spi, cpi } => format!(
            "<tr><th>Type</th><td>college</td></tr>\
             <tr><th>SPI</th><td>{}</td></tr>\
             <tr><th>CPI</th><td>{}</td></tr>",
            format_field(*spi),
            format_field(*cpi)
        ),
        ExtractionResult::School {
            percentage_10th,
            percentage_12th,
        } => format!(
            "<tr><th>Type</th><td>school</td></tr>\
             <tr><th>10th percentage</th><td>{}</td></tr>\
             <tr><th>12th percentage</th><td>{}</td></tr>",
            format_field(*percentage_10th),
            format_field(*percentage_12th)
        ),
    };
    format!(
        "<!doctype html>\n<html><head><title>marksight result</title></head><body>\n\
         <h1>Extraction result</h1>\n<table>{fields}</table>\n\
         <h2>Recognized text</h2>\n<pre>{}</pre>\n\
         <p><a href=\"/\">Upload another</a></p>\n</body></html>",
        escape_html(&extraction.raw_text)
    )
}

fn format_field(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "not found".to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_filename("sem 3 (final).pdf"), "sem3final.pdf");
    }

    #[test]
    fn test_sanitize_filename_empty_falls_back() {
        assert_eq!(sanitize_filename("///"), "upload");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[test]
    fn test_api_response_shape() {
        let response = ApiResponse {
            success: true,
            result: ExtractionResult::College {
                spi: Some(7.85),
                cpi: None,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["marksheet_type"], "college");
        assert_eq!(json["spi"], 7.85);
        assert!(json["cpi"].is_null());
        // The raw corpus never leaks into the API response.
        assert!(json.get("raw_text").is_none());
    }

    #[test]
    fn test_format_field_two_decimals() {
        assert_eq!(format_field(Some(89.5)), "89.50");
        assert_eq!(format_field(None), "not found");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&"), "&lt;b&gt;&amp;");
    }
}
