//! HTTP API the wizard front end talks to.

use crate::deck::{build_presentation, pptx::PPTX_MIME};
use crate::error::PipelineError;
use crate::llm::LlmClient;
use crate::model::{Character, FilmData, SlideContent, Theme};
use crate::pipeline::{Document, Pipeline};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    llm: Arc<dyn LlmClient>,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self.llm.as_ref())
    }
}

pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/default-theme", get(default_theme))
        .route("/api/analyze-document", post(analyze_document))
        .route("/api/refine-characters", post(refine_characters))
        .route("/api/generate-slides", post(generate_slides))
        .route("/api/render-deck", post(render_deck))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn serve(
    state: AppState,
    bind_address: &str,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state, max_upload_bytes)).await?;
    Ok(())
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

/// A failed request: a short message for the UI plus the underlying cause.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    details: String,
}

impl ApiError {
    fn new(message: &'static str, err: PipelineError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::with_status(status, message, err)
    }

    fn with_status(status: StatusCode, message: &'static str, err: PipelineError) -> Self {
        let message = match err {
            PipelineError::UploadMissing => "No file uploaded",
            PipelineError::Upload(_) => "Failed to read upload",
            _ => message,
        };
        error!("{}: {}", message, err);
        Self {
            status,
            message,
            details: err.to_string(),
        }
    }

    /// Keeps the multipart status, e.g. 413 when the body limit is hit.
    fn upload(err: MultipartError) -> Self {
        Self::with_status(
            err.status(),
            ANALYZE_FAILED,
            PipelineError::Upload(err.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message.to_string(),
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

async fn default_theme() -> Json<Theme> {
    Json(Theme::default())
}

const ANALYZE_FAILED: &str = "Failed to analyze document";

async fn read_upload(mut multipart: Multipart) -> Result<Document, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(ApiError::upload)? {
        if field.name() != Some("file") {
            continue;
        }
        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(ApiError::upload)?;
        return Ok(Document {
            bytes: bytes.to_vec(),
            media_type,
            file_name,
        });
    }
    Err(ApiError::new(ANALYZE_FAILED, PipelineError::UploadMissing))
}

pub async fn analyze_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FilmData>, ApiError> {
    let document = read_upload(multipart).await?;
    info!(
        "Analyzing {} ({}, {} bytes)",
        document.file_name.as_deref().unwrap_or("upload"),
        document.media_type,
        document.bytes.len()
    );

    let film = state
        .pipeline()
        .extract_film_data(&document)
        .await
        .map_err(|e| ApiError::new(ANALYZE_FAILED, e))?;
    Ok(Json(film))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub extracted_data: FilmData,
    pub user_edits: Vec<Character>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RefineResponse {
    pub characters: Vec<Character>,
}

pub async fn refine_characters(
    State(state): State<AppState>,
    Json(req): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, ApiError> {
    let characters = state
        .pipeline()
        .refine_characters(&req.extracted_data, &req.user_edits)
        .await
        .map_err(|e| ApiError::new("Failed to refine characters", e))?;
    Ok(Json(RefineResponse { characters }))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub film_data: FilmData,
    pub theme: Theme,
}

pub async fn generate_slides(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<SlideContent>, ApiError> {
    let content = state
        .pipeline()
        .generate_slide_content(&req.film_data, &req.theme)
        .await
        .map_err(|e| ApiError::new("Failed to generate slides", e))?;
    Ok(Json(content))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub film_data: FilmData,
    #[serde(default)]
    pub theme: Theme,
    pub slide_content: SlideContent,
}

pub async fn render_deck(Json(req): Json<RenderRequest>) -> Result<Response, ApiError> {
    let presentation = build_presentation(&req.film_data, &req.theme, &req.slide_content)
        .map_err(|e| ApiError::new("Failed to render deck", e))?;
    info!(
        "Rendered {} ({} bytes)",
        presentation.file_name,
        presentation.bytes.len()
    );

    let disposition = format!("attachment; filename=\"{}\"", presentation.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, PPTX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        presentation.bytes,
    )
        .into_response())
}
