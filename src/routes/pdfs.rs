//! PDF document endpoints
//!
//! - Upload and download PDFs
//! - Get document metadata and overlay history
//! - Render pages and extract text maps
//! - Edit blocks and words in place

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::db::{OverlayRecord, PdfDocument};
use crate::engine::TextMap;
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::read_files;

/// Body of a block or word edit
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub new_text: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_pdf))
        .route("/:id", get(get_pdf))
        .route("/:id/download", get(download_pdf))
        .route("/:id/overlays", get(list_overlays))
        .route("/:id/pages/:page/image", get(page_image))
        .route("/:id/pages/:page/text-map", get(text_map))
        .route("/:id/pages/:page/blocks/:block_id", put(edit_block))
        .route("/:id/pages/:page/words/:word_id", put(edit_word))
}

/// Upload a new PDF
async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PdfDocument>)> {
    let file = read_files(multipart, &["file"])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            tracing::warn!("No file field found in multipart upload");
            AppError::BadRequest("No file provided. Use field name 'file'".to_string())
        })?;

    let document = state.service().upload(file).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn get_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PdfDocument>> {
    Ok(Json(state.service().get(&id).await?))
}

/// Stream the current bytes under the original filename
async fn download_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let (document, bytes) = state.service().download(&id).await?;
    let filename = document.original_filename.replace('"', "");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn list_overlays(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OverlayRecord>>> {
    Ok(Json(state.service().overlays(&id).await?))
}

async fn page_image(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, usize)>,
) -> Result<impl IntoResponse> {
    let png = state.service().page_image(&id, page).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

async fn text_map(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, usize)>,
) -> Result<Json<TextMap>> {
    Ok(Json(state.service().text_map(&id, page).await?))
}

async fn edit_block(
    State(state): State<AppState>,
    Path((id, page, block_id)): Path<(String, usize, String)>,
    Json(request): Json<EditRequest>,
) -> Result<Json<TextMap>> {
    let map = state
        .service()
        .edit_block(&id, page, &block_id, &request.new_text)
        .await?;
    Ok(Json(map))
}

async fn edit_word(
    State(state): State<AppState>,
    Path((id, page, word_id)): Path<(String, usize, String)>,
    Json(request): Json<EditRequest>,
) -> Result<Json<TextMap>> {
    let map = state
        .service()
        .edit_word(&id, page, &word_id, &request.new_text)
        .await?;
    Ok(Json(map))
}
