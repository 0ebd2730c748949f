//! Bulk page operations: merge, split, rotate and delete pages

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::PdfDocument;
use crate::error::Result;
use crate::state::AppState;

use super::read_files;

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub id: String,
    pub page_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub page_ranges: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SplitResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RotateRequest {
    pub page_numbers: Vec<usize>,
    pub angle: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeletePagesRequest {
    pub page_numbers: Vec<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/merge", post(merge))
        .route("/:id/split", post(split))
        .route("/:id/rotate", post(rotate))
        .route("/:id/pages", delete(delete_pages))
}

async fn merge(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MergeResponse>)> {
    let files = read_files(multipart, &[]).await?;
    tracing::debug!("Merging {} uploaded files", files.len());

    let merged = state.service().merge(files).await?;
    Ok((
        StatusCode::CREATED,
        Json(MergeResponse {
            id: merged.id,
            page_count: merged.page_count,
        }),
    ))
}

async fn split(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SplitRequest>,
) -> Result<(StatusCode, Json<SplitResponse>)> {
    let parts = state.service().split(&id, &request.page_ranges).await?;
    Ok((
        StatusCode::CREATED,
        Json(SplitResponse {
            ids: parts.into_iter().map(|d| d.id).collect(),
        }),
    ))
}

async fn rotate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RotateRequest>,
) -> Result<Json<PdfDocument>> {
    let document = state
        .service()
        .rotate(&id, &request.page_numbers, request.angle)
        .await?;
    Ok(Json(document))
}

async fn delete_pages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeletePagesRequest>,
) -> Result<Json<PdfDocument>> {
    let document = state
        .service()
        .delete_pages(&id, &request.page_numbers)
        .await?;
    Ok(Json(document))
}
