use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::api::{CreateVideoRequest, StatusResponse};
use tracing::instrument;

use crate::catalog::CatalogService;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::video::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Videos",
    operation_id = "createVideo",
    summary = "Register an uploaded video",
    description = "Creates the catalog record for an asset already stored by the provider. \
        The record starts in `processing`. `title`, `description` and `publicId` are required; \
        the title is limited to 100 characters.",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Video registered", body = VideoResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "publicId already registered (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(public_id = ?payload.public_id))]
pub async fn create_video(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_video = NewVideo::try_from(payload)?;

    let model = CatalogService::new(&state.db).create(new_video).await?;
    tracing::info!(public_id = %model.public_id, "Registered video");

    Ok((StatusCode::CREATED, Json(VideoResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Videos",
    operation_id = "listVideos",
    summary = "List all videos",
    description = "Returns every catalog record, newest first.",
    responses(
        (status = 200, description = "All videos", body = Vec<VideoResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let videos = CatalogService::new(&state.db).list().await?;
    Ok(Json(videos.into_iter().map(VideoResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/{public_id}",
    tag = "Videos",
    operation_id = "getVideo",
    summary = "Get a video with up-next suggestions",
    description = "Returns the record for `publicId` together with the five most recent other \
        videos.",
    params(("public_id" = String, Path, description = "Provider public ID")),
    responses(
        (status = 200, description = "Video details", body = WatchResponse),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_video(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<WatchResponse>, AppError> {
    let catalog = CatalogService::new(&state.db);
    let video = catalog
        .find(&public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;

    let up_next = catalog.recent_except(video.id, UP_NEXT_LIMIT).await?;

    Ok(Json(WatchResponse {
        video: video.into(),
        up_next: up_next.into_iter().map(VideoSummary::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/{public_id}/status",
    tag = "Videos",
    operation_id = "getVideoStatus",
    summary = "Poll a video's lifecycle status",
    description = "Returns only the status of the record, for cheap high-frequency polling.",
    params(("public_id" = String, Path, description = "Provider public ID")),
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_video_status(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let status = CatalogService::new(&state.db)
        .status(&public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;

    Ok(Json(StatusResponse { status }))
}
