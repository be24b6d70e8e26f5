use axum::Json;
use axum::extract::State;
use common::api::{TranscodeRequest, TranscodeResponse};
use tracing::instrument;

use crate::catalog;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/process",
    tag = "Videos",
    operation_id = "triggerTranscode",
    summary = "Start adaptive-bitrate transcoding",
    description = "Asks the provider to produce the streaming renditions for `publicId` \
        asynchronously. The provider reports completion through `POST /webhooks/transcode`. \
        The record is not required to exist and its status is not changed here.",
    request_body = TranscodeRequest,
    responses(
        (status = 200, description = "Provider accepted the job", body = TranscodeResponse),
        (status = 400, description = "Missing publicId (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Provider secret missing (CONFIGURATION_ERROR)", body = ErrorBody),
        (status = 502, description = "Provider call failed (PROVIDER_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(public_id = ?payload.public_id))]
pub async fn trigger_transcode(
    State(state): State<AppState>,
    AppJson(payload): AppJson<TranscodeRequest>,
) -> Result<Json<TranscodeResponse>, AppError> {
    let public_id = payload
        .public_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing publicId".into()))?;

    let result = catalog::start_transcode(
        &state.db,
        state.provider.as_ref(),
        &state.config.provider,
        public_id,
    )
    .await?;
    tracing::info!(public_id, "Transcode requested");

    Ok(Json(TranscodeResponse {
        success: true,
        result,
    }))
}
