use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use chrono::Utc;
use common::api::UploadSignature;
use common::signing::sign_upload;
use tracing::{debug, instrument};

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

/// Upload credentials must never be served from a cache.
const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

#[utoipa::path(
    get,
    path = "/signature",
    tag = "Uploads",
    operation_id = "issueUploadSignature",
    summary = "Issue direct-upload credentials",
    description = "Returns a fresh timestamp and a signature over it, computed with the provider \
        secret, so the client can upload straight to the provider. Every call issues a new pair \
        and the response is marked non-cacheable. Fails with `CONFIGURATION_ERROR` when the \
        provider secret is not configured.",
    responses(
        (status = 200, description = "Fresh upload credentials", body = UploadSignature),
        (status = 500, description = "Provider secret missing (CONFIGURATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn issue_upload_signature(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let provider = &state.config.provider;
    let secret = provider.secret().map_err(AppError::Configuration)?;

    let timestamp = Utc::now().timestamp();
    let signature = sign_upload(timestamp, secret, provider.signature_algorithm);
    debug!(timestamp, "Issued upload signature");

    Ok((
        [(header::CACHE_CONTROL, NO_STORE), (header::PRAGMA, "no-cache")],
        Json(UploadSignature {
            timestamp,
            signature,
            api_key: provider.api_key.clone(),
            signature_algorithm: provider.signature_algorithm,
        }),
    ))
}
