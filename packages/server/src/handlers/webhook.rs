use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use common::api::{NotificationAck, ProviderNotification};
use common::signing::verify_notification;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogService, MarkReadyResult};
use crate::config::ProviderConfig;
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

pub const TIMESTAMP_HEADER: &str = "x-cld-timestamp";
pub const SIGNATURE_HEADER: &str = "x-cld-signature";

/// Check the provider signature headers against the raw body.
fn verify_signature(
    config: &ProviderConfig,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::InvalidSignature(format!("missing {name} header")))
    };

    let timestamp: i64 = header(TIMESTAMP_HEADER)?
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidSignature("malformed timestamp".into()))?;
    let signature = header(SIGNATURE_HEADER)?;

    let age = Utc::now().timestamp() - timestamp;
    if age.unsigned_abs() > config.notification_max_age_secs {
        return Err(AppError::InvalidSignature(format!(
            "timestamp outside the accepted window ({age}s)"
        )));
    }

    let secret = config.secret().map_err(AppError::Configuration)?;
    if !verify_notification(body, timestamp, signature, secret, config.signature_algorithm) {
        return Err(AppError::InvalidSignature("signature mismatch".into()));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/transcode",
    tag = "Webhooks",
    operation_id = "handleTranscodeNotification",
    summary = "Receive a provider notification",
    description = "Marks the matching record `ready` when an `eager` notification arrives. \
        Any other notification, or one for an unknown publicId, is acknowledged without \
        changes. Redelivery is harmless. When signature verification is enabled the \
        `X-Cld-Timestamp` and `X-Cld-Signature` headers are required.",
    request_body = ProviderNotification,
    responses(
        (status = 200, description = "Notification received", body = NotificationAck),
        (status = 401, description = "Bad signature (INVALID_SIGNATURE)", body = ErrorBody),
        (status = 500, description = "Catalog unavailable; the provider should retry", body = ErrorBody),
    ),
)]
#[instrument(skip_all)]
pub async fn handle_transcode_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<NotificationAck>, AppError> {
    let provider = &state.config.provider;
    if provider.verify_notifications {
        verify_signature(provider, &headers, &body)?;
    }

    let ack = Json(NotificationAck { received: true });

    let notification: ProviderNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Ignoring unparseable notification");
            return Ok(ack);
        }
    };

    let Some(public_id) = notification.completed_public_id() else {
        debug!(
            notification_type = ?notification.notification_type,
            "Ignoring notification"
        );
        return Ok(ack);
    };

    match CatalogService::new(&state.db).mark_ready(public_id).await? {
        MarkReadyResult::MarkedReady => info!(public_id, "Video ready"),
        MarkReadyResult::Unchanged => debug!(public_id, "Video already settled"),
        MarkReadyResult::NotFound => warn!(public_id, "Notification for unknown video"),
    }

    Ok(ack)
}
