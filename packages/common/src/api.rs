//! Wire types exchanged between the upload client, the catalog service and the
//! transcoding provider.

use serde::{Deserialize, Serialize};

use crate::{SignatureAlgorithm, VideoStatus};

/// `notification_type` the provider sends when an eager transform finishes.
pub const EAGER_NOTIFICATION: &str = "eager";

/// Short-lived credentials for a direct upload to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignature {
    /// Unix timestamp (seconds) covered by the signature.
    #[schema(example = 1700000000)]
    pub timestamp: i64,
    /// Hex digest over `timestamp=<timestamp>` and the account secret.
    pub signature: String,
    /// Public provider API key. `null` when the service is not configured with one.
    pub api_key: Option<String>,
    /// Digest used for `signature`; echoed back to the provider with the upload.
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,
}

/// Narrow status-only view of a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatusResponse {
    pub status: VideoStatus,
}

/// Body of `POST /videos`.
///
/// Every field is optional on the wire so that missing values surface as
/// validation errors rather than opaque deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    #[schema(example = "Ep1")]
    pub title: Option<String>,
    #[schema(example = "desc")]
    pub description: Option<String>,
    #[schema(example = "abc123")]
    pub public_id: Option<String>,
    /// Duration in seconds as reported by the provider.
    #[schema(example = 125.0)]
    pub duration: Option<f64>,
    pub thumbnail_url: Option<String>,
}

/// Body of `POST /videos/process`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeRequest {
    #[schema(example = "abc123")]
    pub public_id: Option<String>,
}

/// Acknowledgment that the provider accepted an asynchronous transcode job.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TranscodeResponse {
    pub success: bool,
    /// Provider response, passed through untouched.
    #[schema(value_type = Object)]
    pub result: serde_json::Value,
}

/// Callback pushed by the provider. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProviderNotification {
    #[schema(example = "eager")]
    pub notification_type: Option<String>,
    #[schema(example = "abc123")]
    pub public_id: Option<String>,
}

impl ProviderNotification {
    /// Returns the public ID if this notification reports a finished eager transform.
    pub fn completed_public_id(&self) -> Option<&str> {
        if self.notification_type.as_deref() != Some(EAGER_NOTIFICATION) {
            return None;
        }
        self.public_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Response to a provider notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NotificationAck {
    pub received: bool,
}

/// Successful response of the provider's direct upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUpload {
    pub public_id: String,
    pub duration: Option<f64>,
    pub secure_url: String,
}

impl ProviderUpload {
    /// Poster frame URL: the delivery URL with its extension swapped for `.jpg`.
    pub fn thumbnail_url(&self) -> String {
        thumbnail_url(&self.secure_url)
    }
}

/// Error body returned by the provider on a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderErrorBody {
    pub error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorDetail {
    pub message: String,
}

/// Replace the extension of the last path segment with `.jpg`.
///
/// A URL whose last segment has no extension gets `.jpg` appended.
pub fn thumbnail_url(secure_url: &str) -> String {
    let segment_start = secure_url.rfind('/').map_or(0, |i| i + 1);
    match secure_url[segment_start..].rfind('.') {
        Some(dot) => format!("{}.jpg", &secure_url[..segment_start + dot]),
        None => format!("{secure_url}.jpg"),
    }
}
