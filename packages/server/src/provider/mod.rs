//! Client side of the remote transcoding provider.

mod http;

pub use http::HttpTranscodeProvider;

use async_trait::async_trait;
use thiserror::Error;

/// An eager transformation to run asynchronously on an already uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EagerTranscode {
    pub public_id: String,
    /// Transformation string, e.g. `sp_full_hd/f_m3u8`.
    pub profile: String,
    /// Where the provider reports completion.
    pub notification_url: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    MissingSecret(String),

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// The remote operations the catalog service relies on.
#[async_trait]
pub trait TranscodeProvider: Send + Sync {
    /// Ask the provider to start the eager transcode. Returns the provider's
    /// acknowledgment; completion arrives later through the notification webhook.
    async fn request_eager_transcode(
        &self,
        job: &EagerTranscode,
    ) -> Result<serde_json::Value, ProviderError>;
}
