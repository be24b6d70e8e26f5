//! Catalog store: record lifecycle transitions and the stuck-transcode sweep.

mod reconcile;
mod service;

pub use reconcile::{retrigger_stuck_transcodes, run_transcode_reconciler};
pub use service::{CatalogService, MarkReadyResult};

use sea_orm::ConnectionTrait;
use tracing::warn;

use crate::config::ProviderConfig;
use crate::provider::{EagerTranscode, ProviderError, TranscodeProvider};

/// Ask the provider to transcode `public_id` and note the attempt on its record.
///
/// The record is optional: a missing row does not fail the call, and failing
/// to write the bookkeeping is only logged since the job is already running.
pub async fn start_transcode<C: ConnectionTrait>(
    conn: &C,
    provider: &dyn TranscodeProvider,
    config: &ProviderConfig,
    public_id: &str,
) -> Result<serde_json::Value, ProviderError> {
    let job = EagerTranscode {
        public_id: public_id.to_string(),
        profile: config.eager_profile.clone(),
        notification_url: config.notification_url(),
    };

    let ack = provider.request_eager_transcode(&job).await?;

    if let Err(e) = CatalogService::new(conn).record_trigger(public_id).await {
        warn!(public_id, error = %e, "Failed to record transcode attempt");
    }

    Ok(ack)
}
