use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::VideoStatus;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use tracing::{error, info, warn};

use crate::config::{ProviderConfig, ReconcileConfig};
use crate::entity::video;
use crate::provider::TranscodeProvider;

/// Run the stuck transcode sweep as a background task.
///
/// Records that stay in `processing` long after their last transcode request
/// get the request re-sent, up to `max_attempts` per record. The sweep never
/// marks anything failed.
pub async fn run_transcode_reconciler(
    db: DatabaseConnection,
    provider: Arc<dyn TranscodeProvider>,
    provider_config: ProviderConfig,
    config: ReconcileConfig,
) {
    let scan_interval = Duration::from_secs(config.scan_interval_secs);

    info!(
        stuck_after_secs = config.stuck_after_secs,
        scan_interval_secs = config.scan_interval_secs,
        max_attempts = config.max_attempts,
        "Starting transcode reconciler"
    );

    let mut interval = tokio::time::interval(scan_interval);

    loop {
        interval.tick().await;

        if let Err(e) = retrigger_stuck_transcodes(&db, &*provider, &provider_config, &config).await
        {
            error!(error = %e, "Transcode reconciliation failed");
        }
    }
}

/// One sweep. Returns how many records had their transcode re-requested.
pub async fn retrigger_stuck_transcodes(
    db: &DatabaseConnection,
    provider: &dyn TranscodeProvider,
    provider_config: &ProviderConfig,
    config: &ReconcileConfig,
) -> anyhow::Result<usize> {
    let threshold = Utc::now() - chrono::Duration::seconds(config.stuck_after_secs as i64);

    let stuck_public_ids: Vec<String> = video::Entity::find()
        .select_only()
        .column(video::Column::PublicId)
        .filter(video::Column::Status.eq(VideoStatus::Processing))
        .filter(video::Column::TriggerAttempts.lt(config.max_attempts))
        .filter(
            Condition::any()
                .add(video::Column::LastTriggeredAt.lt(threshold))
                .add(
                    Condition::all()
                        .add(video::Column::LastTriggeredAt.is_null())
                        .add(video::Column::CreatedAt.lt(threshold)),
                ),
        )
        .into_tuple()
        .all(db)
        .await?;

    if stuck_public_ids.is_empty() {
        return Ok(0);
    }

    info!(
        count = stuck_public_ids.len(),
        "Found stuck transcodes, re-requesting"
    );

    let mut retriggered = 0;
    for public_id in stuck_public_ids {
        match super::start_transcode(db, provider, provider_config, &public_id).await {
            Ok(_) => {
                retriggered += 1;
                info!(public_id = %public_id, "Re-requested transcode");
            }
            Err(e) => warn!(public_id = %public_id, error = %e, "Failed to re-request transcode"),
        }
    }

    Ok(retriggered)
}
