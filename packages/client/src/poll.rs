//! Cancellable status polling.

use std::time::Duration;

use common::VideoStatus;
use common::retry::calculate_backoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::UploadBackend;

/// How often and how long to probe a processing video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between probes while the video is processing.
    pub interval: Duration,
    /// Give up after this many probes. `None` polls until settled or cancelled.
    pub max_attempts: Option<u32>,
    /// Cap for the backoff applied after consecutive probe errors.
    pub error_backoff_max: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
            error_backoff_max: Duration::from_secs(5),
        }
    }
}

/// How a polling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    Failed,
    /// `max_attempts` probes went by without a terminal status.
    Exhausted { attempts: u32 },
    Cancelled,
}

/// Probe `public_id` until it settles, the attempt budget runs out, or `cancel` fires.
///
/// The first probe happens one interval after the call. Probe errors are
/// logged and retried; they never end the run on their own. Nothing is sent
/// after `cancel` fires, and an in-flight probe is abandoned.
pub async fn poll_until_settled(
    backend: &dyn UploadBackend,
    public_id: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> PollOutcome {
    let mut attempts = 0u32;
    let mut consecutive_errors = 0u32;
    let mut delay = policy.interval;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }

        let probe = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            probe = backend.probe_status(public_id) => probe,
        };
        attempts += 1;

        match probe {
            Ok(VideoStatus::Ready) => return PollOutcome::Ready,
            Ok(VideoStatus::Failed) => return PollOutcome::Failed,
            Ok(VideoStatus::Processing) => {
                debug!(public_id, attempts, "Still processing");
                consecutive_errors = 0;
                delay = policy.interval;
            }
            Err(e) => {
                consecutive_errors += 1;
                delay = calculate_backoff(
                    consecutive_errors,
                    policy.interval,
                    policy.error_backoff_max,
                );
                warn!(public_id, error = %e, retry_in = ?delay, "Status probe failed");
            }
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return PollOutcome::Exhausted { attempts };
        }
    }
}
