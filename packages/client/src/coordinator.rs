//! Upload lifecycle state machine.
//!
//! `Idle -> Uploading -> Processing -> Ready`. Any failure before the catalog
//! record exists returns to `Idle` with a notice. Once `Processing`, a polling
//! task watches the status probe; it is owned by the coordinator and cancelled
//! when the coordinator is reset or dropped.

use std::fmt;
use std::sync::{Arc, Mutex};

use common::api::CreateVideoRequest;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, instrument, warn};

use crate::api::{UploadBackend, VideoFile};
use crate::error::ClientError;
use crate::poll::{PollOutcome, PollPolicy, poll_until_settled};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadStage {
    #[default]
    Idle,
    Uploading,
    Processing,
    Ready,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Ready => "ready",
        })
    }
}

/// User input captured by the upload form.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub file: Option<VideoFile>,
}

/// Observable coordinator state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub stage: UploadStage,
    /// Provider ID of the video being tracked, from `Processing` on.
    pub public_id: Option<String>,
    /// Message for the user: the last error, or why polling stopped.
    pub notice: Option<String>,
}

struct ValidForm {
    title: String,
    description: String,
    file: VideoFile,
}

fn validate(form: UploadForm) -> Result<ValidForm, ClientError> {
    let file = form.file.ok_or(ClientError::MissingField("file"))?;
    let title = form.title.trim();
    if title.is_empty() {
        return Err(ClientError::MissingField("title"));
    }
    let description = form.description.trim();
    if description.is_empty() {
        return Err(ClientError::MissingField("description"));
    }
    Ok(ValidForm {
        title: title.to_string(),
        description: description.to_string(),
        file,
    })
}

/// Returns the coordinator to `Idle` if `submit` is dropped mid-upload.
struct UploadingGuard<'a> {
    state: &'a watch::Sender<Snapshot>,
    armed: bool,
}

impl UploadingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UploadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.state.send_if_modified(|s| {
            if s.stage != UploadStage::Uploading {
                return false;
            }
            warn!("Upload abandoned before completion");
            *s = Snapshot {
                notice: Some("Upload cancelled".into()),
                ..Snapshot::default()
            };
            true
        });
    }
}

pub struct UploadCoordinator<B> {
    backend: Arc<B>,
    policy: PollPolicy,
    state: Arc<watch::Sender<Snapshot>>,
    /// Cancels the polling task when replaced or dropped.
    poller: Mutex<Option<DropGuard>>,
}

impl<B: UploadBackend + 'static> UploadCoordinator<B> {
    pub fn new(backend: Arc<B>, policy: PollPolicy) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            backend,
            policy,
            state: Arc::new(state),
            poller: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn stage(&self) -> UploadStage {
        self.state.borrow().stage
    }

    /// Run the upload sequence and start polling.
    ///
    /// Returns once the video is `Processing`; `Ready` is reached later through
    /// polling. Fields are validated before any network call. On failure, or
    /// if the returned future is dropped before it completes, the coordinator
    /// is back in `Idle` with a notice.
    #[instrument(skip_all)]
    pub async fn submit(&self, form: UploadForm) -> Result<String, ClientError> {
        if self.stage() != UploadStage::Idle {
            return Err(ClientError::Busy);
        }
        let form = validate(form)?;

        let claimed = self.state.send_if_modified(|s| {
            if s.stage != UploadStage::Idle {
                return false;
            }
            *s = Snapshot {
                stage: UploadStage::Uploading,
                ..Snapshot::default()
            };
            true
        });
        if !claimed {
            return Err(ClientError::Busy);
        }
        let guard = UploadingGuard {
            state: &self.state,
            armed: true,
        };

        let public_id = match self.upload_and_register(form).await {
            Ok(public_id) => public_id,
            Err(e) => {
                guard.disarm();
                warn!(error = %e, "Upload failed");
                self.state.send_replace(Snapshot {
                    notice: Some(e.to_string()),
                    ..Snapshot::default()
                });
                return Err(e);
            }
        };

        // The record exists from here on; a failed trigger leaves it processing.
        if let Err(e) = self.backend.trigger_transcode(&public_id).await {
            warn!(public_id = %public_id, error = %e, "Failed to start transcoding");
        }

        guard.disarm();
        self.state.send_replace(Snapshot {
            stage: UploadStage::Processing,
            public_id: Some(public_id.clone()),
            notice: None,
        });
        self.start_polling(public_id.clone());

        Ok(public_id)
    }

    async fn upload_and_register(&self, form: ValidForm) -> Result<String, ClientError> {
        let signature = self.backend.fetch_signature().await?;
        let api_key = signature
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ClientError::MissingApiKey)?;

        let upload = self
            .backend
            .upload_to_provider(&form.file, &signature, &api_key)
            .await?;
        info!(public_id = %upload.public_id, "Uploaded to provider");

        self.backend
            .create_record(&CreateVideoRequest {
                title: Some(form.title),
                description: Some(form.description),
                public_id: Some(upload.public_id.clone()),
                duration: upload.duration,
                thumbnail_url: Some(upload.thumbnail_url()),
            })
            .await?;

        Ok(upload.public_id)
    }

    fn start_polling(&self, public_id: String) {
        let token = CancellationToken::new();
        let backend = self.backend.clone();
        let state = self.state.clone();
        let policy = self.policy;
        let cancel = token.clone();

        tokio::spawn(async move {
            let outcome = poll_until_settled(&*backend, &public_id, policy, &cancel).await;
            if outcome == PollOutcome::Cancelled {
                return;
            }

            state.send_if_modified(|s| {
                if s.stage != UploadStage::Processing
                    || s.public_id.as_deref() != Some(public_id.as_str())
                {
                    return false;
                }
                match outcome {
                    PollOutcome::Ready => {
                        info!(public_id = %public_id, "Video ready");
                        s.stage = UploadStage::Ready;
                        s.notice = None;
                    }
                    PollOutcome::Failed => {
                        warn!(public_id = %public_id, "Transcoding failed");
                        *s = Snapshot {
                            notice: Some(format!("Processing of {public_id} failed")),
                            ..Snapshot::default()
                        };
                    }
                    PollOutcome::Exhausted { attempts } => {
                        warn!(public_id = %public_id, attempts, "Stopped polling");
                        s.notice = Some(format!(
                            "{public_id} is still processing after {attempts} checks"
                        ));
                    }
                    PollOutcome::Cancelled => return false,
                }
                true
            });
        });

        if let Ok(mut poller) = self.poller.lock() {
            *poller = Some(token.drop_guard());
        }
    }

    /// Go back to `Idle`, clearing the tracked video and stopping any polling.
    ///
    /// Not allowed while an upload is in flight.
    pub fn reset(&self) -> Result<(), ClientError> {
        if self.stage() == UploadStage::Uploading {
            return Err(ClientError::Busy);
        }
        if let Ok(mut poller) = self.poller.lock() {
            poller.take();
        }
        self.state.send_replace(Snapshot::default());
        Ok(())
    }
}
