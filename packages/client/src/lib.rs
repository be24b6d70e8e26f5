pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod poll;

pub use api::{HttpBackend, UploadBackend, VideoFile};
pub use coordinator::{Snapshot, UploadCoordinator, UploadForm, UploadStage};
pub use error::ClientError;
pub use poll::{PollOutcome, PollPolicy};
