use chrono::{DateTime, Utc};
use common::VideoStatus;
use common::api::CreateVideoRequest;
use serde::Serialize;

use crate::error::AppError;

/// Upper bound on title length, in Unicode characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Number of other videos listed next to a watched one.
pub const UP_NEXT_LIMIT: u64 = 5;

/// A catalog record as returned by the API.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: i32,
    #[schema(example = "abc123")]
    pub public_id: String,
    #[schema(example = "Ep1")]
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub duration: Option<f64>,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
}

/// Compact entry for the "up next" rail.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub public_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

/// A video plus the most recent other uploads.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchResponse {
    pub video: VideoResponse,
    pub up_next: Vec<VideoSummary>,
}

/// Validated input for a new catalog record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub public_id: String,
    pub duration: Option<f64>,
    pub thumbnail_url: Option<String>,
}

impl TryFrom<CreateVideoRequest> for NewVideo {
    type Error = AppError;

    fn try_from(req: CreateVideoRequest) -> Result<Self, Self::Error> {
        let title = non_blank(req.title);
        let description = non_blank(req.description);
        let public_id = non_blank(req.public_id);

        let (Some(title), Some(description), Some(public_id)) = (title, description, public_id)
        else {
            return Err(AppError::Validation("Missing required fields".into()));
        };

        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "Title cannot be more than {MAX_TITLE_CHARS} characters"
            )));
        }
        if let Some(duration) = req.duration
            && (!duration.is_finite() || duration < 0.0)
        {
            return Err(AppError::Validation(
                "Duration must be a non-negative number of seconds".into(),
            ));
        }

        Ok(Self {
            title,
            description,
            public_id,
            duration: req.duration,
            thumbnail_url: non_blank(req.thumbnail_url),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<crate::entity::video::Model> for VideoResponse {
    fn from(m: crate::entity::video::Model) -> Self {
        Self {
            id: m.id,
            public_id: m.public_id,
            title: m.title,
            description: m.description,
            thumbnail_url: m.thumbnail_url,
            duration: m.duration,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

impl From<crate::entity::video::Model> for VideoSummary {
    fn from(m: crate::entity::video::Model) -> Self {
        Self {
            public_id: m.public_id,
            title: m.title,
            thumbnail_url: m.thumbnail_url,
        }
    }
}
