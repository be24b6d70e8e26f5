use common::VideoStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog record for one uploaded video.
///
/// Two writers converge on a row through `public_id`: the client creates it
/// and the completion webhook flips `status`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Provider-assigned asset ID.
    #[sea_orm(unique)]
    pub public_id: String,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub thumbnail_url: Option<String>,
    /// Seconds, as reported by the provider after upload.
    pub duration: Option<f64>,

    #[sea_orm(indexed)]
    pub status: VideoStatus,

    /// Transcode requests sent for this asset so far.
    #[sea_orm(default_value = 0)]
    pub trigger_attempts: i32,
    pub last_triggered_at: Option<DateTimeUtc>,

    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
