use chrono::Utc;
use common::VideoStatus;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
    sea_query::{Expr, ExprTrait},
};

use crate::entity::video;
use crate::models::video::NewVideo;

/// Result of applying a completion notification to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadyResult {
    /// Record moved from processing to ready.
    MarkedReady,
    /// Record exists but was not processing (e.g. a redelivered notification).
    Unchanged,
    /// No record carries this public ID.
    NotFound,
}

pub struct CatalogService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CatalogService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Insert a record in `processing`. Fails with a unique violation on a reused public ID.
    pub async fn create(&self, new: NewVideo) -> Result<video::Model, DbErr> {
        let model = video::ActiveModel {
            public_id: Set(new.public_id),
            title: Set(new.title),
            description: Set(new.description),
            thumbnail_url: Set(new.thumbnail_url),
            duration: Set(new.duration),
            status: Set(VideoStatus::Processing),
            trigger_attempts: Set(0),
            last_triggered_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        model.insert(self.conn).await
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<video::Model>, DbErr> {
        video::Entity::find()
            .order_by_desc(video::Column::CreatedAt)
            .order_by_desc(video::Column::Id)
            .all(self.conn)
            .await
    }

    pub async fn find(&self, public_id: &str) -> Result<Option<video::Model>, DbErr> {
        video::Entity::find()
            .filter(video::Column::PublicId.eq(public_id))
            .one(self.conn)
            .await
    }

    /// The most recent records other than `exclude_id`.
    pub async fn recent_except(
        &self,
        exclude_id: i32,
        limit: u64,
    ) -> Result<Vec<video::Model>, DbErr> {
        video::Entity::find()
            .filter(video::Column::Id.ne(exclude_id))
            .order_by_desc(video::Column::CreatedAt)
            .order_by_desc(video::Column::Id)
            .limit(limit)
            .all(self.conn)
            .await
    }

    /// Status only, without loading the rest of the row.
    pub async fn status(&self, public_id: &str) -> Result<Option<VideoStatus>, DbErr> {
        video::Entity::find()
            .select_only()
            .column(video::Column::Status)
            .filter(video::Column::PublicId.eq(public_id))
            .into_tuple()
            .one(self.conn)
            .await
    }

    /// Move a processing record to ready. Only `status` is written.
    pub async fn mark_ready(&self, public_id: &str) -> Result<MarkReadyResult, DbErr> {
        let update_result = video::Entity::update_many()
            .col_expr(video::Column::Status, Expr::value(VideoStatus::Ready))
            .filter(video::Column::PublicId.eq(public_id))
            .filter(video::Column::Status.eq(VideoStatus::Processing))
            .exec(self.conn)
            .await?;

        if update_result.rows_affected > 0 {
            return Ok(MarkReadyResult::MarkedReady);
        }

        if self.find(public_id).await?.is_some() {
            Ok(MarkReadyResult::Unchanged)
        } else {
            Ok(MarkReadyResult::NotFound)
        }
    }

    /// Count a transcode request against the record. Returns `false` if no record matched.
    ///
    /// The increment happens in the database, so concurrent triggers are all counted.
    pub async fn record_trigger(&self, public_id: &str) -> Result<bool, DbErr> {
        let result = video::Entity::update_many()
            .col_expr(
                video::Column::TriggerAttempts,
                Expr::col(video::Column::TriggerAttempts).add(1),
            )
            .col_expr(
                video::Column::LastTriggeredAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(video::Column::PublicId.eq(public_id))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
