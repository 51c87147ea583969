use crate::entities::{prelude::*, repository_connections, sync_events};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

/// Outcome recorded on the connection when a run releases its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    Aborted,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Complete => "complete",
            RunStatus::Aborted => "aborted",
            RunStatus::Error => "error",
        }
    }
}

#[async_trait::async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn find_by_project(
        &self,
        project_id: i32,
    ) -> Result<Option<repository_connections::Model>, DbErr>;

    /// Flips `sync_in_progress` from false to true. Returns `false` when
    /// another run holds the lock.
    async fn try_acquire_sync_lock(&self, project_id: i32) -> Result<bool, DbErr>;

    async fn release_sync_lock(&self, project_id: i32, status: RunStatus) -> Result<(), DbErr>;

    async fn record_event(
        &self,
        project_id: i32,
        event_type: &str,
        details: Option<String>,
    ) -> Result<(), DbErr>;

    /// Newest first.
    async fn recent_events(
        &self,
        project_id: i32,
        limit: u64,
    ) -> Result<Vec<sync_events::Model>, DbErr>;
}

pub struct ConnectionRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ConnectionRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl ConnectionRepository for ConnectionRepositoryImpl {
    async fn find_by_project(
        &self,
        project_id: i32,
    ) -> Result<Option<repository_connections::Model>, DbErr> {
        RepositoryConnections::find()
            .filter(repository_connections::Column::ProjectId.eq(project_id))
            .one(self.db.as_ref())
            .await
    }

    async fn try_acquire_sync_lock(&self, project_id: i32) -> Result<bool, DbErr> {
        let now = chrono::Utc::now().naive_utc();
        let result = RepositoryConnections::update_many()
            .col_expr(
                repository_connections::Column::SyncInProgress,
                Expr::value(true),
            )
            .col_expr(
                repository_connections::Column::SyncStartedAt,
                Expr::value(Some(now)),
            )
            .filter(repository_connections::Column::ProjectId.eq(project_id))
            .filter(repository_connections::Column::SyncInProgress.eq(false))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn release_sync_lock(&self, project_id: i32, status: RunStatus) -> Result<(), DbErr> {
        let connection = self.find_by_project(project_id).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!("repository connection for project {}", project_id))
        })?;

        let now = chrono::Utc::now().naive_utc();
        let mut active: repository_connections::ActiveModel = connection.into();
        active.sync_in_progress = Set(false);
        active.sync_started_at = Set(None);
        active.last_sync_status = Set(Some(status.as_str().to_string()));
        if status == RunStatus::Complete {
            active.last_synced_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn record_event(
        &self,
        project_id: i32,
        event_type: &str,
        details: Option<String>,
    ) -> Result<(), DbErr> {
        let event = sync_events::ActiveModel {
            project_id: Set(project_id),
            event_type: Set(event_type.to_string()),
            details: Set(details),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };
        event.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn recent_events(
        &self,
        project_id: i32,
        limit: u64,
    ) -> Result<Vec<sync_events::Model>, DbErr> {
        SyncEvents::find()
            .filter(sync_events::Column::ProjectId.eq(project_id))
            .order_by_desc(sync_events::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
    }
}
