use crate::domain::library::SystemGlobals;
use crate::entities::{global_contexts, prelude::*};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde_json::Value;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait GlobalContextRepository: Send + Sync {
    async fn find_by_project(&self, project_id: i32) -> Result<Option<SystemGlobals>, DbErr>;

    /// Replaces the content pulled from the repository and records its blob SHA.
    async fn update_content(
        &self,
        project_id: i32,
        content: Value,
        updated_at: DateTime<Utc>,
        sync_sha: Option<String>,
    ) -> Result<(), DbErr>;

    async fn set_sync_sha(&self, project_id: i32, sync_sha: Option<String>) -> Result<(), DbErr>;
}

pub struct GlobalContextRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl GlobalContextRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_model(&self, project_id: i32) -> Result<global_contexts::Model, DbErr> {
        GlobalContexts::find()
            .filter(global_contexts::Column::ProjectId.eq(project_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("global context for project {} not found", project_id))
            })
    }
}

#[async_trait::async_trait]
impl GlobalContextRepository for GlobalContextRepositoryImpl {
    async fn find_by_project(&self, project_id: i32) -> Result<Option<SystemGlobals>, DbErr> {
        Ok(GlobalContexts::find()
            .filter(global_contexts::Column::ProjectId.eq(project_id))
            .one(self.db.as_ref())
            .await?
            .map(|model| SystemGlobals {
                id: model.id,
                content: model.content,
                updated_at: model.updated_at.and_utc(),
                last_sync_git_sha: model.last_sync_git_sha,
            }))
    }

    async fn update_content(
        &self,
        project_id: i32,
        content: Value,
        updated_at: DateTime<Utc>,
        sync_sha: Option<String>,
    ) -> Result<(), DbErr> {
        let mut active: global_contexts::ActiveModel = self.find_model(project_id).await?.into();
        active.content = Set(content);
        active.updated_at = Set(updated_at.naive_utc());
        active.last_sync_git_sha = Set(sync_sha);
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn set_sync_sha(&self, project_id: i32, sync_sha: Option<String>) -> Result<(), DbErr> {
        let mut active: global_contexts::ActiveModel = self.find_model(project_id).await?.into();
        active.last_sync_git_sha = Set(sync_sha);
        active.update(self.db.as_ref()).await?;
        Ok(())
    }
}
