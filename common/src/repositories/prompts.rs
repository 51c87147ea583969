use crate::domain::library::{SystemPrompt, SystemVariable, SystemVersion, VersionStatus};
use crate::entities::{prelude::*, prompt_variables, prompt_versions, prompts};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct NewPrompt<'a> {
    pub project_id: i32,
    pub uuid: Uuid,
    pub slug: &'a str,
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sync_git_sha: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct PromptUpdate {
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_sync_git_sha: Option<Option<String>>,
}

pub struct NewVersion {
    pub prompt_id: i32,
    pub uuid: Uuid,
    pub version: String,
    pub status: VersionStatus,
    pub config: Option<Value>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sync_git_sha: Option<String>,
    pub last_sync_content_sha: Option<String>,
    pub last_sync_variables_sha: Option<String>,
}

/// Partial version update. `None` leaves a field alone; for the sync hashes
/// `Some(None)` clears the stored hash.
#[derive(Debug, Default, Clone)]
pub struct VersionUpdate {
    pub status: Option<VersionStatus>,
    pub config: Option<Option<Value>>,
    pub content: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_sync_git_sha: Option<Option<String>>,
    pub last_sync_content_sha: Option<Option<String>>,
    pub last_sync_variables_sha: Option<Option<String>>,
}

#[async_trait::async_trait]
pub trait PromptRepository: Send + Sync {
    /// Every prompt of the project with its versions and their variables.
    async fn list_library(&self, project_id: i32) -> Result<Vec<SystemPrompt>, DbErr>;

    async fn find_prompt(
        &self,
        project_id: i32,
        slug: &str,
    ) -> Result<Option<prompts::Model>, DbErr>;

    async fn find_version(
        &self,
        prompt_id: i32,
        version: &str,
    ) -> Result<Option<prompt_versions::Model>, DbErr>;

    async fn create_prompt(&self, params: NewPrompt<'_>) -> Result<i32, DbErr>;

    async fn update_prompt(&self, prompt_id: i32, update: PromptUpdate) -> Result<(), DbErr>;

    async fn create_version(&self, params: NewVersion) -> Result<i32, DbErr>;

    async fn update_version(&self, version_id: i32, update: VersionUpdate) -> Result<(), DbErr>;

    async fn delete_version(&self, version_id: i32) -> Result<(), DbErr>;

    /// Swaps the whole variable list of a version in one transaction.
    async fn replace_variables(
        &self,
        version_id: i32,
        variables: Vec<SystemVariable>,
    ) -> Result<(), DbErr>;

    async fn delete_variables(&self, version_id: i32) -> Result<(), DbErr>;
}

pub struct PromptRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl PromptRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn variable_from_model(model: prompt_variables::Model) -> SystemVariable {
    SystemVariable {
        uuid: model.uuid,
        name: model.name,
        var_type: model.var_type,
        required: model.required,
        default_value: model.default_value,
        created_at: model.created_at.and_utc(),
        updated_at: model.updated_at.and_utc(),
    }
}

fn version_from_model(
    model: prompt_versions::Model,
    variables: Vec<SystemVariable>,
) -> SystemVersion {
    SystemVersion {
        id: model.id,
        uuid: model.uuid,
        version: model.version,
        status: model.status,
        config: model.config,
        content: model.content,
        created_at: model.created_at.and_utc(),
        updated_at: model.updated_at.and_utc(),
        last_sync_git_sha: model.last_sync_git_sha,
        last_sync_content_sha: model.last_sync_content_sha,
        last_sync_variables_sha: model.last_sync_variables_sha,
        variables,
    }
}

#[async_trait::async_trait]
impl PromptRepository for PromptRepositoryImpl {
    async fn list_library(&self, project_id: i32) -> Result<Vec<SystemPrompt>, DbErr> {
        let prompt_models = Prompts::find()
            .filter(prompts::Column::ProjectId.eq(project_id))
            .order_by_asc(prompts::Column::Id)
            .all(self.db.as_ref())
            .await?;
        if prompt_models.is_empty() {
            return Ok(Vec::new());
        }

        let prompt_ids: Vec<i32> = prompt_models.iter().map(|p| p.id).collect();
        let version_models = PromptVersions::find()
            .filter(prompt_versions::Column::PromptId.is_in(prompt_ids))
            .order_by_asc(prompt_versions::Column::Id)
            .all(self.db.as_ref())
            .await?;

        let version_ids: Vec<i32> = version_models.iter().map(|v| v.id).collect();
        let variable_models = if version_ids.is_empty() {
            Vec::new()
        } else {
            PromptVariables::find()
                .filter(prompt_variables::Column::PromptVersionId.is_in(version_ids))
                .order_by_asc(prompt_variables::Column::Name)
                .all(self.db.as_ref())
                .await?
        };

        let mut variables_by_version: HashMap<i32, Vec<SystemVariable>> = HashMap::new();
        for model in variable_models {
            variables_by_version
                .entry(model.prompt_version_id)
                .or_default()
                .push(variable_from_model(model));
        }

        let mut versions_by_prompt: HashMap<i32, Vec<SystemVersion>> = HashMap::new();
        for model in version_models {
            let variables = variables_by_version.remove(&model.id).unwrap_or_default();
            versions_by_prompt
                .entry(model.prompt_id)
                .or_default()
                .push(version_from_model(model, variables));
        }

        Ok(prompt_models
            .into_iter()
            .map(|p| SystemPrompt {
                versions: versions_by_prompt.remove(&p.id).unwrap_or_default(),
                id: p.id,
                uuid: p.uuid,
                slug: p.slug,
                name: p.name,
                created_at: p.created_at.and_utc(),
                updated_at: p.updated_at.and_utc(),
                last_sync_git_sha: p.last_sync_git_sha,
            })
            .collect())
    }

    async fn find_prompt(
        &self,
        project_id: i32,
        slug: &str,
    ) -> Result<Option<prompts::Model>, DbErr> {
        Prompts::find()
            .filter(prompts::Column::ProjectId.eq(project_id))
            .filter(prompts::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
    }

    async fn find_version(
        &self,
        prompt_id: i32,
        version: &str,
    ) -> Result<Option<prompt_versions::Model>, DbErr> {
        PromptVersions::find()
            .filter(prompt_versions::Column::PromptId.eq(prompt_id))
            .filter(prompt_versions::Column::Version.eq(version))
            .one(self.db.as_ref())
            .await
    }

    async fn create_prompt(&self, params: NewPrompt<'_>) -> Result<i32, DbErr> {
        let prompt = prompts::ActiveModel {
            uuid: Set(params.uuid),
            project_id: Set(params.project_id),
            slug: Set(params.slug.to_string()),
            name: Set(params.name.to_string()),
            last_sync_git_sha: Set(params.last_sync_git_sha),
            created_at: Set(params.created_at.naive_utc()),
            updated_at: Set(params.updated_at.naive_utc()),
            ..Default::default()
        };
        Ok(prompt.insert(self.db.as_ref()).await?.id)
    }

    async fn update_prompt(&self, prompt_id: i32, update: PromptUpdate) -> Result<(), DbErr> {
        let prompt = Prompts::find_by_id(prompt_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("prompt id {} not found", prompt_id)))?;

        let mut active: prompts::ActiveModel = prompt.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(created_at) = update.created_at {
            active.created_at = Set(created_at.naive_utc());
        }
        if let Some(updated_at) = update.updated_at {
            active.updated_at = Set(updated_at.naive_utc());
        }
        if let Some(sha) = update.last_sync_git_sha {
            active.last_sync_git_sha = Set(sha);
        }
        if active.is_changed() {
            active.update(self.db.as_ref()).await?;
        }
        Ok(())
    }

    async fn create_version(&self, params: NewVersion) -> Result<i32, DbErr> {
        let version = prompt_versions::ActiveModel {
            uuid: Set(params.uuid),
            prompt_id: Set(params.prompt_id),
            version: Set(params.version),
            status: Set(params.status),
            config: Set(params.config),
            content: Set(params.content),
            last_sync_git_sha: Set(params.last_sync_git_sha),
            last_sync_content_sha: Set(params.last_sync_content_sha),
            last_sync_variables_sha: Set(params.last_sync_variables_sha),
            created_at: Set(params.created_at.naive_utc()),
            updated_at: Set(params.updated_at.naive_utc()),
            ..Default::default()
        };
        Ok(version.insert(self.db.as_ref()).await?.id)
    }

    async fn update_version(&self, version_id: i32, update: VersionUpdate) -> Result<(), DbErr> {
        let version = PromptVersions::find_by_id(version_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("prompt version id {} not found", version_id))
            })?;

        let mut active: prompt_versions::ActiveModel = version.into();
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        if let Some(config) = update.config {
            active.config = Set(config);
        }
        if let Some(content) = update.content {
            active.content = Set(content);
        }
        if let Some(created_at) = update.created_at {
            active.created_at = Set(created_at.naive_utc());
        }
        if let Some(updated_at) = update.updated_at {
            active.updated_at = Set(updated_at.naive_utc());
        }
        if let Some(sha) = update.last_sync_git_sha {
            active.last_sync_git_sha = Set(sha);
        }
        if let Some(sha) = update.last_sync_content_sha {
            active.last_sync_content_sha = Set(sha);
        }
        if let Some(sha) = update.last_sync_variables_sha {
            active.last_sync_variables_sha = Set(sha);
        }
        if active.is_changed() {
            active.update(self.db.as_ref()).await?;
        }
        Ok(())
    }

    async fn delete_version(&self, version_id: i32) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;
        PromptVariables::delete_many()
            .filter(prompt_variables::Column::PromptVersionId.eq(version_id))
            .exec(&txn)
            .await?;
        PromptVersions::delete_by_id(version_id).exec(&txn).await?;
        txn.commit().await
    }

    async fn replace_variables(
        &self,
        version_id: i32,
        variables: Vec<SystemVariable>,
    ) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;
        PromptVariables::delete_many()
            .filter(prompt_variables::Column::PromptVersionId.eq(version_id))
            .exec(&txn)
            .await?;

        if !variables.is_empty() {
            let models: Vec<prompt_variables::ActiveModel> = variables
                .into_iter()
                .map(|v| prompt_variables::ActiveModel {
                    uuid: Set(v.uuid),
                    prompt_version_id: Set(version_id),
                    name: Set(v.name),
                    var_type: Set(v.var_type),
                    required: Set(v.required),
                    default_value: Set(v.default_value),
                    created_at: Set(v.created_at.naive_utc()),
                    updated_at: Set(v.updated_at.naive_utc()),
                    ..Default::default()
                })
                .collect();
            PromptVariables::insert_many(models).exec(&txn).await?;
        }

        txn.commit().await
    }

    async fn delete_variables(&self, version_id: i32) -> Result<(), DbErr> {
        PromptVariables::delete_many()
            .filter(prompt_variables::Column::PromptVersionId.eq(version_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::library::VariableType;
    use crate::entities::projects;
    use anyhow::Result;
    use migration::MigratorTrait;
    use sea_orm::Database;

    async fn setup() -> Result<(PromptRepositoryImpl, i32)> {
        let db = Database::connect("sqlite::memory:").await?;
        migration::Migrator::up(&db, None).await?;
        let now = Utc::now().naive_utc();
        let project = projects::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set("Acme".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        Ok((PromptRepositoryImpl::new(Arc::new(db)), project.id))
    }

    fn variable(name: &str) -> SystemVariable {
        SystemVariable {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            var_type: VariableType::String,
            required: true,
            default_value: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn new_version(prompt_id: i32, version: &str) -> NewVersion {
        NewVersion {
            prompt_id,
            uuid: Uuid::new_v4(),
            version: version.to_string(),
            status: VersionStatus::Draft,
            config: None,
            content: "Hello {{ name }}".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_sync_git_sha: None,
            last_sync_content_sha: None,
            last_sync_variables_sha: None,
        }
    }

    #[tokio::test]
    async fn list_library_groups_versions_and_variables() -> Result<()> {
        let (repo, project_id) = setup().await?;
        let prompt_id = repo
            .create_prompt(NewPrompt {
                project_id,
                uuid: Uuid::new_v4(),
                slug: "greeting",
                name: "Greeting",
                created_at: Utc::now(),
                updated_at: Utc::now(),
                last_sync_git_sha: None,
            })
            .await?;
        let first = repo.create_version(new_version(prompt_id, "0.0.1")).await?;
        repo.create_version(new_version(prompt_id, "0.0.2")).await?;
        repo.replace_variables(first, vec![variable("zeta"), variable("alpha")])
            .await?;

        let library = repo.list_library(project_id).await?;
        assert_eq!(library.len(), 1);
        let prompt = &library[0];
        assert_eq!(prompt.slug, "greeting");
        assert_eq!(prompt.versions.len(), 2);
        let names: Vec<_> = prompt.versions[0]
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(prompt.versions[1].variables.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn update_version_sets_and_clears_hashes_independently() -> Result<()> {
        let (repo, project_id) = setup().await?;
        let prompt_id = repo
            .create_prompt(NewPrompt {
                project_id,
                uuid: Uuid::new_v4(),
                slug: "greeting",
                name: "Greeting",
                created_at: Utc::now(),
                updated_at: Utc::now(),
                last_sync_git_sha: None,
            })
            .await?;
        let version_id = repo
            .create_version(NewVersion {
                last_sync_git_sha: Some("descriptor".to_string()),
                last_sync_variables_sha: Some("vars".to_string()),
                ..new_version(prompt_id, "0.0.1")
            })
            .await?;

        repo.update_version(
            version_id,
            VersionUpdate {
                content: Some("Bye".to_string()),
                last_sync_content_sha: Some(Some("content".to_string())),
                last_sync_variables_sha: Some(None),
                ..Default::default()
            },
        )
        .await?;

        let stored = repo.find_version(prompt_id, "0.0.1").await?.unwrap();
        assert_eq!(stored.content, "Bye");
        assert_eq!(stored.last_sync_git_sha.as_deref(), Some("descriptor"));
        assert_eq!(stored.last_sync_content_sha.as_deref(), Some("content"));
        assert_eq!(stored.last_sync_variables_sha, None);
        Ok(())
    }

    #[tokio::test]
    async fn replace_and_delete_variables() -> Result<()> {
        let (repo, project_id) = setup().await?;
        let prompt_id = repo
            .create_prompt(NewPrompt {
                project_id,
                uuid: Uuid::new_v4(),
                slug: "greeting",
                name: "Greeting",
                created_at: Utc::now(),
                updated_at: Utc::now(),
                last_sync_git_sha: None,
            })
            .await?;
        let version_id = repo.create_version(new_version(prompt_id, "0.0.1")).await?;

        repo.replace_variables(version_id, vec![variable("a"), variable("b")])
            .await?;
        repo.replace_variables(version_id, vec![variable("c")]).await?;
        let library = repo.list_library(project_id).await?;
        assert_eq!(library[0].versions[0].variables.len(), 1);
        assert_eq!(library[0].versions[0].variables[0].name, "c");

        repo.delete_variables(version_id).await?;
        let library = repo.list_library(project_id).await?;
        assert!(library[0].versions[0].variables.is_empty());

        repo.delete_version(version_id).await?;
        assert!(repo.find_version(prompt_id, "0.0.1").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_missing_prompt_is_record_not_found() -> Result<()> {
        let (repo, _) = setup().await?;
        let err = repo
            .update_prompt(
                999,
                PromptUpdate {
                    name: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbErr::RecordNotFound(_)));
        Ok(())
    }
}
