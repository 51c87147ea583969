use common::domain::library::SystemState;
use common::repositories::globals::GlobalContextRepository;
use common::repositories::prompts::PromptRepository;

use super::error::SyncError;

/// Reads the whole library of a project. Globals are mandatory.
pub async fn collect_system_state(
    prompts: &dyn PromptRepository,
    globals: &dyn GlobalContextRepository,
    project_id: i32,
) -> Result<SystemState, SyncError> {
    let (library, globals) = tokio::try_join!(
        prompts.list_library(project_id),
        globals.find_by_project(project_id)
    )?;
    let globals = globals.ok_or(SyncError::MissingGlobals(project_id))?;

    tracing::debug!(
        project_id,
        prompts = library.len(),
        versions = library.iter().map(|p| p.versions.len()).sum::<usize>(),
        "Collected system state"
    );
    Ok(SystemState {
        prompts: library,
        globals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use common::entities::{global_contexts, projects};
    use common::repositories::{GlobalContextRepositoryImpl, PromptRepositoryImpl};
    use migration::MigratorTrait;
    use sea_orm::{ActiveModelTrait, Database, Set};
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_globals_fail_the_collection() -> Result<()> {
        let db = Arc::new(Database::connect("sqlite::memory:").await?);
        migration::Migrator::up(db.as_ref(), None).await?;
        let now = chrono::Utc::now().naive_utc();
        let project = projects::ActiveModel {
            uuid: Set(uuid::Uuid::new_v4()),
            name: Set("Acme".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db.as_ref())
        .await?;

        let prompts = PromptRepositoryImpl::new(db.clone());
        let globals = GlobalContextRepositoryImpl::new(db.clone());
        let err = collect_system_state(&prompts, &globals, project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingGlobals(id) if id == project.id));

        global_contexts::ActiveModel {
            project_id: Set(project.id),
            content: Set(serde_json::json!({"company": "Acme"})),
            last_sync_git_sha: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db.as_ref())
        .await?;

        let state = collect_system_state(&prompts, &globals, project.id).await?;
        assert!(state.prompts.is_empty());
        assert_eq!(state.globals.content["company"], "Acme");
        Ok(())
    }
}
