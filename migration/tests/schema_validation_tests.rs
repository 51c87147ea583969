//! Migration schema validation tests
//!
//! These tests ensure that the database schema after running migrations
//! matches the entity definitions in `common::entities`.

use migration::Migrator;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    Set,
};
use sea_orm_migration::MigratorTrait;

async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

async fn insert_project(db: &DatabaseConnection) -> i32 {
    use common::entities::projects;

    projects::ActiveModel {
        uuid: Set(uuid::Uuid::new_v4()),
        name: Set("Acme".to_string()),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert project")
    .id
}

#[tokio::test]
async fn test_all_tables_exist() {
    let db = setup_test_db().await;

    let expected_tables = vec![
        "projects",
        "repository_connections",
        "prompts",
        "prompt_versions",
        "prompt_variables",
        "global_contexts",
        "sync_events",
    ];

    for table in expected_tables {
        let sql = format!("SELECT 1 FROM {} LIMIT 1", table);
        let result: Result<sea_orm::ExecResult, sea_orm::DbErr> = db.execute_unprepared(&sql).await;
        assert!(
            result.is_ok(),
            "Expected table '{}' not found or not accessible: {:?}",
            table,
            result.err()
        );
    }
}

#[tokio::test]
async fn test_prompt_library_entities_match_schema() {
    let db = setup_test_db().await;

    use common::entities::{prompt_variables, prompt_versions, prompts};

    let project_id = insert_project(&db).await;

    let prompt = prompts::ActiveModel {
        uuid: Set(uuid::Uuid::new_v4()),
        project_id: Set(project_id),
        slug: Set("greeting".to_string()),
        name: Set("Greeting".to_string()),
        last_sync_git_sha: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .expect("insert prompt");

    let version = prompt_versions::ActiveModel {
        uuid: Set(uuid::Uuid::new_v4()),
        prompt_id: Set(prompt.id),
        version: Set("0.0.1".to_string()),
        status: Set(prompt_versions::VersionStatus::Published),
        config: Set(Some(serde_json::json!({"model": "openrouter/auto"}))),
        content: Set("Hello {{ name }}".to_string()),
        last_sync_git_sha: Set(None),
        last_sync_content_sha: Set(Some("abc".to_string())),
        last_sync_variables_sha: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .expect("insert version");

    let variable = prompt_variables::ActiveModel {
        uuid: Set(uuid::Uuid::new_v4()),
        prompt_version_id: Set(version.id),
        name: Set("name".to_string()),
        var_type: Set(prompt_variables::VariableType::String),
        required: Set(true),
        default_value: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&db)
    .await;
    assert!(variable.is_ok(), "Failed to insert variable: {:?}", variable.err());

    let stored = prompt_versions::Entity::find_by_id(version.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, prompt_versions::VersionStatus::Published);
    assert_eq!(stored.last_sync_content_sha.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_prompt_slug_is_unique_per_project() {
    let db = setup_test_db().await;

    use common::entities::prompts;

    let project_id = insert_project(&db).await;
    let make = || prompts::ActiveModel {
        uuid: Set(uuid::Uuid::new_v4()),
        project_id: Set(project_id),
        slug: Set("greeting".to_string()),
        name: Set("Greeting".to_string()),
        last_sync_git_sha: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    };

    assert!(make().insert(&db).await.is_ok());
    assert!(make().insert(&db).await.is_err());
}

#[tokio::test]
async fn test_connection_and_globals_entities_match_schema() {
    let db = setup_test_db().await;

    use common::entities::{global_contexts, repository_connections, sync_events};

    let project_id = insert_project(&db).await;

    let connection = repository_connections::ActiveModel {
        project_id: Set(project_id),
        owner: Set("acme".to_string()),
        repo_name: Set("prompts".to_string()),
        default_branch: Set("main".to_string()),
        library_folder: Set("agentsmith".to_string()),
        sync_in_progress: Set(false),
        sync_started_at: Set(None),
        last_sync_status: Set(None),
        last_synced_at: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&db)
    .await;
    assert!(connection.is_ok(), "{:?}", connection.err());

    let globals = global_contexts::ActiveModel {
        project_id: Set(project_id),
        content: Set(serde_json::json!({"company": "Acme"})),
        last_sync_git_sha: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&db)
    .await;
    assert!(globals.is_ok(), "{:?}", globals.err());

    let event = sync_events::ActiveModel {
        project_id: Set(project_id),
        event_type: Set("SYNC_START".to_string()),
        details: Set(None),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&db)
    .await;
    assert!(event.is_ok(), "{:?}", event.err());

    let count = sync_events::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_migration_down_drops_tables() {
    let db = setup_test_db().await;

    Migrator::down(&db, None).await.expect("rollback");

    let result = db.execute_unprepared("SELECT 1 FROM prompts LIMIT 1").await;
    assert!(result.is_err());
}
