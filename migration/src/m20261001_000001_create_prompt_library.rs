use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .col(pk_auto(Projects::Id))
                    .col(uuid(Projects::Uuid))
                    .col(string(Projects::Name))
                    .col(date_time(Projects::CreatedAt))
                    .col(date_time(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RepositoryConnections::Table)
                    .col(pk_auto(RepositoryConnections::Id))
                    .col(integer(RepositoryConnections::ProjectId).unique_key())
                    .col(string(RepositoryConnections::Owner))
                    .col(string(RepositoryConnections::RepoName))
                    .col(string(RepositoryConnections::DefaultBranch))
                    .col(string(RepositoryConnections::LibraryFolder))
                    .col(boolean(RepositoryConnections::SyncInProgress).default(false))
                    .col(date_time_null(RepositoryConnections::SyncStartedAt))
                    .col(string_len_null(RepositoryConnections::LastSyncStatus, 32))
                    .col(date_time_null(RepositoryConnections::LastSyncedAt))
                    .col(date_time(RepositoryConnections::CreatedAt))
                    .col(date_time(RepositoryConnections::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repository_connections_project_id")
                            .from(RepositoryConnections::Table, RepositoryConnections::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Prompts::Table)
                    .col(pk_auto(Prompts::Id))
                    .col(uuid(Prompts::Uuid))
                    .col(integer(Prompts::ProjectId))
                    .col(string(Prompts::Slug))
                    .col(string(Prompts::Name))
                    .col(string_null(Prompts::LastSyncGitSha))
                    .col(date_time(Prompts::CreatedAt))
                    .col(date_time(Prompts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompts_project_id")
                            .from(Prompts::Table, Prompts::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_prompts_project_slug")
                    .table(Prompts::Table)
                    .col(Prompts::ProjectId)
                    .col(Prompts::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromptVersions::Table)
                    .col(pk_auto(PromptVersions::Id))
                    .col(uuid(PromptVersions::Uuid))
                    .col(integer(PromptVersions::PromptId))
                    .col(string(PromptVersions::Version))
                    .col(string_len(PromptVersions::Status, 32))
                    .col(json_null(PromptVersions::Config))
                    .col(text(PromptVersions::Content))
                    .col(string_null(PromptVersions::LastSyncGitSha))
                    .col(string_null(PromptVersions::LastSyncContentSha))
                    .col(string_null(PromptVersions::LastSyncVariablesSha))
                    .col(date_time(PromptVersions::CreatedAt))
                    .col(date_time(PromptVersions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompt_versions_prompt_id")
                            .from(PromptVersions::Table, PromptVersions::PromptId)
                            .to(Prompts::Table, Prompts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_prompt_versions_prompt_version")
                    .table(PromptVersions::Table)
                    .col(PromptVersions::PromptId)
                    .col(PromptVersions::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromptVariables::Table)
                    .col(pk_auto(PromptVariables::Id))
                    .col(uuid(PromptVariables::Uuid))
                    .col(integer(PromptVariables::PromptVersionId))
                    .col(string(PromptVariables::Name))
                    .col(string_len(PromptVariables::VarType, 32))
                    .col(boolean(PromptVariables::Required))
                    .col(text_null(PromptVariables::DefaultValue))
                    .col(date_time(PromptVariables::CreatedAt))
                    .col(date_time(PromptVariables::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompt_variables_prompt_version_id")
                            .from(PromptVariables::Table, PromptVariables::PromptVersionId)
                            .to(PromptVersions::Table, PromptVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_prompt_variables_version_name")
                    .table(PromptVariables::Table)
                    .col(PromptVariables::PromptVersionId)
                    .col(PromptVariables::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GlobalContexts::Table)
                    .col(pk_auto(GlobalContexts::Id))
                    .col(integer(GlobalContexts::ProjectId).unique_key())
                    .col(json(GlobalContexts::Content))
                    .col(string_null(GlobalContexts::LastSyncGitSha))
                    .col(date_time(GlobalContexts::CreatedAt))
                    .col(date_time(GlobalContexts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_global_contexts_project_id")
                            .from(GlobalContexts::Table, GlobalContexts::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SyncEvents::Table)
                    .col(pk_auto(SyncEvents::Id))
                    .col(integer(SyncEvents::ProjectId))
                    .col(string(SyncEvents::EventType))
                    .col(text_null(SyncEvents::Details))
                    .col(date_time(SyncEvents::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_events_project_id")
                    .table(SyncEvents::Table)
                    .col(SyncEvents::ProjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GlobalContexts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PromptVariables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PromptVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Prompts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RepositoryConnections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    Uuid,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RepositoryConnections {
    Table,
    Id,
    ProjectId,
    Owner,
    RepoName,
    DefaultBranch,
    LibraryFolder,
    SyncInProgress,
    SyncStartedAt,
    LastSyncStatus,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Prompts {
    Table,
    Id,
    Uuid,
    ProjectId,
    Slug,
    Name,
    LastSyncGitSha,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PromptVersions {
    Table,
    Id,
    Uuid,
    PromptId,
    Version,
    Status,
    Config,
    Content,
    LastSyncGitSha,
    LastSyncContentSha,
    LastSyncVariablesSha,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PromptVariables {
    Table,
    Id,
    Uuid,
    PromptVersionId,
    Name,
    VarType,
    Required,
    DefaultValue,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum GlobalContexts {
    Table,
    Id,
    ProjectId,
    Content,
    LastSyncGitSha,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SyncEvents {
    Table,
    Id,
    ProjectId,
    EventType,
    Details,
    CreatedAt,
}
