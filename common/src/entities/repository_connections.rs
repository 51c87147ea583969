use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Link between a project and the GitHub repository its library lives in.
/// `sync_in_progress` doubles as the per-project sync lock.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repository_connections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub project_id: i32,
    pub owner: String,
    pub repo_name: String,
    pub default_branch: String,
    pub library_folder: String,
    pub sync_in_progress: bool,
    pub sync_started_at: Option<DateTime>,
    pub last_sync_status: Option<String>,
    pub last_synced_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
