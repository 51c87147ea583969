use crate::github::{GithubClient, GithubError};
use crate::repositories::{
    connections::ConnectionRepositoryImpl, globals::GlobalContextRepositoryImpl,
    prompts::PromptRepositoryImpl,
};
use crate::settings::GithubSettings;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct Repositories {
    pub prompt_repo: Arc<dyn crate::repositories::prompts::PromptRepository>,
    pub globals_repo: Arc<dyn crate::repositories::globals::GlobalContextRepository>,
    pub connection_repo: Arc<dyn crate::repositories::connections::ConnectionRepository>,
}

pub fn build_repositories(db: Arc<DatabaseConnection>) -> Repositories {
    Repositories {
        prompt_repo: Arc::new(PromptRepositoryImpl::new(db.clone())),
        globals_repo: Arc::new(GlobalContextRepositoryImpl::new(db.clone())),
        connection_repo: Arc::new(ConnectionRepositoryImpl::new(db)),
    }
}

/// A missing token is only rejected when a sync actually needs the API.
pub fn build_github_client(settings: &GithubSettings) -> Result<Arc<GithubClient>, GithubError> {
    Ok(Arc::new(GithubClient::new(
        settings.token.as_deref(),
        settings.api_url.clone(),
    )?))
}
