use crate::ports::GithubApi;
use crate::sync::{SyncError, SyncService};
use anyhow::Result;
use common::github::GithubClient;
use common::settings::Settings;
use common::{build_github_client, build_repositories, Repositories};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub struct WorkerContext {
    pub db: Arc<DatabaseConnection>,
    pub repos: Repositories,
    pub github: Arc<GithubClient>,
    pub settings: Arc<Settings>,
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("db", &self.db)
            .field("settings", &self.settings)
            .field("github", &"GithubClient")
            .finish()
    }
}

pub async fn build_worker_context(settings: Settings) -> Result<Arc<WorkerContext>> {
    let db = common::db::establish_connection(&settings.database.url).await?;
    let db = Arc::new(db);
    let repos = build_repositories(db.clone());
    let github = build_github_client(&settings.github)?;

    Ok(Arc::new(WorkerContext {
        db,
        repos,
        github,
        settings: Arc::new(settings),
    }))
}

impl WorkerContext {
    /// Syncing talks to the API on every run, so the token is checked here
    /// rather than at startup.
    pub fn sync_service(&self) -> Result<SyncService, SyncError> {
        if self.settings.github.token.is_none() {
            return Err(SyncError::Config(
                "github.token (or GITHUB_TOKEN) must be set to sync".to_string(),
            ));
        }
        let github: Arc<dyn GithubApi> = self.github.clone();
        Ok(SyncService::new(
            self.repos.clone(),
            github,
            self.settings.sync.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings(token: Option<&str>) -> Settings {
        Settings {
            database: common::settings::DatabaseSettings {
                url: "sqlite::memory:".to_string(),
            },
            github: common::settings::GithubSettings {
                token: token.map(str::to_string),
                api_url: "https://api.github.com".to_string(),
                bot_login: "promptsync[bot]".to_string(),
            },
            sync: common::settings::SyncSettings::default(),
            debug: true,
        }
    }

    #[tokio::test]
    async fn worker_context_debug_hides_client() -> Result<()> {
        let ctx = build_worker_context(test_settings(Some("t0ken"))).await?;
        let dbg = format!("{:?}", ctx);
        assert!(dbg.contains("WorkerContext"));
        assert!(dbg.contains("GithubClient"));
        assert!(ctx.sync_service().is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn missing_token_is_a_config_error() -> Result<()> {
        let ctx = build_worker_context(test_settings(None)).await?;
        assert!(matches!(ctx.sync_service(), Err(SyncError::Config(_))));
        Ok(())
    }
}
