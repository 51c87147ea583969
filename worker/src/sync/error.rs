use common::github::GithubError;
use sea_orm::DbErr;
use thiserror::Error;

use super::cancel::Cancelled;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync is not configured: {0}")]
    Config(String),
    #[error("project {0} has no repository connection")]
    NotConnected(i32),
    #[error("a sync is already running for project {0}")]
    AlreadySyncing(i32),
    #[error("project {0} has no global context")]
    MissingGlobals(i32),
    #[error("sync cancelled")]
    Cancelled,
    #[error("branch '{0}' does not exist")]
    MissingBranch(String),
    #[error("GitHub request failed: {0}")]
    Github(#[from] GithubError),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl From<Cancelled> for SyncError {
    fn from(_: Cancelled) -> Self {
        SyncError::Cancelled
    }
}
