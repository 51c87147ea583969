pub mod branch;
pub mod cancel;
pub mod domain;
pub mod error;
pub mod execute;
pub mod reconcile;
pub mod repo_state;
pub mod system_state;

#[cfg(test)]
pub(crate) mod test_support;

use self::branch::{finish_sync_branch, prepare_sync_branch};
use self::cancel::Cancelled;
use self::execute::{Executor, SyncScope};
use self::reconcile::reconcile;
use self::repo_state::collect_repo_state;
use self::system_state::collect_system_state;
use crate::ports::GithubApi;
use common::domain::paths::normalize_folder;
use common::entities::repository_connections;
use common::github::RepoRef;
use common::repositories::RunStatus;
use common::settings::SyncSettings;
use common::Repositories;
use std::sync::Arc;

pub use self::cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use self::domain::{SyncEvent, SyncOutcome, SyncStatus};
pub use self::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub project_id: i32,
    /// Branch to sync against; the connection's default branch when `None`.
    pub branch: Option<String>,
}

/// Runs one sync for a project: lock, collect both sides, reconcile, execute,
/// unlock.
pub struct SyncService {
    repos: Repositories,
    github: Arc<dyn GithubApi>,
    settings: SyncSettings,
}

impl SyncService {
    pub fn new(repos: Repositories, github: Arc<dyn GithubApi>, settings: SyncSettings) -> Self {
        Self {
            repos,
            github,
            settings,
        }
    }

    pub async fn run(
        &self,
        request: SyncRequest,
        cancel: &CancelSignal,
    ) -> Result<SyncOutcome, SyncError> {
        let project_id = request.project_id;
        let connection = self
            .repos
            .connection_repo
            .find_by_project(project_id)
            .await?
            .ok_or(SyncError::NotConnected(project_id))?;

        if !self
            .repos
            .connection_repo
            .try_acquire_sync_lock(project_id)
            .await?
        {
            tracing::warn!(project_id, "Sync already in progress, refusing to start");
            return Err(SyncError::AlreadySyncing(project_id));
        }

        let requested = request
            .branch
            .clone()
            .unwrap_or_else(|| connection.default_branch.clone());
        let result = match self.run_locked(&connection, &requested, cancel).await {
            Err(SyncError::Cancelled) => Ok(aborted(requested)),
            other => other,
        };

        let (status, event) = match &result {
            Ok(outcome) if outcome.status == SyncStatus::Complete => (
                RunStatus::Complete,
                SyncEvent::Complete {
                    changes_made: outcome.changes_made(),
                    changes: outcome.changes.len(),
                    failures: outcome.failures.len(),
                    conflicts: outcome.conflicts.len(),
                },
            ),
            Ok(outcome) => (
                RunStatus::Aborted,
                SyncEvent::Aborted {
                    changes: outcome.changes.len(),
                },
            ),
            Err(e) => (
                RunStatus::Error,
                SyncEvent::Error {
                    message: e.to_string(),
                },
            ),
        };

        self.record(project_id, &event).await;
        if let Err(e) = self
            .repos
            .connection_repo
            .release_sync_lock(project_id, status)
            .await
        {
            tracing::error!(project_id, error = %e, "Failed to release sync lock");
            if result.is_ok() {
                return Err(e.into());
            }
        }
        result
    }

    async fn run_locked(
        &self,
        connection: &repository_connections::Model,
        requested: &str,
        cancel: &CancelSignal,
    ) -> Result<SyncOutcome, SyncError> {
        let project_id = connection.project_id;
        let repo = RepoRef::new(&connection.owner, &connection.repo_name);
        let folder = normalize_folder(&connection.library_folder);
        let pull_requests = &self.settings.pull_requests;

        tracing::info!(project_id, repo = %repo, branch = requested, "Starting sync");
        self.record(
            project_id,
            &SyncEvent::Start {
                branch: requested.to_string(),
            },
        )
        .await;

        let plan = if pull_requests.enabled && requested == connection.default_branch {
            Some(
                cancel
                    .run(prepare_sync_branch(
                        self.github.as_ref(),
                        &repo,
                        &connection.default_branch,
                        pull_requests,
                    ))
                    .await??,
            )
        } else {
            None
        };
        let branch = plan
            .as_ref()
            .map(|p| p.branch.clone())
            .unwrap_or_else(|| requested.to_string());

        let (system, repo_state) = tokio::try_join!(
            async {
                Ok::<_, SyncError>(
                    cancel
                        .run(collect_system_state(
                            self.repos.prompt_repo.as_ref(),
                            self.repos.globals_repo.as_ref(),
                            project_id,
                        ))
                        .await??,
                )
            },
            collect_repo_state(
                self.github.as_ref(),
                &repo,
                &folder,
                &branch,
                self.settings.max_concurrency,
                cancel,
            ),
        )?;

        let planned = reconcile(&system, &repo_state, self.settings.conflict_policy);
        for conflict in &planned.conflicts {
            tracing::warn!(
                project_id,
                path = %conflict.path,
                resolution = ?conflict.resolution,
                "Both sides changed since the last sync"
            );
        }
        tracing::debug!(project_id, actions = planned.actions.len(), "Reconciled");

        let executor = Executor::new(
            self.github.clone(),
            self.repos.prompt_repo.clone(),
            self.repos.globals_repo.clone(),
            SyncScope {
                project_id,
                repo: repo.clone(),
                branch: branch.clone(),
                folder,
            },
            &self.settings.skip_marker,
            self.settings.max_concurrency,
        );
        let report = executor
            .execute(planned.actions, &planned.baselines, cancel)
            .await;

        let status = match report.stopped {
            None => SyncStatus::Complete,
            Some(SyncError::Cancelled) => SyncStatus::Aborted,
            Some(e) => return Err(e),
        };
        let mut outcome = SyncOutcome {
            status,
            branch,
            changes: report.changes,
            failures: report.failures,
            conflicts: planned.conflicts,
            pull_request: None,
        };

        if let (Some(plan), SyncStatus::Complete) = (&plan, status) {
            let finished = cancel
                .run(finish_sync_branch(
                    self.github.as_ref(),
                    &repo,
                    plan,
                    &connection.default_branch,
                    pull_requests,
                    outcome.repo_changed(),
                ))
                .await;
            match finished {
                Ok(pull_request) => outcome.pull_request = pull_request?,
                Err(Cancelled) => outcome.status = SyncStatus::Aborted,
            }
        }

        tracing::info!(
            project_id,
            status = ?outcome.status,
            changes = outcome.changes.len(),
            failures = outcome.failures.len(),
            conflicts = outcome.conflicts.len(),
            "Sync finished"
        );
        Ok(outcome)
    }

    /// Event bookkeeping never fails a run.
    async fn record(&self, project_id: i32, event: &SyncEvent) {
        let details = event.details().to_string();
        if let Err(e) = self
            .repos
            .connection_repo
            .record_event(project_id, event.event_type(), Some(details))
            .await
        {
            tracing::error!(project_id, event = event.event_type(), error = %e, "Failed to record sync event");
        }
    }
}

fn aborted(branch: String) -> SyncOutcome {
    SyncOutcome {
        status: SyncStatus::Aborted,
        branch,
        changes: Vec::new(),
        failures: Vec::new(),
        conflicts: Vec::new(),
        pull_request: None,
    }
}
