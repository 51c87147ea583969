//! Applies reconciled actions to the repository and the database.
//!
//! Every repository write resolves the current blob SHA under a per-path lock,
//! refuses to proceed when the path no longer holds the blob the action was
//! planned against, and then persists the resulting SHA as the new sync hash,
//! so progress is safe to resume after a partial run.

use common::domain::files::{
    decode_content, decode_globals, decode_prompt, decode_variables, decode_version,
    encode_globals, encode_prompt, encode_variables, encode_version, CodecError,
};
use common::domain::git_blob_sha;
use common::domain::library::SystemVariable;
use common::domain::types_gen::render_types;
use common::github::{FileDelete, FileWrite, GithubError, RemoteFile, RepoRef};
use common::repositories::globals::GlobalContextRepository;
use common::repositories::prompts::{
    NewPrompt, NewVersion, PromptRepository, PromptUpdate, VersionUpdate,
};
use futures::stream::{self, StreamExt};
use sea_orm::DbErr;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

use super::cancel::{CancelHandle, CancelSignal, Cancelled};
use super::domain::{
    ActionFailure, Baseline, FailureKind, Lane, RepoAction, SyncAction, SyncChange, SyncOp,
    SystemAction,
};
use super::error::SyncError;
use super::system_state::collect_system_state;
use crate::ports::GithubApi;

/// Repository coordinates a run writes to.
#[derive(Debug, Clone)]
pub struct SyncScope {
    pub project_id: i32,
    pub repo: RepoRef,
    pub branch: String,
    pub folder: String,
}

#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub changes: Vec<SyncChange>,
    pub failures: Vec<ActionFailure>,
    /// Set when the run stopped early: cancellation or a fatal error.
    pub stopped: Option<SyncError>,
}

enum ActionError {
    Invalid(String),
    Conflict(String),
    Fatal(SyncError),
}

impl From<GithubError> for ActionError {
    fn from(e: GithubError) -> Self {
        if e.is_write_conflict() {
            ActionError::Conflict(e.to_string())
        } else {
            ActionError::Fatal(SyncError::Github(e))
        }
    }
}

impl From<DbErr> for ActionError {
    fn from(e: DbErr) -> Self {
        ActionError::Fatal(SyncError::Database(e))
    }
}

impl From<CodecError> for ActionError {
    fn from(e: CodecError) -> Self {
        ActionError::Invalid(e.to_string())
    }
}

impl From<Cancelled> for ActionError {
    fn from(_: Cancelled) -> Self {
        ActionError::Fatal(SyncError::Cancelled)
    }
}

/// One async lock per repository path. The guarded value is the blob SHA this
/// run last wrote at the path.
#[derive(Default)]
struct PathLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Option<String>>>>>,
}

impl PathLocks {
    async fn acquire(&self, path: &str) -> OwnedMutexGuard<Option<String>> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(path.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

struct Written {
    previous: Option<RemoteFile>,
    content: String,
    sha: String,
    changed: bool,
}

#[derive(Default)]
struct LaneReport {
    changes: Vec<SyncChange>,
    failures: Vec<ActionFailure>,
    stopped: Option<SyncError>,
}

pub struct Executor {
    github: Arc<dyn GithubApi>,
    prompts: Arc<dyn PromptRepository>,
    globals: Arc<dyn GlobalContextRepository>,
    scope: SyncScope,
    skip_marker: String,
    max_concurrency: usize,
    locks: PathLocks,
}

impl Executor {
    pub fn new(
        github: Arc<dyn GithubApi>,
        prompts: Arc<dyn PromptRepository>,
        globals: Arc<dyn GlobalContextRepository>,
        scope: SyncScope,
        skip_marker: impl Into<String>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            github,
            prompts,
            globals,
            scope,
            skip_marker: skip_marker.into(),
            max_concurrency: max_concurrency.max(1),
            locks: PathLocks::default(),
        }
    }

    /// Runs one lane for the globals and one per prompt concurrently, then the
    /// generated types file once every lane has finished.
    pub async fn execute(
        &self,
        actions: Vec<SyncAction>,
        baselines: &[Baseline],
        cancel: &CancelSignal,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        if let Err(e) = self.record_baselines(baselines).await {
            report.stopped = Some(e);
            return report;
        }

        let mut lanes: BTreeMap<Lane, Vec<SyncAction>> = BTreeMap::new();
        for action in actions {
            lanes.entry(action.lane()).or_default().push(action);
        }
        let last = lanes.remove(&Lane::GeneratedTypes).unwrap_or_default();

        let (abort, signal) = cancel.child();
        let results: Vec<LaneReport> = stream::iter(lanes.into_values())
            .map(|lane| self.run_lane(lane, &signal, &abort))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        for lane in results {
            report.changes.extend(lane.changes);
            report.failures.extend(lane.failures);
            if let Some(e) = lane.stopped {
                // A fatal error outranks the cancellations it caused in other lanes.
                let keep = matches!(&report.stopped, Some(existing) if !matches!(existing, SyncError::Cancelled));
                if !keep {
                    report.stopped = Some(e);
                }
            }
        }
        if report.stopped.is_some() {
            return report;
        }

        let tail = self.run_lane(last, cancel, &abort).await;
        report.changes.extend(tail.changes);
        report.failures.extend(tail.failures);
        report.stopped = tail.stopped;
        report
    }

    async fn run_lane(
        &self,
        actions: Vec<SyncAction>,
        signal: &CancelSignal,
        abort: &CancelHandle,
    ) -> LaneReport {
        let mut lane = LaneReport::default();
        for action in actions {
            if signal.is_cancelled() {
                lane.stopped = Some(SyncError::Cancelled);
                break;
            }
            let path = action.path(&self.scope.folder);
            match self.apply(&action, &path, signal).await {
                Ok(Some(change)) => {
                    tracing::info!(action = %action.describe(), path = %path, "Applied sync action");
                    lane.changes.push(change);
                }
                Ok(None) => {
                    tracing::debug!(action = %action.describe(), path = %path, "Sync action left the file unchanged");
                }
                Err(ActionError::Invalid(reason)) => {
                    tracing::warn!(action = %action.describe(), path = %path, %reason, "Skipping invalid repository file");
                    lane.failures.push(ActionFailure {
                        action: action.describe(),
                        path,
                        kind: FailureKind::Invalid,
                        reason,
                    });
                }
                Err(ActionError::Conflict(reason)) => {
                    tracing::warn!(action = %action.describe(), path = %path, %reason, "Write conflict, abandoning action");
                    lane.failures.push(ActionFailure {
                        action: action.describe(),
                        path,
                        kind: FailureKind::WriteConflict,
                        reason,
                    });
                }
                Err(ActionError::Fatal(e)) => {
                    if !matches!(e, SyncError::Cancelled) {
                        tracing::error!(action = %action.describe(), path = %path, error = %e, "Sync action failed");
                        abort.cancel();
                    }
                    lane.stopped = Some(e);
                    break;
                }
            }
        }
        lane
    }

    async fn apply(
        &self,
        action: &SyncAction,
        path: &str,
        cancel: &CancelSignal,
    ) -> Result<Option<SyncChange>, ActionError> {
        match action {
            SyncAction::Repo(repo_action) => self.apply_repo(action, repo_action, path, cancel).await,
            SyncAction::System(system_action) => {
                self.apply_system(action, system_action, path, cancel).await
            }
        }
    }

    async fn apply_repo(
        &self,
        action: &SyncAction,
        repo_action: &RepoAction,
        path: &str,
        cancel: &CancelSignal,
    ) -> Result<Option<SyncChange>, ActionError> {
        use RepoAction as R;
        let expected = repo_action.expected_sha();
        match repo_action {
            R::CreateGlobals { globals } | R::UpdateGlobals { globals, .. } => {
                let written = self
                    .write(action.op(), path, encode_globals(&globals.content), expected, cancel)
                    .await?;
                self.globals
                    .set_sync_sha(self.scope.project_id, Some(written.sha.clone()))
                    .await?;
                Ok(written_change(action, path, written))
            }
            R::CreatePrompt { prompt } | R::UpdatePrompt { prompt, .. } => {
                let written = self
                    .write(action.op(), path, encode_prompt(prompt), expected, cancel)
                    .await?;
                self.prompts
                    .update_prompt(
                        prompt.id,
                        PromptUpdate {
                            last_sync_git_sha: Some(Some(written.sha.clone())),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(written_change(action, path, written))
            }
            R::RefreshPrompt { slug, .. } => {
                let library = self.prompts.list_library(self.scope.project_id).await?;
                let Some(prompt) = library.into_iter().find(|p| &p.slug == slug) else {
                    tracing::debug!(slug = %slug, "Prompt to refresh is gone from the system");
                    return Ok(None);
                };
                let written = self
                    .write(action.op(), path, encode_prompt(&prompt), expected, cancel)
                    .await?;
                self.prompts
                    .update_prompt(
                        prompt.id,
                        PromptUpdate {
                            last_sync_git_sha: Some(Some(written.sha.clone())),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(written_change(action, path, written))
            }
            R::CreateVersion { version, .. } | R::UpdateVersion { version, .. } => {
                let written = self
                    .write(action.op(), path, encode_version(version), expected, cancel)
                    .await?;
                self.set_version_hashes(
                    version.id,
                    VersionUpdate {
                        last_sync_git_sha: Some(Some(written.sha.clone())),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(written_change(action, path, written))
            }
            R::CreateContent { version, .. } | R::UpdateContent { version, .. } => {
                let written = self
                    .write(action.op(), path, version.content.clone(), expected, cancel)
                    .await?;
                self.set_version_hashes(
                    version.id,
                    VersionUpdate {
                        last_sync_content_sha: Some(Some(written.sha.clone())),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(written_change(action, path, written))
            }
            R::CreateVariables { version, .. } | R::UpdateVariables { version, .. } => {
                let written = self
                    .write(action.op(), path, encode_variables(&version.variables), expected, cancel)
                    .await?;
                self.set_version_hashes(
                    version.id,
                    VersionUpdate {
                        last_sync_variables_sha: Some(Some(written.sha.clone())),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(written_change(action, path, written))
            }
            R::DeleteVersion { version, .. } => {
                let removed = self.remove(path, expected, cancel).await?;
                self.set_version_hashes(
                    version.id,
                    VersionUpdate {
                        last_sync_git_sha: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(removed.map(|file| removed_change(action, path, file)))
            }
            R::DeleteContent { version, .. } => {
                let removed = self.remove(path, expected, cancel).await?;
                self.set_version_hashes(
                    version.id,
                    VersionUpdate {
                        last_sync_content_sha: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(removed.map(|file| removed_change(action, path, file)))
            }
            R::DeleteVariables { version, .. } => {
                let removed = self.remove(path, expected, cancel).await?;
                self.set_version_hashes(
                    version.id,
                    VersionUpdate {
                        last_sync_variables_sha: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(removed.map(|file| removed_change(action, path, file)))
            }
            R::CreateGeneratedTypes | R::UpdateGeneratedTypes { .. } => {
                // Rendered from a fresh read so pulls made by this run are included.
                let state = collect_system_state(
                    self.prompts.as_ref(),
                    self.globals.as_ref(),
                    self.scope.project_id,
                )
                .await
                .map_err(ActionError::Fatal)?;
                let written = self
                    .write(action.op(), path, render_types(&state), expected, cancel)
                    .await?;
                Ok(written_change(action, path, written))
            }
        }
    }

    async fn apply_system(
        &self,
        action: &SyncAction,
        system_action: &SystemAction,
        path: &str,
        cancel: &CancelSignal,
    ) -> Result<Option<SyncChange>, ActionError> {
        use SystemAction as S;
        let project_id = self.scope.project_id;
        match system_action {
            S::UpdateGlobals {
                file,
                old_content,
                old_sha,
            } => {
                let remote = self.fetch(path, cancel).await?;
                let content = decode_globals(&remote.content)?;
                self.globals
                    .update_content(project_id, content, file.last_modified, Some(remote.sha.clone()))
                    .await?;
                Ok(Some(pulled_change(action, path, Some(old_content), Some(old_sha), remote)))
            }
            S::CreatePrompt { slug, .. } => {
                let remote = self.fetch(path, cancel).await?;
                let parsed = decode_prompt(&remote.content, slug)?;
                self.prompts
                    .create_prompt(NewPrompt {
                        project_id,
                        uuid: parsed.uuid,
                        slug: slug.as_str(),
                        name: parsed.name.as_str(),
                        created_at: parsed.created_at,
                        updated_at: parsed.updated_at,
                        last_sync_git_sha: Some(remote.sha.clone()),
                    })
                    .await?;
                Ok(Some(pulled_change(action, path, None, None, remote)))
            }
            S::UpdatePrompt {
                prompt_id,
                slug,
                old_content,
                old_sha,
                ..
            } => {
                let remote = self.fetch(path, cancel).await?;
                let parsed = decode_prompt(&remote.content, slug)?;
                self.prompts
                    .update_prompt(
                        *prompt_id,
                        PromptUpdate {
                            name: Some(parsed.name),
                            created_at: Some(parsed.created_at),
                            updated_at: Some(parsed.updated_at),
                            last_sync_git_sha: Some(Some(remote.sha.clone())),
                        },
                    )
                    .await?;
                Ok(Some(pulled_change(action, path, Some(old_content), Some(old_sha), remote)))
            }
            S::CreateVersion { slug, version } => {
                let descriptor = self.fetch(&version.descriptor.path, cancel).await?;
                let content = self.fetch(&version.content.path, cancel).await?;
                let variables = match &version.variables {
                    Some(file) => Some(self.fetch(&file.path, cancel).await?),
                    None => None,
                };

                let parsed = decode_version(&descriptor.content, &version.version)?;
                let body = decode_content(&content.content)?;
                let parsed_variables = match &variables {
                    Some(file) => decode_variables(&file.content)?,
                    None => Vec::new(),
                };

                let prompt = self
                    .prompts
                    .find_prompt(project_id, slug)
                    .await?
                    .ok_or_else(|| {
                        ActionError::Invalid(format!("prompt '{}' does not exist in the system", slug))
                    })?;
                let version_id = self
                    .prompts
                    .create_version(NewVersion {
                        prompt_id: prompt.id,
                        uuid: parsed.uuid,
                        version: version.version.clone(),
                        status: parsed.status,
                        config: parsed.config,
                        content: body,
                        created_at: parsed.created_at,
                        updated_at: parsed.updated_at,
                        last_sync_git_sha: Some(descriptor.sha.clone()),
                        last_sync_content_sha: Some(content.sha.clone()),
                        last_sync_variables_sha: variables.as_ref().map(|f| f.sha.clone()),
                    })
                    .await?;
                if !parsed_variables.is_empty() {
                    self.prompts
                        .replace_variables(
                            version_id,
                            parsed_variables.into_iter().map(SystemVariable::from).collect(),
                        )
                        .await?;
                }
                Ok(Some(pulled_change(action, path, None, None, descriptor)))
            }
            S::UpdateVersion {
                version_id,
                version,
                old_content,
                old_sha,
                ..
            } => {
                let remote = self.fetch(path, cancel).await?;
                let parsed = decode_version(&remote.content, version)?;
                self.prompts
                    .update_version(
                        *version_id,
                        VersionUpdate {
                            status: Some(parsed.status),
                            config: Some(parsed.config),
                            created_at: Some(parsed.created_at),
                            updated_at: Some(parsed.updated_at),
                            last_sync_git_sha: Some(Some(remote.sha.clone())),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(Some(pulled_change(action, path, Some(old_content), Some(old_sha), remote)))
            }
            S::UpdateContent {
                version_id,
                old_content,
                old_sha,
                ..
            } => {
                let remote = self.fetch(path, cancel).await?;
                let body = decode_content(&remote.content)?;
                self.prompts
                    .update_version(
                        *version_id,
                        VersionUpdate {
                            content: Some(body),
                            last_sync_content_sha: Some(Some(remote.sha.clone())),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(Some(pulled_change(action, path, Some(old_content), Some(old_sha), remote)))
            }
            S::CreateVariables { version_id, .. } => {
                let remote = self.fetch(path, cancel).await?;
                self.pull_variables(*version_id, &remote).await?;
                Ok(Some(pulled_change(action, path, None, None, remote)))
            }
            S::UpdateVariables {
                version_id,
                old_content,
                old_sha,
                ..
            } => {
                let remote = self.fetch(path, cancel).await?;
                self.pull_variables(*version_id, &remote).await?;
                Ok(Some(pulled_change(action, path, Some(old_content), Some(old_sha), remote)))
            }
            S::DeleteVariables {
                version_id,
                old_content,
                old_sha,
                ..
            } => {
                self.prompts.delete_variables(*version_id).await?;
                self.set_version_hashes(
                    *version_id,
                    VersionUpdate {
                        last_sync_variables_sha: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(Some(SyncChange {
                    target: action.target(),
                    op: action.op(),
                    entity: action.entity(),
                    path: path.to_string(),
                    old_content: Some(old_content.clone()),
                    new_content: None,
                    old_sha: Some(old_sha.clone()),
                    new_sha: None,
                }))
            }
        }
    }

    async fn pull_variables(&self, version_id: i32, remote: &RemoteFile) -> Result<(), ActionError> {
        let parsed = decode_variables(&remote.content)?;
        self.prompts
            .replace_variables(version_id, parsed.into_iter().map(SystemVariable::from).collect())
            .await?;
        self.set_version_hashes(
            version_id,
            VersionUpdate {
                last_sync_variables_sha: Some(Some(remote.sha.clone())),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    async fn set_version_hashes(&self, version_id: i32, update: VersionUpdate) -> Result<(), DbErr> {
        self.prompts.update_version(version_id, update).await
    }

    async fn record_baselines(&self, baselines: &[Baseline]) -> Result<(), SyncError> {
        for baseline in baselines {
            match baseline {
                Baseline::Globals { sha } => {
                    self.globals
                        .set_sync_sha(self.scope.project_id, Some(sha.clone()))
                        .await?
                }
                Baseline::Prompt { prompt_id, sha } => {
                    self.prompts
                        .update_prompt(
                            *prompt_id,
                            PromptUpdate {
                                last_sync_git_sha: Some(Some(sha.clone())),
                                ..Default::default()
                            },
                        )
                        .await?
                }
                Baseline::Version { version_id, sha } => {
                    self.set_version_hashes(
                        *version_id,
                        VersionUpdate {
                            last_sync_git_sha: Some(Some(sha.clone())),
                            ..Default::default()
                        },
                    )
                    .await?
                }
                Baseline::Content { version_id, sha } => {
                    self.set_version_hashes(
                        *version_id,
                        VersionUpdate {
                            last_sync_content_sha: Some(Some(sha.clone())),
                            ..Default::default()
                        },
                    )
                    .await?
                }
                Baseline::Variables { version_id, sha } => {
                    self.set_version_hashes(
                        *version_id,
                        VersionUpdate {
                            last_sync_variables_sha: Some(sha.clone()),
                            ..Default::default()
                        },
                    )
                    .await?
                }
            }
        }
        if !baselines.is_empty() {
            tracing::debug!(count = baselines.len(), "Refreshed stale sync hashes");
        }
        Ok(())
    }

    fn commit_message(&self, op: SyncOp, path: &str) -> String {
        let verb = match op {
            SyncOp::Create => "Create",
            SyncOp::Update => "Update",
            SyncOp::Delete => "Delete",
        };
        format!("{} {} {}", verb, path, self.skip_marker)
    }

    /// Reads the file at the sync ref. A file that vanished since collection
    /// counts as a conflict for this action.
    async fn fetch(&self, path: &str, cancel: &CancelSignal) -> Result<RemoteFile, ActionError> {
        cancel
            .run(self.github.get_file(&self.scope.repo, path, &self.scope.branch))
            .await??
            .ok_or_else(|| ActionError::Conflict(format!("{} disappeared from the repository", path)))
    }

    /// `expected` is the SHA the action was planned against, `None` for a file
    /// that was absent. A path this run already wrote expects that write instead.
    async fn write(
        &self,
        op: SyncOp,
        path: &str,
        content: String,
        expected: Option<&str>,
        cancel: &CancelSignal,
    ) -> Result<Written, ActionError> {
        let mut last_written = self.locks.acquire(path).await;
        let previous = cancel
            .run(self.github.get_file(&self.scope.repo, path, &self.scope.branch))
            .await??;
        let sha = git_blob_sha(content.as_bytes());
        if previous.as_ref().is_some_and(|file| file.sha == sha) {
            *last_written = Some(sha.clone());
            return Ok(Written {
                previous,
                content,
                sha,
                changed: false,
            });
        }

        let expected = last_written.as_deref().or(expected);
        let current = previous.as_ref().map(|file| file.sha.as_str());
        if current != expected {
            return Err(moved_since_planning(path, expected, current));
        }

        let write = FileWrite {
            path: path.to_string(),
            content,
            message: self.commit_message(op, path),
            branch: self.scope.branch.clone(),
        };
        let sha = match &previous {
            Some(file) => {
                cancel
                    .run(self.github.update_file(&self.scope.repo, &write, &file.sha))
                    .await??
            }
            None => cancel.run(self.github.create_file(&self.scope.repo, &write)).await??,
        };
        *last_written = Some(sha.clone());
        Ok(Written {
            previous,
            content: write.content,
            sha,
            changed: true,
        })
    }

    /// Deleting an absent file is a no-op.
    async fn remove(
        &self,
        path: &str,
        expected: Option<&str>,
        cancel: &CancelSignal,
    ) -> Result<Option<RemoteFile>, ActionError> {
        let _guard = self.locks.acquire(path).await;
        let Some(current) = cancel
            .run(self.github.get_file(&self.scope.repo, path, &self.scope.branch))
            .await??
        else {
            tracing::warn!(path, "File already absent, nothing to delete");
            return Ok(None);
        };
        if Some(current.sha.as_str()) != expected {
            return Err(moved_since_planning(path, expected, Some(&current.sha)));
        }

        let delete = FileDelete {
            path: path.to_string(),
            sha: current.sha.clone(),
            message: self.commit_message(SyncOp::Delete, path),
            branch: self.scope.branch.clone(),
        };
        match cancel.run(self.github.delete_file(&self.scope.repo, &delete)).await? {
            Ok(()) => Ok(Some(current)),
            Err(GithubError::NotFound(_)) => {
                tracing::warn!(path, "File already absent, nothing to delete");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn moved_since_planning(path: &str, expected: Option<&str>, current: Option<&str>) -> ActionError {
    ActionError::Conflict(format!(
        "{} changed in the repository since the sync was planned (expected {}, found {})",
        path,
        expected.unwrap_or("no file"),
        current.unwrap_or("no file"),
    ))
}

fn written_change(action: &SyncAction, path: &str, written: Written) -> Option<SyncChange> {
    if !written.changed {
        return None;
    }
    Some(SyncChange {
        target: action.target(),
        op: action.op(),
        entity: action.entity(),
        path: path.to_string(),
        old_content: written.previous.as_ref().map(|f| f.content.clone()),
        new_content: Some(written.content),
        old_sha: written.previous.map(|f| f.sha),
        new_sha: Some(written.sha),
    })
}

fn removed_change(action: &SyncAction, path: &str, removed: RemoteFile) -> SyncChange {
    SyncChange {
        target: action.target(),
        op: action.op(),
        entity: action.entity(),
        path: path.to_string(),
        old_content: Some(removed.content),
        new_content: None,
        old_sha: Some(removed.sha),
        new_sha: None,
    }
}

fn pulled_change(
    action: &SyncAction,
    path: &str,
    old_content: Option<&String>,
    old_sha: Option<&String>,
    remote: RemoteFile,
) -> SyncChange {
    SyncChange {
        target: action.target(),
        op: action.op(),
        entity: action.entity(),
        path: path.to_string(),
        old_content: old_content.cloned(),
        new_content: Some(remote.content),
        old_sha: old_sha.cloned(),
        new_sha: Some(remote.sha),
    }
}
