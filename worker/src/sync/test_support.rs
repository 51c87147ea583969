//! Fixtures and an in-memory hosting API for engine tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::domain::files::{encode_globals, encode_prompt, encode_variables, encode_version};
use common::domain::library::{
    SystemGlobals, SystemPrompt, SystemState, SystemVariable, SystemVersion, VariableType,
    VersionStatus,
};
use common::domain::{git_blob_sha, paths};
use common::github::{
    CommitInfo, FileDelete, FileWrite, GithubError, NewPullRequest, PullRequest, RemoteFile,
    RepoRef, TreeEntry,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use uuid::Uuid;

use super::domain::{RepoFile, RepoPrompt, RepoState, RepoVersion};
use crate::ports::GithubApi;

pub fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn sha(content: &str) -> String {
    git_blob_sha(content.as_bytes())
}

pub fn system_version(version: &str, status: VersionStatus) -> SystemVersion {
    SystemVersion {
        id: 1,
        uuid: Uuid::new_v4(),
        version: version.to_string(),
        status,
        config: Some(serde_json::json!({"model": "openrouter/auto"})),
        content: format!("Hello {{{{ name }}}} from {}", version),
        created_at: ts("2025-01-01T00:00:00Z"),
        updated_at: ts("2025-01-01T00:00:00Z"),
        last_sync_git_sha: None,
        last_sync_content_sha: None,
        last_sync_variables_sha: None,
        variables: Vec::new(),
    }
}

pub fn system_variable(name: &str, updated_at: DateTime<Utc>) -> SystemVariable {
    SystemVariable {
        uuid: Uuid::new_v4(),
        name: name.to_string(),
        var_type: VariableType::String,
        required: true,
        default_value: None,
        created_at: updated_at,
        updated_at,
    }
}

pub fn system_prompt(slug: &str, versions: Vec<SystemVersion>) -> SystemPrompt {
    SystemPrompt {
        id: 1,
        uuid: Uuid::new_v4(),
        slug: slug.to_string(),
        name: slug.to_uppercase(),
        created_at: ts("2025-01-01T00:00:00Z"),
        updated_at: ts("2025-01-01T00:00:00Z"),
        last_sync_git_sha: None,
        versions,
    }
}

pub fn system_globals() -> SystemGlobals {
    SystemGlobals {
        id: 1,
        content: serde_json::json!({"company": "Acme"}),
        updated_at: ts("2025-01-01T00:00:00Z"),
        last_sync_git_sha: None,
    }
}

pub fn repo_file(path: String, sha: String, last_modified: DateTime<Utc>) -> RepoFile {
    RepoFile {
        path,
        sha,
        last_modified,
    }
}

/// The repository exactly as the system would write it, types file included.
pub fn mirror(system: &SystemState, folder: &str, at: DateTime<Utc>) -> RepoState {
    let prompts = system
        .prompts
        .iter()
        .map(|prompt| RepoPrompt {
            slug: prompt.slug.clone(),
            descriptor: Some(repo_file(
                paths::prompt_path(folder, &prompt.slug),
                sha(&encode_prompt(prompt)),
                at,
            )),
            versions: prompt
                .versions
                .iter()
                .filter(|v| !v.is_archived())
                .map(|v| RepoVersion {
                    version: v.version.clone(),
                    descriptor: repo_file(
                        paths::version_path(folder, &prompt.slug, &v.version),
                        sha(&encode_version(v)),
                        at,
                    ),
                    content: repo_file(
                        paths::content_path(folder, &prompt.slug, &v.version),
                        sha(&v.content),
                        at,
                    ),
                    variables: (!v.variables.is_empty()).then(|| {
                        repo_file(
                            paths::variables_path(folder, &prompt.slug, &v.version),
                            sha(&encode_variables(&v.variables)),
                            at,
                        )
                    }),
                })
                .collect(),
        })
        .collect();

    RepoState {
        globals: Some(repo_file(
            paths::globals_path(folder),
            sha(&encode_globals(&system.globals.content)),
            at,
        )),
        types: Some(repo_file(paths::types_path(folder), "types".into(), at)),
        prompts,
    }
}

/// Sets every stored sync hash to the current system serialization.
pub fn mark_synced(system: &mut SystemState) {
    system.globals.last_sync_git_sha = Some(sha(&encode_globals(&system.globals.content)));
    for prompt in &mut system.prompts {
        prompt.last_sync_git_sha = Some(sha(&encode_prompt(prompt)));
        for version in &mut prompt.versions {
            version.last_sync_git_sha = Some(sha(&encode_version(version)));
            version.last_sync_content_sha = Some(sha(&version.content));
            version.last_sync_variables_sha = (!version.variables.is_empty())
                .then(|| sha(&encode_variables(&version.variables)));
        }
    }
}

#[derive(Debug, Clone)]
struct Blob {
    content: String,
    modified: DateTime<Utc>,
}

#[derive(Debug)]
struct FakeRepo {
    branches: BTreeMap<String, BTreeMap<String, Blob>>,
    pulls: Vec<PullRequest>,
    labels: BTreeSet<String>,
    clock: DateTime<Utc>,
    commits: Vec<String>,
    conflict_paths: BTreeSet<String>,
    broken_history: bool,
}

/// A single repository with branches, pull requests and labels. Every engine
/// write advances the clock by one second.
#[derive(Debug)]
pub struct FakeGithub {
    state: Mutex<FakeRepo>,
}

impl FakeGithub {
    pub fn new(default_branch: &str) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(default_branch.to_string(), BTreeMap::new());
        Self {
            state: Mutex::new(FakeRepo {
                branches,
                pulls: Vec::new(),
                labels: BTreeSet::new(),
                clock: ts("2025-06-01T00:00:00Z"),
                commits: Vec::new(),
                conflict_paths: BTreeSet::new(),
                broken_history: false,
            }),
        }
    }

    /// A human edit made outside the engine.
    pub fn put(&self, branch: &str, path: &str, content: &str, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.branches.entry(branch.to_string()).or_default().insert(
            path.to_string(),
            Blob {
                content: content.to_string(),
                modified: at,
            },
        );
    }

    pub fn remove(&self, branch: &str, path: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(files) = state.branches.get_mut(branch) {
            files.remove(path);
        }
    }

    pub fn read(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .branches
            .get(branch)
            .and_then(|files| files.get(path))
            .map(|blob| blob.content.clone())
    }

    pub fn paths(&self, branch: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .branches
            .get(branch)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.state.lock().unwrap().branches.contains_key(branch)
    }

    /// Commit messages of engine writes, oldest first.
    pub fn commits(&self) -> Vec<String> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn pulls(&self) -> Vec<PullRequest> {
        self.state.lock().unwrap().pulls.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().clock
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap();
        state.clock += by;
    }

    pub fn reject_writes_to(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .conflict_paths
            .insert(path.to_string());
    }

    pub fn break_history(&self) {
        self.state.lock().unwrap().broken_history = true;
    }

    fn commit(state: &mut FakeRepo, branch: &str, path: &str, content: Option<&str>, message: &str) {
        state.clock += Duration::seconds(1);
        let modified = state.clock;
        let files = state.branches.entry(branch.to_string()).or_default();
        match content {
            Some(content) => {
                files.insert(
                    path.to_string(),
                    Blob {
                        content: content.to_string(),
                        modified,
                    },
                );
            }
            None => {
                files.remove(path);
            }
        }
        state.commits.push(message.to_string());
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    async fn get_file(
        &self,
        _repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, GithubError> {
        Ok(self.read(git_ref, path).map(|content| RemoteFile {
            path: path.to_string(),
            sha: sha(&content),
            content,
        }))
    }

    async fn get_tree(&self, _repo: &RepoRef, git_ref: &str) -> Result<Vec<TreeEntry>, GithubError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .branches
            .get(git_ref)
            .map(|files| {
                files
                    .iter()
                    .map(|(path, blob)| TreeEntry {
                        path: path.clone(),
                        sha: sha(&blob.content),
                        kind: "blob".to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_commit(
        &self,
        _repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<CommitInfo>, GithubError> {
        let state = self.state.lock().unwrap();
        if state.broken_history {
            return Err(GithubError::Status {
                status: 500,
                context: format!("commits {}", path),
                body: "history unavailable".into(),
            });
        }
        Ok(state
            .branches
            .get(git_ref)
            .and_then(|files| files.get(path))
            .map(|blob| CommitInfo {
                sha: sha(&blob.content),
                message: "edit".into(),
                date: blob.modified,
            }))
    }

    async fn create_file(&self, _repo: &RepoRef, write: &FileWrite) -> Result<String, GithubError> {
        let mut state = self.state.lock().unwrap();
        let exists = state
            .branches
            .get(&write.branch)
            .is_some_and(|files| files.contains_key(&write.path));
        if exists || state.conflict_paths.contains(&write.path) {
            return Err(GithubError::Unprocessable {
                context: format!("create {}", write.path),
                body: "\"sha\" wasn't supplied.".into(),
            });
        }
        Self::commit(&mut state, &write.branch, &write.path, Some(&write.content), &write.message);
        Ok(sha(&write.content))
    }

    async fn update_file(
        &self,
        _repo: &RepoRef,
        write: &FileWrite,
        current: &str,
    ) -> Result<String, GithubError> {
        let mut state = self.state.lock().unwrap();
        let matches = state
            .branches
            .get(&write.branch)
            .and_then(|files| files.get(&write.path))
            .is_some_and(|blob| sha(&blob.content) == current);
        if !matches || state.conflict_paths.contains(&write.path) {
            return Err(GithubError::Conflict(format!("update {}", write.path)));
        }
        Self::commit(&mut state, &write.branch, &write.path, Some(&write.content), &write.message);
        Ok(sha(&write.content))
    }

    async fn delete_file(&self, _repo: &RepoRef, delete: &FileDelete) -> Result<(), GithubError> {
        let mut state = self.state.lock().unwrap();
        let matches = state
            .branches
            .get(&delete.branch)
            .and_then(|files| files.get(&delete.path))
            .is_some_and(|blob| sha(&blob.content) == delete.sha);
        if !matches || state.conflict_paths.contains(&delete.path) {
            return Err(GithubError::Conflict(format!("delete {}", delete.path)));
        }
        Self::commit(&mut state, &delete.branch, &delete.path, None, &delete.message);
        Ok(())
    }

    async fn branch_head(
        &self,
        _repo: &RepoRef,
        branch: &str,
    ) -> Result<Option<String>, GithubError> {
        Ok(self.has_branch(branch).then(|| format!("head-{}", branch)))
    }

    async fn create_branch(
        &self,
        _repo: &RepoRef,
        branch: &str,
        from_sha: &str,
    ) -> Result<(), GithubError> {
        let mut state = self.state.lock().unwrap();
        let source = from_sha
            .strip_prefix("head-")
            .and_then(|name| state.branches.get(name))
            .cloned()
            .ok_or_else(|| GithubError::Unprocessable {
                context: format!("create branch {}", branch),
                body: "Object does not exist".into(),
            })?;
        state.branches.insert(branch.to_string(), source);
        Ok(())
    }

    async fn delete_branch(&self, _repo: &RepoRef, branch: &str) -> Result<(), GithubError> {
        self.state.lock().unwrap().branches.remove(branch);
        Ok(())
    }

    async fn list_pull_requests(
        &self,
        _repo: &RepoRef,
        label: &str,
    ) -> Result<Vec<PullRequest>, GithubError> {
        Ok(self
            .pulls()
            .into_iter()
            .filter(|pull| pull.labels.iter().any(|l| l == label))
            .collect())
    }

    async fn create_pull_request(
        &self,
        _repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequest, GithubError> {
        let mut state = self.state.lock().unwrap();
        let created = PullRequest {
            number: state.pulls.len() as u64 + 1,
            head_ref: pull.head.clone(),
            html_url: format!("https://github.com/acme/prompts/pull/{}", state.pulls.len() + 1),
            labels: Vec::new(),
        };
        state.pulls.push(created.clone());
        Ok(created)
    }

    async fn ensure_label(&self, _repo: &RepoRef, label: &str) -> Result<(), GithubError> {
        self.state.lock().unwrap().labels.insert(label.to_string());
        Ok(())
    }

    async fn add_labels(
        &self,
        _repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError> {
        let mut state = self.state.lock().unwrap();
        let pull = state
            .pulls
            .iter_mut()
            .find(|pull| pull.number == number)
            .ok_or_else(|| GithubError::NotFound(format!("pull {}", number)))?;
        pull.labels.extend(labels.iter().cloned());
        Ok(())
    }
}
