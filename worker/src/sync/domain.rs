use chrono::{DateTime, Utc};
use common::domain::library::{SystemGlobals, SystemPrompt, SystemVersion};
use common::domain::paths;
use common::github::PullRequest;
use serde::{Deserialize, Serialize};

/// A library file as found in the repository tree at the sync ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: String,
    pub sha: String,
    /// Date of the latest commit touching the path, the epoch when unknown.
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepoState {
    pub globals: Option<RepoFile>,
    pub types: Option<RepoFile>,
    pub prompts: Vec<RepoPrompt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPrompt {
    pub slug: String,
    /// `prompt.json`; versions may exist on disk without it.
    pub descriptor: Option<RepoFile>,
    pub versions: Vec<RepoVersion>,
}

/// Only versions with both `version.json` and a content body are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoVersion {
    pub version: String,
    pub descriptor: RepoFile,
    pub content: RepoFile,
    pub variables: Option<RepoFile>,
}

impl RepoState {
    pub fn is_empty(&self) -> bool {
        self.globals.is_none() && self.types.is_none() && self.prompts.is_empty()
    }

    pub fn prompt(&self, slug: &str) -> Option<&RepoPrompt> {
        self.prompts.iter().find(|p| p.slug == slug)
    }
}

impl RepoPrompt {
    pub fn version(&self, version: &str) -> Option<&RepoVersion> {
        self.versions.iter().find(|v| v.version == version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTarget {
    System,
    Repo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOp {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncEntity {
    Prompt,
    Version,
    Variables,
    Content,
    Globals,
    GeneratedTypes,
}

/// Repository-directed writes. Payloads carry the system values to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum RepoAction {
    CreateGlobals {
        globals: SystemGlobals,
    },
    UpdateGlobals {
        globals: SystemGlobals,
        repo_sha: String,
    },
    CreatePrompt {
        prompt: SystemPrompt,
    },
    UpdatePrompt {
        prompt: SystemPrompt,
        repo_sha: String,
    },
    /// Re-encodes `prompt.json` from the system after this run pulled into the
    /// prompt, since `latestVersion` derives from the version statuses.
    RefreshPrompt {
        slug: String,
        repo_sha: Option<String>,
    },
    CreateVersion {
        slug: String,
        version: SystemVersion,
    },
    UpdateVersion {
        slug: String,
        version: SystemVersion,
        repo_sha: String,
    },
    DeleteVersion {
        slug: String,
        version: SystemVersion,
        repo_sha: String,
    },
    CreateContent {
        slug: String,
        version: SystemVersion,
    },
    UpdateContent {
        slug: String,
        version: SystemVersion,
        repo_sha: String,
    },
    DeleteContent {
        slug: String,
        version: SystemVersion,
        repo_sha: String,
    },
    CreateVariables {
        slug: String,
        version: SystemVersion,
    },
    UpdateVariables {
        slug: String,
        version: SystemVersion,
        repo_sha: String,
    },
    DeleteVariables {
        slug: String,
        version: SystemVersion,
        repo_sha: String,
    },
    CreateGeneratedTypes,
    UpdateGeneratedTypes {
        repo_sha: String,
    },
}

/// System-directed writes. Payloads carry the repository file to read and
/// what the system held before, for the change record.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemAction {
    UpdateGlobals {
        file: RepoFile,
        old_content: String,
        old_sha: String,
    },
    CreatePrompt {
        slug: String,
        file: RepoFile,
    },
    UpdatePrompt {
        prompt_id: i32,
        slug: String,
        file: RepoFile,
        old_content: String,
        old_sha: String,
    },
    CreateVersion {
        slug: String,
        version: RepoVersion,
    },
    UpdateVersion {
        version_id: i32,
        slug: String,
        version: String,
        file: RepoFile,
        old_content: String,
        old_sha: String,
    },
    UpdateContent {
        version_id: i32,
        slug: String,
        version: String,
        file: RepoFile,
        old_content: String,
        old_sha: String,
    },
    CreateVariables {
        version_id: i32,
        slug: String,
        version: String,
        file: RepoFile,
    },
    UpdateVariables {
        version_id: i32,
        slug: String,
        version: String,
        file: RepoFile,
        old_content: String,
        old_sha: String,
    },
    DeleteVariables {
        version_id: i32,
        slug: String,
        version: String,
        old_content: String,
        old_sha: String,
    },
}

impl RepoAction {
    /// Blob SHA the path held when the action was planned; `None` when the
    /// file was absent. A write only proceeds while the path still holds it.
    pub fn expected_sha(&self) -> Option<&str> {
        use RepoAction as R;
        match self {
            R::CreateGlobals { .. }
            | R::CreatePrompt { .. }
            | R::CreateVersion { .. }
            | R::CreateContent { .. }
            | R::CreateVariables { .. }
            | R::CreateGeneratedTypes => None,
            R::RefreshPrompt { repo_sha, .. } => repo_sha.as_deref(),
            R::UpdateGlobals { repo_sha, .. }
            | R::UpdatePrompt { repo_sha, .. }
            | R::UpdateVersion { repo_sha, .. }
            | R::DeleteVersion { repo_sha, .. }
            | R::UpdateContent { repo_sha, .. }
            | R::DeleteContent { repo_sha, .. }
            | R::UpdateVariables { repo_sha, .. }
            | R::DeleteVariables { repo_sha, .. }
            | R::UpdateGeneratedTypes { repo_sha } => Some(repo_sha.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    Repo(RepoAction),
    System(SystemAction),
}

/// Actions in one lane run in order; lanes run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    Globals,
    Prompt(String),
    GeneratedTypes,
}

impl SyncAction {
    pub fn target(&self) -> SyncTarget {
        match self {
            SyncAction::Repo(_) => SyncTarget::Repo,
            SyncAction::System(_) => SyncTarget::System,
        }
    }

    pub fn op(&self) -> SyncOp {
        use RepoAction as R;
        use SystemAction as S;
        match self {
            SyncAction::Repo(action) => match action {
                R::CreateGlobals { .. }
                | R::CreatePrompt { .. }
                | R::CreateVersion { .. }
                | R::CreateContent { .. }
                | R::CreateVariables { .. }
                | R::CreateGeneratedTypes => SyncOp::Create,
                R::UpdateGlobals { .. }
                | R::UpdatePrompt { .. }
                | R::RefreshPrompt { .. }
                | R::UpdateVersion { .. }
                | R::UpdateContent { .. }
                | R::UpdateVariables { .. }
                | R::UpdateGeneratedTypes { .. } => SyncOp::Update,
                R::DeleteVersion { .. } | R::DeleteContent { .. } | R::DeleteVariables { .. } => {
                    SyncOp::Delete
                }
            },
            SyncAction::System(action) => match action {
                S::CreatePrompt { .. } | S::CreateVersion { .. } | S::CreateVariables { .. } => {
                    SyncOp::Create
                }
                S::UpdateGlobals { .. }
                | S::UpdatePrompt { .. }
                | S::UpdateVersion { .. }
                | S::UpdateContent { .. }
                | S::UpdateVariables { .. } => SyncOp::Update,
                S::DeleteVariables { .. } => SyncOp::Delete,
            },
        }
    }

    pub fn entity(&self) -> SyncEntity {
        use RepoAction as R;
        use SystemAction as S;
        match self {
            SyncAction::Repo(action) => match action {
                R::CreateGlobals { .. } | R::UpdateGlobals { .. } => SyncEntity::Globals,
                R::CreatePrompt { .. } | R::UpdatePrompt { .. } | R::RefreshPrompt { .. } => {
                    SyncEntity::Prompt
                }
                R::CreateVersion { .. } | R::UpdateVersion { .. } | R::DeleteVersion { .. } => {
                    SyncEntity::Version
                }
                R::CreateContent { .. } | R::UpdateContent { .. } | R::DeleteContent { .. } => {
                    SyncEntity::Content
                }
                R::CreateVariables { .. }
                | R::UpdateVariables { .. }
                | R::DeleteVariables { .. } => SyncEntity::Variables,
                R::CreateGeneratedTypes | R::UpdateGeneratedTypes { .. } => {
                    SyncEntity::GeneratedTypes
                }
            },
            SyncAction::System(action) => match action {
                S::UpdateGlobals { .. } => SyncEntity::Globals,
                S::CreatePrompt { .. } | S::UpdatePrompt { .. } => SyncEntity::Prompt,
                S::CreateVersion { .. } | S::UpdateVersion { .. } => SyncEntity::Version,
                S::UpdateContent { .. } => SyncEntity::Content,
                S::CreateVariables { .. }
                | S::UpdateVariables { .. }
                | S::DeleteVariables { .. } => SyncEntity::Variables,
            },
        }
    }

    /// Prompt slug and version the action is about, when it has them.
    pub fn coordinates(&self) -> (Option<&str>, Option<&str>) {
        use RepoAction as R;
        use SystemAction as S;
        match self {
            SyncAction::Repo(action) => match action {
                R::CreateGlobals { .. }
                | R::UpdateGlobals { .. }
                | R::CreateGeneratedTypes
                | R::UpdateGeneratedTypes { .. } => (None, None),
                R::CreatePrompt { prompt } | R::UpdatePrompt { prompt, .. } => {
                    (Some(prompt.slug.as_str()), None)
                }
                R::RefreshPrompt { slug, .. } => (Some(slug.as_str()), None),
                R::CreateVersion { slug, version }
                | R::UpdateVersion { slug, version, .. }
                | R::DeleteVersion { slug, version, .. }
                | R::CreateContent { slug, version }
                | R::UpdateContent { slug, version, .. }
                | R::DeleteContent { slug, version, .. }
                | R::CreateVariables { slug, version }
                | R::UpdateVariables { slug, version, .. }
                | R::DeleteVariables { slug, version, .. } => {
                    (Some(slug.as_str()), Some(version.version.as_str()))
                }
            },
            SyncAction::System(action) => match action {
                S::UpdateGlobals { .. } => (None, None),
                S::CreatePrompt { slug, .. } | S::UpdatePrompt { slug, .. } => {
                    (Some(slug.as_str()), None)
                }
                S::CreateVersion { slug, version } => {
                    (Some(slug.as_str()), Some(version.version.as_str()))
                }
                S::UpdateVersion { slug, version, .. }
                | S::UpdateContent { slug, version, .. }
                | S::CreateVariables { slug, version, .. }
                | S::UpdateVariables { slug, version, .. }
                | S::DeleteVariables { slug, version, .. } => {
                    (Some(slug.as_str()), Some(version.as_str()))
                }
            },
        }
    }

    pub fn lane(&self) -> Lane {
        match (self.entity(), self.coordinates()) {
            (SyncEntity::Globals, _) => Lane::Globals,
            (SyncEntity::GeneratedTypes, _) => Lane::GeneratedTypes,
            (_, (Some(slug), _)) => Lane::Prompt(slug.to_string()),
            (_, (None, _)) => Lane::Globals,
        }
    }

    /// Repository path the action reads or writes.
    pub fn path(&self, folder: &str) -> String {
        let (slug, version) = self.coordinates();
        let slug = slug.unwrap_or_default();
        let version = version.unwrap_or_default();
        match self.entity() {
            SyncEntity::Globals => paths::globals_path(folder),
            SyncEntity::GeneratedTypes => paths::types_path(folder),
            SyncEntity::Prompt => paths::prompt_path(folder, slug),
            SyncEntity::Version => paths::version_path(folder, slug, version),
            SyncEntity::Content => paths::content_path(folder, slug, version),
            SyncEntity::Variables => paths::variables_path(folder, slug, version),
        }
    }

    pub fn describe(&self) -> String {
        let (slug, version) = self.coordinates();
        let mut out = format!("{:?} {:?} {:?}", self.target(), self.op(), self.entity())
            .to_lowercase();
        if let Some(slug) = slug {
            out.push(' ');
            out.push_str(slug);
        }
        if let Some(version) = version {
            out.push('@');
            out.push_str(version);
        }
        out
    }
}

/// One executed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChange {
    pub target: SyncTarget,
    pub op: SyncOp,
    pub entity: SyncEntity,
    pub path: String,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub old_sha: Option<String>,
    pub new_sha: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Repository file failed parsing, schema or template checks.
    Invalid,
    /// The file changed between reading its SHA and writing.
    WriteConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub action: String,
    pub path: String,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    SystemWins,
    RepoWins,
    Surfaced,
}

/// An axis edited on both sides since the last sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    pub entity: SyncEntity,
    pub path: String,
    /// `None` when the system side deleted the entity.
    pub system_sha: Option<String>,
    pub repo_sha: String,
    pub base_sha: Option<String>,
    pub resolution: ConflictResolution,
}

/// A stored sync hash that lags behind a side already in sync. Recorded
/// silently; it is bookkeeping, not a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    Globals { sha: String },
    Prompt { prompt_id: i32, sha: String },
    Version { version_id: i32, sha: String },
    Content { version_id: i32, sha: String },
    Variables { version_id: i32, sha: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Complete,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub branch: String,
    pub changes: Vec<SyncChange>,
    pub failures: Vec<ActionFailure>,
    pub conflicts: Vec<SyncConflict>,
    pub pull_request: Option<PullRequest>,
}

impl SyncOutcome {
    pub fn changes_made(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn repo_changed(&self) -> bool {
        self.changes.iter().any(|c| c.target == SyncTarget::Repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Start { branch: String },
    Complete { changes_made: bool, changes: usize, failures: usize, conflicts: usize },
    Aborted { changes: usize },
    Error { message: String },
}

impl SyncEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::Start { .. } => "SYNC_START",
            SyncEvent::Complete { .. } => "SYNC_COMPLETE",
            SyncEvent::Aborted { .. } => "SYNC_ABORTED",
            SyncEvent::Error { .. } => "SYNC_ERROR",
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            SyncEvent::Start { branch } => serde_json::json!({ "branch": branch }),
            SyncEvent::Complete {
                changes_made,
                changes,
                failures,
                conflicts,
            } => serde_json::json!({
                "changes_made": changes_made,
                "changes": changes,
                "failures": failures,
                "conflicts": conflicts,
            }),
            SyncEvent::Aborted { changes } => serde_json::json!({ "changes": changes }),
            SyncEvent::Error { message } => serde_json::json!({ "message": message }),
        }
    }
}
