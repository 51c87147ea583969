//! In-memory view of a project's prompt library as stored in the database.
//!
//! These are the "system side" values the sync engine compares against the
//! repository. They are read fresh for every run and never cached.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

pub use crate::entities::prompt_variables::VariableType;
pub use crate::entities::prompt_versions::VersionStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    pub prompts: Vec<SystemPrompt>,
    pub globals: SystemGlobals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemPrompt {
    pub id: i32,
    pub uuid: Uuid,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Blob SHA of `prompt.json` as of the last successful sync, `None` if never synced.
    pub last_sync_git_sha: Option<String>,
    pub versions: Vec<SystemVersion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemVersion {
    pub id: i32,
    pub uuid: Uuid,
    pub version: String,
    pub status: VersionStatus,
    pub config: Option<Value>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sync_git_sha: Option<String>,
    pub last_sync_content_sha: Option<String>,
    pub last_sync_variables_sha: Option<String>,
    pub variables: Vec<SystemVariable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemVariable {
    pub uuid: Uuid,
    pub name: String,
    pub var_type: VariableType,
    pub required: bool,
    pub default_value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemGlobals {
    pub id: i32,
    pub content: Value,
    pub updated_at: DateTime<Utc>,
    pub last_sync_git_sha: Option<String>,
}

impl SystemPrompt {
    pub fn version(&self, version: &str) -> Option<&SystemVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Highest published version, which `prompt.json` advertises as `latestVersion`.
    pub fn latest_version(&self) -> Option<&str> {
        self.versions
            .iter()
            .filter(|v| v.status == VersionStatus::Published)
            .max_by(|a, b| compare_versions(&a.version, &b.version))
            .map(|v| v.version.as_str())
    }
}

impl SystemVersion {
    pub fn is_archived(&self) -> bool {
        self.status == VersionStatus::Archived
    }

    /// Most recent `updated_at` across the variable rows, if any exist.
    pub fn variables_updated_at(&self) -> Option<DateTime<Utc>> {
        self.variables.iter().map(|v| v.updated_at).max()
    }
}

/// Orders dotted numeric versions (`1.10.0` > `1.9.3`). Non-numeric parts
/// fall back to a lexical comparison so the ordering stays total.
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |s: &str| -> Option<Vec<u64>> {
        s.split('.').map(|part| part.parse::<u64>().ok()).collect()
    };
    match (parse(a), parse(b)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => a.cmp(b),
    }
}
