use serde::Deserialize;

/// The subset of a GitHub `push` webhook payload the worker looks at.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub deleted: bool,
    pub head_commit: Option<HeadCommit>,
    pub sender: Option<Account>,
    pub pusher: Option<Pusher>,
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pusher {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct PushPolicy {
    /// `owner/name` of the connected repository.
    pub repository: String,
    pub default_branch: String,
    pub sync_branch: Option<String>,
    pub bot_login: String,
    pub skip_marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushDecision {
    Sync { branch: String, is_main_branch: bool },
    Ignore { reason: String },
}

impl PushDecision {
    fn ignore(reason: impl Into<String>) -> Self {
        PushDecision::Ignore {
            reason: reason.into(),
        }
    }
}

/// Decides whether a push should start a sync. Pushes the engine made itself
/// never do.
pub fn evaluate_push(event: &PushEvent, policy: &PushPolicy) -> PushDecision {
    if let Some(repository) = &event.repository {
        if !repository.full_name.eq_ignore_ascii_case(&policy.repository) {
            return PushDecision::ignore(format!(
                "push to {} but the project is connected to {}",
                repository.full_name, policy.repository
            ));
        }
    }

    let sender = event.sender.as_ref().map(|s| s.login.as_str());
    let pusher = event.pusher.as_ref().and_then(|p| p.name.as_deref());
    if sender == Some(policy.bot_login.as_str()) || pusher == Some(policy.bot_login.as_str()) {
        return PushDecision::ignore(format!("pushed by {}", policy.bot_login));
    }

    if !policy.skip_marker.is_empty()
        && event
            .head_commit
            .as_ref()
            .is_some_and(|c| c.message.contains(&policy.skip_marker))
    {
        return PushDecision::ignore("commit message carries the skip marker");
    }

    let Some(branch) = event.git_ref.strip_prefix("refs/heads/") else {
        return PushDecision::ignore(format!("{} is not a branch", event.git_ref));
    };
    if event.deleted {
        return PushDecision::ignore(format!("branch {branch} was deleted"));
    }

    if branch == policy.default_branch {
        return PushDecision::Sync {
            branch: branch.to_string(),
            is_main_branch: true,
        };
    }
    if policy.sync_branch.as_deref() == Some(branch) {
        return PushDecision::Sync {
            branch: branch.to_string(),
            is_main_branch: false,
        };
    }
    PushDecision::ignore(format!("branch {branch} is not tracked"))
}
