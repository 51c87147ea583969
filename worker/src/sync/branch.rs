use common::github::{GithubError, NewPullRequest, PullRequest, RepoRef};
use common::settings::PullRequestSettings;

use super::error::SyncError;
use crate::ports::GithubApi;

/// Where a pull-request-mode run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPlan {
    pub branch: String,
    pub pull_request: Option<PullRequest>,
    /// The branch did not exist before this run.
    pub created: bool,
}

/// Reuses the head branch of an open labelled pull request, otherwise the
/// configured sync branch, creating it from the default branch head.
pub async fn prepare_sync_branch(
    github: &dyn GithubApi,
    repo: &RepoRef,
    default_branch: &str,
    settings: &PullRequestSettings,
) -> Result<BranchPlan, SyncError> {
    let open = github.list_pull_requests(repo, &settings.label).await?;
    if let Some(pull) = open.into_iter().next() {
        tracing::info!(number = pull.number, branch = %pull.head_ref, "Reusing open sync pull request");
        return Ok(BranchPlan {
            branch: pull.head_ref.clone(),
            pull_request: Some(pull),
            created: false,
        });
    }

    if github.branch_head(repo, &settings.branch).await?.is_some() {
        return Ok(BranchPlan {
            branch: settings.branch.clone(),
            pull_request: None,
            created: false,
        });
    }

    let head = github
        .branch_head(repo, default_branch)
        .await?
        .ok_or_else(|| SyncError::MissingBranch(default_branch.to_string()))?;
    github.create_branch(repo, &settings.branch, &head).await?;
    tracing::info!(branch = %settings.branch, from = %default_branch, "Created sync branch");
    Ok(BranchPlan {
        branch: settings.branch.clone(),
        pull_request: None,
        created: true,
    })
}

/// Opens the pull request once the branch carries changes, or drops a branch
/// this run created for nothing.
pub async fn finish_sync_branch(
    github: &dyn GithubApi,
    repo: &RepoRef,
    plan: &BranchPlan,
    default_branch: &str,
    settings: &PullRequestSettings,
    repo_changed: bool,
) -> Result<Option<PullRequest>, GithubError> {
    if plan.pull_request.is_some() {
        return Ok(plan.pull_request.clone());
    }
    if !repo_changed {
        if plan.created {
            github.delete_branch(repo, &plan.branch).await?;
            tracing::debug!(branch = %plan.branch, "Deleted unused sync branch");
        }
        return Ok(None);
    }

    github.ensure_label(repo, &settings.label).await?;
    let pull = github
        .create_pull_request(
            repo,
            &NewPullRequest {
                title: settings.title.clone(),
                head: plan.branch.clone(),
                base: default_branch.to_string(),
                body: "Automated update of the prompt library.".to_string(),
            },
        )
        .await?;
    github
        .add_labels(repo, pull.number, &[settings.label.clone()])
        .await?;
    tracing::info!(number = pull.number, url = %pull.html_url, "Opened sync pull request");
    Ok(Some(PullRequest {
        labels: vec![settings.label.clone()],
        ..pull
    }))
}
