use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::infra::github_http::{build_github_client, send_request_with_retry};

const LABEL_COLOR: &str = "5319e7";

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("not found ({0})")]
    NotFound(String),
    #[error("sha precondition failed ({0})")]
    Conflict(String),
    #[error("unprocessable entity ({context}): {body}")]
    Unprocessable { context: String, body: String },
    #[error("rate limit exceeded after {attempts} attempts ({context})")]
    RateLimited { attempts: u32, context: String },
    #[error("GitHub returned {status} ({context}): {body}")]
    Status {
        status: u16,
        context: String,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response ({context}): {reason}")]
    Decode { context: String, reason: String },
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl GithubError {
    /// SHA mismatches and rejected writes. These abandon a single write, not the run.
    pub fn is_write_conflict(&self) -> bool {
        matches!(
            self,
            GithubError::Conflict(_) | GithubError::Unprocessable { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub sha: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub head_ref: String,
    pub html_url: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDelete {
    pub path: String,
    pub sha: String,
    pub message: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
    committer: Option<CommitSignature>,
    author: Option<CommitSignature>,
}

#[derive(Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    head: PullHead,
    #[serde(default)]
    labels: Vec<LabelResponse>,
}

#[derive(Deserialize)]
struct PullHead {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Deserialize)]
struct LabelResponse {
    name: String,
}

impl From<PullResponse> for PullRequest {
    fn from(pull: PullResponse) -> Self {
        Self {
            number: pull.number,
            head_ref: pull.head.ref_name,
            html_url: pull.html_url,
            labels: pull.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

pub struct GithubClient {
    client: Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(token: Option<&str>, api_url: impl Into<String>) -> Result<Self, GithubError> {
        Ok(Self {
            client: build_github_client(token)?,
            api_url: api_url.into(),
        })
    }

    fn endpoint(&self, repo: &RepoRef, tail: &[&str]) -> Result<Url, GithubError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| GithubError::Config(format!("invalid api url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GithubError::Config("api url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["repos", repo.owner.as_str(), repo.name.as_str()])
            .extend(tail.iter().flat_map(|part| part.split('/')));
        Ok(url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> Result<T, GithubError> {
        response.json::<T>().await.map_err(|e| GithubError::Decode {
            context: context.to_string(),
            reason: e.to_string(),
        })
    }

    /// File contents and blob SHA at `git_ref`, `None` when the path does not exist.
    pub async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, GithubError> {
        let url = self.endpoint(repo, &["contents", path])?;
        let context = format!("get {}", path);
        let response = match send_request_with_retry(
            self.client.get(url).query(&[("ref", git_ref)]),
            &context,
        )
        .await
        {
            Ok(response) => response,
            Err(GithubError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let body: ContentsResponse = Self::decode(response, &context).await?;
        Ok(Some(RemoteFile {
            content: decode_content(&body.content, &body.encoding, &context)?,
            path: body.path,
            sha: body.sha,
        }))
    }

    /// Recursive tree at `git_ref`. An empty repository has no tree and yields no entries.
    pub async fn get_tree(
        &self,
        repo: &RepoRef,
        git_ref: &str,
    ) -> Result<Vec<TreeEntry>, GithubError> {
        let url = self.endpoint(repo, &["git", "trees", git_ref])?;
        let context = format!("tree {}", git_ref);
        let response = match send_request_with_retry(
            self.client.get(url).query(&[("recursive", "1")]),
            &context,
        )
        .await
        {
            Ok(response) => response,
            Err(GithubError::NotFound(_) | GithubError::Conflict(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let body: TreeResponse = Self::decode(response, &context).await?;
        if body.truncated {
            tracing::warn!(repo = %repo, git_ref, "GitHub truncated the recursive tree listing");
        }
        Ok(body.tree)
    }

    pub async fn latest_commit(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<CommitInfo>, GithubError> {
        let url = self.endpoint(repo, &["commits"])?;
        let context = format!("commits {}", path);
        let response = send_request_with_retry(
            self.client
                .get(url)
                .query(&[("path", path), ("sha", git_ref), ("per_page", "1")]),
            &context,
        )
        .await?;
        let commits: Vec<CommitResponse> = Self::decode(response, &context).await?;
        Ok(commits.into_iter().next().and_then(|c| {
            let date = c
                .commit
                .committer
                .or(c.commit.author)
                .map(|signature| signature.date)?;
            Some(CommitInfo {
                sha: c.sha,
                message: c.commit.message,
                date,
            })
        }))
    }

    pub async fn create_file(&self, repo: &RepoRef, write: &FileWrite) -> Result<String, GithubError> {
        self.put_file(repo, write, None).await
    }

    pub async fn update_file(
        &self,
        repo: &RepoRef,
        write: &FileWrite,
        sha: &str,
    ) -> Result<String, GithubError> {
        self.put_file(repo, write, Some(sha)).await
    }

    async fn put_file(
        &self,
        repo: &RepoRef,
        write: &FileWrite,
        sha: Option<&str>,
    ) -> Result<String, GithubError> {
        let url = self.endpoint(repo, &["contents", &write.path])?;
        let context = format!("put {}", write.path);
        let mut body = json!({
            "message": write.message,
            "content": STANDARD.encode(write.content.as_bytes()),
            "branch": write.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        let response = send_request_with_retry(self.client.put(url).json(&body), &context).await?;
        let written: WriteResponse = Self::decode(response, &context).await?;
        Ok(written.content.sha)
    }

    pub async fn delete_file(&self, repo: &RepoRef, delete: &FileDelete) -> Result<(), GithubError> {
        let url = self.endpoint(repo, &["contents", &delete.path])?;
        let context = format!("delete {}", delete.path);
        let body = json!({
            "message": delete.message,
            "sha": delete.sha,
            "branch": delete.branch,
        });
        send_request_with_retry(self.client.delete(url).json(&body), &context).await?;
        Ok(())
    }

    /// Commit SHA the branch points at, `None` when the branch does not exist.
    pub async fn branch_head(
        &self,
        repo: &RepoRef,
        branch: &str,
    ) -> Result<Option<String>, GithubError> {
        let url = self.endpoint(repo, &["git", "ref", "heads", branch])?;
        let context = format!("ref {}", branch);
        match send_request_with_retry(self.client.get(url), &context).await {
            Ok(response) => {
                let body: RefResponse = Self::decode(response, &context).await?;
                Ok(Some(body.object.sha))
            }
            Err(GithubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_branch(
        &self,
        repo: &RepoRef,
        branch: &str,
        from_sha: &str,
    ) -> Result<(), GithubError> {
        let url = self.endpoint(repo, &["git", "refs"])?;
        let body = json!({ "ref": format!("refs/heads/{}", branch), "sha": from_sha });
        send_request_with_retry(
            self.client.post(url).json(&body),
            &format!("create branch {}", branch),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<(), GithubError> {
        let url = self.endpoint(repo, &["git", "refs", "heads", branch])?;
        send_request_with_retry(
            self.client.delete(url),
            &format!("delete branch {}", branch),
        )
        .await?;
        Ok(())
    }

    /// Open pull requests carrying `label`.
    pub async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        label: &str,
    ) -> Result<Vec<PullRequest>, GithubError> {
        let url = self.endpoint(repo, &["pulls"])?;
        let context = "list pulls";
        let response = send_request_with_retry(
            self.client
                .get(url)
                .query(&[("state", "open"), ("per_page", "100")]),
            context,
        )
        .await?;
        let pulls: Vec<PullResponse> = Self::decode(response, context).await?;
        Ok(pulls
            .into_iter()
            .map(PullRequest::from)
            .filter(|pr| pr.labels.iter().any(|l| l == label))
            .collect())
    }

    pub async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequest, GithubError> {
        let url = self.endpoint(repo, &["pulls"])?;
        let context = format!("create pull {}", pull.head);
        let response = send_request_with_retry(self.client.post(url).json(pull), &context).await?;
        let created: PullResponse = Self::decode(response, &context).await?;
        Ok(created.into())
    }

    pub async fn ensure_label(&self, repo: &RepoRef, label: &str) -> Result<(), GithubError> {
        let url = self.endpoint(repo, &["labels", label])?;
        match send_request_with_retry(self.client.get(url), &format!("label {}", label)).await {
            Ok(_) => return Ok(()),
            Err(GithubError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let url = self.endpoint(repo, &["labels"])?;
        let body = json!({ "name": label, "color": LABEL_COLOR });
        match send_request_with_retry(
            self.client.post(url).json(&body),
            &format!("create label {}", label),
        )
        .await
        {
            // Another run created it in between.
            Ok(_) | Err(GithubError::Unprocessable { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError> {
        let number = number.to_string();
        let url = self.endpoint(repo, &["issues", &number, "labels"])?;
        send_request_with_retry(
            self.client.post(url).json(&json!({ "labels": labels })),
            &format!("label pull {}", number),
        )
        .await?;
        Ok(())
    }
}

fn decode_content(raw: &str, encoding: &str, context: &str) -> Result<String, GithubError> {
    let bytes = match encoding {
        "base64" => {
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(compact).map_err(|e| GithubError::Decode {
                context: context.to_string(),
                reason: e.to_string(),
            })?
        }
        _ => raw.as_bytes().to_vec(),
    };
    String::from_utf8(bytes).map_err(|e| GithubError::Decode {
        context: context.to_string(),
        reason: e.to_string(),
    })
}
