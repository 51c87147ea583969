use async_trait::async_trait;
use common::github::{
    CommitInfo, FileDelete, FileWrite, GithubClient, GithubError, NewPullRequest, PullRequest,
    RemoteFile, RepoRef, TreeEntry,
};
#[cfg(test)]
use mockall::automock;

/// The slice of the hosting API the sync engine talks to.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, GithubError>;

    async fn get_tree(&self, repo: &RepoRef, git_ref: &str) -> Result<Vec<TreeEntry>, GithubError>;

    async fn latest_commit(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<CommitInfo>, GithubError>;

    async fn create_file(&self, repo: &RepoRef, write: &FileWrite) -> Result<String, GithubError>;

    async fn update_file(
        &self,
        repo: &RepoRef,
        write: &FileWrite,
        sha: &str,
    ) -> Result<String, GithubError>;

    async fn delete_file(&self, repo: &RepoRef, delete: &FileDelete) -> Result<(), GithubError>;

    async fn branch_head(&self, repo: &RepoRef, branch: &str)
        -> Result<Option<String>, GithubError>;

    async fn create_branch(
        &self,
        repo: &RepoRef,
        branch: &str,
        from_sha: &str,
    ) -> Result<(), GithubError>;

    async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<(), GithubError>;

    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        label: &str,
    ) -> Result<Vec<PullRequest>, GithubError>;

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequest, GithubError>;

    async fn ensure_label(&self, repo: &RepoRef, label: &str) -> Result<(), GithubError>;

    async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError>;
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, GithubError> {
        self.get_file(repo, path, git_ref).await
    }

    async fn get_tree(&self, repo: &RepoRef, git_ref: &str) -> Result<Vec<TreeEntry>, GithubError> {
        self.get_tree(repo, git_ref).await
    }

    async fn latest_commit(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<CommitInfo>, GithubError> {
        self.latest_commit(repo, path, git_ref).await
    }

    async fn create_file(&self, repo: &RepoRef, write: &FileWrite) -> Result<String, GithubError> {
        self.create_file(repo, write).await
    }

    async fn update_file(
        &self,
        repo: &RepoRef,
        write: &FileWrite,
        sha: &str,
    ) -> Result<String, GithubError> {
        self.update_file(repo, write, sha).await
    }

    async fn delete_file(&self, repo: &RepoRef, delete: &FileDelete) -> Result<(), GithubError> {
        self.delete_file(repo, delete).await
    }

    async fn branch_head(
        &self,
        repo: &RepoRef,
        branch: &str,
    ) -> Result<Option<String>, GithubError> {
        self.branch_head(repo, branch).await
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        branch: &str,
        from_sha: &str,
    ) -> Result<(), GithubError> {
        self.create_branch(repo, branch, from_sha).await
    }

    async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<(), GithubError> {
        self.delete_branch(repo, branch).await
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        label: &str,
    ) -> Result<Vec<PullRequest>, GithubError> {
        self.list_pull_requests(repo, label).await
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequest, GithubError> {
        self.create_pull_request(repo, pull).await
    }

    async fn ensure_label(&self, repo: &RepoRef, label: &str) -> Result<(), GithubError> {
        self.ensure_label(repo, label).await
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError> {
        self.add_labels(repo, number, labels).await
    }
}
