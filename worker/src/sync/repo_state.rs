use chrono::{DateTime, Utc};
use common::domain::library::compare_versions;
use common::domain::paths::{parse_library_path, LibraryFile};
use common::github::{RepoRef, TreeEntry};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;

use super::cancel::CancelSignal;
use super::domain::{RepoFile, RepoPrompt, RepoState, RepoVersion};
use super::error::SyncError;
use crate::ports::GithubApi;

#[derive(Default)]
struct VersionFiles {
    descriptor: Option<RepoFile>,
    content: Option<RepoFile>,
    variables: Option<RepoFile>,
}

#[derive(Default)]
struct PromptFiles {
    descriptor: Option<RepoFile>,
    versions: BTreeMap<String, VersionFiles>,
}

/// Walks the library folder at `git_ref`. A missing folder or an empty
/// repository yields an empty state.
pub async fn collect_repo_state(
    github: &dyn GithubApi,
    repo: &RepoRef,
    folder: &str,
    git_ref: &str,
    max_concurrency: usize,
    cancel: &CancelSignal,
) -> Result<RepoState, SyncError> {
    let tree = cancel.run(github.get_tree(repo, git_ref)).await??;
    let entries: Vec<(LibraryFile, TreeEntry)> = tree
        .into_iter()
        .filter(TreeEntry::is_blob)
        .filter_map(|entry| parse_library_path(folder, &entry.path).map(|kind| (kind, entry)))
        .collect();

    let files: Vec<(LibraryFile, RepoFile)> = cancel
        .run(
            stream::iter(entries)
                .map(|(kind, entry)| async move {
                    let last_modified = last_modified(github, repo, &entry.path, git_ref).await;
                    (
                        kind,
                        RepoFile {
                            path: entry.path,
                            sha: entry.sha,
                            last_modified,
                        },
                    )
                })
                .buffer_unordered(max_concurrency.max(1))
                .collect(),
        )
        .await?;

    let state = assemble(files);
    tracing::debug!(
        repo = %repo,
        git_ref,
        prompts = state.prompts.len(),
        "Collected repository state"
    );
    Ok(state)
}

async fn last_modified(
    github: &dyn GithubApi,
    repo: &RepoRef,
    path: &str,
    git_ref: &str,
) -> DateTime<Utc> {
    match github.latest_commit(repo, path, git_ref).await {
        Ok(Some(commit)) => commit.date,
        Ok(None) => {
            tracing::warn!(path, "No commit history for file, treating it as oldest");
            DateTime::<Utc>::UNIX_EPOCH
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "Commit history lookup failed, treating file as oldest");
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

fn assemble(files: Vec<(LibraryFile, RepoFile)>) -> RepoState {
    let mut state = RepoState::default();
    let mut prompts: BTreeMap<String, PromptFiles> = BTreeMap::new();

    for (kind, file) in files {
        match kind {
            LibraryFile::Globals => state.globals = Some(file),
            LibraryFile::Types => state.types = Some(file),
            LibraryFile::Prompt { slug } => prompts.entry(slug).or_default().descriptor = Some(file),
            LibraryFile::Version { slug, version } => {
                version_files(&mut prompts, slug, version).descriptor = Some(file)
            }
            LibraryFile::Content { slug, version } => {
                version_files(&mut prompts, slug, version).content = Some(file)
            }
            LibraryFile::Variables { slug, version } => {
                version_files(&mut prompts, slug, version).variables = Some(file)
            }
        }
    }

    for (slug, files) in prompts {
        let mut versions: Vec<RepoVersion> = files
            .versions
            .into_iter()
            .filter_map(|(version, files)| match (files.descriptor, files.content) {
                (Some(descriptor), Some(content)) => Some(RepoVersion {
                    version,
                    descriptor,
                    content,
                    variables: files.variables,
                }),
                _ => {
                    tracing::warn!(slug = %slug, version = %version, "Skipping incomplete version directory");
                    None
                }
            })
            .collect();
        versions.sort_by(|a, b| compare_versions(&a.version, &b.version));

        if files.descriptor.is_none() {
            tracing::warn!(slug = %slug, "Prompt directory has no prompt.json");
        }
        state.prompts.push(RepoPrompt {
            slug,
            descriptor: files.descriptor,
            versions,
        });
    }
    state
}

fn version_files(
    prompts: &mut BTreeMap<String, PromptFiles>,
    slug: String,
    version: String,
) -> &mut VersionFiles {
    prompts
        .entry(slug)
        .or_default()
        .versions
        .entry(version)
        .or_default()
}
