//! Pure three-way diff between the system and repository snapshots.
//!
//! Every axis (globals, prompt descriptor, version descriptor, content,
//! variables) compares the blob SHA of the system's canonical serialization,
//! the repository blob SHA and the stored last-synced hash. Equal SHAs are in
//! sync. When only one side moved away from the stored hash that side wins;
//! when both moved the configured [`ConflictPolicy`] decides.

use chrono::{DateTime, Utc};
use common::domain::files::{encode_globals, encode_prompt, encode_variables, encode_version};
use common::domain::git_blob_sha;
use common::domain::library::{
    SystemGlobals, SystemPrompt, SystemState, SystemVersion, VersionStatus,
};
use common::settings::ConflictPolicy;

use super::domain::{
    Baseline, ConflictResolution, RepoAction, RepoFile, RepoPrompt, RepoState, RepoVersion,
    SyncAction, SyncConflict, SyncEntity, SystemAction,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub actions: Vec<SyncAction>,
    pub conflicts: Vec<SyncConflict>,
    pub baselines: Vec<Baseline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// System value overwrites the repository.
    Push,
    /// Repository value overwrites the system.
    Pull,
}

struct Axis<'a> {
    entity: SyncEntity,
    path: &'a str,
    system_sha: &'a str,
    repo_sha: &'a str,
    base: Option<&'a str>,
    system_time: DateTime<Utc>,
    repo_time: DateTime<Utc>,
}

enum Verdict {
    InSync,
    Move(Direction),
    Surfaced,
}

/// Actions come out globals first, then per prompt its descriptor followed by
/// each version's descriptor, content and variables, with the generated types
/// file last.
pub fn reconcile(
    system: &SystemState,
    repo: &RepoState,
    policy: ConflictPolicy,
) -> Reconciliation {
    let mut planner = Planner {
        policy,
        out: Reconciliation::default(),
    };

    planner.globals(&system.globals, repo.globals.as_ref());

    for prompt in &system.prompts {
        planner.prompt(prompt, repo.prompt(&prompt.slug));
    }
    for repo_prompt in &repo.prompts {
        if !system.prompts.iter().any(|p| p.slug == repo_prompt.slug) {
            planner.repo_only_prompt(repo_prompt);
        }
    }

    let mut out = planner.out;
    if !out.actions.is_empty() || repo.types.is_none() {
        out.actions.push(SyncAction::Repo(match &repo.types {
            Some(file) => RepoAction::UpdateGeneratedTypes {
                repo_sha: file.sha.clone(),
            },
            None => RepoAction::CreateGeneratedTypes,
        }));
    }
    out
}

fn blob_sha(content: &str) -> String {
    git_blob_sha(content.as_bytes())
}

struct Planner {
    policy: ConflictPolicy,
    out: Reconciliation,
}

impl Planner {
    fn repo(&mut self, action: RepoAction) {
        self.out.actions.push(SyncAction::Repo(action));
    }

    fn system(&mut self, action: SystemAction) {
        self.out.actions.push(SyncAction::System(action));
    }

    fn judge(&mut self, axis: Axis<'_>) -> Verdict {
        if axis.system_sha == axis.repo_sha {
            return Verdict::InSync;
        }
        let system_moved = axis.base != Some(axis.system_sha);
        let repo_moved = axis.base != Some(axis.repo_sha);
        match (system_moved, repo_moved) {
            (true, false) => Verdict::Move(Direction::Push),
            (false, true) => Verdict::Move(Direction::Pull),
            _ => self.conflict(
                axis.entity,
                axis.path,
                Some(axis.system_sha),
                axis.repo_sha,
                axis.base,
                axis.system_time,
                axis.repo_time,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn conflict(
        &mut self,
        entity: SyncEntity,
        path: &str,
        system_sha: Option<&str>,
        repo_sha: &str,
        base: Option<&str>,
        system_time: DateTime<Utc>,
        repo_time: DateTime<Utc>,
    ) -> Verdict {
        let direction = match self.policy {
            ConflictPolicy::Newest if repo_time > system_time => Some(Direction::Pull),
            ConflictPolicy::Newest => Some(Direction::Push),
            ConflictPolicy::SystemWins => Some(Direction::Push),
            ConflictPolicy::RepoWins => Some(Direction::Pull),
            ConflictPolicy::Surface => None,
        };
        self.out.conflicts.push(SyncConflict {
            entity,
            path: path.to_string(),
            system_sha: system_sha.map(str::to_string),
            repo_sha: repo_sha.to_string(),
            base_sha: base.map(str::to_string),
            resolution: match direction {
                Some(Direction::Push) => ConflictResolution::SystemWins,
                Some(Direction::Pull) => ConflictResolution::RepoWins,
                None => ConflictResolution::Surfaced,
            },
        });
        match direction {
            Some(direction) => Verdict::Move(direction),
            None => Verdict::Surfaced,
        }
    }

    fn globals(&mut self, globals: &SystemGlobals, file: Option<&RepoFile>) {
        let encoded = encode_globals(&globals.content);
        let system_sha = blob_sha(&encoded);
        let Some(file) = file else {
            self.repo(RepoAction::CreateGlobals {
                globals: globals.clone(),
            });
            return;
        };

        let verdict = self.judge(Axis {
            entity: SyncEntity::Globals,
            path: &file.path,
            system_sha: &system_sha,
            repo_sha: &file.sha,
            base: globals.last_sync_git_sha.as_deref(),
            system_time: globals.updated_at,
            repo_time: file.last_modified,
        });
        match verdict {
            Verdict::Move(Direction::Push) => self.repo(RepoAction::UpdateGlobals {
                globals: globals.clone(),
                repo_sha: file.sha.clone(),
            }),
            Verdict::Move(Direction::Pull) => self.system(SystemAction::UpdateGlobals {
                file: file.clone(),
                old_content: encoded,
                old_sha: system_sha,
            }),
            Verdict::InSync if globals.last_sync_git_sha.as_deref() != Some(file.sha.as_str()) => {
                self.out.baselines.push(Baseline::Globals {
                    sha: file.sha.clone(),
                })
            }
            Verdict::InSync | Verdict::Surfaced => {}
        }
    }

    fn prompt(&mut self, prompt: &SystemPrompt, repo: Option<&RepoPrompt>) {
        let first = self.out.actions.len();
        let mut descriptor_surfaced = false;
        match repo.and_then(|r| r.descriptor.as_ref()) {
            None => self.repo(RepoAction::CreatePrompt {
                prompt: prompt.clone(),
            }),
            Some(file) => {
                let encoded = encode_prompt(prompt);
                let system_sha = blob_sha(&encoded);
                let verdict = self.judge(Axis {
                    entity: SyncEntity::Prompt,
                    path: &file.path,
                    system_sha: &system_sha,
                    repo_sha: &file.sha,
                    base: prompt.last_sync_git_sha.as_deref(),
                    system_time: prompt.updated_at,
                    repo_time: file.last_modified,
                });
                match verdict {
                    Verdict::Move(Direction::Push) => self.repo(RepoAction::UpdatePrompt {
                        prompt: prompt.clone(),
                        repo_sha: file.sha.clone(),
                    }),
                    Verdict::Move(Direction::Pull) => self.system(SystemAction::UpdatePrompt {
                        prompt_id: prompt.id,
                        slug: prompt.slug.clone(),
                        file: file.clone(),
                        old_content: encoded,
                        old_sha: system_sha,
                    }),
                    Verdict::InSync if prompt.last_sync_git_sha.as_deref() != Some(file.sha.as_str()) => {
                        self.out.baselines.push(Baseline::Prompt {
                            prompt_id: prompt.id,
                            sha: file.sha.clone(),
                        })
                    }
                    Verdict::Surfaced => descriptor_surfaced = true,
                    Verdict::InSync => {}
                }
            }
        }

        for version in &prompt.versions {
            let repo_version = repo.and_then(|r| r.version(&version.version));
            self.version(&prompt.slug, version, repo_version);
        }

        if let Some(repo) = repo {
            for repo_version in &repo.versions {
                if prompt.version(&repo_version.version).is_none() {
                    self.system(SystemAction::CreateVersion {
                        slug: prompt.slug.clone(),
                        version: repo_version.clone(),
                    });
                }
            }
        }

        let pulled_into_prompt = self.out.actions[first..].iter().any(|action| {
            matches!(
                action,
                SyncAction::System(
                    SystemAction::UpdatePrompt { .. }
                        | SystemAction::CreateVersion { .. }
                        | SystemAction::UpdateVersion { .. }
                )
            )
        });
        if pulled_into_prompt && !descriptor_surfaced {
            self.repo(RepoAction::RefreshPrompt {
                slug: prompt.slug.clone(),
                repo_sha: repo
                    .and_then(|r| r.descriptor.as_ref())
                    .map(|file| file.sha.clone()),
            });
        }
    }

    /// Without a descriptor there is no name to create the prompt with.
    fn repo_only_prompt(&mut self, repo: &RepoPrompt) {
        let Some(file) = &repo.descriptor else {
            return;
        };
        self.system(SystemAction::CreatePrompt {
            slug: repo.slug.clone(),
            file: file.clone(),
        });
        for version in &repo.versions {
            self.system(SystemAction::CreateVersion {
                slug: repo.slug.clone(),
                version: version.clone(),
            });
        }
        self.repo(RepoAction::RefreshPrompt {
            slug: repo.slug.clone(),
            repo_sha: Some(file.sha.clone()),
        });
    }

    fn version(&mut self, slug: &str, version: &SystemVersion, repo: Option<&RepoVersion>) {
        if version.is_archived() {
            // Archival is system-authoritative.
            if let Some(repo) = repo {
                self.repo(RepoAction::DeleteVersion {
                    slug: slug.to_string(),
                    version: version.clone(),
                    repo_sha: repo.descriptor.sha.clone(),
                });
                if let Some(variables) = &repo.variables {
                    self.repo(RepoAction::DeleteVariables {
                        slug: slug.to_string(),
                        version: version.clone(),
                        repo_sha: variables.sha.clone(),
                    });
                }
                self.repo(RepoAction::DeleteContent {
                    slug: slug.to_string(),
                    version: version.clone(),
                    repo_sha: repo.content.sha.clone(),
                });
            }
            return;
        }

        let Some(repo) = repo else {
            self.repo(RepoAction::CreateVersion {
                slug: slug.to_string(),
                version: version.clone(),
            });
            self.repo(RepoAction::CreateContent {
                slug: slug.to_string(),
                version: version.clone(),
            });
            if !version.variables.is_empty() {
                self.repo(RepoAction::CreateVariables {
                    slug: slug.to_string(),
                    version: version.clone(),
                });
            }
            return;
        };

        self.version_descriptor(slug, version, &repo.descriptor);
        self.content(slug, version, &repo.content);
        self.variables(slug, version, repo);
    }

    fn version_descriptor(&mut self, slug: &str, version: &SystemVersion, file: &RepoFile) {
        let encoded = encode_version(version);
        let system_sha = blob_sha(&encoded);
        let verdict = self.judge(Axis {
            entity: SyncEntity::Version,
            path: &file.path,
            system_sha: &system_sha,
            repo_sha: &file.sha,
            base: version.last_sync_git_sha.as_deref(),
            system_time: version.updated_at,
            repo_time: file.last_modified,
        });
        match verdict {
            Verdict::Move(Direction::Push) => self.repo(RepoAction::UpdateVersion {
                slug: slug.to_string(),
                version: version.clone(),
                repo_sha: file.sha.clone(),
            }),
            Verdict::Move(Direction::Pull) => self.system(SystemAction::UpdateVersion {
                version_id: version.id,
                slug: slug.to_string(),
                version: version.version.clone(),
                file: file.clone(),
                old_content: encoded,
                old_sha: system_sha,
            }),
            Verdict::InSync if version.last_sync_git_sha.as_deref() != Some(file.sha.as_str()) => {
                self.out.baselines.push(Baseline::Version {
                    version_id: version.id,
                    sha: file.sha.clone(),
                })
            }
            Verdict::InSync | Verdict::Surfaced => {}
        }
    }

    fn content(&mut self, slug: &str, version: &SystemVersion, file: &RepoFile) {
        let system_sha = blob_sha(&version.content);
        let verdict = self.judge(Axis {
            entity: SyncEntity::Content,
            path: &file.path,
            system_sha: &system_sha,
            repo_sha: &file.sha,
            base: version.last_sync_content_sha.as_deref(),
            system_time: version.updated_at,
            repo_time: file.last_modified,
        });
        match verdict {
            Verdict::Move(Direction::Push) => self.repo(RepoAction::UpdateContent {
                slug: slug.to_string(),
                version: version.clone(),
                repo_sha: file.sha.clone(),
            }),
            Verdict::Move(Direction::Pull) => self.system(SystemAction::UpdateContent {
                version_id: version.id,
                slug: slug.to_string(),
                version: version.version.clone(),
                file: file.clone(),
                old_content: version.content.clone(),
                old_sha: system_sha,
            }),
            Verdict::InSync if version.last_sync_content_sha.as_deref() != Some(file.sha.as_str()) => {
                self.out.baselines.push(Baseline::Content {
                    version_id: version.id,
                    sha: file.sha.clone(),
                })
            }
            Verdict::InSync | Verdict::Surfaced => {}
        }
    }

    fn variables(&mut self, slug: &str, version: &SystemVersion, repo: &RepoVersion) {
        let base = version.last_sync_variables_sha.as_deref();
        let system_time = version.variables_updated_at().unwrap_or(version.updated_at);

        match (&repo.variables, version.variables.is_empty()) {
            (None, true) => {
                if base.is_some() {
                    self.out.baselines.push(Baseline::Variables {
                        version_id: version.id,
                        sha: None,
                    });
                }
            }
            (None, false) => {
                // A deleted variables.json only propagates for drafts that were
                // synced before and whose content changed after the variables.
                let repo_content_newer = version
                    .variables_updated_at()
                    .is_some_and(|updated| repo.content.last_modified > updated);
                if version.status == VersionStatus::Draft && base.is_some() && repo_content_newer {
                    let encoded = encode_variables(&version.variables);
                    self.system(SystemAction::DeleteVariables {
                        version_id: version.id,
                        slug: slug.to_string(),
                        version: version.version.clone(),
                        old_sha: blob_sha(&encoded),
                        old_content: encoded,
                    });
                } else {
                    self.repo(RepoAction::CreateVariables {
                        slug: slug.to_string(),
                        version: version.clone(),
                    });
                }
            }
            (Some(file), true) => {
                let direction = match base {
                    None => Some(Direction::Pull),
                    Some(base) if base == file.sha => Some(Direction::Push),
                    Some(_) => match self.conflict(
                        SyncEntity::Variables,
                        &file.path,
                        None,
                        &file.sha,
                        base,
                        version.updated_at,
                        file.last_modified,
                    ) {
                        Verdict::Move(direction) => Some(direction),
                        Verdict::InSync | Verdict::Surfaced => None,
                    },
                };
                match direction {
                    Some(Direction::Push) => self.repo(RepoAction::DeleteVariables {
                        slug: slug.to_string(),
                        version: version.clone(),
                        repo_sha: file.sha.clone(),
                    }),
                    Some(Direction::Pull) => self.system(SystemAction::CreateVariables {
                        version_id: version.id,
                        slug: slug.to_string(),
                        version: version.version.clone(),
                        file: file.clone(),
                    }),
                    None => {}
                }
            }
            (Some(file), false) => {
                let encoded = encode_variables(&version.variables);
                let system_sha = blob_sha(&encoded);
                let verdict = self.judge(Axis {
                    entity: SyncEntity::Variables,
                    path: &file.path,
                    system_sha: &system_sha,
                    repo_sha: &file.sha,
                    base,
                    system_time,
                    repo_time: file.last_modified,
                });
                match verdict {
                    Verdict::Move(Direction::Push) => self.repo(RepoAction::UpdateVariables {
                        slug: slug.to_string(),
                        version: version.clone(),
                        repo_sha: file.sha.clone(),
                    }),
                    Verdict::Move(Direction::Pull) => self.system(SystemAction::UpdateVariables {
                        version_id: version.id,
                        slug: slug.to_string(),
                        version: version.version.clone(),
                        file: file.clone(),
                        old_content: encoded,
                        old_sha: system_sha,
                    }),
                    Verdict::InSync if base != Some(file.sha.as_str()) => {
                        self.out.baselines.push(Baseline::Variables {
                            version_id: version.id,
                            sha: Some(file.sha.clone()),
                        })
                    }
                    Verdict::InSync | Verdict::Surfaced => {}
                }
            }
        }
    }
}
