pub use super::global_contexts::Entity as GlobalContexts;
pub use super::projects::Entity as Projects;
pub use super::prompt_variables::Entity as PromptVariables;
pub use super::prompt_versions::Entity as PromptVersions;
pub use super::prompts::Entity as Prompts;
pub use super::repository_connections::Entity as RepositoryConnections;
pub use super::sync_events::Entity as SyncEvents;
