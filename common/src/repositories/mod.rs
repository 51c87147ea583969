pub mod connections;
pub mod globals;
pub mod prompts;

pub use connections::{ConnectionRepository, ConnectionRepositoryImpl, RunStatus};
pub use globals::{GlobalContextRepository, GlobalContextRepositoryImpl};
pub use prompts::{
    NewPrompt, NewVersion, PromptRepository, PromptRepositoryImpl, PromptUpdate, VersionUpdate,
};
