pub mod blob;
pub mod files;
pub mod library;
pub mod paths;
pub mod template;
pub mod types_gen;

pub use blob::git_blob_sha;
pub use files::CodecError;
pub use library::{
    SystemGlobals, SystemPrompt, SystemState, SystemVariable, SystemVersion, VariableType,
    VersionStatus,
};
