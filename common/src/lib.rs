pub mod builders;
pub mod db;
pub mod domain;
pub mod entities;
pub mod github;
pub mod infra;
pub mod repositories;
pub mod settings;

pub use builders::{build_github_client, build_repositories, Repositories};
