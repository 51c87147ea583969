use dotenvy::dotenv;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_PATH_ENV: &str = "PROMPTSYNC_CONFIG_PATH";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub github: GithubSettings,
    pub sync: SyncSettings,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GithubSettings {
    pub token: Option<String>,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    /// Login the engine commits as. Pushes by this login never trigger a sync.
    #[serde(default = "default_bot_login")]
    pub bot_login: String,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_bot_login() -> String {
    "promptsync[bot]".to_string()
}

/// How an axis edited on both sides since the last sync is resolved.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The side with the later edit wins; ties go to the system.
    #[default]
    Newest,
    SystemWins,
    RepoWins,
    /// Leave both sides alone and report the conflict.
    Surface,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncSettings {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    #[serde(default = "default_skip_marker")]
    pub skip_marker: String,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub pull_requests: PullRequestSettings,
}

fn default_skip_marker() -> String {
    "[skip promptsync]".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PullRequestSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_pr_branch")]
    pub branch: String,
    #[serde(default = "default_pr_label")]
    pub label: String,
    #[serde(default = "default_pr_title")]
    pub title: String,
}

fn default_pr_branch() -> String {
    "promptsync/updates".to_string()
}

fn default_pr_label() -> String {
    "promptsync".to_string()
}

fn default_pr_title() -> String {
    "Sync prompt library".to_string()
}

impl Default for PullRequestSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            branch: default_pr_branch(),
            label: default_pr_label(),
            title: default_pr_title(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            skip_marker: default_skip_marker(),
            max_concurrency: default_max_concurrency(),
            pull_requests: PullRequestSettings::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            database: DatabaseSettings {
                url: "sqlite://promptsync.db?mode=rwc".to_string(),
            },
            github: GithubSettings {
                token: None,
                api_url: default_github_api_url(),
                bot_login: default_bot_login(),
            },
            sync: SyncSettings::default(),
        }
    }
}

impl Settings {
    #[allow(clippy::result_large_err)]
    pub fn new() -> Result<Self, figment::Error> {
        Self::load(None)
    }

    /// Layers defaults, config files, `PROMPTSYNC_*` variables and the raw
    /// `GITHUB_TOKEN`/`DATABASE_URL` variables, later sources winning.
    #[allow(clippy::result_large_err)]
    pub fn load(config_path: Option<&str>) -> Result<Self, figment::Error> {
        dotenv().ok();

        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        figment = figment.merge(Toml::file("/etc/promptsync/config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            figment = figment.merge(Toml::file(config_dir.join("promptsync/config.toml")));
        }

        figment = figment.merge(Toml::file("promptsync.toml"));

        let config_path = config_path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());
        if let Some(config_path) = config_path {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(Env::prefixed("PROMPTSYNC_").split("__"));

        figment = figment.merge(
            Env::raw()
                .only(&["GITHUB_TOKEN"])
                .map(|_| "github.token".into()),
        );
        figment = figment.merge(
            Env::raw()
                .only(&["DATABASE_URL"])
                .map(|_| "database.url".into()),
        );

        figment.extract()
    }
}
