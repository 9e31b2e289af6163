use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default age after which cached releases are refetched (1 hour)
pub const DEFAULT_RELEASE_REFRESH_INTERVAL_MS: i64 = 60 * 60 * 1000;

/// Age after which a release fetch lock is considered abandoned (30 seconds)
pub const FETCH_TIMEOUT_MS: i64 = 30_000;

/// Length of the trailing window aggregated by the usage report
pub const USAGE_WINDOW_HOURS: i64 = 24;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 65429;

pub const DEFAULT_REGISTRY_URL: &str = "https://pypi.org";

const DEFAULT_ALLOWED_PACKAGES: &[&str] = &[
    "datacleaner",
    "hackday_bot",
    "praw",
    "prawtools",
    "redditanalysis",
    "statsbot",
    "topraw4",
    "tpot",
    "xrff2csv",
];

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://bboe.github.io", "http://localhost:8080"];

const DEFAULT_USER_AGENT_TOKENS: &[&str] = &["python-requests"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Server configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// SQLite database file; defaults to [`db_path`]
    pub database_path: Option<PathBuf>,
    /// Normalized package names accepted by `PUT /check`
    pub allowed_packages: HashSet<String>,
    /// Origins echoed in `Access-Control-Allow-Origin` by `GET /packages`
    pub allowed_origins: Vec<String>,
    /// A check is only accepted when its User-Agent contains one of these
    pub user_agent_tokens: Vec<String>,
    pub registry_url: String,
    /// Release cache refresh interval in milliseconds
    pub release_refresh_interval: i64,
    /// Log to this file instead of stdout
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            database_path: None,
            allowed_packages: to_strings(DEFAULT_ALLOWED_PACKAGES).collect(),
            allowed_origins: to_strings(DEFAULT_ALLOWED_ORIGINS).collect(),
            user_agent_tokens: to_strings(DEFAULT_USER_AGENT_TOKENS).collect(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            release_refresh_interval: DEFAULT_RELEASE_REFRESH_INTERVAL_MS,
            log_file: None,
        }
    }
}

fn to_strings(values: &'static [&'static str]) -> impl Iterator<Item = String> {
    values.iter().map(|s| s.to_string())
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(db_path)
    }

    /// Whether a User-Agent header value identifies a supported client
    pub fn is_recognized_agent(&self, user_agent: &str) -> bool {
        self.user_agent_tokens
            .iter()
            .any(|token| user_agent.contains(token.as_str()))
    }
}

/// Returns the path to the data directory for update-checker.
/// Uses $XDG_DATA_HOME/update-checker if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/update-checker,
/// or ./update-checker if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("update_checker.db")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("update-checker")
}
