use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const ENV_WEBHOOK_URL: &str = "BITRIX24_WEBHOOK_URL";
const ENV_PROJECTS_DIRS: &str = "PROJECTS_DIRS";
const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
const ENV_MODEL: &str = "ANTHROPIC_MODEL";
const ENV_CACHE_DIR: &str = "WEEKLY_REVIEW_CACHE_DIR";
const ENV_PROJECTS_TTL: &str = "WEEKLY_REVIEW_PROJECTS_TTL_SECS";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_url: String,
    pub projects_dir: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub cache_dir: PathBuf,
    pub projects_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let webhook_url = get(ENV_WEBHOOK_URL)
            .map(|v| v.trim_end_matches('/').to_string())
            .ok_or(ConfigError::MissingVar(ENV_WEBHOOK_URL))?;

        let projects_dir = expand_home(&get(ENV_PROJECTS_DIRS).unwrap_or_else(|| "~/projects".to_string()));

        let cache_dir = match get(ENV_CACHE_DIR) {
            Some(dir) => expand_home(&dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cache")
                .join("weekly-review"),
        };

        let projects_cache_ttl_secs = match get(ENV_PROJECTS_TTL) {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                var: ENV_PROJECTS_TTL,
                reason: e.to_string(),
            })?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Self {
            webhook_url,
            projects_dir,
            api_key: get(ENV_API_KEY),
            model: get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            cache_dir,
            projects_cache_ttl_secs,
        })
    }

    pub fn projects_cache_file(&self) -> PathBuf {
        self.cache_dir.join("projects-cache.json")
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Path::new(raw).to_path_buf(),
    }
}
