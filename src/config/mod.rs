use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::errors::{AppError, AppResult};
use crate::models::{FailureGranularity, Group, ResetPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default = "default_playlists")]
    pub playlists: Vec<PlaylistConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Source list: one `<url> <region>` per line
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,
    /// Directory receiving the rendered playlists
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_failure_ledger_path")]
    pub failure_ledger_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(
        with = "duration_serde::duration",
        default = "default_fetch_timeout"
    )]
    pub fetch_timeout: Duration,
    /// Consecutive failures after which a source is skipped
    #[serde(default = "default_failure_limit")]
    pub failure_limit: u32,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_refresh_cron")]
    pub refresh_cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub build_on_startup: bool,
    /// Let the serving layer request a build when a playlist file is missing
    #[serde(default = "default_true")]
    pub build_on_missing_output: bool,
    #[serde(default)]
    pub reset_policy: ResetPolicy,
    #[serde(default)]
    pub failure_granularity: FailureGranularity,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_blocked_keywords")]
    pub blocked_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingConfig {
    #[serde(default = "default_flagship_group")]
    pub flagship_group: String,
    #[serde(default = "default_flagship_order")]
    pub flagship_order: Vec<String>,
    #[serde(default = "default_group_ranks")]
    pub groups: Vec<GroupRank>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRank {
    pub label: String,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// File stem under the output directory
    pub name: String,
    /// URL stem the playlist is served under
    pub route: String,
    /// Group labels to include; empty means every group
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_sources_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCES_PATH)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_failure_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_FAILURE_LEDGER_PATH)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)
}

fn default_failure_limit() -> u32 {
    DEFAULT_FAILURE_LIMIT
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_refresh_cron() -> String {
    DEFAULT_REFRESH_CRON.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_blocked_keywords() -> Vec<String> {
    DEFAULT_BLOCKED_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_flagship_group() -> String {
    DEFAULT_FLAGSHIP_GROUP.to_string()
}

fn default_flagship_order() -> Vec<String> {
    DEFAULT_FLAGSHIP_ORDER.iter().map(|n| n.to_string()).collect()
}

fn default_group_ranks() -> Vec<GroupRank> {
    DEFAULT_GROUP_RANKS
        .iter()
        .map(|(label, rank)| GroupRank {
            label: label.to_string(),
            rank: *rank,
        })
        .collect()
}

fn default_playlists() -> Vec<PlaylistConfig> {
    DEFAULT_PLAYLISTS
        .iter()
        .map(|(name, route, groups)| PlaylistConfig {
            name: name.to_string(),
            route: route.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        })
        .collect()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sources_path: default_sources_path(),
            output_path: default_output_path(),
            failure_ledger_path: default_failure_ledger_path(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: default_fetch_timeout(),
            failure_limit: default_failure_limit(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            refresh_cron: default_refresh_cron(),
            timezone: default_timezone(),
            build_on_startup: true,
            build_on_missing_output: true,
            reset_policy: ResetPolicy::default(),
            failure_granularity: FailureGranularity::default(),
            user_agent: None,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blocked_keywords: default_blocked_keywords(),
        }
    }
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            flagship_group: default_flagship_group(),
            flagship_order: default_flagship_order(),
            groups: default_group_ranks(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            storage: StorageConfig::default(),
            ingestion: IngestionConfig::default(),
            filter: FilterConfig::default(),
            ordering: OrderingConfig::default(),
            playlists: default_playlists(),
        }
    }
}

impl IngestionConfig {
    pub fn schedule(&self) -> AppResult<cron::Schedule> {
        cron::Schedule::from_str(&self.refresh_cron).map_err(|e| {
            AppError::configuration(format!(
                "Invalid refresh_cron '{}': {}",
                self.refresh_cron, e
            ))
        })
    }

    pub fn tz(&self) -> AppResult<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|e| {
            AppError::configuration(format!("Invalid timezone '{}': {}", self.timezone, e))
        })
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.ingestion.failure_limit == 0 {
            return Err(AppError::configuration("failure_limit must be at least 1"));
        }
        if self.ingestion.max_concurrent_fetches == 0 {
            return Err(AppError::configuration(
                "max_concurrent_fetches must be at least 1",
            ));
        }
        self.ingestion.schedule()?;
        self.ingestion.tz()?;

        Group::from_str(&self.ordering.flagship_group)?;
        for group in &self.ordering.groups {
            Group::from_str(&group.label)?;
        }

        let mut names = HashSet::new();
        let mut routes = HashSet::new();
        for playlist in &self.playlists {
            if playlist.name.trim().is_empty() || playlist.route.trim().is_empty() {
                return Err(AppError::configuration(
                    "playlist name and route must not be empty",
                ));
            }
            if playlist.name.contains(['/', '\\']) || playlist.route.contains(['/', '\\']) {
                return Err(AppError::configuration(format!(
                    "playlist '{}' must not contain path separators",
                    playlist.name
                )));
            }
            if !names.insert(playlist.name.as_str()) {
                return Err(AppError::configuration(format!(
                    "duplicate playlist name '{}'",
                    playlist.name
                )));
            }
            if !routes.insert(playlist.route.as_str()) {
                return Err(AppError::configuration(format!(
                    "duplicate playlist route '{}'",
                    playlist.route
                )));
            }
            for group in &playlist.groups {
                Group::from_str(group)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ingestion.failure_limit, 3);
        assert_eq!(config.ingestion.fetch_timeout, Duration::from_secs(8));
        assert_eq!(config.playlists.len(), 3);
        assert_eq!(config.web.port, 3566);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ingestion]
            failure_limit = 5
            fetch_timeout = "15s"
            reset_policy = "never"
            failure_granularity = "per_stream_url"
            "#,
        )
        .unwrap();

        assert_eq!(config.ingestion.failure_limit, 5);
        assert_eq!(config.ingestion.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.ingestion.reset_policy, ResetPolicy::Never);
        assert_eq!(
            config.ingestion.failure_granularity,
            FailureGranularity::PerStreamUrl
        );
        assert_eq!(config.ingestion.refresh_cron, DEFAULT_REFRESH_CRON);
        assert_eq!(config.filter.blocked_keywords.len(), DEFAULT_BLOCKED_KEYWORDS.len());
        assert_eq!(config.playlists.len(), 3);
    }

    #[test]
    fn test_default_config_survives_toml_round_trip() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.ordering.groups, Config::default().ordering.groups);
        assert_eq!(parsed.playlists, Config::default().playlists);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.ingestion.failure_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingestion.refresh_cron = "every day".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingestion.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.playlists.push(config.playlists[0].clone());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.playlists[0].name = "../escape".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file_writes_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        let config = Config::load_from_file(path_str).unwrap();
        assert!(path.exists());
        assert_eq!(config.web.port, DEFAULT_PORT);

        let reloaded = Config::load_from_file(path_str).unwrap();
        assert_eq!(reloaded.playlists, config.playlists);
    }
}
