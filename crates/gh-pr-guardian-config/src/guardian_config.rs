//! Guardian configuration
//!
//! Configuration loaded from `.gh-pr-guardian.toml`, then overridden by
//! environment variables.

use gh_client::MergeMethod;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Repository watched when nothing else is configured
pub const DEFAULT_REPOSITORY: &str = "sassman/gh-pr-guardian";

/// Environment variable naming the target repository
pub const REPOSITORY_ENV: &str = "GUARDIAN_REPOSITORY";

/// Repository variable set by GitHub Actions runners
pub const GITHUB_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Environment variable naming the GitHub host
pub const HOST_ENV: &str = "GUARDIAN_HOST";

/// Environment variable enabling dry-run mode
pub const DRY_RUN_ENV: &str = "GUARDIAN_DRY_RUN";

/// Guardian configuration loaded from .gh-pr-guardian.toml
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GuardianConfig {
    /// Target repository as `owner/name`
    #[serde(default = "default_repository")]
    pub repository: String,

    /// GitHub host (None = github.com)
    #[serde(default)]
    pub host: Option<String>,

    /// PRs older than this many days are marked stale
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,

    /// Number of failed checks rerun per failure episode
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Minutes before `rerun-attempted` is removed again
    #[serde(default = "default_rerun_cooldown_minutes")]
    pub rerun_cooldown_minutes: u64,

    /// Minutes before `auto-updated` is removed again
    #[serde(default = "default_sync_cooldown_minutes")]
    pub sync_cooldown_minutes: u64,

    /// Below this many remaining requests the run waits for the quota reset
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u64,

    /// Upper bound for the quota wait, in seconds
    #[serde(default = "default_max_rate_limit_wait_secs")]
    pub max_rate_limit_wait_secs: u64,

    /// Case-insensitive patterns identifying secret-scanning checks
    #[serde(default = "default_secret_scan_patterns")]
    pub secret_scan_patterns: Vec<String>,

    /// Remove `secret-violation` once every secret scan passes
    #[serde(default)]
    pub auto_clear_secret_violation: bool,

    /// Merge method requested when enabling auto-merge
    #[serde(default)]
    pub merge_method: MergeMethod,

    /// Evaluate rules without mutating anything on GitHub
    #[serde(default)]
    pub dry_run: bool,

    /// Location of the label expiry ledger (defaults to the cache directory)
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_stale_after_days() -> u32 {
    30
}

fn default_max_retries() -> usize {
    1
}

fn default_rerun_cooldown_minutes() -> u64 {
    120
}

fn default_sync_cooldown_minutes() -> u64 {
    60
}

fn default_rate_limit_threshold() -> u64 {
    10
}

fn default_max_rate_limit_wait_secs() -> u64 {
    3600
}

fn default_secret_scan_patterns() -> Vec<String> {
    vec![
        "gitleaks".to_string(),
        "trufflehog".to_string(),
        r"secret[-_ ]?scan".to_string(),
        "detect-secrets".to_string(),
    ]
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            host: None,
            stale_after_days: default_stale_after_days(),
            max_retries: default_max_retries(),
            rerun_cooldown_minutes: default_rerun_cooldown_minutes(),
            sync_cooldown_minutes: default_sync_cooldown_minutes(),
            rate_limit_threshold: default_rate_limit_threshold(),
            max_rate_limit_wait_secs: default_max_rate_limit_wait_secs(),
            secret_scan_patterns: default_secret_scan_patterns(),
            auto_clear_secret_violation: false,
            merge_method: MergeMethod::default(),
            dry_run: false,
            ledger_path: None,
        }
    }
}

impl GuardianConfig {
    /// Load config from CWD first, then home directory, or use defaults,
    /// then apply environment overrides
    pub fn load() -> Self {
        crate::load_dotenv();

        let mut config = Self::from_file().unwrap_or_else(|| {
            log::debug!("Using default guardian config");
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    fn from_file() -> Option<Self> {
        let content = crate::load_config_file()?;
        match toml::from_str(&content) {
            Ok(config) => {
                log::info!("Loaded guardian config from file");
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to parse config file: {}", e);
                None
            }
        }
    }

    /// Apply environment overrides using the given variable lookup
    ///
    /// `GUARDIAN_REPOSITORY` beats `GITHUB_REPOSITORY`; empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(repository) = non_empty(REPOSITORY_ENV).or_else(|| non_empty(GITHUB_REPOSITORY_ENV))
        {
            self.repository = repository.trim().to_string();
        }
        if let Some(host) = non_empty(HOST_ENV) {
            self.host = Some(host.trim().to_string());
        }
        if let Some(flag) = non_empty(DRY_RUN_ENV) {
            self.dry_run = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Parsed target repository
    pub fn repository(&self) -> Result<RepositoryRef, RepositoryParseError> {
        self.repository.parse()
    }

    /// Cool-down of the `rerun-attempted` label
    pub fn rerun_cooldown(&self) -> Duration {
        Duration::from_secs(self.rerun_cooldown_minutes.saturating_mul(60))
    }

    /// Cool-down of the `auto-updated` label
    pub fn sync_cooldown(&self) -> Duration {
        Duration::from_secs(self.sync_cooldown_minutes.saturating_mul(60))
    }

    /// Upper bound for the quota wait
    pub fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_wait_secs)
    }
}

/// An `owner/name` repository reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// The repository setting is not of the form `owner/name`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid repository '{0}', expected 'owner/name'")]
pub struct RepositoryParseError(pub String);

impl FromStr for RepositoryRef {
    type Err = RepositoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(RepositoryParseError(s.to_string())),
        }
    }
}
