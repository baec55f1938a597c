use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::validate::DEFAULT_IDENTIFIER_MAX_LEN;

/// Project-local directory holding the store and config.
pub const PROJECT_DIR: &str = ".taxq";
/// Store file name inside [`PROJECT_DIR`].
pub const STORE_FILE: &str = "taxq.db";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub identifier: IdentifierConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Subdomain (or numeric id) used when `--account` is not given.
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Return year used by `add` and `check-id` when `--year` is omitted.
    #[serde(default)]
    pub default_return_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierConfig {
    /// Must be within `1..=4`.
    #[serde(default = "default_identifier_max_len")]
    pub max_len: usize,
}

impl IdentifierConfig {
    /// # Errors
    ///
    /// Returns an error when `max_len` is outside `1..=4`.
    pub fn validate(&self) -> Result<()> {
        if !(1..=DEFAULT_IDENTIFIER_MAX_LEN).contains(&self.max_len) {
            bail!(
                "identifier.max_len = {} is outside 1..={DEFAULT_IDENTIFIER_MAX_LEN}",
                self.max_len
            );
        }
        Ok(())
    }
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            max_len: default_identifier_max_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Attempts per unit when the store reports busy/locked.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: if self.retry_attempts == 0 { 1 } else { self.retry_attempts },
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// How often a unit is retried after a transient store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Sleep before attempt `n` is `backoff * (n - 1)`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        StoreConfig::default().retry_policy()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Staff identity recorded in `last_updated_by`.
    #[serde(default)]
    pub staff: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

/// Load `.taxq/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or
/// holds an out-of-range value.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .identifier
        .validate()
        .with_context(|| format!("Invalid {}", path.display()))?;
    Ok(config)
}

/// Load `<config_dir>/taxq/config.toml`, falling back to defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("taxq/config.toml"))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pick the account handle: CLI flag, then `TAXQ_ACCOUNT`, then config.
#[must_use]
pub fn resolve_account_handle(
    cli_flag: Option<&str>,
    env_value: Option<String>,
    config: &ProjectConfig,
) -> Option<String> {
    cli_flag
        .map(str::to_string)
        .or(env_value)
        .or_else(|| config.account.default.clone())
        .map(|handle| handle.trim().to_string())
        .filter(|handle| !handle.is_empty())
}

const fn default_identifier_max_len() -> usize {
    DEFAULT_IDENTIFIER_MAX_LEN
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

const fn default_retry_attempts() -> u32 {
    3
}

const fn default_retry_backoff_ms() -> u64 {
    50
}
