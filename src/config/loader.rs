//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, filling credentials from the
//! environment, validating all parameters, and providing clear error
//! messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::domain::symbols::slugify;

/// Environment variable supplying the API key of accounts that leave it empty.
pub const ENV_API_KEY: &str = "BINANCE_API_KEY";
/// Environment variable supplying the API secret of accounts that leave it empty.
pub const ENV_API_SECRET: &str = "BINANCE_API_SECRET";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content, |name| std::env::var(name).ok())?;

  info!(
    accounts = config.accounts.len(),
    scan_interval_secs = config.service.scan_interval_secs,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse, fill credentials via `env`, and validate.
///
/// `env` is injected so tests do not depend on the process environment.
pub fn parse_config<F>(content: &str, env: F) -> Result<AppConfig>
where
  F: Fn(&str) -> Option<String>,
{
  let mut config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  apply_env_credentials(&mut config, env);
  validate_config(&config)?;
  Ok(config)
}

/// Fill empty API keys and secrets from the environment.
fn apply_env_credentials<F>(config: &mut AppConfig, env: F)
where
  F: Fn(&str) -> Option<String>,
{
  for account in &mut config.accounts {
    if account.api_key.trim().is_empty() {
      if let Some(key) = env(ENV_API_KEY) {
        account.api_key = key;
      }
    }
    if account.api_secret.trim().is_empty() {
      if let Some(secret) = env(ENV_API_SECRET) {
        account.api_secret = secret;
      }
    }
  }
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - At least one account, with unique names
/// - Non-empty credentials and currency codes
/// - Positive intervals, throttle no longer than the scan interval
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.accounts.is_empty(),
    "At least one account must be configured"
  );

  let mut seen = HashSet::new();
  for (i, account) in config.accounts.iter().enumerate() {
    let slug = slugify(&account.name);
    anyhow::ensure!(!slug.is_empty(), "Account {} has an empty name", i);
    anyhow::ensure!(
      seen.insert(slug),
      "Account name {:?} is used more than once",
      account.name
    );
    anyhow::ensure!(
      !account.api_key.trim().is_empty(),
      "Account {} ({}) has no api_key (set it or {})",
      i,
      account.name,
      ENV_API_KEY
    );
    anyhow::ensure!(
      !account.api_secret.trim().is_empty(),
      "Account {} ({}) has no api_secret (set it or {})",
      i,
      account.name,
      ENV_API_SECRET
    );
    anyhow::ensure!(
      !account.domain.trim().is_empty()
        && account.domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '.'),
      "Account {} ({}) has invalid domain {:?}",
      i,
      account.name,
      account.domain
    );
    anyhow::ensure!(
      !account.native_currency.trim().is_empty(),
      "Account {} ({}) has empty native_currency",
      i,
      account.name
    );
  }

  let service = &config.service;
  anyhow::ensure!(
    service.scan_interval_secs > 0,
    "scan_interval_secs must be positive"
  );
  anyhow::ensure!(
    service.min_time_between_updates_secs <= service.scan_interval_secs,
    "min_time_between_updates_secs ({}) must not exceed scan_interval_secs ({})",
    service.min_time_between_updates_secs,
    service.scan_interval_secs
  );
  anyhow::ensure!(
    service.request_timeout_secs > 0,
    "request_timeout_secs must be positive"
  );
  anyhow::ensure!(
    service.recv_window_ms > 0 && service.recv_window_ms <= 60_000,
    "recv_window_ms must be in (0, 60000], got {}",
    service.recv_window_ms
  );
  anyhow::ensure!(
    service.max_requests_per_second > 0,
    "max_requests_per_second must be positive"
  );

  if config.server.enabled {
    anyhow::ensure!(
      config.server.bind_address.parse::<std::net::SocketAddr>().is_ok(),
      "server.bind_address {:?} is not a socket address",
      config.server.bind_address
    );
  }

  Ok(())
}
