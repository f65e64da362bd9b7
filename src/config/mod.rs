//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`, with API
//! credentials optionally supplied through environment variables
//! so they never have to be committed to the file.

pub mod loader;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::Credentials;
use crate::domain::symbols::normalize_symbol;
use crate::usecases::ProjectionConfig;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Polling and logging behaviour shared by all accounts.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Entity / health / metrics HTTP server.
  #[serde(default)]
  pub server: ServerConfig,
  /// One entry per exchange account.
  pub accounts: Vec<AccountConfig>,
}

/// Service-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Seconds between scheduled polls.
  #[serde(default = "default_scan_interval")]
  pub scan_interval_secs: u64,
  /// Minimum seconds between two remote fetches of one account.
  #[serde(default = "default_min_time_between_updates")]
  pub min_time_between_updates_secs: u64,
  /// HTTP request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub request_timeout_secs: u64,
  /// `recvWindow` sent with signed requests (milliseconds).
  #[serde(default = "default_recv_window")]
  pub recv_window_ms: u64,
  /// Client-side cap on requests per second, per account.
  #[serde(default = "default_max_requests_per_second")]
  pub max_requests_per_second: u32,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      log_level: default_log_level(),
      scan_interval_secs: default_scan_interval(),
      min_time_between_updates_secs: default_min_time_between_updates(),
      request_timeout_secs: default_timeout(),
      recv_window_ms: default_recv_window(),
      max_requests_per_second: default_max_requests_per_second(),
    }
  }
}

impl ServiceConfig {
  pub fn scan_interval(&self) -> Duration {
    Duration::from_secs(self.scan_interval_secs)
  }

  pub fn min_time_between_updates(&self) -> Duration {
    Duration::from_secs(self.min_time_between_updates_secs)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Serve entities, health probes and metrics.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_bind_address(),
    }
  }
}

/// One exchange account.
#[derive(Clone, Deserialize)]
pub struct AccountConfig {
  /// Display name, prefixed to every entity name.
  #[serde(default = "default_name")]
  pub name: String,
  /// API key. Empty means "read `BINANCE_API_KEY`".
  #[serde(default)]
  pub api_key: String,
  /// API secret. Empty means "read `BINANCE_API_SECRET`".
  #[serde(default)]
  pub api_secret: String,
  /// Exchange top-level domain ("us" for binance.us, "com" for binance.com).
  #[serde(default = "default_domain")]
  pub domain: String,
  /// Currency balances are converted into.
  #[serde(default = "default_currency")]
  pub native_currency: String,
  /// Assets to expose; empty exposes every asset.
  #[serde(default)]
  pub balances: Vec<String>,
  /// Trading pairs to expose; empty exposes every pair.
  #[serde(default)]
  pub exchanges: Vec<String>,
  /// REST base URL override (defaults to `https://api.binance.<domain>`).
  #[serde(default)]
  pub base_url: Option<String>,
}

impl AccountConfig {
  pub fn credentials(&self) -> Credentials {
    Credentials::new(&self.api_key, &self.api_secret, &self.domain)
  }

  pub fn projection(&self) -> ProjectionConfig {
    ProjectionConfig {
      account_name: self.name.clone(),
      native_currency: normalize_symbol(&self.native_currency),
      balances: self.balances.clone(),
      exchanges: self.exchanges.clone(),
    }
  }

  /// REST base URL for this account.
  pub fn rest_base_url(&self) -> String {
    self.base_url.clone().unwrap_or_else(|| {
      format!("https://api.binance.{}", self.domain.trim().to_lowercase())
    })
  }
}

impl fmt::Debug for AccountConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AccountConfig")
      .field("name", &self.name)
      .field("api_key", &self.api_key)
      .field("api_secret", &"<redacted>")
      .field("domain", &self.domain)
      .field("native_currency", &self.native_currency)
      .field("balances", &self.balances)
      .field("exchanges", &self.exchanges)
      .field("base_url", &self.base_url)
      .finish()
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_scan_interval() -> u64 {
  60
}

fn default_min_time_between_updates() -> u64 {
  60
}

fn default_timeout() -> u64 {
  10
}

fn default_recv_window() -> u64 {
  5_000
}

fn default_max_requests_per_second() -> u32 {
  10
}

fn default_bind_address() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_name() -> String {
  "Binance".to_string()
}

fn default_domain() -> String {
  "us".to_string()
}

fn default_currency() -> String {
  "USD".to_string()
}
