//! Binance Sensors — Entry Point
//!
//! Initializes configuration, logging, the entity host, and one
//! polling scheduler per configured account. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate (credentials may come from env)
//! 2. Init tracing (JSON structured logging)
//! 3. Create metrics registry + entity store (EntityHost port)
//! 4. Spawn host server (/entities, /live, /ready, /metrics)
//! 5. Per account: BinanceConnector → PollingAdapter → AccountScheduler
//! 6. Wait for SIGINT/SIGTERM → broadcast shutdown → join tasks

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use binance_sensors::adapters::binance::{BinanceClientConfig, BinanceConnector};
use binance_sensors::adapters::host::{EntityStore, HostServer};
use binance_sensors::adapters::metrics::MetricsRegistry;
use binance_sensors::config::{self, AccountConfig, AppConfig};
use binance_sensors::ports::EntityHost;
use binance_sensors::usecases::{AccountScheduler, PollingAdapter};

/// Config path used when neither an argument nor the env var is given.
const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// Environment variable overriding the config path.
const CONFIG_PATH_ENV: &str = "BINANCE_SENSORS_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        accounts = config.accounts.len(),
        scan_interval_secs = config.service.scan_interval_secs,
        "Starting Binance sensors"
    );

    // ── 3. Shutdown channel, metrics and entity store ───────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics")?);
    let store = Arc::new(EntityStore::new(config.accounts.len(), Arc::clone(&metrics)));

    // ── 4. Host server ──────────────────────────────────────
    let server_handle = if config.server.enabled {
        let server = HostServer::new(Arc::clone(&store), &config.server.bind_address);
        let server_shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(server_shutdown).await {
                error!(error = %e, "Host server failed");
            }
        }))
    } else {
        info!("Host server disabled");
        None
    };

    // ── 5. One scheduler per account ────────────────────────
    let host: Arc<dyn EntityHost> = store;
    let mut account_handles = Vec::with_capacity(config.accounts.len());
    for account in &config.accounts {
        let scheduler = build_scheduler(&config, account, Arc::clone(&host))
            .with_context(|| format!("Failed to set up account {}", account.name))?;
        let account_shutdown = shutdown_tx.subscribe();
        let name = account.name.clone();
        account_handles.push(tokio::spawn(async move {
            if let Err(e) = scheduler.run(account_shutdown).await {
                error!(account = %name, error = %e, "Account scheduler failed");
            }
        }));
    }

    info!("All tasks spawned, service is running");

    // ── 6. Wait for SIGINT or SIGTERM ───────────────────────
    wait_for_signal().await;

    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    for handle in account_handles {
        let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
    }
    if let Some(handle) = server_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wire connector, adapter and scheduler for one account.
fn build_scheduler(
    config: &AppConfig,
    account: &AccountConfig,
    host: Arc<dyn EntityHost>,
) -> Result<AccountScheduler> {
    let connector = BinanceConnector::new(BinanceClientConfig {
        base_url: account.rest_base_url(),
        timeout: config.service.request_timeout(),
        recv_window_ms: config.service.recv_window_ms,
        max_requests_per_second: config.service.max_requests_per_second,
    })?;

    let adapter = Arc::new(PollingAdapter::new(
        &account.name,
        account.credentials(),
        Arc::new(connector),
        config.service.min_time_between_updates(),
    ));

    info!(
        account = %account.name,
        host = %account.credentials().host(),
        native_currency = %account.native_currency,
        balances = ?account.balances,
        exchanges = ?account.exchanges,
        "Account configured"
    );

    Ok(AccountScheduler::new(
        adapter,
        account.projection(),
        host,
        config.service.scan_interval(),
    ))
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Cannot install SIGTERM handler");
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => info!("SIGINT received, initiating graceful shutdown"),
            _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("SIGINT received, initiating graceful shutdown");
    }
}
