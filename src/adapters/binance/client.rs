//! Binance HTTP Client - Rate-limited Read-only REST Client
//!
//! Wraps reqwest with client-side rate limiting, request signing, and
//! mapping of Binance error bodies onto `ExchangeError`. Each request
//! is tried once; the polling schedule is the retry mechanism.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, info, instrument};

use super::auth::{API_KEY_HEADER, BinanceAuth};
use super::types::{AccountInfo, ApiErrorBody, PriceTicker, ServerTime};
use crate::domain::symbols::normalize_symbol;
use crate::domain::{BalanceRecord, Credentials, TickerRecord};
use crate::ports::exchange::{ExchangeClient, ExchangeConnector, ExchangeError};

/// Binance error codes meaning the key, secret or signature was refused.
const AUTH_ERROR_CODES: [i64; 3] = [-2014, -2015, -1022];
/// Binance error code for a timestamp outside `recvWindow` or ahead of
/// the server clock.
const TIMESTAMP_ERROR_CODE: i64 = -1021;
/// Binance error code for an unknown trading pair.
const INVALID_SYMBOL_CODE: i64 = -1121;

/// Configuration for the Binance HTTP client.
#[derive(Debug, Clone)]
pub struct BinanceClientConfig {
    /// REST base URL, e.g. `https://api.binance.us`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// `recvWindow` for signed requests (ms).
    pub recv_window_ms: u64,
    /// Client-side request cap.
    pub max_requests_per_second: u32,
}

impl Default for BinanceClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.us".to_string(),
            timeout: Duration::from_secs(10),
            recv_window_ms: 5_000,
            max_requests_per_second: 10,
        }
    }
}

/// Opens Binance sessions: ping, then clock sync.
pub struct BinanceConnector {
    http: Client,
    config: BinanceClientConfig,
}

impl BinanceConnector {
    /// Create a connector; the underlying HTTP pool is shared by all
    /// sessions it opens.
    pub fn new(config: BinanceClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(2)
            .user_agent(concat!("binance-sensors/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl ExchangeConnector for BinanceConnector {
    #[instrument(skip(self, credentials), fields(base_url = %self.config.base_url))]
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ExchangeClient>, ExchangeError> {
        let client = BinanceRestClient::new(self.http.clone(), &self.config, credentials);

        let connection_error = |e: ExchangeError| ExchangeError::Connection {
            host: credentials.host(),
            message: e.to_string(),
        };
        client.ping().await.map_err(connection_error)?;
        client.sync_clock().await.map_err(connection_error)?;

        info!(
            host = %credentials.host(),
            clock_offset_ms = client.auth.time_offset_ms(),
            "Connected to Binance"
        );
        Ok(Arc::new(client))
    }
}

/// One authenticated Binance session.
pub struct BinanceRestClient {
    http: Client,
    base_url: String,
    auth: BinanceAuth,
    limiter: DefaultDirectRateLimiter,
}

impl BinanceRestClient {
    /// Create a session without contacting the exchange.
    pub fn new(http: Client, config: &BinanceClientConfig, credentials: &Credentials) -> Self {
        let per_second =
            NonZeroU32::new(config.max_requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: BinanceAuth::new(credentials, config.recv_window_ms),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }

    /// `GET /api/v3/ping`.
    pub async fn ping(&self) -> Result<(), ExchangeError> {
        let _: IgnoredAny = self.get_public("/api/v3/ping", &[]).await?;
        Ok(())
    }

    /// `GET /api/v3/time`, then align the signing clock.
    pub async fn sync_clock(&self) -> Result<(), ExchangeError> {
        let time: ServerTime = self.get_public("/api/v3/time", &[]).await?;
        self.auth.sync_clock(time.server_time);
        Ok(())
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.http.get(&url).query(query);
        self.send(request, path, query_symbol(query)).await
    }

    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}{}?{}", self.base_url, path, self.auth.signed_query(params));
        let request = self.http.get(&url).header(API_KEY_HEADER, self.auth.api_key());
        self.send(request, path, query_symbol(params)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
        symbol: Option<&str>,
    ) -> Result<T, ExchangeError> {
        self.limiter.until_ready().await;

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        debug!(path, status = status.as_u16(), bytes = body.len(), "Binance response");

        if !status.is_success() {
            return Err(map_error_response(status, &body, symbol));
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl ExchangeClient for BinanceRestClient {
    #[instrument(skip(self))]
    async fn account_balances(&self) -> Result<Vec<BalanceRecord>, ExchangeError> {
        let account: AccountInfo = self.get_signed("/api/v3/account", &[]).await?;
        debug!(balances = account.balances.len(), "Fetched balances");
        Ok(account.balances.into_iter().map(BalanceRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn all_tickers(&self) -> Result<Vec<TickerRecord>, ExchangeError> {
        let tickers: Vec<PriceTicker> = self.get_public("/api/v3/ticker/price", &[]).await?;
        debug!(tickers = tickers.len(), "Fetched exchange rates");
        Ok(tickers.into_iter().map(TickerRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn ticker(&self, pair: &str) -> Result<TickerRecord, ExchangeError> {
        let symbol = normalize_symbol(pair);
        let ticker: PriceTicker = self
            .get_public("/api/v3/ticker/price", &[("symbol", symbol.as_str())])
            .await?;
        Ok(ticker.into())
    }
}

fn query_symbol<'a>(query: &[(&str, &'a str)]) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| *k == "symbol")
        .map(|(_, v)| *v)
}

/// Translate a non-2xx Binance response into an `ExchangeError`.
///
/// `symbol` is the pair the request asked for, if any.
pub fn map_error_response(status: StatusCode, body: &str, symbol: Option<&str>) -> ExchangeError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();

    match parsed {
        Some(err) if AUTH_ERROR_CODES.contains(&err.code) => ExchangeError::Authentication {
            code: err.code,
            message: err.msg,
        },
        Some(err) if err.code == TIMESTAMP_ERROR_CODE => ExchangeError::ClockSkew {
            code: err.code,
            message: err.msg,
        },
        Some(err) if err.code == INVALID_SYMBOL_CODE => ExchangeError::UnknownSymbol {
            symbol: symbol.unwrap_or_default().to_string(),
        },
        _ if status == StatusCode::UNAUTHORIZED => ExchangeError::Authentication {
            code: 0,
            message: body.to_string(),
        },
        Some(err) => ExchangeError::Api {
            status: status.as_u16(),
            code: Some(err.code),
            message: err.msg,
        },
        None => ExchangeError::Api {
            status: status.as_u16(),
            code: None,
            message: body.chars().take(200).collect(),
        },
    }
}
