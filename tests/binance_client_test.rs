//! Binance REST Client Tests - Against an In-process Fake Exchange
//!
//! Serves the handful of Binance endpoints the client uses from an
//! axum router on a random local port, verifying the API key header
//! and the HMAC signature the way the exchange does.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal_macros::dec;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use binance_sensors::adapters::binance::{BinanceClientConfig, BinanceConnector};
use binance_sensors::domain::Credentials;
use binance_sensors::ports::exchange::{ExchangeClient, ExchangeConnector, ExchangeError};
use binance_sensors::usecases::{PollingAdapter, RefreshOutcome};

const API_KEY: &str = "fake-api-key";
const API_SECRET: &str = "fake-api-secret";

#[derive(Clone)]
struct FakeExchange {
    api_key: Arc<str>,
    api_secret: Arc<str>,
}

fn error_body(status: StatusCode, code: i64, msg: &str) -> Response {
    (status, Json(json!({ "code": code, "msg": msg }))).into_response()
}

async fn ping() -> impl IntoResponse {
    Json(json!({}))
}

async fn server_time() -> impl IntoResponse {
    Json(json!({ "serverTime": chrono::Utc::now().timestamp_millis() + 1_500 }))
}

async fn account(
    State(exchange): State<FakeExchange>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let key = headers.get("x-mbx-apikey").and_then(|v| v.to_str().ok());
    if key != Some(&*exchange.api_key) {
        return error_body(
            StatusCode::UNAUTHORIZED,
            -2015,
            "Invalid API-key, IP, or permissions for action.",
        );
    }

    let query = query.unwrap_or_default();
    let Some((payload, signature)) = query.rsplit_once("&signature=") else {
        return error_body(StatusCode::BAD_REQUEST, -1102, "Mandatory parameter 'signature' was not sent.");
    };
    if !payload.starts_with("recvWindow=5000&timestamp=") {
        return error_body(StatusCode::BAD_REQUEST, -1102, "Mandatory parameter 'timestamp' was not sent.");
    }
    let expected = hex::encode(hmac_sha256::HMAC::mac(
        payload.as_bytes(),
        exchange.api_secret.as_bytes(),
    ));
    if signature != expected {
        return error_body(StatusCode::BAD_REQUEST, -1022, "Signature for this request is not valid.");
    }

    Json(json!({
        "makerCommission": 10,
        "canTrade": true,
        "balances": [
            { "asset": "BTC", "free": "1.50000000", "locked": "0.00000000" },
            { "asset": "ETH", "free": "10.00000000", "locked": "2.50000000" },
            { "asset": "USD", "free": "12.34000000", "locked": "0.00000000" }
        ]
    }))
    .into_response()
}

async fn ticker_price(Query(params): Query<HashMap<String, String>>) -> Response {
    let tickers = [("BTCUSD", "50000.00000000"), ("ETHBTC", "0.05000000")];
    match params.get("symbol") {
        None => Json(
            tickers
                .iter()
                .map(|(symbol, price)| json!({ "symbol": symbol, "price": price }))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Some(symbol) => match tickers.iter().find(|(s, _)| *s == symbol.as_str()) {
            Some((s, price)) => Json(json!({ "symbol": s, "price": price })).into_response(),
            None => error_body(StatusCode::BAD_REQUEST, -1121, "Invalid symbol."),
        },
    }
}

/// Start the fake exchange and return its address.
async fn spawn_exchange() -> SocketAddr {
    let state = FakeExchange {
        api_key: API_KEY.into(),
        api_secret: API_SECRET.into(),
    };
    let app = Router::new()
        .route("/api/v3/ping", get(ping))
        .route("/api/v3/time", get(server_time))
        .route("/api/v3/account", get(account))
        .route("/api/v3/ticker/price", get(ticker_price))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn connector(addr: SocketAddr) -> BinanceConnector {
    BinanceConnector::new(BinanceClientConfig {
        base_url: format!("http://{addr}/"),
        timeout: Duration::from_secs(5),
        ..BinanceClientConfig::default()
    })
    .unwrap()
}

fn credentials(key: &str, secret: &str) -> Credentials {
    Credentials::new(key, secret, "us")
}

#[tokio::test]
async fn test_fetch_balances_and_tickers() {
    let addr = spawn_exchange().await;
    let client = assert_ok!(connector(addr).connect(&credentials(API_KEY, API_SECRET)).await);

    let balances = client.account_balances().await.unwrap();
    assert_eq!(balances.len(), 3);
    assert_eq!(balances[0].asset, "BTC");
    assert_eq!(balances[0].free, dec!(1.5));
    assert_eq!(balances[1].locked, dec!(2.5));

    let tickers = client.all_tickers().await.unwrap();
    assert_eq!(tickers.len(), 2);
    assert_eq!(tickers[0].symbol, "BTCUSD");
    assert_eq!(tickers[0].price, dec!(50000));

    let single = client.ticker("ethbtc").await.unwrap();
    assert_eq!(single.symbol, "ETHBTC");
    assert_eq!(single.price, dec!(0.05));
}

#[tokio::test]
async fn test_unknown_symbol() {
    let addr = spawn_exchange().await;
    let client = assert_ok!(connector(addr).connect(&credentials(API_KEY, API_SECRET)).await);

    match client.ticker("dogeusd").await {
        Err(ExchangeError::UnknownSymbol { symbol }) => assert_eq!(symbol, "DOGEUSD"),
        other => panic!("expected unknown symbol, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_api_key_is_authentication_error() {
    let addr = spawn_exchange().await;
    // Public endpoints do not check the key, so connecting succeeds.
    let client = assert_ok!(connector(addr).connect(&credentials("other-key", API_SECRET)).await);

    let err = assert_err!(client.account_balances().await);
    assert!(matches!(err, ExchangeError::Authentication { code: -2015, .. }));
    assert!(err.invalidates_session());
    // Prices stay readable.
    assert!(client.all_tickers().await.is_ok());
}

#[tokio::test]
async fn test_wrong_secret_fails_signature_check() {
    let addr = spawn_exchange().await;
    let client = assert_ok!(connector(addr).connect(&credentials(API_KEY, "other-secret")).await);

    let err = assert_err!(client.account_balances().await);
    assert!(matches!(err, ExchangeError::Authentication { code: -1022, .. }));
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = connector(addr)
        .connect(&credentials(API_KEY, API_SECRET))
        .await;
    match result {
        Err(ExchangeError::Connection { host, .. }) => assert_eq!(host, "binance.us"),
        Err(other) => panic!("expected connection error, got {other:?}"),
        Ok(_) => panic!("connected to a closed port"),
    }
}

#[tokio::test]
async fn test_polling_adapter_end_to_end() {
    let addr = spawn_exchange().await;
    let adapter = PollingAdapter::new(
        "Binance",
        credentials(API_KEY, API_SECRET),
        Arc::new(connector(addr)),
        Duration::from_secs(60),
    );

    let snapshot = match adapter.refresh().await {
        RefreshOutcome::Updated(snapshot) => snapshot,
        other => panic!("expected update, got {other:?}"),
    };
    assert_eq!(snapshot.balance_count(), 3);
    assert_eq!(snapshot.ticker_count(), 2);
    assert_eq!(adapter.get_balance("usd").unwrap().free, dec!(12.34));

    assert!(matches!(adapter.refresh().await, RefreshOutcome::Throttled));
}
