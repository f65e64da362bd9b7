//! Host Server - Entities, Health Probes and Metrics over HTTP
//!
//! Exposes the entity store via axum 0.7:
//! - `/live`: 200 while the process runs
//! - `/ready`: 200 once every account has registered its entities
//! - `/entities`, `/entities/:entity_id`: JSON entity states
//! - `/metrics`: Prometheus text format

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use super::store::EntityStore;

/// Build the router over `store`.
pub fn router(store: Arc<EntityStore>) -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/entities", get(list_entities))
        .route("/entities/:entity_id", get(get_entity))
        .route("/metrics", get(metrics))
        .with_state(store)
}

/// HTTP server for the entity store.
pub struct HostServer {
    store: Arc<EntityStore>,
    bind_address: String,
}

impl HostServer {
    pub fn new(store: Arc<EntityStore>, bind_address: &str) -> Self {
        Self {
            store,
            bind_address: bind_address.to_string(),
        }
    }

    /// Serve until the shutdown broadcast fires.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        info!("Host server started");

        axum::serve(listener, router(self.store))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: 200 only once all accounts are set up.
async fn readiness(State(store): State<Arc<EntityStore>>) -> impl IntoResponse {
    if store.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn list_entities(State(store): State<Arc<EntityStore>>) -> impl IntoResponse {
    Json(store.list())
}

async fn get_entity(
    State(store): State<Arc<EntityStore>>,
    Path(entity_id): Path<String>,
) -> Response {
    match store.get(&entity_id) {
        Some(entity) => Json(entity).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown entity").into_response(),
    }
}

async fn metrics(State(store): State<Arc<EntityStore>>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        store.metrics().gather_text(),
    )
}
