//! HTTP routes: authorization flow and metrics scraping.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use byocar_core::{CallbackParams, VehicleDataClient};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{error, info};

use crate::exporter::render_metrics;

/// State shared across route handlers.
#[derive(Clone)]
pub struct AppState {
    client: Arc<dyn VehicleDataClient>,
    registry: Arc<Registry>,
    redirect_url: Arc<str>,
}

impl AppState {
    pub fn new(
        client: Arc<dyn VehicleDataClient>,
        registry: Arc<Registry>,
        redirect_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            client,
            registry,
            redirect_url: redirect_url.into(),
        }
    }
}

/// Build the exporter router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/auth", get(auth_redirect))
        .route("/store-token", get(store_token))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the router on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server exited unexpectedly")
}

async fn auth_redirect(State(state): State<AppState>) -> Response {
    match state.client.get_auth_start_url(&state.redirect_url) {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            error!(error = %e, "creating authorization URL");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("creating authorization URL: {}", e),
            )
                .into_response()
        }
    }
}

async fn store_token(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, String) {
    match state
        .client
        .store_token_from_request(&state.redirect_url, &params)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            "Token stored, configuration done.".to_string(),
        ),
        Err(e) => {
            error!(error = %e, "storing auth token");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("storing auth token: {}", e),
            )
        }
    }
}

async fn metrics(State(state): State<AppState>) -> Response {
    match render_metrics(&state.registry) {
        Ok(body) => (
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "encoding metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("encoding metrics: {}", e),
            )
                .into_response()
        }
    }
}
