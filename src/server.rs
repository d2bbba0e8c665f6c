//! Page summary HTTP API
//!
//! `GET /v1/summary?url=<page>` fetches the page and answers with its
//! [`PageSummary`] as JSON. Input and fetch failures are 400s with a short
//! message; nothing about the upstream failure is passed on to the client.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::http::{HttpOptions, extract_from_stream, fetch};
use crate::summary::PageSummary;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub options: Arc<HttpOptions>,
}

impl AppState {
    pub fn new(options: HttpOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }
}

/// Query string of the summary route
#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}

/// Failures of the summary route, mapped to status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing url query parameter")]
    MissingUrl,

    /// The page could not be fetched; the cause is only logged
    #[error("bad request")]
    Fetch,

    #[error("unexpected server error")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::Fetch => StatusCode::BAD_REQUEST,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Liveness check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Summarize the page named by the `url` query parameter.
pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Response, ApiError> {
    let page_url = params
        .url
        .filter(|url| !url.is_empty())
        .ok_or(ApiError::MissingUrl)?;

    let stream = fetch(&page_url, &state.options).await.map_err(|err| {
        warn!(page_url = %page_url, error = %err, "page fetch failed");
        ApiError::Fetch
    })?;

    let summary: PageSummary = extract_from_stream(&page_url, stream).await;
    let body = serde_json::to_vec(&summary)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/summary", get(summary))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the API on `addr` until Ctrl-C.
pub async fn run(addr: SocketAddr, options: HttpOptions) -> anyhow::Result<()> {
    let app = create_router(AppState::new(options));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("page summary API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Log output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides
/// `default_filter`.
pub fn init_logging(format: LogFormat, default_filter: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))
}
