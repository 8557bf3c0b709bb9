//! HTTP Server
//!
//! Maps the public routes onto [`PlayPassService`]. Every route answers
//! `OPTIONS` with 204 and carries open CORS headers; other unsupported
//! methods get axum's 405.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    AUTHORIZATION,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::network::error::ApiError;
use crate::network::protocol::{
    FidQuery, HealthResponse, PlaySessionRequest, PlaySessionResponse, SubmitScoreRequest,
    SubmitScoreResponse, UserStatusResponse,
};
use crate::network::service::PlayPassService;
use crate::store::{LeaderboardEntry, PlayerStore, RankEntry};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Persistence service endpoint, passed through to the store.
    pub store_url: Option<String>,
    /// Persistence service access key. Never logged.
    pub store_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store_url: None,
            store_key: None,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ServerError> {
        let mut config = Self::default();
        if let Ok(bind) = std::env::var("BIND_ADDR") {
            config.bind_addr = bind
                .parse()
                .map_err(|e| ServerError::InvalidConfig(format!("BIND_ADDR {}: {}", bind, e)))?;
        }
        config.store_url = std::env::var("STORE_URL").ok().filter(|v| !v.is_empty());
        config.store_key = std::env::var("STORE_KEY").ok().filter(|v| !v.is_empty());
        Ok(config)
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind or serve.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Build the router for a service.
pub fn router<S: PlayerStore>(service: Arc<PlayPassService<S>>) -> Router {
    Router::new()
        .route("/user-status", get(user_status::<S>).options(preflight))
        .route("/play-session", post(play_session::<S>).options(preflight))
        .route("/submit-score", post(submit_score::<S>).options(preflight))
        .route("/leaderboard", get(leaderboard::<S>).options(preflight))
        .route("/user-rank", get(user_rank::<S>).options(preflight))
        .route("/health", get(health).options(preflight))
        .layer(middleware::map_response(cors_headers))
        .with_state(service)
}

/// The HTTP server.
pub struct PlayPassServer<S> {
    /// Server configuration.
    config: ServerConfig,
    /// Shared service.
    service: Arc<PlayPassService<S>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl<S: PlayerStore> PlayPassServer<S> {
    /// Create a new server.
    pub fn new(config: ServerConfig, service: Arc<PlayPassService<S>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { config, service, shutdown_tx }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!("Play pass server listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, router(self.service.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    /// Signal the server to stop accepting requests.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

async fn user_status<S: PlayerStore>(
    State(service): State<Arc<PlayPassService<S>>>,
    Query(query): Query<FidQuery>,
) -> Result<Json<UserStatusResponse>, ApiError> {
    service.user_status(query.player_id(), Utc::now()).await.map(Json)
}

async fn play_session<S: PlayerStore>(
    State(service): State<Arc<PlayPassService<S>>>,
    payload: Result<Json<PlaySessionRequest>, JsonRejection>,
) -> Result<Json<PlaySessionResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    service.play_session(request, Utc::now()).await.map(Json)
}

async fn submit_score<S: PlayerStore>(
    State(service): State<Arc<PlayPassService<S>>>,
    headers: HeaderMap,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<Json<SubmitScoreResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    // A non-UTF-8 header counts as present but malformed
    let authorization = headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());
    service.submit_score(authorization, request, Utc::now()).await.map(Json)
}

async fn leaderboard<S: PlayerStore>(
    State(service): State<Arc<PlayPassService<S>>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    service.leaderboard().await.map(Json)
}

async fn user_rank<S: PlayerStore>(
    State(service): State<Arc<PlayPassService<S>>>,
    Query(query): Query<FidQuery>,
) -> Result<Json<RankEntry>, ApiError> {
    service.user_rank(query.player_id()).await.map(Json)
}

// =============================================================================
// TESTS
// =============================================================================
