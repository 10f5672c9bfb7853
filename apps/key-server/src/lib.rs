//! SecureLink Key Server
//!
//! Counterpart of the client handshake: publishes an RSA public key, unwraps
//! submitted session keys and serves encrypted requests per session.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::{get, post};
use shared_protocol::{EXCHANGE_KEY_PATH, PUBLIC_KEY_PATH, SECURE_ECHO_PATH};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use state::{AppState, KeyRing, SessionStore};

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PUBLIC_KEY_PATH, get(routes::public_key_handler))
        .route(EXCHANGE_KEY_PATH, post(routes::exchange_key_handler))
        .route(SECURE_ECHO_PATH, post(routes::secure_echo_handler))
        .route("/health", get(routes::health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically purge expired sessions
pub fn spawn_session_sweeper(sessions: Arc<SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            sessions.sweep(Instant::now());
        }
    })
}
