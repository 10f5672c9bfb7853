//! SecureLink Key Server
//!
//! HTTP endpoints for the hybrid RSA/AES session key exchange.

use anyhow::Context;
use tracing::info;

use key_server::{AppState, KeyRing, ServerConfig, router, spawn_session_sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("key_server=debug".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Starting SecureLink Key Server");

    let config = ServerConfig::from_env()?;

    info!("Generating {}-bit RSA key pair", config.rsa_bits);
    let bits = config.rsa_bits;
    let keys = tokio::task::spawn_blocking(move || KeyRing::generate(bits))
        .await
        .context("key generation task panicked")??;

    let state = AppState::new(keys, config.session_ttl);
    spawn_session_sweeper(state.sessions.clone(), config.sweep_interval);

    let app = router(state);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
