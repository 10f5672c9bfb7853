//! SecureLink Channel Client
//!
//! Establishes a session key with the key server, then sends the message
//! given on the command line through the encrypted echo endpoint.

mod client;
mod config;

use tracing::{info, warn};

use client::{ChannelClient, TransportMode, parse_message};
use config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("channel_client=debug".parse()?)
                .add_directive("crypto_session=info".parse()?)
                .add_directive("net_transport=info".parse()?),
        )
        .init();

    let message = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if message.is_empty() {
        anyhow::bail!("usage: channel-client <message>");
    }

    let config = ClientConfig::from_env()?;
    info!("Connecting to {} ({:?})", config.server_url, config.iv_mode);

    let client = ChannelClient::new(&config)?;
    match client.connect().await? {
        TransportMode::Encrypted => {
            let reply = client.echo(parse_message(&message)).await?;
            println!("{reply}");
        }
        TransportMode::Plaintext => {
            warn!("Secure channel unavailable; message not sent");
            println!("transport mode: plaintext (message not sent)");
        }
    }

    Ok(())
}
