//! Handshake plus encrypted echo against the key server

use std::sync::Arc;

use crypto_session::{
    Decrypted, FileKeyPersistence, HandshakeConfig, HandshakeError, KeyExchangeProtocol, Payload,
    SecureChannel,
};
use net_transport::{HttpConfig, HttpCounterpart, TransportError};
use shared_protocol::SECURE_ECHO_PATH;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ClientConfig, FallbackPolicy};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// How messages travel after [`ChannelClient::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Encrypted,
    /// The handshake failed and the policy allowed carrying on unencrypted
    Plaintext,
}

pub struct ChannelClient {
    protocol: KeyExchangeProtocol<HttpCounterpart>,
    fallback: FallbackPolicy,
}

impl ChannelClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = HttpConfig {
            request_timeout: config.request_timeout,
            ..HttpConfig::default()
        };
        let counterpart = HttpCounterpart::new(&config.server_url, http)?;

        let mut protocol = KeyExchangeProtocol::new(counterpart, Arc::new(SecureChannel::new()))
            .with_config(HandshakeConfig {
                iv_mode: config.iv_mode,
            });
        if let Some(path) = &config.key_file {
            protocol = protocol.with_persistence(Arc::new(FileKeyPersistence::new(path)));
        }

        Ok(Self {
            protocol,
            fallback: config.fallback,
        })
    }

    pub fn channel(&self) -> &Arc<SecureChannel> {
        self.protocol.channel()
    }

    /// Run the handshake and apply the fallback policy to its outcome
    pub async fn connect(&self) -> ClientResult<TransportMode> {
        match self.protocol.initialize().await {
            Ok(()) => {
                info!("Secure channel established with {}", self.protocol.counterpart().base_url());
                Ok(TransportMode::Encrypted)
            }
            Err(e) if self.fallback == FallbackPolicy::AllowPlaintext => {
                warn!("Handshake failed ({}), continuing in plaintext mode", e);
                Ok(TransportMode::Plaintext)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Send `message` encrypted to the echo endpoint and decrypt the reply
    pub async fn echo(&self, message: impl Into<Payload>) -> ClientResult<Decrypted> {
        let reply = self
            .protocol
            .counterpart()
            .post_encrypted(SECURE_ECHO_PATH, self.channel(), message)
            .await?;
        Ok(reply)
    }
}

/// JSON if `text` parses as JSON, otherwise the text itself
pub fn parse_message(text: &str) -> Payload {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => Payload::Structured(value),
        Err(_) => Payload::Text(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::LazyLock;
    use std::time::Duration;

    use crypto_session::{ChannelError, ChannelState, IvMode, RsaPrivateKey, generate_private_key};
    use key_server::{AppState, KeyRing, router};
    use serde_json::json;

    use super::*;

    static SERVER_KEY: LazyLock<RsaPrivateKey> =
        LazyLock::new(|| generate_private_key(2048).unwrap());

    async fn start_server() -> SocketAddr {
        let keys = KeyRing::from_private_key(SERVER_KEY.clone()).unwrap();
        let app = router(AppState::new(keys, Duration::from_secs(60)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn closed_port() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    fn config(addr: SocketAddr, fallback: FallbackPolicy) -> ClientConfig {
        ClientConfig {
            server_url: format!("http://{addr}"),
            fallback,
            request_timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_parse_message() {
        assert_eq!(
            parse_message(r#"{"legal_case": "X davası"}"#),
            Payload::Structured(json!({ "legal_case": "X davası" }))
        );
        assert_eq!(
            parse_message("merhaba dünya"),
            Payload::Text("merhaba dünya".to_string())
        );
    }

    #[tokio::test]
    async fn test_connect_and_echo() {
        let addr = start_server().await;

        for iv_mode in [IvMode::SessionFixed, IvMode::PerMessage] {
            let mut config = config(addr, FallbackPolicy::Refuse);
            config.iv_mode = iv_mode;
            let client = ChannelClient::new(&config).unwrap();

            assert_eq!(client.connect().await.unwrap(), TransportMode::Encrypted);
            assert_eq!(client.channel().iv_mode(), Some(iv_mode));

            let payload = json!({ "legal_case": "X davası" });
            let reply = client.echo(payload.clone()).await.unwrap();
            assert_eq!(reply, Decrypted::Structured(payload));

            let reply = client.echo("plain words").await.unwrap();
            assert_eq!(reply, Decrypted::Text("plain words".to_string()));
        }
    }

    #[tokio::test]
    async fn test_refuse_policy_surfaces_handshake_failure() {
        let addr = closed_port().await;
        let client = ChannelClient::new(&config(addr, FallbackPolicy::Refuse)).unwrap();

        assert!(matches!(
            client.connect().await,
            Err(ClientError::Handshake(HandshakeError::KeyFetchFailed(_)))
        ));
        assert_eq!(client.channel().state(), ChannelState::Failed);
    }

    #[tokio::test]
    async fn test_allow_plaintext_reports_mode_but_never_encrypts() {
        let addr = closed_port().await;
        let client = ChannelClient::new(&config(addr, FallbackPolicy::AllowPlaintext)).unwrap();

        assert_eq!(client.connect().await.unwrap(), TransportMode::Plaintext);
        assert!(matches!(
            client.echo("hello").await,
            Err(ClientError::Transport(TransportError::Channel(
                ChannelError::NotInitialized(ChannelState::Failed)
            )))
        ));
    }

    #[tokio::test]
    async fn test_key_file_written_after_handshake() {
        let addr = start_server().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("session.json");

        let mut config = config(addr, FallbackPolicy::Refuse);
        config.key_file = Some(path.clone());
        let client = ChannelClient::new(&config).unwrap();
        client.connect().await.unwrap();

        let stored: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(stored["aes_key"].is_string());
        assert!(stored["aes_iv"].is_string());
    }
}
