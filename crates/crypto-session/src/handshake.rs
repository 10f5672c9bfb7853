//! Key exchange: establish a session key with the server's RSA public key

use std::sync::Arc;

use shared_protocol::{ExchangeKeyRequest, IvMode, SessionId};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::wrap::{import_public_key, wrap_session_key};
use crate::{
    HandshakeError, HandshakeResult, KeyExchangeCounterpart, KeyPersistence, SecureChannel,
    SessionCipher, SessionKeyMaterial,
};

/// Handshake configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeConfig {
    /// IV handling requested for the session
    pub iv_mode: IvMode,
}

/// Runs the hybrid handshake and populates a [`SecureChannel`].
///
/// Calls to [`initialize`](Self::initialize) on one instance are serialized;
/// the channel only receives key material after the server acknowledged it.
pub struct KeyExchangeProtocol<C> {
    counterpart: C,
    channel: Arc<SecureChannel>,
    config: HandshakeConfig,
    persistence: Option<Arc<dyn KeyPersistence>>,
    in_flight: Mutex<()>,
}

impl<C: KeyExchangeCounterpart> KeyExchangeProtocol<C> {
    pub fn new(counterpart: C, channel: Arc<SecureChannel>) -> Self {
        Self {
            counterpart,
            channel,
            config: HandshakeConfig::default(),
            persistence: None,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: HandshakeConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist the negotiated key after success
    pub fn with_persistence(mut self, persistence: Arc<dyn KeyPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn channel(&self) -> &Arc<SecureChannel> {
        &self.channel
    }

    pub fn counterpart(&self) -> &C {
        &self.counterpart
    }

    /// Establish the session key.
    ///
    /// Returns immediately if the channel is already initialized. On any
    /// failure the channel ends in `Failed` and the cause is logged and
    /// returned; nothing is retried.
    pub async fn initialize(&self) -> HandshakeResult<()> {
        let _guard = self.in_flight.lock().await;

        if self.channel.is_initialized() {
            debug!("Secure channel already initialized, skipping handshake");
            return Ok(());
        }

        match self.exchange().await {
            Ok((cipher, session_id)) => {
                self.persist(cipher.material());
                self.channel.adopt(cipher, session_id);
                Ok(())
            }
            Err(err) => {
                error!("Secure channel handshake failed: {}", err);
                self.channel.mark_failed();
                Err(err)
            }
        }
    }

    async fn exchange(&self) -> HandshakeResult<(SessionCipher, SessionId)> {
        let response = self
            .counterpart
            .fetch_public_key()
            .await
            .map_err(HandshakeError::fetch)?;
        let session_id = response
            .validate()
            .map_err(|e| HandshakeError::KeyFetchFailed(e.to_string()))?;
        debug!("Received server public key for session {}", session_id);

        let material = SessionKeyMaterial::generate();
        let public_key = import_public_key(&response.public_key)?;
        let encrypted_key = wrap_session_key(&public_key, &material, self.config.iv_mode)?;

        let request = ExchangeKeyRequest::new(encrypted_key, &session_id);
        self.counterpart
            .submit_wrapped_key(&request)
            .await
            .map_err(HandshakeError::rejected)?;

        info!(
            "Key exchange accepted for session {} ({:?})",
            session_id, self.config.iv_mode
        );
        Ok((SessionCipher::new(material, self.config.iv_mode), session_id))
    }

    fn persist(&self, material: &SessionKeyMaterial) {
        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.store(material) {
                warn!("Failed to persist session key: {}", e);
            }
        }
    }
}
