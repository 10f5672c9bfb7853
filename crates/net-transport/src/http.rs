//! JSON/HTTP client for the key server

use std::time::Duration;

use async_trait::async_trait;
use crypto_session::{
    ChannelError, CounterpartError, Decrypted, KeyExchangeCounterpart, Payload, SecureChannel,
};
use reqwest::{Client, Response, Url};
use shared_protocol::{
    EXCHANGE_KEY_PATH, EncryptedRequest, EncryptedResponse, ErrorResponse, ExchangeKeyRequest,
    PUBLIC_KEY_PATH, PublicKeyResponse,
};
use tracing::{debug, info, warn};

use crate::{DEFAULT_REQUEST_TIMEOUT_SECS, TransportError, TransportResult};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Timeout applied to every request
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: format!("securelink/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Key server reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpCounterpart {
    base_url: Url,
    client: Client,
}

impl HttpCounterpart {
    /// Create a client for the server at `base_url` (scheme, host and port)
    pub fn new(base_url: &str, config: HttpConfig) -> TransportResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> TransportResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }

    /// Turn any non-2xx response into `TransportError::Status`
    async fn check(response: Response) -> TransportResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        warn!("Key server returned {}: {}", status, message);

        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_public_key(&self) -> TransportResult<PublicKeyResponse> {
        let url = self.endpoint(PUBLIC_KEY_PATH)?;
        debug!("Fetching public key from {}", url);

        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post_exchange(&self, request: &ExchangeKeyRequest) -> TransportResult<()> {
        let url = self.endpoint(EXCHANGE_KEY_PATH)?;
        debug!("Submitting wrapped key for session {}", request.session_id);

        Self::check(self.client.post(url).json(request).send().await?).await?;
        Ok(())
    }

    /// Send an encrypted payload and decrypt the encrypted reply.
    ///
    /// The body is `{encrypted_data, session_id}`; the reply must be
    /// `{encrypted_data}` under the same session key.
    pub async fn post_encrypted(
        &self,
        path: &str,
        channel: &SecureChannel,
        payload: impl Into<Payload>,
    ) -> TransportResult<Decrypted> {
        let encrypted_data = channel.encrypt(payload)?;
        let session_id = channel
            .session_id()
            .ok_or(ChannelError::NotInitialized(channel.state()))?;

        let url = self.endpoint(path)?;
        let request = EncryptedRequest::new(encrypted_data, &session_id);
        let response = Self::check(self.client.post(url).json(&request).send().await?).await?;

        let reply: EncryptedResponse = response.json().await?;
        info!("Encrypted exchange on {} completed for session {}", path, session_id);
        Ok(channel.decrypt(&reply.encrypted_data)?)
    }
}

#[async_trait]
impl KeyExchangeCounterpart for HttpCounterpart {
    async fn fetch_public_key(&self) -> Result<PublicKeyResponse, CounterpartError> {
        Ok(self.get_public_key().await?)
    }

    async fn submit_wrapped_key(
        &self,
        request: &ExchangeKeyRequest,
    ) -> Result<(), CounterpartError> {
        Ok(self.post_exchange(request).await?)
    }
}
