//! HTTP handlers

use axum::Json;
use axum::extract::State;
use crypto_session::{SessionCipher, open_payload, seal_payload};
use shared_protocol::{
    EncryptedRequest, EncryptedResponse, ExchangeKeyRequest, ExchangeKeyResponse,
    ProtocolError, PublicKeyResponse, SessionId,
};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Publish the server public key with a newly issued session id
pub async fn public_key_handler(State(state): State<AppState>) -> Json<PublicKeyResponse> {
    let session_id = state.sessions.issue();
    info!("Public key sent for new session {}", session_id);

    Json(PublicKeyResponse {
        public_key: state.keys.public_pem().to_string(),
        session_id: session_id.into_inner(),
    })
}

/// Unwrap and store the client's session key
pub async fn exchange_key_handler(
    State(state): State<AppState>,
    Json(request): Json<ExchangeKeyRequest>,
) -> ApiResult<Json<ExchangeKeyResponse>> {
    let session_id = request.validate()?;

    if !state.sessions.is_pending(&session_id) {
        warn!("Key exchange for unknown session {}", session_id);
        return Err(ApiError::UnknownSession);
    }

    let (material, iv_mode) = state.keys.unwrap(&request.encrypted_key).map_err(|e| {
        warn!("Key exchange failed for session {}: {}", session_id, e);
        ApiError::KeyExchange
    })?;

    let cipher = SessionCipher::new(material, iv_mode);
    if !state.sessions.establish(&session_id, cipher) {
        return Err(ApiError::UnknownSession);
    }

    info!("Key exchange succeeded for session {} ({:?})", session_id, iv_mode);
    Ok(Json(ExchangeKeyResponse::ok()))
}

/// Decrypt the request payload and return it encrypted again
pub async fn secure_echo_handler(
    State(state): State<AppState>,
    Json(request): Json<EncryptedRequest>,
) -> ApiResult<Json<EncryptedResponse>> {
    let encrypted_data = request.encrypted_data.ok_or_else(|| {
        ApiError::BadRequest("this endpoint only accepts encrypted requests".to_string())
    })?;
    let session_id = request
        .session_id
        .ok_or(ProtocolError::MissingField("session_id"))?;
    let session_id = SessionId::new(session_id)?;

    let cipher = state
        .sessions
        .cipher(&session_id)
        .ok_or(ApiError::UnknownSession)?;

    let decrypted = open_payload(&cipher, &encrypted_data).map_err(|e| {
        warn!("Decryption failed for session {}: {}", session_id, e);
        ApiError::Decryption
    })?;
    debug!("Echoing payload for session {}", session_id);

    let encrypted_data = seal_payload(&cipher, decrypted.into_payload())
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(EncryptedResponse { encrypted_data }))
}
