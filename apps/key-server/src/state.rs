//! Server key ring and per-session cipher store

use std::sync::Arc;
use std::time::{Duration, Instant};

use crypto_session::{
    CryptoResult, IvMode, RsaPrivateKey, SessionCipher, SessionId, SessionKeyMaterial,
    export_public_key, generate_private_key, unwrap_session_key,
};
use dashmap::DashMap;
use tracing::debug;

/// The server's RSA key pair and its published armored public key
pub struct KeyRing {
    private_key: RsaPrivateKey,
    public_pem: String,
}

impl KeyRing {
    pub fn generate(bits: usize) -> CryptoResult<Self> {
        Self::from_private_key(generate_private_key(bits)?)
    }

    pub fn from_private_key(private_key: RsaPrivateKey) -> CryptoResult<Self> {
        let public_pem = export_public_key(&private_key.to_public_key())?;
        Ok(Self {
            private_key,
            public_pem,
        })
    }

    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    /// Recover the client's session key from `encrypted_key`
    pub fn unwrap(&self, encrypted_key: &str) -> CryptoResult<(SessionKeyMaterial, IvMode)> {
        unwrap_session_key(&self.private_key, encrypted_key)
    }
}

struct Established {
    cipher: Arc<SessionCipher>,
    expires_at: Instant,
}

/// Issued session ids and the ciphers established for them.
///
/// Entries past their expiry are treated as absent and removed on access or
/// by [`sweep`](Self::sweep).
pub struct SessionStore {
    pending: DashMap<SessionId, Instant>,
    established: DashMap<SessionId, Established>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            established: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh session id awaiting its key exchange
    pub fn issue(&self) -> SessionId {
        let id = SessionId::generate();
        self.pending.insert(id.clone(), Instant::now() + self.ttl);
        id
    }

    /// Whether `id` was issued, has not expired and awaits a key
    pub fn is_pending(&self, id: &SessionId) -> bool {
        let now = Instant::now();
        self.pending
            .remove_if(id, |_, expires_at| *expires_at <= now)
            .is_none()
            && self.pending.contains_key(id)
    }

    /// Attach a cipher to a pending session; `false` if it was not pending
    pub fn establish(&self, id: &SessionId, cipher: SessionCipher) -> bool {
        let now = Instant::now();
        match self.pending.remove(id) {
            Some((_, expires_at)) if expires_at > now => {
                self.established.insert(
                    id.clone(),
                    Established {
                        cipher: Arc::new(cipher),
                        expires_at: now + self.ttl,
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// Cipher of an established, unexpired session
    pub fn cipher(&self, id: &SessionId) -> Option<Arc<SessionCipher>> {
        let now = Instant::now();
        let _ = self
            .established
            .remove_if(id, |_, entry| entry.expires_at <= now);
        self.established.get(id).map(|entry| entry.cipher.clone())
    }

    /// Drop everything that expired before `now`; returns how many went
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.pending.len() + self.established.len();
        self.pending.retain(|_, expires_at| *expires_at > now);
        self.established.retain(|_, entry| entry.expires_at > now);
        let removed = before - (self.pending.len() + self.established.len());
        if removed > 0 {
            debug!("Swept {} expired sessions", removed);
        }
        removed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn established_count(&self) -> usize {
        self.established.len()
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub keys: Arc<KeyRing>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(keys: KeyRing, session_ttl: Duration) -> Self {
        Self {
            keys: Arc::new(keys),
            sessions: Arc::new(SessionStore::new(session_ttl)),
        }
    }
}
