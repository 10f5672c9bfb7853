//! Key server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crypto_session::DEFAULT_RSA_BITS;
use shared_protocol::DEFAULT_SESSION_TTL_SECS;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: SocketAddr,
    /// RSA modulus size of the server key pair
    pub rsa_bits: usize,
    /// Lifetime of issued and established sessions
    pub session_ttl: Duration,
    /// How often expired sessions are purged
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            rsa_bits: DEFAULT_RSA_BITS,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `KEY_SERVER_ADDR`, `RSA_KEY_BITS` and
    /// `SESSION_TTL_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("KEY_SERVER_ADDR") {
            config.bind_addr = parse("KEY_SERVER_ADDR", value)?;
        }
        if let Some(value) = lookup("RSA_KEY_BITS") {
            config.rsa_bits = parse("RSA_KEY_BITS", value)?;
        }
        if let Some(value) = lookup("SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(parse("SESSION_TTL_SECS", value)?);
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}
