//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use net_transport::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL};
use shared_protocol::IvMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// What to do when the handshake fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Report the failure and send nothing
    #[default]
    Refuse,
    /// Carry on in plaintext mode, reported as such
    AllowPlaintext,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Key server base URL
    pub server_url: String,
    pub iv_mode: IvMode,
    pub fallback: FallbackPolicy,
    /// Where to write the negotiated key, if anywhere
    pub key_file: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            iv_mode: IvMode::default(),
            fallback: FallbackPolicy::default(),
            key_file: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `CHANNEL_SERVER_URL`, `CHANNEL_IV_MODE`,
    /// `CHANNEL_ALLOW_PLAINTEXT` and `CHANNEL_KEY_FILE`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("CHANNEL_SERVER_URL") {
            config.server_url = value.trim().to_string();
        }
        if let Some(value) = lookup("CHANNEL_IV_MODE") {
            config.iv_mode = value.parse().map_err(|_| ConfigError::Invalid {
                var: "CHANNEL_IV_MODE",
                value,
            })?;
        }
        if let Some(value) = lookup("CHANNEL_ALLOW_PLAINTEXT") {
            config.fallback = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => FallbackPolicy::AllowPlaintext,
                "0" | "false" | "no" | "" => FallbackPolicy::Refuse,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CHANNEL_ALLOW_PLAINTEXT",
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup("CHANNEL_KEY_FILE") {
            if !value.trim().is_empty() {
                config.key_file = Some(PathBuf::from(value.trim()));
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_refuse_plaintext() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.iv_mode, IvMode::SessionFixed);
        assert_eq!(config.fallback, FallbackPolicy::Refuse);
        assert!(config.key_file.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::from_lookup(|var| match var {
            "CHANNEL_SERVER_URL" => Some("http://10.0.0.5:9000".to_string()),
            "CHANNEL_IV_MODE" => Some("per-message".to_string()),
            "CHANNEL_ALLOW_PLAINTEXT" => Some("true".to_string()),
            "CHANNEL_KEY_FILE" => Some("/tmp/session.json".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.server_url, "http://10.0.0.5:9000");
        assert_eq!(config.iv_mode, IvMode::PerMessage);
        assert_eq!(config.fallback, FallbackPolicy::AllowPlaintext);
        assert_eq!(config.key_file, Some(PathBuf::from("/tmp/session.json")));
    }

    #[test]
    fn test_invalid_values() {
        let result = ClientConfig::from_lookup(|var| {
            (var == "CHANNEL_IV_MODE").then(|| "sometimes".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { var: "CHANNEL_IV_MODE", .. })
        ));

        let result = ClientConfig::from_lookup(|var| {
            (var == "CHANNEL_ALLOW_PLAINTEXT").then(|| "maybe".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { var: "CHANNEL_ALLOW_PLAINTEXT", .. })
        ));
    }
}
