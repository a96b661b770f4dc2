//! Client configuration.
//!
//! The base URL defaults to the relative `/api` so requests follow whatever
//! origin the transport is bound to. `TRADZY_API_BASE_URL` overrides it.

use std::env;

use thiserror::Error;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "/api";
pub const BASE_URL_ENV: &str = "TRADZY_API_BASE_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let Some(raw) = lookup(BASE_URL_ENV) else {
            info!("{BASE_URL_ENV} not set, using default: {DEFAULT_BASE_URL}");
            return Ok(Self::default());
        };
        let base_url = raw.trim();
        validate_base_url(base_url)?;
        info!(base_url, "using configured API base URL");
        Ok(Self {
            base_url: base_url.to_string(),
        })
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let relative = base_url.starts_with('/');
    let absolute = base_url.starts_with("http://") || base_url.starts_with("https://");
    if relative || absolute {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        key: BASE_URL_ENV,
        reason: format!("expected a path starting with '/' or an http(s) URL, got {base_url:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_uses_default() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, "/api");
    }

    #[test]
    fn absolute_override_is_accepted() {
        let config =
            ClientConfig::from_lookup(|_| Some(" https://shop.example.com/api ".to_string())).unwrap();
        assert_eq!(config.base_url, "https://shop.example.com/api");
    }

    #[test]
    fn bare_host_is_rejected() {
        let err = ClientConfig::from_lookup(|_| Some("localhost:5000".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: BASE_URL_ENV, .. }));
    }
}
