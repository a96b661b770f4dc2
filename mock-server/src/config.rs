use std::env;

use thiserror::Error;
use tracing::info;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT value {value:?}: {reason}")]
    InvalidPort { value: String, reason: String },
}

pub struct Config {
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_port_var(env::var("PORT").ok())
    }

    fn from_port_var(raw: Option<String>) -> Result<Self, ConfigError> {
        let port = match raw {
            None => {
                info!("PORT not set, using default: {DEFAULT_PORT}");
                DEFAULT_PORT
            }
            Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidPort {
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?,
        };
        Ok(Self { port })
    }

    pub fn bind_addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}
