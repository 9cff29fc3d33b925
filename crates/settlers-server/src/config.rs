//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_FROM_EMAIL: &str = "settlers@localhost";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid SERVER_ADDR '{value}': {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `SERVER_ADDR`
    pub addr: SocketAddr,
    /// `SETTLERS_DATA_DIR`; games are kept in memory when unset
    pub data_dir: Option<PathBuf>,
    /// `SETTLERS_FROM_EMAIL`, sender shown on notifications
    pub from_email: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr_value = get("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_value
            .parse()
            .map_err(|source| ConfigError::InvalidAddr {
                value: addr_value.clone(),
                source,
            })?;

        Ok(Self {
            addr,
            data_dir: get("SETTLERS_DATA_DIR").map(PathBuf::from),
            from_email: get("SETTLERS_FROM_EMAIL").unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
        })
    }
}
