//! Server configuration, loaded from TOML.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpConfig,

    #[serde(default)]
    pub replication: ReplicationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address the HTTP/WebSocket front end binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Expected number of visible segments, reserved up front (0 = none)
    #[serde(default)]
    pub capacity_hint: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;
        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level cannot be empty".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server.bind_address.parse().map_err(|_| {
            Error::Config(format!(
                "server.bind_address is not a socket address: {}",
                self.server.bind_address
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = ServerConfig::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
        assert_eq!(config.replication.capacity_hint, 0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_file() {
        let config = ServerConfig::from_str(
            r#"
            [server]
            bind_address = "0.0.0.0:8080"

            [replication]
            capacity_hint = 4096

            [logging]
            level = "segment_sets=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_address().unwrap().port(), 8080);
        assert_eq!(config.replication.capacity_hint, 4096);
        assert_eq!(config.logging.level, "segment_sets=debug");
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let err = ServerConfig::from_str("[server]\nbind_address = \"nowhere\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = ServerConfig::from_str("[server").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
