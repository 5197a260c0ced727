//! Error types for segment set operations.

use thiserror::Error;

use crate::segments::ObjectId;

/// Result type alias for segment set operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed decimal input to identifier parsing.
    #[error("Invalid segment id: {input:?}")]
    Parse { input: String },

    /// A remote message or structural check broke a setup invariant.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Protocol violation: no replicated object registered with id {0}")]
    UnknownObject(ObjectId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Protocol violations are fatal for the affected replication channel.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::ProtocolViolation(_) | Error::UnknownObject(_))
    }
}
