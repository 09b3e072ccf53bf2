//! Error types for AnveshaNav

use thiserror::Error;

/// AnveshaNav error type
#[derive(Error, Debug)]
pub enum AnveshaError {
    #[error("Connection failed: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Startup error: {0}")]
    Startup(String),
}

impl From<prost::DecodeError> for AnveshaError {
    fn from(e: prost::DecodeError) -> Self {
        AnveshaError::Protocol(e.to_string())
    }
}

impl From<toml::de::Error> for AnveshaError {
    fn from(e: toml::de::Error) -> Self {
        AnveshaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnveshaError>;
