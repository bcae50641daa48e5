//! Error handling for the BlueChat CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("BlueChat core error: {0}")]
    Core(#[from] bluechat_core::BluechatError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Transport initialization failed: {0}")]
    TransportInit(String),

    #[error("Unable to connect to device {0}")]
    ConnectFailed(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Session ended: {0}")]
    SessionEnded(String),

    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
