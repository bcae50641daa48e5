//! Error types for BlueChat sessions
//!
//! Transports report failures as [`TransportError`]; everything else is folded into the
//! top-level [`BluechatError`]. None of these are fatal to the session manager: workers
//! turn them into events and the manager falls back to listening.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures reported by a transport capability
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Rendezvous endpoint unavailable: {reason}")]
    EndpointUnavailable { reason: String },
    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },
    #[error("Transport does not support {capability}")]
    Unsupported { capability: String },
    #[error("Invalid peer address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Connection failed to peer {address}: {reason}")]
    ConnectFailed { address: String, reason: String },
    #[error("Transport timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
    #[error("Transport closed")]
    Closed,
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ----------------------------------------------------------------------------
// Core Error Type
// ----------------------------------------------------------------------------

/// Core error type for BlueChat
#[derive(Debug, thiserror::Error)]
pub enum BluechatError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// No async runtime to spawn workers on
    #[error("No tokio runtime available: {reason}")]
    RuntimeUnavailable { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl BluechatError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        BluechatError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an endpoint-unavailable transport error
    pub fn endpoint_unavailable<T: Into<String>>(reason: T) -> Self {
        BluechatError::Transport(TransportError::EndpointUnavailable {
            reason: reason.into(),
        })
    }

    /// Create an invalid address transport error
    pub fn invalid_address<A: Into<String>, R: Into<String>>(address: A, reason: R) -> Self {
        BluechatError::Transport(TransportError::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        })
    }

    /// Create a transport connection failed error
    pub fn connection_failed<A: Into<String>, R: Into<String>>(address: A, reason: R) -> Self {
        BluechatError::Transport(TransportError::ConnectFailed {
            address: address.into(),
            reason: reason.into(),
        })
    }

    /// Create a permission denied error for the named operation
    pub fn permission_denied<T: Into<String>>(operation: T) -> Self {
        BluechatError::Transport(TransportError::PermissionDenied {
            operation: operation.into(),
        })
    }

    /// Whether the error means the transport itself is unusable, as opposed to a single
    /// attempt failing
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            BluechatError::Transport(
                TransportError::EndpointUnavailable { .. }
                    | TransportError::PermissionDenied { .. }
                    | TransportError::Unsupported { .. }
            )
        )
    }
}

impl From<std::io::Error> for BluechatError {
    fn from(err: std::io::Error) -> Self {
        BluechatError::Transport(TransportError::Io(err))
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, BluechatError>;
pub type BluechatResult<T> = Result<T>;
