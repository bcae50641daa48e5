//! Error types for the stream transports

use bluechat_core::{BluechatError, TransportError};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the RFCOMM and TCP transports
#[derive(Error, Debug)]
pub enum RfcommError {
    #[error("Bluetooth adapter not available: {0}")]
    AdapterUnavailable(String),

    #[error("Failed to register service: {0}")]
    ServiceRegistration(String),

    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection to {address} timed out after {timeout_ms}ms")]
    ConnectionTimeout { address: String, timeout_ms: u64 },

    #[error("Bluetooth permission denied: {0}")]
    PermissionDenied(String),

    #[error("Listener closed")]
    ListenerClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RfcommError> for BluechatError {
    fn from(err: RfcommError) -> Self {
        let transport = match err {
            RfcommError::AdapterUnavailable(reason) | RfcommError::ServiceRegistration(reason) => {
                TransportError::EndpointUnavailable { reason }
            }
            RfcommError::InvalidAddress { address, reason } => {
                TransportError::InvalidAddress { address, reason }
            }
            RfcommError::ConnectionFailed { address, reason } => {
                TransportError::ConnectFailed { address, reason }
            }
            RfcommError::ConnectionTimeout { timeout_ms, .. } => TransportError::Timeout {
                duration_ms: timeout_ms,
            },
            RfcommError::PermissionDenied(operation) => TransportError::PermissionDenied { operation },
            RfcommError::ListenerClosed => TransportError::Closed,
            RfcommError::Io(e) => TransportError::Io(e),
        };
        BluechatError::Transport(transport)
    }
}

#[cfg(all(feature = "bluez", target_os = "linux"))]
impl From<bluer::Error> for RfcommError {
    fn from(err: bluer::Error) -> Self {
        match err.kind {
            bluer::ErrorKind::NotAuthorized | bluer::ErrorKind::NotPermitted => {
                RfcommError::PermissionDenied(err.message)
            }
            bluer::ErrorKind::NotReady | bluer::ErrorKind::NotAvailable => {
                RfcommError::AdapterUnavailable(err.message)
            }
            _ => RfcommError::AdapterUnavailable(err.to_string()),
        }
    }
}
