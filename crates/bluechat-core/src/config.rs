//! Session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BluechatError, Result};

/// Serial Port Profile UUID, the well-known RFCOMM service class
pub const SERIAL_PORT_PROFILE_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Default service name advertised with the rendezvous endpoint
pub const DEFAULT_SERVICE_NAME: &str = "BlueChatPro";

/// Name reported for a peer whose name could not be resolved
pub const UNKNOWN_PEER_NAME: &str = "Unknown Device";

/// Transport chunk size for session reads
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

// ----------------------------------------------------------------------------
// Service Record
// ----------------------------------------------------------------------------

/// Well-known identifier a listener registers its rendezvous endpoint under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub uuid: Uuid,
}

impl Default for ServiceRecord {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
            uuid: SERIAL_PORT_PROFILE_UUID,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for a [`crate::SessionManager`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Service the listener registers under
    pub service: ServiceRecord,
    /// Size of the buffer each session read fills
    pub read_buffer_size: usize,
    /// Upper bound on best-effort peer name lookup
    #[serde(with = "duration_millis")]
    pub name_resolution_timeout: Duration,
    /// Sentinel name used when lookup fails or is denied
    pub unknown_peer_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service: ServiceRecord::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            name_resolution_timeout: Duration::from_secs(2),
            unknown_peer_name: UNKNOWN_PEER_NAME.to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service name
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service.name = name.into();
        self
    }

    /// Set the service UUID
    pub fn with_service_uuid(mut self, uuid: Uuid) -> Self {
        self.service.uuid = uuid;
        self
    }

    /// Set the read buffer size
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the name resolution timeout
    pub fn with_name_resolution_timeout(mut self, timeout: Duration) -> Self {
        self.name_resolution_timeout = timeout;
        self
    }

    /// Set the name reported for unresolved peers
    pub fn with_unknown_peer_name(mut self, name: impl Into<String>) -> Self {
        self.unknown_peer_name = name.into();
        self
    }

    /// Reject settings the workers cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(BluechatError::config_error(
                "Read buffer size must be greater than 0",
            ));
        }
        if self.service.name.trim().is_empty() {
            return Err(BluechatError::config_error("Service name must not be empty"));
        }
        if self.unknown_peer_name.is_empty() {
            return Err(BluechatError::config_error(
                "Unknown peer name must not be empty",
            ));
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
