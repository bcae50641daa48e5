//! Transport configuration

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// TCP
// ----------------------------------------------------------------------------

/// Configuration for [`crate::TcpTransport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpTransportConfig {
    /// Address the rendezvous socket binds to
    pub listen_addr: SocketAddr,
    /// Upper bound on a single dial
    pub connect_timeout: Duration,
    /// Disable Nagle so small chat frames go out immediately
    pub nodelay: bool,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 7310)),
            connect_timeout: Duration::from_secs(10),
            nodelay: true,
        }
    }
}

impl TcpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rendezvous address
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set dial timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

// ----------------------------------------------------------------------------
// BlueZ
// ----------------------------------------------------------------------------

/// RFCOMM channel used when none is configured
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

/// Configuration for the BlueZ RFCOMM transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluezTransportConfig {
    /// Adapter name such as `hci0`; the default adapter when unset
    pub adapter: Option<String>,
    /// RFCOMM channel for both the published record and outbound dials
    pub channel: u8,
    /// Upper bound on a single dial
    pub connect_timeout: Duration,
    /// Ask BlueZ to require pairing before accepting
    pub require_authentication: bool,
}

impl Default for BluezTransportConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            channel: DEFAULT_RFCOMM_CHANNEL,
            connect_timeout: Duration::from_secs(15),
            require_authentication: false,
        }
    }
}

impl BluezTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
