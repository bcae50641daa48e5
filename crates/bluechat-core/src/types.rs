//! Core value types shared by the session manager, its workers and transports

use std::fmt;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// Lifecycle state of the single session managed by a [`crate::SessionManager`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing running
    #[default]
    Idle,
    /// Waiting for an inbound connection
    Listening,
    /// Dialing a peer
    Connecting,
    /// A session pump owns a live socket
    Connected,
}

impl SessionState {
    /// Whether bytes can be written in this state
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }

    /// Whether an inbound connection accepted in this state should be promoted
    pub fn accepts_inbound(&self) -> bool {
        matches!(self, SessionState::Listening | SessionState::Connecting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Connected => write!(f, "Connected"),
        }
    }
}

// ----------------------------------------------------------------------------
// Peer Identity
// ----------------------------------------------------------------------------

/// Opaque transport address of a peer (a Bluetooth MAC, a socket address, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new<T: Into<String>>(address: T) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Address of the remote end plus its human-readable name, when one could be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentity {
    pub address: PeerAddress,
    /// Display name; already falls back to the configured sentinel when unresolved
    pub name: String,
}

impl PeerIdentity {
    pub fn new(address: PeerAddress, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

// ----------------------------------------------------------------------------
// Worker Bookkeeping
// ----------------------------------------------------------------------------

/// Identifies one spawned worker; a callback carrying a stale id is ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// The three worker roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Listener,
    Connector,
    Pump,
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Listener => write!(f, "listener"),
            WorkerKind::Connector => write!(f, "connector"),
            WorkerKind::Pump => write!(f, "pump"),
        }
    }
}

/// Snapshot of which worker slots are occupied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActiveWorkers {
    pub listener: bool,
    pub connector: bool,
    pub pump: bool,
}

impl ActiveWorkers {
    /// Number of occupied slots
    pub fn count(&self) -> usize {
        [self.listener, self.connector, self.pump]
            .iter()
            .filter(|occupied| **occupied)
            .count()
    }
}
