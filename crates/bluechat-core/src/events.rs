//! Notifications emitted by the session manager
//!
//! Every state transition, received chunk and written chunk is reported to an
//! [`EventSink`]. Events that belong to one transition are emitted while the manager's
//! lock is held, so a sink observes them contiguously and in causal order.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

use crate::types::{PeerIdentity, SessionState};

// ----------------------------------------------------------------------------
// Event Types
// ----------------------------------------------------------------------------

/// One chunk produced by a single successful session read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundFrame {
    pub byte_count: usize,
    pub payload: Vec<u8>,
}

impl InboundFrame {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            byte_count: payload.len(),
            payload,
        }
    }
}

/// Non-fatal conditions worth telling the consumer about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SessionWarning {
    #[error("Not connected to any device")]
    NotConnected,
    #[error("Failed to open listening endpoint: {0}")]
    EndpointUnavailable(String),
    #[error("Failed to send message: {0}")]
    WriteFailed(String),
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),
}

/// Notification delivered to the consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged { state: SessionState },
    PeerIdentified { peer: PeerIdentity },
    InboundFrame(InboundFrame),
    OutboundFrame { payload: Vec<u8> },
    Warning { warning: SessionWarning },
    ConnectionFailed,
    ConnectionLost,
}

impl SessionEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "StateChanged",
            SessionEvent::PeerIdentified { .. } => "PeerIdentified",
            SessionEvent::InboundFrame(_) => "InboundFrame",
            SessionEvent::OutboundFrame { .. } => "OutboundFrame",
            SessionEvent::Warning { .. } => "Warning",
            SessionEvent::ConnectionFailed => "ConnectionFailed",
            SessionEvent::ConnectionLost => "ConnectionLost",
        }
    }
}

impl From<SessionWarning> for SessionEvent {
    fn from(warning: SessionWarning) -> Self {
        SessionEvent::Warning { warning }
    }
}

// ----------------------------------------------------------------------------
// Event Sink
// ----------------------------------------------------------------------------

/// Receiver side of the notification contract
///
/// `deliver` is called from worker tasks, sometimes with the manager lock held. It must
/// return promptly; anything slow belongs on the other side of a channel.
pub trait EventSink: Send + Sync + 'static {
    fn deliver(&self, event: SessionEvent);
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

impl EventSink for EventSender {
    fn deliver(&self, event: SessionEvent) {
        if let Err(e) = self.send(event) {
            trace!("Event receiver dropped, discarding {}", e.0.name());
        }
    }
}

/// Create the unbounded channel the default sink uses
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
