//! BlueChat session core
//!
//! Connection lifecycle for a point-to-point chat session over a serial-style byte
//! stream. A [`SessionManager`] owns at most one session at a time and moves it between
//! IDLE, LISTENING, CONNECTING and CONNECTED, coordinating a listener, a connector and a
//! session pump without ever letting two of them own the session at once.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bluechat_core::{SessionConfig, SessionEvent, SessionManager, Transport};
//!
//! # async fn example(transport: Arc<dyn Transport>) -> bluechat_core::Result<()> {
//! let (manager, mut events) = SessionManager::with_channel(transport, SessionConfig::new())?;
//! manager.start();
//!
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::InboundFrame(frame) = event {
//!         manager.write(frame.payload);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Transports live in `bluechat-rfcomm`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

mod cancel;
pub mod config;
pub mod errors;
pub mod events;
pub mod session;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{
    ServiceRecord, SessionConfig, DEFAULT_READ_BUFFER_SIZE, DEFAULT_SERVICE_NAME,
    SERIAL_PORT_PROFILE_UUID, UNKNOWN_PEER_NAME,
};
pub use errors::{BluechatError, BluechatResult, Result, TransportError};
pub use events::{
    create_event_channel, EventReceiver, EventSender, EventSink, InboundFrame, SessionEvent,
    SessionWarning,
};
pub use session::SessionManager;
pub use transport::{Accepted, BoxedEndpoint, BoxedSocket, RendezvousEndpoint, StreamSocket, Transport};
pub use types::{ActiveWorkers, PeerAddress, PeerIdentity, SessionState, WorkerId, WorkerKind};
