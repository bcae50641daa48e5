//! Transport abstraction consumed by the session workers
//!
//! The core never touches a radio or a socket API directly. A transport supplies a
//! rendezvous endpoint for inbound connections, dials outbound ones, and hands back
//! connected byte streams. Closing is expressed as `Drop`: a worker that is cancelled
//! drops its endpoint or socket, which releases the underlying resource.
//!
//! ## Implementations
//!
//! Concrete transports live in the `bluechat-rfcomm` crate.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ServiceRecord;
use crate::errors::Result;
use crate::types::PeerAddress;

// ----------------------------------------------------------------------------
// Socket Types
// ----------------------------------------------------------------------------

/// A connected, bidirectional byte stream
pub trait StreamSocket: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> StreamSocket for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedSocket = Box<dyn StreamSocket>;

/// A socket handed out by [`RendezvousEndpoint::accept`] together with who connected
pub struct Accepted {
    pub socket: BoxedSocket,
    pub peer: PeerAddress,
}

impl Accepted {
    pub fn new(socket: BoxedSocket, peer: PeerAddress) -> Self {
        Self { socket, peer }
    }
}

// ----------------------------------------------------------------------------
// Transport Traits
// ----------------------------------------------------------------------------

/// Passive listening point registered under a [`ServiceRecord`]
#[async_trait]
pub trait RendezvousEndpoint: Send {
    /// Wait for the next inbound connection
    ///
    /// An error ends the listener's accept loop.
    async fn accept(&mut self) -> Result<Accepted>;
}

pub type BoxedEndpoint = Box<dyn RendezvousEndpoint>;

/// Capability set the session manager needs from its environment
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a rendezvous endpoint for the given service
    async fn listen(&self, service: &ServiceRecord) -> Result<BoxedEndpoint>;

    /// Turn a user-supplied address into a dialable target
    ///
    /// Runs synchronously inside `connect()`, so it must not perform I/O.
    fn resolve(&self, address: &str) -> Result<PeerAddress>;

    /// Dial a resolved peer
    async fn connect(&self, target: &PeerAddress, service: &ServiceRecord) -> Result<BoxedSocket>;

    /// Stop any ongoing peer discovery; purely an optimisation for dialing
    async fn cancel_discovery(&self) -> Result<()> {
        Ok(())
    }

    /// Look up a human-readable name for a peer
    async fn peer_name(&self, _address: &PeerAddress) -> Result<Option<String>> {
        Ok(None)
    }

    /// Short transport name for logs
    fn name(&self) -> &'static str;
}
