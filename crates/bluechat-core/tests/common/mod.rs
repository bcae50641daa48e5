//! In-memory transport for driving the session manager in tests
//!
//! Inbound connections and dials are backed by `tokio::io::duplex` pairs; the test keeps
//! the remote half and plays the peer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bluechat_core::{
    Accepted, BluechatError, BoxedEndpoint, BoxedSocket, EventReceiver, PeerAddress,
    RendezvousEndpoint, Result, ServiceRecord, SessionEvent, SessionState, Transport,
};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
const DUPLEX_CAPACITY: usize = 4096;

// ----------------------------------------------------------------------------
// Dial Scripts
// ----------------------------------------------------------------------------

/// How the next dial to an address behaves; each script is consumed by one dial
pub enum DialBehavior {
    Succeed,
    Fail,
    /// Never completes
    Hang,
    /// Completes once the test sends `true` (succeed) or `false` (fail)
    Gated(oneshot::Receiver<bool>),
}

// ----------------------------------------------------------------------------
// Mock Transport
// ----------------------------------------------------------------------------

pub struct MockTransport {
    inbound_tx: mpsc::UnboundedSender<Result<Accepted>>,
    inbound_rx: InboundQueue,
    dialed_tx: mpsc::UnboundedSender<(String, DuplexStream)>,
    dials: Mutex<HashMap<String, DialBehavior>>,
    names: Mutex<HashMap<String, String>>,
    listen_fails: AtomicBool,
    listen_calls: AtomicUsize,
}

type InboundQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Accepted>>>>;

/// Remote halves of successful dials, tagged with the dialed address
pub type DialedPeers = mpsc::UnboundedReceiver<(String, DuplexStream)>;

impl MockTransport {
    pub fn new() -> (Arc<Self>, DialedPeers) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (dialed_tx, dialed_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            inbound_tx,
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
            dialed_tx,
            dials: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            listen_fails: AtomicBool::new(false),
            listen_calls: AtomicUsize::new(0),
        });
        (transport, dialed_rx)
    }

    /// Queue an inbound connection from `peer`; returns the peer's end of the stream
    pub fn inject_inbound(&self, peer: &str) -> DuplexStream {
        let (local, remote) = tokio::io::duplex(DUPLEX_CAPACITY);
        self.inject_inbound_socket(peer, Box::new(local));
        remote
    }

    /// Queue an inbound connection backed by a caller-supplied socket
    pub fn inject_inbound_socket(&self, peer: &str, socket: BoxedSocket) {
        self.push_inbound(Ok(Accepted::new(socket, PeerAddress::new(peer))));
    }

    /// Make the endpoint's pending accept fail
    pub fn inject_accept_error(&self) {
        self.push_inbound(Err(BluechatError::endpoint_unavailable("adapter reset")));
    }

    fn push_inbound(&self, accepted: Result<Accepted>) {
        if self.inbound_tx.send(accepted).is_err() {
            panic!("inbound queue closed");
        }
    }

    pub fn script_dial(&self, address: &str, behavior: DialBehavior) {
        self.dials.lock().unwrap().insert(address.to_string(), behavior);
    }

    pub fn set_name(&self, address: &str, name: &str) {
        self.names
            .lock()
            .unwrap()
            .insert(address.to_string(), name.to_string());
    }

    pub fn set_listen_fails(&self, fails: bool) {
        self.listen_fails.store(fails, Ordering::SeqCst);
    }

    pub fn listen_calls(&self) -> usize {
        self.listen_calls.load(Ordering::SeqCst)
    }

    fn dialed(&self, address: &PeerAddress) -> Result<BoxedSocket> {
        let (local, remote) = tokio::io::duplex(DUPLEX_CAPACITY);
        let _ = self.dialed_tx.send((address.to_string(), remote));
        Ok(Box::new(local))
    }
}

struct MockEndpoint {
    inbound: InboundQueue,
}

#[async_trait]
impl RendezvousEndpoint for MockEndpoint {
    async fn accept(&mut self) -> Result<Accepted> {
        let mut inbound = self.inbound.lock().await;
        inbound
            .recv()
            .await
            .unwrap_or_else(|| Err(BluechatError::endpoint_unavailable("inbound queue closed")))
    }
}

/// Socket that never yields data and rejects every write
pub struct BrokenWriteSocket;

impl AsyncRead for BrokenWriteSocket {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenWriteSocket {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "link degraded")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn listen(&self, _service: &ServiceRecord) -> Result<BoxedEndpoint> {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        if self.listen_fails.load(Ordering::SeqCst) {
            return Err(BluechatError::endpoint_unavailable("adapter is off"));
        }
        Ok(Box::new(MockEndpoint {
            inbound: Arc::clone(&self.inbound_rx),
        }))
    }

    fn resolve(&self, address: &str) -> Result<PeerAddress> {
        if address.is_empty() || address.contains(char::is_whitespace) {
            return Err(BluechatError::invalid_address(address, "malformed address"));
        }
        Ok(PeerAddress::new(address))
    }

    async fn connect(&self, target: &PeerAddress, _service: &ServiceRecord) -> Result<BoxedSocket> {
        let behavior = self
            .dials
            .lock()
            .unwrap()
            .remove(target.as_str())
            .unwrap_or(DialBehavior::Fail);
        match behavior {
            DialBehavior::Succeed => self.dialed(target),
            DialBehavior::Fail => Err(BluechatError::connection_failed(target.as_str(), "refused")),
            DialBehavior::Hang => std::future::pending().await,
            DialBehavior::Gated(gate) => match gate.await {
                Ok(true) => self.dialed(target),
                _ => Err(BluechatError::connection_failed(target.as_str(), "gate closed")),
            },
        }
    }

    async fn peer_name(&self, address: &PeerAddress) -> Result<Option<String>> {
        Ok(self.names.lock().unwrap().get(address.as_str()).cloned())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ----------------------------------------------------------------------------
// Event Helpers
// ----------------------------------------------------------------------------

pub async fn next_event(rx: &mut EventReceiver) -> SessionEvent {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

/// Collect events up to and including the next transition into `state`
pub async fn events_until_state(rx: &mut EventReceiver, state: SessionState) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx).await;
        let done = event == SessionEvent::StateChanged { state };
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Assert nothing arrives within a short window
pub async fn expect_quiet(rx: &mut EventReceiver) {
    if let Ok(Some(event)) = timeout(Duration::from_millis(100), rx.recv()).await {
        panic!("unexpected event: {:?}", event);
    }
}

pub fn state(state: SessionState) -> SessionEvent {
    SessionEvent::StateChanged { state }
}
