//! Session manager
//!
//! Owns the single logical session and its three workers:
//!
//! - **Listener** waits on a rendezvous endpoint for an inbound connection
//! - **Connector** dials one peer
//! - **Pump** owns the connected socket, reading chunks and serving writes
//!
//! All state lives behind one mutex. Control operations and worker callbacks take that
//! lock, perform the whole transition (cancel workers, spawn workers, set state, emit
//! events) and release it; it is never held across an `.await`. Every worker carries a
//! [`WorkerId`], and a callback whose id no longer occupies a slot is ignored, so a
//! superseded worker that finishes late cannot disturb the session.

mod connector;
mod identity;
mod listener;
mod pump;
mod registry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cancel::{cancel_pair, CancelToken};
use crate::config::SessionConfig;
use crate::errors::{BluechatError, Result};
use crate::events::{create_event_channel, EventReceiver, EventSink, InboundFrame, SessionEvent, SessionWarning};
use crate::transport::{BoxedSocket, Transport};
use crate::types::{ActiveWorkers, PeerIdentity, SessionState, WorkerId, WorkerKind};

use connector::Connector;
use listener::Listener;
use pump::Pump;
use registry::{PumpRegistration, Registration, WorkerRegistry};

// ----------------------------------------------------------------------------
// Worker Plumbing
// ----------------------------------------------------------------------------

/// What happened to a socket a listener handed over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AcceptVerdict {
    /// The session took the socket; the listener is done
    Promoted,
    /// The session is busy; the socket was closed and the listener keeps accepting
    Rejected,
    /// The listener no longer owns its slot; the socket was closed
    Superseded,
}

/// The narrow interface workers use to report back
///
/// Callbacks that may start new workers take `Arc<Self>`.
pub(crate) trait WorkerCallbacks: Send + Sync + 'static {
    fn on_accepted(self: Arc<Self>, id: WorkerId, socket: BoxedSocket, peer: PeerIdentity) -> AcceptVerdict;
    fn on_connected(self: Arc<Self>, id: WorkerId, socket: BoxedSocket, peer: PeerIdentity);
    fn on_failed(self: Arc<Self>, id: WorkerId);
    fn on_lost(self: Arc<Self>, id: WorkerId);
    /// Returns `false` once the pump has been superseded
    fn on_inbound(&self, id: WorkerId, payload: Vec<u8>) -> bool;
    fn on_outbound(&self, id: WorkerId, payload: Vec<u8>);
    fn on_warning(&self, id: WorkerId, warning: SessionWarning);
    fn on_listener_closed(&self, id: WorkerId);
}

/// Everything a worker task owns
pub(crate) struct WorkerContext {
    pub(crate) id: WorkerId,
    pub(crate) cancel: CancelToken,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) callbacks: Arc<dyn WorkerCallbacks>,
}

// ----------------------------------------------------------------------------
// Manager State
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Shared {
    state: SessionState,
    registry: WorkerRegistry,
}

struct Inner {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
    config: Arc<SessionConfig>,
    runtime: Handle,
    next_worker: AtomicU64,
    shared: Mutex<Shared>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        self.sink.deliver(event);
    }

    fn set_state(&self, shared: &mut Shared, state: SessionState) {
        if shared.state != state {
            info!("Session state {} -> {}", shared.state, state);
        }
        shared.state = state;
        self.emit(SessionEvent::StateChanged { state });
    }

    fn context(self: &Arc<Self>) -> (WorkerContext, crate::cancel::CancelHandle) {
        let id = WorkerId::new(self.next_worker.fetch_add(1, Ordering::Relaxed));
        let (handle, cancel) = cancel_pair();
        let ctx = WorkerContext {
            id,
            cancel,
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            callbacks: Arc::clone(self) as Arc<dyn WorkerCallbacks>,
        };
        (ctx, handle)
    }

    fn spawn_listener(self: &Arc<Self>, shared: &mut Shared) {
        let (ctx, handle) = self.context();
        let id = ctx.id;
        shared.registry.register_listener(Registration::new(id, handle));
        debug!("Spawning listener {}", id);
        self.runtime.spawn(
            Listener::new(ctx)
                .run()
                .instrument(info_span!("listener", worker = %id)),
        );
    }

    fn spawn_connector(self: &Arc<Self>, shared: &mut Shared, target: Result<crate::types::PeerAddress>) {
        let (ctx, handle) = self.context();
        let id = ctx.id;
        shared.registry.register_connector(Registration::new(id, handle));
        debug!("Spawning connector {}", id);
        self.runtime.spawn(
            Connector::new(ctx, target)
                .run()
                .instrument(info_span!("connector", worker = %id)),
        );
    }

    fn spawn_pump(self: &Arc<Self>, shared: &mut Shared, socket: BoxedSocket) {
        let (ctx, handle) = self.context();
        let id = ctx.id;
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();
        shared
            .registry
            .register_pump(PumpRegistration::new(Registration::new(id, handle), writes_tx));
        debug!("Spawning pump {}", id);
        self.runtime.spawn(
            Pump::new(ctx, socket, writes_rx)
                .run()
                .instrument(info_span!("pump", worker = %id)),
        );
    }

    // ------------------------------------------------------------------------
    // Transitions (caller holds the lock)
    // ------------------------------------------------------------------------

    fn start_locked(self: &Arc<Self>, shared: &mut Shared) {
        shared.registry.cancel_connector();
        shared.registry.cancel_pump();
        if !shared.registry.has_listener() {
            self.spawn_listener(shared);
        }
        self.set_state(shared, SessionState::Listening);
    }

    fn connect_locked(self: &Arc<Self>, shared: &mut Shared, address: &str) {
        // A connector only exists while CONNECTING
        shared.registry.cancel_connector();
        shared.registry.cancel_pump();
        shared.registry.cancel_listener();

        let target = self.transport.resolve(address);
        match &target {
            Ok(target) => info!("Connecting to {}", target),
            Err(e) => warn!("Could not resolve {}: {}", address, e),
        }
        self.spawn_connector(shared, target);
        self.set_state(shared, SessionState::Connecting);
    }

    fn promote_locked(self: &Arc<Self>, shared: &mut Shared, socket: BoxedSocket, peer: PeerIdentity) {
        shared.registry.cancel_all();
        self.spawn_pump(shared, socket);
        info!("Session established with {}", peer);
        self.emit(SessionEvent::PeerIdentified { peer });
        self.set_state(shared, SessionState::Connected);
    }

    fn ignore_stale(&self, id: WorkerId, what: &str) {
        debug!("Ignoring {} from superseded worker {}", what, id);
    }
}

impl WorkerCallbacks for Inner {
    fn on_accepted(self: Arc<Self>, id: WorkerId, socket: BoxedSocket, peer: PeerIdentity) -> AcceptVerdict {
        let mut shared = self.lock();
        if shared.registry.kind_of(id) != Some(WorkerKind::Listener) {
            self.ignore_stale(id, "accepted connection");
            drop(socket);
            return AcceptVerdict::Superseded;
        }
        if shared.state.accepts_inbound() {
            shared.registry.release(id);
            self.promote_locked(&mut shared, socket, peer);
            AcceptVerdict::Promoted
        } else {
            debug!("Closing inbound connection from {} while {}", peer, shared.state);
            drop(socket);
            AcceptVerdict::Rejected
        }
    }

    fn on_connected(self: Arc<Self>, id: WorkerId, socket: BoxedSocket, peer: PeerIdentity) {
        let mut shared = self.lock();
        if shared.registry.kind_of(id) != Some(WorkerKind::Connector) {
            self.ignore_stale(id, "connected socket");
            drop(socket);
            return;
        }
        shared.registry.release(id);
        self.promote_locked(&mut shared, socket, peer);
    }

    fn on_failed(self: Arc<Self>, id: WorkerId) {
        let mut shared = self.lock();
        if shared.registry.kind_of(id) != Some(WorkerKind::Connector) {
            self.ignore_stale(id, "connection failure");
            return;
        }
        shared.registry.release(id);
        self.emit(SessionEvent::ConnectionFailed);
        self.start_locked(&mut shared);
    }

    fn on_lost(self: Arc<Self>, id: WorkerId) {
        let mut shared = self.lock();
        if shared.registry.kind_of(id) != Some(WorkerKind::Pump) {
            self.ignore_stale(id, "connection loss");
            return;
        }
        shared.registry.release(id);
        self.emit(SessionEvent::ConnectionLost);
        self.start_locked(&mut shared);
    }

    fn on_inbound(&self, id: WorkerId, payload: Vec<u8>) -> bool {
        let shared = self.lock();
        if shared.registry.kind_of(id) != Some(WorkerKind::Pump) {
            return false;
        }
        self.emit(SessionEvent::InboundFrame(InboundFrame::new(payload)));
        true
    }

    fn on_outbound(&self, id: WorkerId, payload: Vec<u8>) {
        let shared = self.lock();
        if shared.registry.kind_of(id) == Some(WorkerKind::Pump) {
            self.emit(SessionEvent::OutboundFrame { payload });
        }
    }

    fn on_warning(&self, id: WorkerId, warning: SessionWarning) {
        let shared = self.lock();
        if shared.registry.is_registered(id) {
            self.emit(warning.into());
        } else {
            self.ignore_stale(id, "warning");
        }
    }

    fn on_listener_closed(&self, id: WorkerId) {
        let mut shared = self.lock();
        if shared.registry.kind_of(id) == Some(WorkerKind::Listener) {
            shared.registry.release(id);
            debug!("Listener {} closed; next start() reopens the endpoint", id);
        }
    }
}

// ----------------------------------------------------------------------------
// Session Manager
// ----------------------------------------------------------------------------

/// Single-peer connection lifecycle manager
///
/// Control operations are synchronous and non-blocking; all I/O happens on worker
/// tasks spawned onto the runtime captured at construction. Outcomes arrive through
/// the [`EventSink`]. Dropping the manager stops every worker.
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a manager that spawns its workers onto the current tokio runtime
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn EventSink>, config: SessionConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| BluechatError::RuntimeUnavailable {
            reason: e.to_string(),
        })?;
        Self::with_runtime(transport, sink, config, runtime)
    }

    /// Create a manager bound to an explicit runtime handle
    pub fn with_runtime(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn EventSink>,
        config: SessionConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        debug!("Session manager using {} transport", transport.name());
        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                sink,
                config: Arc::new(config),
                runtime,
                next_worker: AtomicU64::new(1),
                shared: Mutex::new(Shared::default()),
            }),
        })
    }

    /// Create a manager that reports into a fresh unbounded channel
    pub fn with_channel(transport: Arc<dyn Transport>, config: SessionConfig) -> Result<(Self, EventReceiver)> {
        let (tx, rx) = create_event_channel();
        let manager = Self::new(transport, Arc::new(tx), config)?;
        Ok((manager, rx))
    }

    /// Enter LISTENING, keeping an existing listener or spawning one
    pub fn start(&self) {
        let mut shared = self.inner.lock();
        self.inner.start_locked(&mut shared);
    }

    /// Abandon whatever is running and dial `address`
    pub fn connect(&self, address: &str) {
        let mut shared = self.inner.lock();
        self.inner.connect_locked(&mut shared, address);
    }

    /// Queue `bytes` on the live session
    ///
    /// Outside CONNECTED this only emits a [`SessionWarning::NotConnected`].
    pub fn write(&self, bytes: impl Into<Vec<u8>>) {
        let shared = self.inner.lock();
        if !shared.state.is_connected() {
            self.inner.emit(SessionWarning::NotConnected.into());
            return;
        }
        match shared.registry.pump_writer() {
            Some(writer) => {
                if writer.send(bytes.into()).is_err() {
                    self.inner
                        .emit(SessionWarning::WriteFailed("session is closing".to_string()).into());
                }
            }
            None => self.inner.emit(SessionWarning::NotConnected.into()),
        }
    }

    /// Cancel every worker and return to IDLE
    pub fn stop(&self) {
        let mut shared = self.inner.lock();
        shared.registry.cancel_all();
        self.inner.set_state(&mut shared, SessionState::Idle);
    }

    pub fn current_state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Which worker slots are currently occupied
    pub fn active_workers(&self) -> ActiveWorkers {
        self.inner.lock().registry.snapshot()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        let mut shared = self.inner.lock();
        shared.registry.cancel_all();
        shared.state = SessionState::Idle;
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.inner.lock();
        f.debug_struct("SessionManager")
            .field("transport", &self.inner.transport.name())
            .field("state", &shared.state)
            .field("workers", &shared.registry.snapshot())
            .finish()
    }
}
