//! Worker slots owned by the session manager
//!
//! Each slot holds at most one registration. Replacing or clearing a slot drops its
//! [`CancelHandle`], so a worker can never outlive its registration without noticing.

use tokio::sync::mpsc;
use tracing::debug;

use crate::cancel::CancelHandle;
use crate::types::{ActiveWorkers, WorkerId, WorkerKind};

pub(crate) type WriteSender = mpsc::UnboundedSender<Vec<u8>>;
pub(crate) type WriteReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

// ----------------------------------------------------------------------------
// Registrations
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct Registration {
    id: WorkerId,
    cancel: CancelHandle,
}

impl Registration {
    pub(crate) fn new(id: WorkerId, cancel: CancelHandle) -> Self {
        Self { id, cancel }
    }
}

/// The pump additionally owns the sending side of its write queue
#[derive(Debug)]
pub(crate) struct PumpRegistration {
    registration: Registration,
    writes: WriteSender,
}

impl PumpRegistration {
    pub(crate) fn new(registration: Registration, writes: WriteSender) -> Self {
        Self {
            registration,
            writes,
        }
    }
}

// ----------------------------------------------------------------------------
// Worker Registry
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(crate) struct WorkerRegistry {
    listener: Option<Registration>,
    connector: Option<Registration>,
    pump: Option<PumpRegistration>,
}

impl WorkerRegistry {
    pub(crate) fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub(crate) fn register_listener(&mut self, registration: Registration) {
        self.cancel_listener();
        self.listener = Some(registration);
    }

    pub(crate) fn register_connector(&mut self, registration: Registration) {
        self.cancel_connector();
        self.connector = Some(registration);
    }

    pub(crate) fn register_pump(&mut self, registration: PumpRegistration) {
        self.cancel_pump();
        self.pump = Some(registration);
    }

    pub(crate) fn cancel_listener(&mut self) {
        if let Some(registration) = self.listener.take() {
            Self::cancel(WorkerKind::Listener, registration);
        }
    }

    pub(crate) fn cancel_connector(&mut self) {
        if let Some(registration) = self.connector.take() {
            Self::cancel(WorkerKind::Connector, registration);
        }
    }

    pub(crate) fn cancel_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            Self::cancel(WorkerKind::Pump, pump.registration);
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        self.cancel_connector();
        self.cancel_pump();
        self.cancel_listener();
    }

    fn cancel(kind: WorkerKind, registration: Registration) {
        debug!("Cancelling {} {}", kind, registration.id);
        registration.cancel.cancel();
    }

    /// Which slot, if any, `id` currently occupies
    pub(crate) fn kind_of(&self, id: WorkerId) -> Option<WorkerKind> {
        if self.listener.as_ref().is_some_and(|r| r.id == id) {
            Some(WorkerKind::Listener)
        } else if self.connector.as_ref().is_some_and(|r| r.id == id) {
            Some(WorkerKind::Connector)
        } else if self.pump.as_ref().is_some_and(|p| p.registration.id == id) {
            Some(WorkerKind::Pump)
        } else {
            None
        }
    }

    pub(crate) fn is_registered(&self, id: WorkerId) -> bool {
        self.kind_of(id).is_some()
    }

    /// Remove `id` from its slot without signalling it; used when a worker reports its
    /// own completion
    pub(crate) fn release(&mut self, id: WorkerId) -> Option<WorkerKind> {
        let kind = self.kind_of(id)?;
        match kind {
            WorkerKind::Listener => self.listener = None,
            WorkerKind::Connector => self.connector = None,
            WorkerKind::Pump => self.pump = None,
        }
        Some(kind)
    }

    pub(crate) fn pump_writer(&self) -> Option<&WriteSender> {
        self.pump.as_ref().map(|p| &p.writes)
    }

    pub(crate) fn snapshot(&self) -> ActiveWorkers {
        ActiveWorkers {
            listener: self.listener.is_some(),
            connector: self.connector.is_some(),
            pump: self.pump.is_some(),
        }
    }

    #[cfg(test)]
    pub(crate) fn connector_id(&self) -> Option<WorkerId> {
        self.connector.as_ref().map(|r| r.id)
    }

    #[cfg(test)]
    pub(crate) fn pump_id(&self) -> Option<WorkerId> {
        self.pump.as_ref().map(|p| p.registration.id)
    }
}
