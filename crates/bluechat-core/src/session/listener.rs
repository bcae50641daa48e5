//! Listener worker: opens the rendezvous endpoint and waits for inbound connections

use tracing::{debug, info, warn};

use super::identity::resolve_identity;
use super::{AcceptVerdict, WorkerContext};
use crate::events::SessionWarning;
use crate::transport::Accepted;

pub(crate) struct Listener {
    ctx: WorkerContext,
}

impl Listener {
    pub(crate) fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    pub(crate) async fn run(self) {
        let WorkerContext {
            id,
            mut cancel,
            transport,
            config,
            callbacks,
        } = self.ctx;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Cancelled before the endpoint opened");
                return;
            }
            opened = transport.listen(&config.service) => opened,
        };

        let mut endpoint = match opened {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!("Unable to open rendezvous endpoint: {}", e);
                callbacks.on_warning(id, SessionWarning::EndpointUnavailable(e.to_string()));
                callbacks.on_listener_closed(id);
                return;
            }
        };
        info!(
            "Listening as {} ({}) over {}",
            config.service.name,
            config.service.uuid,
            transport.name()
        );

        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Listener cancelled");
                    return;
                }
                accepted = endpoint.accept() => accepted,
            };

            let Accepted { socket, peer } = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept failed, closing listener: {}", e);
                    callbacks.on_warning(id, SessionWarning::EndpointUnavailable(e.to_string()));
                    break;
                }
            };
            debug!("Inbound connection from {}", peer);

            let identity = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Listener cancelled while naming {}", peer);
                    return;
                }
                identity = resolve_identity(transport.as_ref(), &config, peer.clone()) => identity,
            };

            match callbacks.clone().on_accepted(id, socket, identity) {
                AcceptVerdict::Promoted => {
                    debug!("Handed inbound connection to the session");
                    return;
                }
                AcceptVerdict::Superseded => {
                    debug!("Listener superseded, dropping inbound connection");
                    return;
                }
                AcceptVerdict::Rejected => {
                    debug!("Session busy, closed inbound connection");
                }
            }
        }

        drop(endpoint);
        callbacks.on_listener_closed(id);
    }
}
