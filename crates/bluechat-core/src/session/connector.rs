//! Connector worker: dials one peer

use tracing::{debug, info, warn};

use super::identity::resolve_identity;
use super::WorkerContext;
use crate::errors::Result;
use crate::events::SessionWarning;
use crate::types::PeerAddress;

pub(crate) struct Connector {
    ctx: WorkerContext,
    target: Result<PeerAddress>,
}

impl Connector {
    /// A connector built from a failed resolution is inert and reports failure at once
    pub(crate) fn new(ctx: WorkerContext, target: Result<PeerAddress>) -> Self {
        Self { ctx, target }
    }

    pub(crate) async fn run(self) {
        let WorkerContext {
            id,
            mut cancel,
            transport,
            config,
            callbacks,
        } = self.ctx;

        let target = match self.target {
            Ok(target) => target,
            Err(e) => {
                warn!("Cannot dial: {}", e);
                callbacks.on_warning(id, SessionWarning::InvalidAddress(e.to_string()));
                callbacks.on_failed(id);
                return;
            }
        };

        if let Err(e) = transport.cancel_discovery().await {
            debug!("Could not cancel discovery: {}", e);
        }

        let dial = async {
            let socket = transport.connect(&target, &config.service).await?;
            let identity = resolve_identity(transport.as_ref(), &config, target.clone()).await;
            Ok::<_, crate::errors::BluechatError>((socket, identity))
        };

        let dialed = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Connector cancelled");
                return;
            }
            dialed = dial => dialed,
        };

        match dialed {
            Ok((socket, identity)) => {
                info!("Connected to {}", identity);
                callbacks.on_connected(id, socket, identity);
            }
            Err(e) => {
                warn!("Unable to connect to {}: {}", target, e);
                callbacks.on_failed(id);
            }
        }
    }
}
