//! Best-effort peer name lookup

use tokio::time::timeout;
use tracing::debug;

use crate::config::SessionConfig;
use crate::transport::Transport;
use crate::types::{PeerAddress, PeerIdentity};

/// Resolve a display name for `address`, falling back to the configured sentinel
///
/// Never fails: a denied, failed, empty or slow lookup all yield the sentinel.
pub(crate) async fn resolve_identity(
    transport: &dyn Transport,
    config: &SessionConfig,
    address: PeerAddress,
) -> PeerIdentity {
    let lookup = timeout(config.name_resolution_timeout, transport.peer_name(&address)).await;
    let name = match lookup {
        Ok(Ok(Some(name))) if !name.trim().is_empty() => name,
        Ok(Ok(_)) => config.unknown_peer_name.clone(),
        Ok(Err(e)) => {
            debug!("Name lookup for {} failed: {}", address, e);
            config.unknown_peer_name.clone()
        }
        Err(_) => {
            debug!("Name lookup for {} timed out", address);
            config.unknown_peer_name.clone()
        }
    };
    PeerIdentity::new(address, name)
}
