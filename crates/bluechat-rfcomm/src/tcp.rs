//! TCP stand-in for RFCOMM
//!
//! Behaves like a serial-port profile link over a local network: one listening socket
//! acts as the rendezvous endpoint and peers are addressed as `ip:port`. There is no
//! discovery and no name service, so peers show up under the unknown-peer sentinel.

use std::net::SocketAddr;

use async_trait::async_trait;
use bluechat_core::{
    Accepted, BoxedEndpoint, BoxedSocket, PeerAddress, RendezvousEndpoint, Result, ServiceRecord,
    Transport,
};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::config::TcpTransportConfig;
use crate::error::RfcommError;

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TcpTransportConfig,
}

impl TcpTransport {
    pub fn new(config: TcpTransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TcpTransportConfig {
        &self.config
    }

    fn prepare(&self, stream: &TcpStream) {
        if let Err(e) = stream.set_nodelay(self.config.nodelay) {
            debug!("Could not set TCP_NODELAY: {}", e);
        }
    }
}

struct TcpEndpoint {
    listener: TcpListener,
    nodelay: bool,
}

#[async_trait]
impl RendezvousEndpoint for TcpEndpoint {
    async fn accept(&mut self) -> Result<Accepted> {
        let (stream, remote) = self.listener.accept().await.map_err(RfcommError::from)?;
        if let Err(e) = stream.set_nodelay(self.nodelay) {
            debug!("Could not set TCP_NODELAY: {}", e);
        }
        Ok(Accepted::new(
            Box::new(stream),
            PeerAddress::new(remote.to_string()),
        ))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn listen(&self, service: &ServiceRecord) -> Result<BoxedEndpoint> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| {
                RfcommError::AdapterUnavailable(format!("bind {}: {}", self.config.listen_addr, e))
            })?;
        let bound = listener.local_addr().map_err(RfcommError::from)?;
        info!("{} ({}) accepting on {}", service.name, service.uuid, bound);
        Ok(Box::new(TcpEndpoint {
            listener,
            nodelay: self.config.nodelay,
        }))
    }

    fn resolve(&self, address: &str) -> Result<PeerAddress> {
        let parsed: SocketAddr = address.trim().parse().map_err(|e: std::net::AddrParseError| {
            RfcommError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(PeerAddress::new(parsed.to_string()))
    }

    async fn connect(&self, target: &PeerAddress, _service: &ServiceRecord) -> Result<BoxedSocket> {
        let addr: SocketAddr = target.as_str().parse().map_err(|e: std::net::AddrParseError| {
            RfcommError::InvalidAddress {
                address: target.to_string(),
                reason: e.to_string(),
            }
        })?;

        let dial = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr));
        let stream = match dial.await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RfcommError::ConnectionFailed {
                    address: target.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
            Err(_) => {
                return Err(RfcommError::ConnectionTimeout {
                    address: target.to_string(),
                    timeout_ms: self.config.connect_timeout.as_millis() as u64,
                }
                .into())
            }
        };
        self.prepare(&stream);
        Ok(Box::new(stream))
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}
