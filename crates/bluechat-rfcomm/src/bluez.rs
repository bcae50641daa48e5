//! RFCOMM over BlueZ
//!
//! The rendezvous endpoint is a BlueZ profile registration: the daemon publishes an SDP
//! record for the service UUID and hands every inbound RFCOMM connection to us as a
//! connect request. Outbound dials go straight to the configured RFCOMM channel.

use async_trait::async_trait;
use bluechat_core::{
    Accepted, BoxedEndpoint, BoxedSocket, PeerAddress, RendezvousEndpoint, Result, ServiceRecord,
    Transport,
};
use bluer::rfcomm::{Profile, ProfileHandle, Role, SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::BluezTransportConfig;
use crate::error::RfcommError;

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

pub struct BluezTransport {
    session: Session,
    adapter: Adapter,
    config: BluezTransportConfig,
}

impl BluezTransport {
    /// Connect to bluetoothd and power on the selected adapter
    pub async fn new(config: BluezTransportConfig) -> std::result::Result<Self, RfcommError> {
        let session = Session::new().await?;
        let adapter = match &config.adapter {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        if !adapter.is_powered().await? {
            info!("Powering on adapter {}", adapter.name());
            adapter.set_powered(true).await?;
        }
        info!(
            "Using adapter {} ({})",
            adapter.name(),
            adapter.address().await?
        );
        Ok(Self {
            session,
            adapter,
            config,
        })
    }

    fn parse_address(address: &str) -> std::result::Result<Address, RfcommError> {
        address
            .trim()
            .parse::<Address>()
            .map_err(|e| RfcommError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })
    }
}

struct ProfileEndpoint {
    handle: ProfileHandle,
}

#[async_trait]
impl RendezvousEndpoint for ProfileEndpoint {
    async fn accept(&mut self) -> Result<Accepted> {
        let request = self.handle.next().await.ok_or(RfcommError::ListenerClosed)?;
        let device = request.device();
        debug!("Connect request from {}", device);
        let stream = request.accept().map_err(RfcommError::from)?;
        Ok(Accepted::new(
            Box::new(stream),
            PeerAddress::new(device.to_string()),
        ))
    }
}

#[async_trait]
impl Transport for BluezTransport {
    async fn listen(&self, service: &ServiceRecord) -> Result<BoxedEndpoint> {
        let profile = Profile {
            uuid: service.uuid,
            name: Some(service.name.clone()),
            role: Some(Role::Server),
            channel: Some(self.config.channel.into()),
            require_authentication: Some(self.config.require_authentication),
            require_authorization: Some(false),
            ..Default::default()
        };
        let handle = self
            .session
            .register_profile(profile)
            .await
            .map_err(|e| RfcommError::ServiceRegistration(e.to_string()))?;
        info!(
            "Registered {} ({}) on RFCOMM channel {}",
            service.name, service.uuid, self.config.channel
        );
        Ok(Box::new(ProfileEndpoint { handle }))
    }

    fn resolve(&self, address: &str) -> Result<PeerAddress> {
        let parsed = Self::parse_address(address)?;
        Ok(PeerAddress::new(parsed.to_string()))
    }

    async fn connect(&self, target: &PeerAddress, _service: &ServiceRecord) -> Result<BoxedSocket> {
        let address = Self::parse_address(target.as_str())?;
        let socket_addr = SocketAddr::new(address, self.config.channel);

        let stream = match tokio::time::timeout(self.config.connect_timeout, Stream::connect(socket_addr)).await {
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
        Ok(Box::new(stream))
    }

    /// Reports discovery run by other BlueZ clients; this transport starts none to stop
    async fn cancel_discovery(&self) -> Result<()> {
        match self.adapter.is_discovering().await {
            Ok(true) => warn!("Adapter {} is discovering; dial may be slow", self.adapter.name()),
            Ok(false) => {}
            Err(e) => debug!("Could not query discovery state: {}", e),
        }
        Ok(())
    }

    async fn peer_name(&self, address: &PeerAddress) -> Result<Option<String>> {
        let address = Self::parse_address(address.as_str())?;
        let device = self.adapter.device(address).map_err(RfcommError::from)?;
        let name = match device.alias().await {
            Ok(alias) => Some(alias),
            Err(_) => device.name().await.map_err(RfcommError::from)?,
        };
        Ok(name)
    }

    fn name(&self) -> &'static str {
        "bluez"
    }
}
