//! Stream transports for BlueChat sessions
//!
//! Implementations of the `bluechat-core` [`Transport`](bluechat_core::Transport) trait:
//!
//! - [`TcpTransport`] - serial-profile stand-in over TCP, always available
//! - `BluezTransport` - RFCOMM through BlueZ on Linux, behind the `bluez` feature
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bluechat_core::{SessionConfig, SessionManager};
//! use bluechat_rfcomm::{TcpTransport, TcpTransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(TcpTransport::new(TcpTransportConfig::default()));
//! let (manager, _events) = SessionManager::with_channel(transport, SessionConfig::new())?;
//! manager.start();
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod tcp;

#[cfg(all(feature = "bluez", target_os = "linux"))]
mod bluez;

pub use config::{BluezTransportConfig, TcpTransportConfig, DEFAULT_RFCOMM_CHANNEL};
pub use error::RfcommError;
pub use tcp::TcpTransport;

#[cfg(all(feature = "bluez", target_os = "linux"))]
pub use bluez::BluezTransport;
